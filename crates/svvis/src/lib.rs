//! SvVis: a compact telemetry and control link between swarm vehicles and a
//! host.
//!
//! Every message is one channel byte plus a payload the channel implies
//! (a short string, an `i16` or an `f32`). The protocol engine runs a send
//! loop and a receive loop per link and lets the receiving side pause the
//! sender with in-band acquisition control.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte transports (ring pipe, serial endpoint, TCP, in-memory)
//! - [`frame`]: Message model and wire codec
//! - [`engine`]: Queued protocol engine with flow control (behind `engine` feature)

/// Re-export transport types.
pub mod transport {
    pub use svvis_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use svvis_frame::*;
}

/// Re-export engine types (requires `engine` feature).
#[cfg(feature = "engine")]
pub mod engine {
    pub use svvis_engine::*;
}
