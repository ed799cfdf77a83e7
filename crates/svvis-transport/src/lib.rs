//! Byte transports for the SvVis protocol.
//!
//! Provides the contract every SvVis link satisfies and its implementations:
//! - [`RingPipe`], the bounded blocking byte queue fed by receive interrupts
//! - [`SerialTransport`], a serial peripheral endpoint built on a ring pipe
//! - [`TcpTransport`] / [`SvVisListener`], the host socket endpoint
//! - [`MemoryTransport`], an in-process duplex link
//!
//! This is the lowest layer of svvis. Framing and the protocol engine build
//! on the [`Transport`] trait defined here.

pub mod error;
pub mod memory;
pub mod pipe;
pub mod serial;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use pipe::RingPipe;
pub use serial::{PipeFeeder, SerialTransport, DEFAULT_RX_CAPACITY};
pub use tcp::{SvVisListener, TcpConfig, TcpTransport};
pub use traits::{Deadline, Transport};
