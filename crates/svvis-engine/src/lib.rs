//! SvVis protocol engine.
//!
//! Turns a byte [`Transport`](svvis_transport::Transport) into a bidirectional
//! message link: bounded outbound and inbound queues, a send loop gated by
//! the peer's acquisition flag, a receive loop that applies in-band
//! acquisition control, and a flush barrier.

pub mod config;
pub mod connector;
pub mod control;
pub mod engine;
pub mod error;
pub mod listener;
mod state;

pub use config::{EngineConfig, DEFAULT_RECV_QUEUE_CAPACITY, DEFAULT_SEND_QUEUE_CAPACITY};
pub use connector::{connect, connect_with_config};
pub use control::ControlSignal;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use listener::EngineListener;
