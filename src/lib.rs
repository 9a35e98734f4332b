#![doc(html_root_url = "https://docs.rs/webwindow/latest")]
//! Public API for the `webwindow` library.
//!
//! This crate implements the protocol engine behind a server-side window
//! talking to browser clients over websockets: the connection handshake,
//! multiplexed channels, credit-based flow control and bounded outbound
//! queues. Sockets, HTTP serving and process management stay with the host
//! and are reached through the traits in [`transport`].

#[macro_use]
mod macros;

pub mod config;
pub mod credit;
pub mod error;
pub mod frame;
pub mod handler;
pub mod hooks;
pub mod keys;
pub mod metrics;
pub mod queue;
pub mod registry;
pub mod transport;
pub mod window;

pub use config::{ConfigError, WindowConfig, WindowConfigBuilder};
pub use error::{ErrorKind, Result, WindowError};
pub use frame::{FrameError, FrameHeader, InboundFrame};
pub use handler::{WindowHandler, WsEvent};
pub use hooks::{CONN_CLOSED, CONN_READY, ChannelCallback, DataCallback};
pub use metrics::{CONNECTIONS_ACTIVE, Direction, ERRORS_TOTAL, FRAMES_TOTAL, QUEUE_OVERFLOW_TOTAL};
pub use queue::Payload;
pub use registry::{ConnectionId, Stage, Target};
pub use transport::{ChannelTransport, Outbound, ProcessId, SessionId, Transport, WindowId, WindowManager};
pub use window::WebWindow;
