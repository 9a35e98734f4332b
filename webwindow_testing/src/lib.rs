//! Utilities for driving a [`WebWindow`](webwindow::WebWindow) in tests.
//!
//! [`Harness`] wires a window to a [`ChannelTransport`](webwindow::ChannelTransport)
//! and a [`RecordingManager`], plays the client side of the handshake and
//! collects everything the window sends or delivers.
//!
//! ```rust
//! use webwindow::WindowConfig;
//! use webwindow_testing::Harness;
//!
//! let mut harness = Harness::new(WindowConfig::default());
//! let conn = harness.handshake(1, "").expect("handshake succeeds");
//! harness.window.send(conn, "hello").expect("send succeeds");
//! assert_eq!(harness.sent_text(), vec!["1:10:1:hello".to_owned()]);
//! ```

pub mod harness;
pub mod logging;
pub mod manager;

pub use harness::{Delivery, Harness, client_frame};
pub use logging::{LoggerHandle, logger};
pub use manager::RecordingManager;
