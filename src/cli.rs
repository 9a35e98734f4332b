//! Command line interface for the `webwindow` replay binary.
//!
//! The binary drives one window from an event script so client
//! implementations can be checked against the server's framing and
//! flow control without a browser.

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments for the `webwindow` binary.
#[derive(Debug, Parser)]
#[command(
    name = "webwindow",
    version,
    about = "Replay websocket event scripts against a window"
)]
pub struct Cli {
    /// Event script to replay; standard input is read when omitted.
    pub script: Option<PathBuf>,
    /// Identifier of the replayed window.
    #[arg(long, default_value_t = 1)]
    pub window: u32,
    /// Panel clients are asked to show after the handshake.
    #[arg(long)]
    pub panel: Option<String>,
    /// Maximum number of simultaneous connections; 0 disables the limit.
    #[arg(long, default_value_t = 0)]
    pub connection_limit: usize,
    /// Maximum number of frames queued per connection.
    #[arg(long, default_value_t = 10)]
    pub max_queue: usize,
    /// Send credits granted to each new connection.
    #[arg(long, default_value_t = 10)]
    pub credits: u64,
    /// Refuse clients that do not present a registered key.
    #[arg(long)]
    pub native_only: bool,
}
