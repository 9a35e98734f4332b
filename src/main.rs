//! Replay a websocket event script against a single window.
//!
//! Each script line is one command:
//!
//! ```text
//! key <key> <process>        register a one-time key
//! connect <session>          WS_CONNECT
//! ready <session>            WS_READY
//! data <session> <frame>     WS_DATA carrying the rest of the line
//! close <session>            WS_CLOSE
//! send <conn|all> <text>     send text on the data channel
//! channel <conn>             print data arriving on channels above 1
//! closeall                   ask every client to close
//! ```
//!
//! Outbound frames are printed as `<- <session>: <frame>`, callback
//! deliveries as `cb <conn>: <data>`, and rejected lines as `!! ...`.

mod cli;

use std::{
    error::Error,
    fs::File,
    io::{self, BufRead, BufReader},
    sync::Arc,
};

use bytes::Bytes;
use clap::Parser;
use tracing::info;
use webwindow::{
    ChannelTransport,
    ConnectionId,
    Outbound,
    ProcessId,
    SessionId,
    Target,
    WebWindow,
    WindowConfig,
    WindowId,
    WindowManager,
    WsEvent,
};

/// Manager standing in for the host application during a replay.
struct ReplayManager;

impl WindowManager for ReplayManager {
    fn halt_client(&self, process: ProcessId) { info!(%process, "halt client"); }

    fn unregister(&self, window: WindowId) { info!(%window, "window unregistered"); }

    fn url(&self, window: WindowId, _remote: bool) -> String {
        format!("http://localhost/win{window}/")
    }

    fn show(&self, _window: WindowId, _location: &str) -> bool { false }

    fn wait_for(&self, check: &mut dyn FnMut(f64) -> i32, _time_limit: f64) -> i32 { check(0.0) }
}

fn session(arg: &str) -> Result<SessionId, Box<dyn Error>> {
    Ok(SessionId::new(arg.trim().parse()?))
}

fn target(arg: &str) -> Result<Target, Box<dyn Error>> {
    if arg == "all" {
        return Ok(Target::All);
    }
    Ok(Target::Connection(ConnectionId::new(arg.parse()?)))
}

/// Run one script line. Only the command and its leading arguments are
/// trimmed; a `data` frame is replayed byte for byte.
fn replay_line(window: &WebWindow, line: &str) -> Result<(), Box<dyn Error>> {
    let line = line.trim_start();
    if line.trim_end().is_empty() || line.starts_with('#') {
        return Ok(());
    }
    let (command, rest) = line.split_once(' ').unwrap_or((line.trim_end(), ""));
    let handler = window.handler();
    match command {
        "connect" => handler.process(WsEvent::Connect {
            session: session(rest)?,
        })?,
        "ready" => handler.process(WsEvent::Ready {
            session: session(rest)?,
        })?,
        "close" => handler.process(WsEvent::Close {
            session: session(rest)?,
        })?,
        "data" => {
            let (id, frame) = rest.trim_start().split_once(' ').unwrap_or((rest, ""));
            handler.process(WsEvent::Data {
                session: session(id)?,
                payload: Bytes::copy_from_slice(frame.as_bytes()),
            })?;
        }
        "key" => {
            let (key, process) = rest.split_once(' ').ok_or("key needs <key> <process>")?;
            window.add_key(key, ProcessId::new(process.trim().parse()?));
        }
        "send" => {
            let (to, text) = rest.split_once(' ').unwrap_or((rest, ""));
            window.send(target(to)?, text)?;
        }
        "channel" => {
            let id = ConnectionId::new(rest.trim().parse()?);
            window.set_channel_callback(id, |conn, data| {
                println!("ch {conn}: {}", String::from_utf8_lossy(data));
            })?;
        }
        "closeall" => window.close_connections()?,
        other => return Err(format!("unknown command {other:?}").into()),
    }
    Ok(())
}

fn print_frame(frame: &Outbound) {
    match frame {
        Outbound::Text { session, frame } => {
            println!("<- {session}: {}", String::from_utf8_lossy(frame));
        }
        Outbound::Binary {
            session,
            header,
            data,
        } => println!(
            "<- {session}: {} [{} bytes]",
            String::from_utf8_lossy(header),
            data.len()
        ),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // Diagnostics go to stderr so stdout carries only the replay transcript.
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = cli::Cli::parse();
    let mut builder = WindowConfig::builder()
        .connection_limit(cli.connection_limit)
        .max_queue_length(cli.max_queue)
        .initial_credits(cli.credits)
        .native_only(cli.native_only);
    if let Some(panel) = cli.panel {
        builder = builder.panel_name(panel);
    }

    let (transport, mut frames) = ChannelTransport::new();
    let window = WebWindow::new(
        WindowId::new(cli.window),
        builder.build()?,
        Arc::new(ReplayManager),
        Arc::new(transport),
    )?;
    window.set_data_callback(|conn, data| println!("cb {conn}: {}", String::from_utf8_lossy(data)));

    let input: Box<dyn BufRead> = match &cli.script {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };
    for (number, line) in input.lines().enumerate() {
        let line = line?;
        if let Err(err) = replay_line(&window, &line) {
            println!("!! line {}: {err}", number + 1);
        }
        while let Ok(frame) = frames.try_recv() {
            print_frame(&frame);
        }
    }
    Ok(())
}
