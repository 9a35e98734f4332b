//! Tests for events delivered to one window from several threads.

use std::{
    sync::{Arc, Mutex, PoisonError},
    thread,
};

use webwindow::{
    CONN_CLOSED,
    ChannelTransport,
    ConnectionId,
    SessionId,
    WebWindow,
    WindowConfig,
    WindowError,
    WindowId,
    WsEvent,
};
use webwindow_testing::{Delivery, RecordingManager, client_frame};

type Log = Arc<Mutex<Vec<Delivery>>>;

fn recording_window() -> (WebWindow, Log) {
    let (transport, _frames) = ChannelTransport::new();
    let window = WebWindow::new(
        WindowId::new(1),
        WindowConfig::default(),
        Arc::new(RecordingManager::default()),
        Arc::new(transport),
    )
    .expect("default configuration is valid");
    let log = Log::default();
    let sink = Arc::clone(&log);
    window.set_data_callback(move |conn, data| {
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((conn, data.to_vec()));
    });
    (window, log)
}

fn handshake(window: &WebWindow, session: u64) -> ConnectionId {
    let session = SessionId::new(session);
    let handler = window.handler();
    handler.process(WsEvent::Connect { session }).expect("connect");
    handler.process(WsEvent::Ready { session }).expect("ready");
    handler
        .process(WsEvent::Data {
            session,
            payload: client_frame(0, 10, 0, "READY="),
        })
        .expect("announce");
    window.connection_for(session).expect("connection registered")
}

fn data(window: &WebWindow, session: u64) -> webwindow::Result<()> {
    window.handler().process(WsEvent::Data {
        session: SessionId::new(session),
        payload: client_frame(0, 10, 1, "m"),
    })
}

fn take(log: &Log) -> Vec<Delivery> {
    std::mem::take(&mut *log.lock().unwrap_or_else(PoisonError::into_inner))
}

#[test]
fn concurrent_frames_on_one_connection_are_all_accounted() {
    let (window, log) = recording_window();
    let conn = handshake(&window, 1);
    take(&log);

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..50 {
                    data(&window, 1).expect("frame accepted");
                }
            });
        }
    });

    assert_eq!(window.inspect(conn, |c| c.ledger().recv_count()), Some(201));
    let delivered = take(&log);
    assert_eq!(delivered.len(), 200);
    assert!(delivered.iter().all(|(c, d)| *c == conn && d == b"m"));
}

#[test]
fn close_racing_data_leaves_registry_consistent() {
    const SESSIONS: u64 = 8;
    let (window, log) = recording_window();
    let conns: Vec<ConnectionId> = (1..=SESSIONS).map(|s| handshake(&window, s)).collect();
    take(&log);

    let accepted: Vec<usize> = thread::scope(|s| {
        let senders: Vec<_> = (1..=SESSIONS)
            .map(|session| {
                let window = &window;
                s.spawn(move || {
                    (0..50)
                        .filter(|_| match data(window, session) {
                            Ok(()) => true,
                            Err(WindowError::UnknownSession(_)) => false,
                            Err(err) => panic!("unexpected error: {err}"),
                        })
                        .count()
                })
            })
            .collect();
        for session in 1..=SESSIONS {
            let window = &window;
            s.spawn(move || {
                window
                    .handler()
                    .process(WsEvent::Close {
                        session: SessionId::new(session),
                    })
                    .expect("close accepted");
            });
        }
        senders
            .into_iter()
            .map(|h| h.join().expect("sender thread"))
            .collect()
    });

    assert_eq!(window.num_connections(), 0);
    let delivered = take(&log);
    for (conn, sent) in conns.iter().zip(&accepted) {
        let mine: Vec<&[u8]> = delivered
            .iter()
            .filter(|(c, _)| c == conn)
            .map(|(_, d)| d.as_slice())
            .collect();
        let closed = mine.iter().filter(|d| **d == CONN_CLOSED.as_bytes()).count();
        let frames = mine.iter().filter(|d| **d == b"m").count();
        assert_eq!(closed, 1, "connection {conn} closed once");
        assert_eq!(frames, *sent, "connection {conn} got every accepted frame");
    }
}
