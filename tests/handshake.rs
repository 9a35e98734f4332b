//! Tests for connection bring-up and channel dispatch.
//!
//! They drive a window through the websocket events a transport reports and
//! check the resulting connection stages, callbacks and outbound frames.

use std::sync::{Arc, Mutex};

use rstest::rstest;
use webwindow::{
    ChannelTransport,
    ConfigError,
    ConnectionId,
    ProcessId,
    SessionId,
    Stage,
    Target,
    WebWindow,
    WindowConfig,
    WindowError,
    WindowId,
    WsEvent,
    config::PANEL_PAGE,
};
use webwindow_testing::{Harness, RecordingManager, client_frame};

mod common;
use common::{TestResult, config, harness};

fn stage(h: &Harness, conn: ConnectionId) -> Option<Stage> { h.window.connection_stage(conn) }

#[rstest]
fn ready_announcement_completes_handshake(mut harness: Harness) -> TestResult {
    let conn = harness.handshake(1, "")?;
    assert_eq!(conn, ConnectionId::new(1));
    assert_eq!(stage(&harness, conn), Some(Stage::Ready));
    assert_eq!(harness.delivered_text(), vec![(conn, "CONN_READY".to_owned())]);
    assert!(harness.sent().is_empty());
    Ok(())
}

#[rstest]
fn attached_connection_waits_for_announcement(harness: Harness) -> TestResult {
    let conn = harness.attach(1)?;
    assert_eq!(stage(&harness, conn), Some(Stage::Pending));
    harness.client(1, 0, 0, "KEEPALIVE")?;
    assert_eq!(stage(&harness, conn), Some(Stage::Pending));
    assert!(harness.delivered().is_empty());
    Ok(())
}

#[test]
fn connection_limit_refuses_another_session() -> TestResult {
    let harness = Harness::new(config(WindowConfig::builder().connection_limit(1)));
    harness.handshake(1, "")?;

    let session = SessionId::new(2);
    assert_eq!(
        harness.event(WsEvent::Connect { session }),
        Err(WindowError::ConnectionLimit { limit: 1 })
    );
    assert_eq!(
        harness.event(WsEvent::Ready { session }),
        Err(WindowError::ConnectionLimit { limit: 1 })
    );
    assert_eq!(harness.window.num_connections(), 1);
    Ok(())
}

#[rstest]
fn duplicate_ready_is_rejected(harness: Harness) -> TestResult {
    harness.attach(1)?;
    let session = SessionId::new(1);
    assert_eq!(
        harness.event(WsEvent::Ready { session }),
        Err(WindowError::DuplicateSession(session))
    );
    assert_eq!(harness.window.num_connections(), 1);
    Ok(())
}

#[test]
fn unknown_key_tears_down_native_only_connection() -> TestResult {
    let harness = Harness::new(config(WindowConfig::builder().native_only(true)));
    harness.attach(1)?;

    let result = harness.client(1, 0, 0, "READY=abc");
    assert_eq!(result, Err(WindowError::UnauthorizedKey(SessionId::new(1))));
    assert_eq!(harness.window.num_connections(), 0);
    assert!(harness.delivered().is_empty());
    Ok(())
}

#[test]
fn registered_key_is_consumed_and_attaches_process() -> TestResult {
    let harness = Harness::new(config(WindowConfig::builder().native_only(true)));
    harness.window.add_key("abc", ProcessId::new(42));

    let conn = harness.handshake(1, "abc")?;
    assert!(!harness.window.has_key("abc"));
    assert_eq!(
        harness.window.inspect(conn, |c| c.process()),
        Some(Some(ProcessId::new(42)))
    );
    assert_eq!(stage(&harness, conn), Some(Stage::Ready));

    // The key is spent; a second client presenting it is refused.
    harness.attach(2)?;
    assert_eq!(
        harness.client(2, 0, 0, "READY=abc"),
        Err(WindowError::UnauthorizedKey(SessionId::new(2)))
    );
    Ok(())
}

#[rstest]
fn unknown_key_is_accepted_without_native_only(harness: Harness) -> TestResult {
    let conn = harness.handshake(1, "stranger")?;
    assert_eq!(stage(&harness, conn), Some(Stage::Ready));
    assert_eq!(harness.window.inspect(conn, |c| c.process()), Some(None));
    Ok(())
}

#[test]
fn panel_window_requests_panel_then_waits() -> TestResult {
    let mut harness = Harness::new(config(WindowConfig::builder().panel_name("fit")));
    harness.window.add_key("key", ProcessId::new(3));

    let conn = harness.handshake(1, "key")?;
    assert_eq!(harness.sent_text(), vec!["1:10:0:SHOWPANEL:fit".to_owned()]);
    assert_eq!(stage(&harness, conn), Some(Stage::PanelWait));
    assert!(harness.delivered().is_empty());

    harness.client(1, 1, 1, "PANEL_READY")?;
    assert_eq!(stage(&harness, conn), Some(Stage::Ready));
    assert_eq!(harness.delivered_text(), vec![(conn, "CONN_READY".to_owned())]);
    Ok(())
}

#[test]
fn panel_request_that_cannot_be_queued_removes_connection() -> TestResult {
    let mut harness = Harness::new(config(
        WindowConfig::builder()
            .panel_name("fit")
            .initial_credits(1)
            .max_queue_length(1),
    ));
    harness.window.add_key("k", ProcessId::new(4));
    let conn = harness.attach(1)?;
    harness.window.send(Target::All, "a")?;
    harness.window.send(Target::All, "b")?;

    assert_eq!(
        harness.client(1, 0, 0, "READY=k"),
        Err(WindowError::QueueFull {
            dropped: vec![conn],
            max: 1
        })
    );
    assert_eq!(harness.window.num_connections(), 0);
    assert_eq!(harness.manager.halted(), vec![ProcessId::new(4)]);
    assert!(harness.delivered().is_empty());
    assert_eq!(harness.sent_text(), vec!["0:1:1:a".to_owned()]);
    Ok(())
}

#[test]
fn unexpected_panel_reply_aborts_connection() -> TestResult {
    let harness = Harness::new(config(WindowConfig::builder().panel_name("fit")));
    let conn = harness.handshake(1, "")?;

    harness.client(1, 1, 1, "something else")?;
    assert_eq!(harness.delivered_text(), vec![(conn, "CONN_CLOSED".to_owned())]);
    assert_eq!(harness.window.num_connections(), 0);
    Ok(())
}

#[rstest]
#[case::data_channel(1)]
#[case::custom_channel(4)]
fn data_before_announcement_is_rejected(harness: Harness, #[case] channel: u32) -> TestResult {
    let conn = harness.attach(1)?;
    assert_eq!(
        harness.client(1, 0, channel, "early"),
        Err(WindowError::UnexpectedData {
            connection: conn,
            channel
        })
    );
    assert_eq!(harness.window.num_connections(), 0);
    assert!(harness.delivered().is_empty());
    Ok(())
}

#[rstest]
fn data_channel_reaches_data_callback(harness: Harness) -> TestResult {
    let conn = harness.handshake(1, "")?;
    harness.delivered();

    harness.client(1, 0, 1, "payload:with:colons")?;
    assert_eq!(
        harness.delivered_text(),
        vec![(conn, "payload:with:colons".to_owned())]
    );
    Ok(())
}

#[rstest]
fn higher_channels_reach_connection_callback(harness: Harness) -> TestResult {
    let first = harness.handshake(1, "")?;
    let second = harness.handshake(2, "")?;
    harness.delivered();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    harness.window.set_channel_callback(first, move |conn, data| {
        sink.lock()
            .expect("callback sink poisoned")
            .push((conn, data.to_vec()));
    })?;

    harness.client(1, 0, 2, "two")?;
    // No callback registered for the second connection: dropped.
    harness.client(2, 0, 3, "three")?;

    let seen = seen.lock().expect("callback sink poisoned").clone();
    assert_eq!(seen, vec![(first, b"two".to_vec())]);
    assert!(harness.delivered().is_empty());
    assert_eq!(stage(&harness, second), Some(Stage::Ready));
    Ok(())
}

#[test]
fn data_callback_can_reply_through_window() -> TestResult {
    let (transport, mut frames) = ChannelTransport::new();
    let window = Arc::new(WebWindow::new(
        WindowId::new(1),
        WindowConfig::default(),
        Arc::new(RecordingManager::default()),
        Arc::new(transport),
    )?);
    let weak = Arc::downgrade(&window);
    window.set_data_callback(move |conn, data| {
        if data == b"ping"
            && let Some(window) = weak.upgrade()
        {
            window.send(conn, "pong").expect("reply accepted");
        }
    });

    let handler = window.handler();
    let session = SessionId::new(1);
    handler.process(WsEvent::Connect { session })?;
    handler.process(WsEvent::Ready { session })?;
    handler.process(WsEvent::Data {
        session,
        payload: client_frame(0, 10, 0, "READY="),
    })?;
    handler.process(WsEvent::Data {
        session,
        payload: client_frame(0, 10, 1, "ping"),
    })?;

    let reply = frames.try_recv()?;
    assert_eq!(reply.session(), session);
    assert_eq!(reply.text(), b"2:10:1:pong");
    assert!(frames.try_recv().is_err());
    Ok(())
}

#[rstest]
fn channel_callback_requires_connection(harness: Harness) {
    let missing = ConnectionId::new(9);
    assert_eq!(
        harness.window.set_channel_callback(missing, |_, _| {}),
        Err(WindowError::UnknownConnection(missing))
    );
}

#[rstest]
fn repeated_announcement_is_ignored(harness: Harness) -> TestResult {
    let conn = harness.handshake(1, "")?;
    harness.client(1, 0, 0, "READY=again")?;
    assert_eq!(harness.delivered_text(), vec![(conn, "CONN_READY".to_owned())]);
    Ok(())
}

#[test]
fn close_notifies_and_halts_client() -> TestResult {
    let harness = Harness::new(WindowConfig::default());
    harness.window.add_key("k", ProcessId::new(5));
    let conn = harness.handshake(1, "k")?;
    harness.delivered();

    harness.event(WsEvent::Close {
        session: SessionId::new(1),
    })?;
    assert_eq!(harness.delivered_text(), vec![(conn, "CONN_CLOSED".to_owned())]);
    assert_eq!(harness.manager.halted(), vec![ProcessId::new(5)]);
    assert_eq!(harness.window.num_connections(), 0);

    // Closing an unknown session is harmless.
    harness.event(WsEvent::Close {
        session: SessionId::new(1),
    })?;
    assert!(harness.delivered().is_empty());
    Ok(())
}

#[rstest]
fn unexpected_event_is_rejected(harness: Harness) {
    let event = WsEvent::Other {
        session: SessionId::new(1),
        method: "WS_PING".to_owned(),
    };
    assert_eq!(
        harness.event(event),
        Err(WindowError::UnexpectedEvent("WS_PING".to_owned()))
    );
}

#[rstest]
fn session_zero_is_ignored(harness: Harness) -> TestResult {
    let session = SessionId::new(0);
    harness.event(WsEvent::Data {
        session,
        payload: "garbage".into(),
    })?;
    harness.event(WsEvent::Other {
        session,
        method: "GET".to_owned(),
    })?;
    assert_eq!(harness.window.num_connections(), 0);
    Ok(())
}

#[rstest]
fn empty_payload_is_a_no_op(harness: Harness) -> TestResult {
    let conn = harness.attach(1)?;
    harness.raw(1, bytes::Bytes::new())?;
    assert_eq!(harness.window.inspect(conn, |c| c.ledger().recv_count()), Some(0));
    Ok(())
}

#[rstest]
fn data_without_connection_is_rejected(harness: Harness) {
    assert_eq!(
        harness.client(9, 0, 1, "lost"),
        Err(WindowError::UnknownSession(SessionId::new(9)))
    );
}

#[rstest]
fn panel_cannot_change_while_connected(harness: Harness) -> TestResult {
    harness.window.set_panel_name("fit")?;
    assert_eq!(harness.window.default_page(), PANEL_PAGE);

    harness.attach(1)?;
    assert_eq!(
        harness.window.set_panel_name("other"),
        Err(WindowError::Config(ConfigError::PanelWithConnections))
    );
    assert_eq!(harness.window.panel_name().as_deref(), Some("fit"));
    Ok(())
}
