//! Tests for diagnostics emitted while processing events.

use bytes::Bytes;
use rstest::rstest;
use serial_test::serial;
use webwindow::{ConfigError, WindowConfig, WindowError};
use webwindow_testing::{Harness, LoggerHandle, logger};

fn drain(logger: &mut LoggerHandle) { while logger.pop().is_some() {} }

#[rstest]
#[serial]
fn malformed_frame_is_logged_as_error(mut logger: LoggerHandle) {
    drain(&mut logger);
    let harness = Harness::new(WindowConfig::default());
    harness.attach(1).expect("attach");

    let err = harness
        .raw(1, Bytes::from_static(b"12:notanumber:"))
        .expect_err("frame must be rejected");
    assert!(matches!(err, WindowError::Frame(_)));

    let mut found = false;
    while let Some(record) = logger.pop() {
        if record.args().contains("websocket event rejected") {
            assert_eq!(record.level(), log::Level::Error);
            found = true;
        }
    }
    assert!(found, "rejection not logged");
}

#[rstest]
#[serial]
fn connection_limit_is_logged_as_warning(mut logger: LoggerHandle) {
    drain(&mut logger);
    let harness = Harness::new(
        WindowConfig::builder()
            .connection_limit(1)
            .build()
            .expect("config"),
    );
    harness.attach(1).expect("attach");
    assert!(harness.attach(2).is_err());

    let mut found = false;
    while let Some(record) = logger.pop() {
        if record.args().contains("websocket event refused") {
            assert_eq!(record.level(), log::Level::Warn);
            found = true;
        }
    }
    assert!(found, "refusal not logged");
}

#[rstest]
#[serial]
fn queue_overflow_is_logged(mut logger: LoggerHandle) {
    drain(&mut logger);
    let harness = Harness::new(
        WindowConfig::builder()
            .initial_credits(1)
            .max_queue_length(1)
            .build()
            .expect("config"),
    );
    let conn = harness.handshake(1, "").expect("handshake");
    for _ in 0..3 {
        let _ = harness.window.send(conn, "data");
    }
    assert!(logger.contains("maximum queue length achieved"));
}

#[rstest]
#[serial]
fn panel_change_with_connections_is_logged(mut logger: LoggerHandle) {
    drain(&mut logger);
    let harness = Harness::new(WindowConfig::default());
    harness.attach(1).expect("attach");
    assert_eq!(
        harness.window.set_panel_name("fit"),
        Err(WindowError::Config(ConfigError::PanelWithConnections))
    );
    assert!(logger.contains("panel not configured"));
}
