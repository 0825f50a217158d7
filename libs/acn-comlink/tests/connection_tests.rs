//! Connection lifecycle tests against the mock master
#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::time::Duration;

use acn_comlink::testing::{MockHandle, MockMaster};
use acn_comlink::{
    AcnError, Connection, ConnectionEvent, ConnectionOptions, ConnectionState, MasterRequest,
    ScanType, TransportEvent,
};
use serde_json::json;
use tokio::sync::broadcast;

const PORT: &str = "/dev/ttyUSB7";

async fn open_connection() -> (Connection<MockMaster>, MockHandle) {
    let (master, handle) = MockMaster::new();
    let options = ConnectionOptions::new(PORT).with_reconnect_interval(Duration::from_millis(500));
    let mut conn = Connection::new(master, options);
    conn.open().await.unwrap();
    (conn, handle)
}

fn drain(rx: &mut broadcast::Receiver<ConnectionEvent>) -> Vec<ConnectionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_link_drop() {
    let (mut conn, handle) = open_connection().await;
    let mut events = conn.subscribe();

    handle.queue_open_failures(2);
    assert!(handle.disconnect());

    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Disconnected));
    assert_eq!(conn.state(), ConnectionState::Reconnecting);
    assert!(conn.reconnect_pending());

    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Reopening));
    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Reopening));
    assert_eq!(conn.state(), ConnectionState::Reconnecting);
    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Connected));
    assert_eq!(conn.state(), ConnectionState::Open);

    let diag = conn.diagnostics();
    assert_eq!(diag.reconnect_timers_started, 1);
    assert_eq!(diag.reconnect_timers_cleared, 1);
    assert_eq!(diag.reopen_attempts, 3);
    assert_eq!(diag.active_timers(), 0);
    assert!(!conn.reconnect_pending());

    assert_eq!(handle.open_calls(), 4);
    // re-attached once to the new physical handle
    assert_eq!(handle.subscribe_calls(), 2);

    assert_eq!(
        drain(&mut events),
        vec![
            ConnectionEvent::Disconnected,
            ConnectionEvent::Reopening,
            ConnectionEvent::Reopening,
            ConnectionEvent::Reopening,
            ConnectionEvent::Connected,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_reopen_waits_for_interval() {
    let (mut conn, handle) = open_connection().await;
    handle.disconnect();
    conn.next_event().await;

    let start = tokio::time::Instant::now();
    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Connected));
    assert!(start.elapsed() >= Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_close_starts_one_timer() {
    let (mut conn, handle) = open_connection().await;

    handle.disconnect();
    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Disconnected));

    handle.queue_open_failures(1);
    assert!(handle.emit(TransportEvent::Close));
    assert!(handle.disconnect());

    // duplicate close events are swallowed; the next event is the timer
    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Reopening));
    assert_eq!(conn.diagnostics().reconnect_timers_started, 1);
    assert_eq!(conn.diagnostics().active_timers(), 1);
    assert_eq!(handle.subscribe_calls(), 2);

    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Connected));
    assert_eq!(conn.diagnostics().active_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_close_reconnects() {
    let (mut conn, handle) = open_connection().await;

    conn.close().await.unwrap();
    assert_eq!(handle.close_calls(), 1);
    assert_eq!(conn.state(), ConnectionState::Reconnecting);
    assert!(matches!(
        conn.close().await,
        Err(AcnError::InvalidState(_))
    ));

    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Connected));
    assert!(conn.is_open());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_reconnecting() {
    let (mut conn, handle) = open_connection().await;
    handle.disconnect();
    conn.next_event().await;

    conn.shutdown().await;
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(conn.diagnostics().active_timers(), 0);
    assert_eq!(conn.next_event().await, None);
    // not open at shutdown, so the transport is not closed again
    assert_eq!(handle.close_calls(), 0);
}

#[tokio::test]
async fn test_transport_error_is_forwarded() {
    let (mut conn, handle) = open_connection().await;
    handle.emit(TransportEvent::Error("framing error".to_string()));

    assert_eq!(
        conn.next_event().await,
        Some(ConnectionEvent::Error("framing error".to_string()))
    );
    assert!(conn.is_open());
    assert_eq!(conn.diagnostics().errors, 1);
    assert_eq!(
        conn.diagnostics().last_error.as_deref(),
        Some("Transport error: framing error")
    );
}

#[tokio::test(start_paused = true)]
async fn test_lost_event_stream_counts_as_disconnect() {
    let (mut conn, handle) = open_connection().await;
    handle.drop_events();

    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Disconnected));
    assert_eq!(conn.state(), ConnectionState::Reconnecting);
    assert_eq!(handle.subscribe_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reopen_reattaches_lost_event_stream() {
    let (mut conn, handle) = open_connection().await;
    handle.disconnect();
    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Disconnected));

    // the new handle goes away before the port comes back
    handle.drop_events();
    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Connected));
    assert_eq!(handle.subscribe_calls(), 3);

    assert!(handle.disconnect());
    assert_eq!(conn.next_event().await, Some(ConnectionEvent::Disconnected));
    assert_eq!(conn.state(), ConnectionState::Reconnecting);
}

#[tokio::test]
async fn test_requests_fail_while_reconnecting() {
    let (mut conn, handle) = open_connection().await;
    handle.disconnect();
    conn.next_event().await;

    assert_eq!(
        conn.read("config").await.unwrap_err(),
        AcnError::NotConnected
    );
    assert_eq!(handle.request_count(), 0);
}

#[tokio::test]
async fn test_scan_stores_result() {
    let (mut conn, handle) = open_connection().await;

    let mut entry = vec![11u8];
    entry.extend_from_slice(&[0x00, 0x13, 0xA2, 0x00, 0x40, 0x0A, 0x0B, 0x0C]);
    entry.extend_from_slice(&[0x34, 0x12, 0x8E, 0x20, 0xC8, 0x5A]);
    // a channel of 0 marks an empty slot
    entry.extend_from_slice(&[0u8; 15]);
    handle.queue_values(entry);

    let found = conn.scan(ScanType::Active, 4).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].channel, 11);
    assert_eq!(
        handle.requests(),
        vec![MasterRequest::Command {
            code: 6,
            payload: vec![2u8, 4].into()
        }]
    );
    assert_eq!(conn.map().get("scanResult").unwrap().format()[0]["channel"], 11);
}

#[tokio::test]
async fn test_write_bank_and_read_back() {
    let (mut conn, handle) = open_connection().await;
    handle.queue_response(Default::default());

    let outputs = json!([
        {"active": true, "duty": 50, "period": 100},
        {"active": false, "duty": 100, "period": 1600},
    ]);
    conn.write("localOutputs", &outputs).await.unwrap();

    match &handle.requests()[0] {
        MasterRequest::WriteRegisters { address, values } => {
            assert_eq!(*address, 0x0300);
            assert_eq!(values.len(), 4);
        },
        other => panic!("unexpected request {:?}", other),
    }
    assert_eq!(conn.map().get("localOutputs").unwrap().format(), outputs);
}

#[tokio::test]
async fn test_transport_failure_propagates() {
    let (mut conn, handle) = open_connection().await;
    handle.queue_error(AcnError::timeout("no reply"));

    assert!(matches!(
        conn.get_network_status().await,
        Err(AcnError::Timeout(_))
    ));
    assert!(conn.is_open());
}
