// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Session Integration Tests
//!
//! - `test_events_*`: Status lines for delivered transitions
//! - `test_sweep_*`: Idle summaries from the background sweep
//! - `test_drain_*`: Session handling around shutdown

use std::time::Duration;

use ctrl_core::StatusCode;
use ctrl_server::session::SessionState;
use ctrl_server::{SessionEvent, SessionMonitor, SessionMonitorConfig, SessionSnapshot};
use ctrl_tests::prelude::*;

const WAIT: Duration = Duration::from_secs(2);

fn slow_sweep(dir: &std::path::Path) -> ctrl_server::ControllerConfig {
    let mut config = ControllerFixtures::auto_accept_static(dir);
    config.sessions = SessionMonitorConfig {
        sweep_interval: Duration::from_secs(60),
        idle_threshold: Duration::from_secs(60),
    };
    config
}

// =============================================================================
// Event Lines
// =============================================================================

#[tokio::test]
async fn test_events_print_one_line_each() {
    let server = TestServer::start_with(slow_sweep).await.unwrap();
    let operator = SessionFixtures::operator(1);

    server
        .controller
        .deliver_session_event(SessionEvent::created(SessionSnapshot::new(
            operator.session_id.clone(),
            operator.name.clone(),
        )))
        .unwrap();
    server
        .controller
        .deliver_session_event(SessionEvent::activated(operator.clone()))
        .unwrap();
    server
        .controller
        .deliver_session_event(SessionEvent::closing(operator.clone()))
        .unwrap();

    let lines = server.sink.lines();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        format!("{:>9}:{:>20}::{}", "Created", "Operator1", "ns=1;i=1001")
    );
    assert_eq!(
        lines[1],
        format!("{:>9}:{:>20}::{:>20}:{}", "Activated", "Operator1", "user1", "ns=1;i=1001")
    );
    assert!(lines[2].starts_with("  Closing:"));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_events_track_session_state() {
    let server = TestServer::start_with(slow_sweep).await.unwrap();
    let monitor = server.controller.sessions().unwrap();

    for i in 0..3 {
        server
            .controller
            .deliver_session_event(SessionEvent::created(SessionFixtures::operator(i)))
            .unwrap();
    }
    server
        .controller
        .deliver_session_event(SessionEvent::activated(SessionFixtures::operator(1)))
        .unwrap();

    assert_eq!(monitor.session_count(), 3);
    let record = monitor.session("ns=1;i=1001").unwrap();
    assert_eq!(record.state, SessionState::Active);
    assert_eq!(record.events, 2);
    assert_eq!(monitor.session("ns=1;i=1000").unwrap().state, SessionState::Created);

    server
        .controller
        .deliver_session_event(SessionEvent::closing(SessionFixtures::operator(0)))
        .unwrap();
    assert_eq!(monitor.session_count(), 2);
    assert_eq!(monitor.delivered(), 5);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_events_closing_unknown_session_is_reported() {
    let server = TestServer::start_with(slow_sweep).await.unwrap();

    server
        .controller
        .deliver_session_event(SessionEvent::closing(SessionFixtures::operator(9)))
        .unwrap();

    assert_eq!(server.sink.matching("Operator9").len(), 1);
    assert_eq!(server.controller.sessions().unwrap().session_count(), 0);

    server.stop().await.unwrap();
}

// =============================================================================
// Idle Sweep
// =============================================================================

#[tokio::test]
async fn test_sweep_prints_summary_when_idle() {
    let server = TestServer::start().await.unwrap();
    server
        .controller
        .deliver_session_event(SessionEvent::activated(SessionFixtures::operator(2)))
        .unwrap();

    let summarized = eventually(WAIT, || !server.sink.matching("-Status-").is_empty()).await;
    assert!(summarized, "no idle summary");

    let summary = server.sink.matching("-Status-").remove(0);
    assert!(summary.starts_with(&format!("{:>9}:{:>20}:Last Event:", "-Status-", "Operator2")));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_sweep_orders_by_name() {
    let sink = RecordingSink::new();
    let monitor = SessionMonitor::new(
        SessionMonitorConfig {
            sweep_interval: Duration::from_millis(10),
            idle_threshold: Duration::from_millis(10),
        },
        sink.clone(),
    );
    for i in [3, 1, 2] {
        monitor
            .deliver(SessionEvent::created(SessionFixtures::operator(i)))
            .unwrap();
    }
    sink.clear();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(monitor.sweep(), 3);

    let names: Vec<String> = sink
        .lines()
        .iter()
        .map(|l| l.split(':').nth(1).unwrap_or_default().trim().to_string())
        .collect();
    assert_eq!(names, vec!["Operator1", "Operator2", "Operator3"]);
}

#[tokio::test]
async fn test_sweep_quiet_while_events_flow() {
    let sink = RecordingSink::new();
    let monitor = SessionMonitor::new(
        SessionMonitorConfig {
            sweep_interval: Duration::from_millis(5),
            idle_threshold: Duration::from_millis(200),
        },
        sink.clone(),
    );
    let mut sweep = monitor.start_sweep().unwrap();

    for _ in 0..10 {
        monitor
            .deliver(SessionEvent::activated(SessionFixtures::operator(1)))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    sweep.shutdown().await;
    assert!(sweep.ticks() > 0);
    assert!(sink.matching("-Status-").is_empty());
    assert_eq!(sink.len(), 10);
}

#[tokio::test]
async fn test_sweep_without_sessions_prints_nothing() {
    let server = TestServer::start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(server.sink.is_empty());

    server.stop().await.unwrap();
}

// =============================================================================
// Draining
// =============================================================================

#[tokio::test]
async fn test_drain_refuses_new_sessions() {
    let server = TestServer::start_with(slow_sweep).await.unwrap();
    let monitor = server.controller.sessions().unwrap();
    server
        .controller
        .deliver_session_event(SessionEvent::created(SessionFixtures::operator(1)))
        .unwrap();

    monitor.set_accepting(false);
    assert_status(
        server
            .controller
            .deliver_session_event(SessionEvent::created(SessionFixtures::operator(2))),
        StatusCode::BAD_SHUTDOWN,
    );
    server
        .controller
        .deliver_session_event(SessionEvent::closing(SessionFixtures::operator(1)))
        .unwrap();
    assert_eq!(monitor.session_count(), 0);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_drain_stop_closes_monitor() {
    let server = TestServer::start().await.unwrap();
    let monitor = server.controller.sessions().unwrap();

    server.stop().await.unwrap();

    assert!(!monitor.is_accepting());
    assert_status(
        server
            .controller
            .deliver_session_event(SessionEvent::created(SessionFixtures::operator(1))),
        StatusCode::BAD_SHUTDOWN,
    );

    // The sweep is gone; nothing else is printed.
    let printed = server.sink.len();
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(server.sink.len(), printed);
}
