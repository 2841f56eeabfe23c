mod common;

use common::*;
use std::path::PathBuf;
use std::time::Duration;
use termpanel_core::panel::{ForwardedPort, LogLevel};
use termpanel_core::*;
use tokio::sync::mpsc;
use tokio::time::Instant;

async fn open_panel() -> (TerminalPanel, std::sync::Arc<FakeHost>, FakeFactory) {
    let (mut panel, host, factory) = panel();
    panel.handle_command(PanelCommand::Open, Instant::now());
    panel.complete_pending_spawns().await;
    (panel, host, factory)
}

// ========================================================================
// Opening and the default session
// ========================================================================

#[tokio::test]
async fn test_open_creates_default_session_in_workspace() {
    let (panel, host, _factory) = panel();
    let mut panel = panel.with_workspace("/work/app");

    panel.handle_command(PanelCommand::Open, Instant::now());
    assert_eq!(panel.pending_spawns().len(), 1);
    assert_eq!(panel.pending_spawns()[0].origin, SpawnOrigin::Default);

    panel.complete_pending_spawns().await;

    assert_eq!(panel.registry().len(), 1);
    assert_eq!(panel.mount().mounted(), Some(&id("t1")));
    assert_eq!(
        host.creates.lock().unwrap().clone(),
        vec![Some(PathBuf::from("/work/app"))]
    );
}

#[tokio::test]
async fn test_reopen_during_default_spawn_spawns_once() {
    let (mut panel, host, _factory) = panel();
    let now = Instant::now();

    panel.handle_command(PanelCommand::Open, now);
    panel.handle_command(PanelCommand::Close, now);
    panel.handle_command(PanelCommand::Open, now);
    panel.handle_command(PanelCommand::Open, now);
    panel.complete_pending_spawns().await;

    assert_eq!(host.create_count(), 1);
    assert_eq!(panel.registry().len(), 1);
}

#[tokio::test]
async fn test_reopen_after_killing_everything_spawns_again() {
    let (mut panel, host, _factory) = open_panel().await;
    let now = Instant::now();

    panel.handle_command(PanelCommand::Kill(None), now);
    panel.handle_command(PanelCommand::Close, now);
    panel.handle_command(PanelCommand::Open, now);
    panel.complete_pending_spawns().await;

    assert_eq!(host.create_count(), 2);
    assert_eq!(panel.registry().active_id(), Some(&id("t2")));
}

#[tokio::test]
async fn test_failed_spawn_reported_in_debug_console() {
    let (mut panel, host, _factory) = panel();
    host.fail_next();

    panel.handle_command(PanelCommand::Open, Instant::now());
    panel.complete_pending_spawns().await;

    assert!(panel.registry().is_empty());
    assert_eq!(panel.registry().init_state(), InitState::Ready);
    let entry = panel.debug_console().entries().next().unwrap();
    assert_eq!(entry.level, LogLevel::Error);
    assert!(entry.message.contains("shell not found"));
}

#[tokio::test]
async fn test_failed_spawn_is_sent_as_notice() {
    let (mut panel, host, _factory) = panel();
    let mut notices = panel.notices();
    host.fail_next();

    panel.handle_command(PanelCommand::Open, Instant::now());
    panel.complete_pending_spawns().await;

    match notices.try_recv().unwrap() {
        PanelNotice::SpawnFailed(message) => {
            assert_eq!(
                message,
                "Failed to spawn terminal: Process host error: shell not found"
            );
        }
    }
    assert!(notices.try_recv().is_err());
    // Handed to the UI, so it is not reported again.
    assert!(panel.registry().last_error().is_none());

    // The user retries by hand.
    panel.handle_command(PanelCommand::NewTerminal, Instant::now());
    panel.complete_pending_spawns().await;
    assert_eq!(panel.registry().len(), 1);
    assert!(notices.try_recv().is_err());
}

// ========================================================================
// Session commands
// ========================================================================

#[tokio::test]
async fn test_new_terminal_becomes_active_and_mounted() {
    let (mut panel, _host, factory) = open_panel().await;

    panel.handle_command(PanelCommand::NewTerminal, Instant::now());
    panel.complete_pending_spawns().await;

    assert_eq!(panel.registry().active_id(), Some(&id("t2")));
    assert_eq!(panel.mount().mounted(), Some(&id("t2")));
    assert!(factory.state("t1").lock().unwrap().attached_to.is_none());
}

#[tokio::test]
async fn test_input_goes_to_active_session() {
    let (mut panel, host, _factory) = open_panel().await;
    panel.handle_command(PanelCommand::NewTerminal, Instant::now());
    panel.complete_pending_spawns().await;

    panel.handle_command(PanelCommand::Select(id("t1")), Instant::now());
    panel.handle_command(PanelCommand::Input(b"pwd\r".to_vec()), Instant::now());

    assert_eq!(host.writes(), vec![(id("t1"), b"pwd\r".to_vec())]);
}

#[tokio::test]
async fn test_select_relative_wraps_around() {
    let (mut panel, _host, _factory) = open_panel().await;
    panel.handle_command(PanelCommand::NewTerminal, Instant::now());
    panel.handle_command(PanelCommand::NewTerminal, Instant::now());
    panel.complete_pending_spawns().await;
    assert_eq!(panel.registry().active_id(), Some(&id("t3")));

    panel.handle_command(PanelCommand::SelectRelative(1), Instant::now());
    assert_eq!(panel.mount().mounted(), Some(&id("t1")));

    panel.handle_command(PanelCommand::SelectRelative(-1), Instant::now());
    assert_eq!(panel.mount().mounted(), Some(&id("t3")));
}

#[tokio::test]
async fn test_kill_active_mounts_replacement() {
    let (mut panel, host, _factory) = open_panel().await;
    panel.handle_command(PanelCommand::NewTerminal, Instant::now());
    panel.complete_pending_spawns().await;

    panel.handle_command(PanelCommand::Kill(None), Instant::now());

    assert_eq!(host.kills(), vec![id("t2")]);
    assert_eq!(panel.mount().mounted(), Some(&id("t1")));
    assert!(panel.resize_sync().next_deadline().is_some());
}

#[tokio::test]
async fn test_host_events_reach_bindings() {
    let (mut panel, host, factory) = open_panel().await;

    host.emit_output("t1", "hello");
    host.emit_exit("t1", Some(0));
    assert_eq!(panel.drain_host_events(), 2);

    assert!(factory.buffer("t1").starts_with("hello"));
    assert!(!panel.registry().is_alive(&id("t1")));
}

// ========================================================================
// Tabs and layout
// ========================================================================

#[tokio::test]
async fn test_switching_tabs_hides_without_disposing() {
    let (mut panel, _host, factory) = open_panel().await;
    let now = Instant::now();

    panel.handle_command(PanelCommand::SelectTab(PanelTab::Problems), now);
    assert!(panel.mount().mounted().is_none());

    panel.handle_command(PanelCommand::SelectTab(PanelTab::Terminal), now);
    assert_eq!(panel.mount().mounted(), Some(&id("t1")));

    let state = factory.state("t1");
    let state = state.lock().unwrap();
    assert_eq!(state.opens, 1);
    assert_eq!(state.reattaches, 1);
    assert_eq!(state.disposes, 0);
}

#[tokio::test]
async fn test_resize_pass_reaches_host_once() {
    let (mut panel, host, _factory) = open_panel().await;
    let now = Instant::now();

    panel.tick(now + Duration::from_millis(200));
    panel.handle_command(PanelCommand::WindowResized { width: 1000.0, height: 700.0 }, now);
    panel.tick(now + Duration::from_secs(1));

    // The scripted fit does not depend on pixels, so the size never changes.
    assert_eq!(host.resizes(), vec![(id("t1"), TermSize::new(80, 24))]);
}

#[tokio::test]
async fn test_drag_updates_viewport_and_schedules_fit() {
    let (mut panel, _host, _factory) = open_panel().await;
    let now = Instant::now();
    panel.tick(now + Duration::from_secs(1));
    assert!(panel.resize_sync().next_deadline().is_none());

    panel.handle_command(PanelCommand::PointerDown, now);
    panel.handle_command(PanelCommand::PointerMove { y: 500.0 }, now);
    panel.handle_command(PanelCommand::PointerUp, now);

    assert_eq!(panel.panel().panel_height(), 300.0);
    assert_eq!(panel.mount().viewport().height_px, 265.0);
    assert!(panel.resize_sync().next_deadline().is_some());
    assert!(panel.panel().global_drag_style().is_none());
}

#[tokio::test]
async fn test_maximize_resizes_viewport() {
    let (mut panel, _host, _factory) = open_panel().await;

    panel.handle_command(PanelCommand::ToggleMaximize, Instant::now());

    assert!(panel.panel().is_maximized());
    assert_eq!(panel.mount().viewport().height_px, 800.0 - 32.0 - 35.0);
}

#[tokio::test]
async fn test_sidebar_shrinks_viewport_width() {
    let (mut panel, _host, _factory) = open_panel().await;

    panel.handle_command(PanelCommand::SidebarResized(300.0), Instant::now());

    assert_eq!(panel.mount().viewport().width_px, 1100.0);
}

// ========================================================================
// Secondary views
// ========================================================================

#[test]
fn test_badges_and_clear_actions() {
    let (mut panel, _host, _factory) = panel();
    let now = Instant::now();

    assert_eq!(panel.badge(PanelTab::Ports), None);
    panel.handle_command(PanelCommand::ForwardPort(ForwardedPort::new(3000)), now);
    panel.handle_command(PanelCommand::ForwardPort(ForwardedPort::new(8080)), now);
    assert_eq!(panel.badge(PanelTab::Ports), Some(2));
    panel.handle_command(PanelCommand::ClosePort(3000), now);
    assert_eq!(panel.badge(PanelTab::Ports), Some(1));

    panel.output_mut().push(LogLevel::Info, "build started");
    panel.debug_console_mut().push(LogLevel::Debug, "breakpoint hit");
    panel.handle_command(PanelCommand::ClearOutput, now);
    assert!(panel.output().is_empty());
    assert_eq!(panel.debug_console().len(), 1);
    panel.handle_command(PanelCommand::ClearDebug, now);
    assert!(panel.debug_console().is_empty());

    assert_eq!(panel.badge(PanelTab::Terminal), None);
}

// ========================================================================
// Teardown
// ========================================================================

#[tokio::test]
async fn test_teardown_kills_sessions_and_stops_handling() {
    let (mut panel, host, factory) = open_panel().await;

    panel.handle_command(PanelCommand::Teardown, Instant::now());
    panel.handle_command(PanelCommand::NewTerminal, Instant::now());

    assert!(panel.is_torn_down());
    assert!(panel.registry().is_empty());
    assert!(panel.pending_spawns().is_empty());
    assert_eq!(host.kills(), vec![id("t1")]);
    assert_eq!(factory.state("t1").lock().unwrap().disposes, 1);
}

// ========================================================================
// Event loop
// ========================================================================

#[tokio::test(start_paused = true)]
async fn test_run_loop_spawns_fits_and_tears_down() {
    let (mut panel, host, factory) = panel();
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(PanelCommand::Open).unwrap();

    let driver_host = host.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        driver_host.emit_output("t1", "prompt$ ");
        tokio::time::sleep(Duration::from_millis(500)).await;
        let _ = tx.send(PanelCommand::Teardown);
    });

    panel.run(rx).await;

    assert!(panel.is_torn_down());
    assert_eq!(host.create_count(), 1);
    assert_eq!(host.resizes(), vec![(id("t1"), TermSize::new(80, 24))]);
    assert_eq!(factory.buffer("t1"), "prompt$ ");
    assert_eq!(host.kills(), vec![id("t1")]);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_keeps_output_that_beats_the_spawn_result() {
    // Which branch `run` takes first is random, so go round several times.
    for _ in 0..20 {
        let (mut panel, host, factory) = panel();
        host.set_greeting("PROMPT$ ");
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(PanelCommand::Open).unwrap();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let _ = tx.send(PanelCommand::Teardown);
        });

        panel.run(rx).await;

        assert_eq!(factory.buffer("t1"), "PROMPT$ ");
    }
}
