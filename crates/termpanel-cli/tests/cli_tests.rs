use std::io::Write;
use std::sync::{Arc, Mutex};
use termpanel_cli::app::{command_for, render_notice};
use termpanel_cli::emulator::SharedOutput;
use termpanel_cli::{KeyAction, KeyRouter, PassthroughEmulator, TerminalFit};
use termpanel_core::emulator::{Emulator, FitCalculator, MonospaceFit, Viewport};
use termpanel_core::{PanelCommand, PanelNotice, TermSize};

// ========================================================================
// Key Routing Tests (keys.rs)
// ========================================================================

#[test]
fn test_plain_input_is_forwarded() {
    let mut router = KeyRouter::new();
    assert_eq!(
        router.feed(b"ls -la\r"),
        vec![KeyAction::Forward(b"ls -la\r".to_vec())]
    );
}

#[test]
fn test_prefix_commands() {
    let mut router = KeyRouter::new();
    assert_eq!(router.feed(b"\x01c"), vec![KeyAction::NewTerminal]);
    assert_eq!(router.feed(b"\x01n"), vec![KeyAction::Next]);
    assert_eq!(router.feed(b"\x01p"), vec![KeyAction::Previous]);
    assert_eq!(router.feed(b"\x01x"), vec![KeyAction::Kill]);
    assert_eq!(router.feed(b"\x01q"), vec![KeyAction::Quit]);
}

#[test]
fn test_input_around_command_keeps_order() {
    let mut router = KeyRouter::new();
    assert_eq!(
        router.feed(b"ab\x01nc"),
        vec![
            KeyAction::Forward(b"ab".to_vec()),
            KeyAction::Next,
            KeyAction::Forward(b"c".to_vec()),
        ]
    );
}

#[test]
fn test_double_prefix_sends_literal() {
    let mut router = KeyRouter::new();
    assert_eq!(router.feed(b"\x01\x01"), vec![KeyAction::Forward(vec![0x01])]);
}

#[test]
fn test_prefix_split_across_reads() {
    let mut router = KeyRouter::new();
    assert!(router.feed(b"\x01").is_empty());
    assert!(router.is_prefix_pending());
    assert_eq!(router.feed(b"x"), vec![KeyAction::Kill]);
    assert!(!router.is_prefix_pending());
}

#[test]
fn test_unknown_key_after_prefix_is_dropped() {
    let mut router = KeyRouter::new();
    assert_eq!(router.feed(b"\x01zok"), vec![KeyAction::Forward(b"ok".to_vec())]);
}

#[test]
fn test_actions_map_to_panel_commands() {
    assert_eq!(command_for(KeyAction::Next), PanelCommand::SelectRelative(1));
    assert_eq!(command_for(KeyAction::Previous), PanelCommand::SelectRelative(-1));
    assert_eq!(command_for(KeyAction::Kill), PanelCommand::Kill(None));
    assert_eq!(command_for(KeyAction::Quit), PanelCommand::Teardown);
    assert_eq!(
        command_for(KeyAction::Forward(b"a".to_vec())),
        PanelCommand::Input(b"a".to_vec())
    );
}

// ========================================================================
// Passthrough Emulator Tests (emulator.rs)
// ========================================================================

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn take(&self) -> String {
        String::from_utf8_lossy(&std::mem::take(&mut *self.0.lock().unwrap())).into_owned()
    }
}

fn emulator(limit: usize) -> (PassthroughEmulator, Capture) {
    let capture = Capture::default();
    let out: SharedOutput = Arc::new(Mutex::new(Box::new(capture.clone())));
    (PassthroughEmulator::new(out, limit), capture)
}

#[test]
fn test_detached_output_is_buffered_then_replayed() {
    let (mut emu, capture) = emulator(1024);
    let viewport = Viewport::new(100.0, 100.0);

    emu.write(b"early ");
    assert!(capture.take().is_empty());

    emu.open(&viewport);
    assert_eq!(capture.take(), "\x1b[2J\x1b[3J\x1b[Hearly ");

    emu.write(b"live");
    assert_eq!(capture.take(), "live");

    emu.detach();
    emu.write(b" hidden");
    assert!(capture.take().is_empty());

    emu.reattach(&viewport);
    assert_eq!(capture.take(), "\x1b[2J\x1b[3J\x1b[Hearly live hidden");
}

#[test]
fn test_history_keeps_newest_bytes() {
    let (mut emu, _capture) = emulator(4);
    emu.write(b"abcdef");
    assert_eq!(emu.history(), b"cdef");
}

#[test]
fn test_disposed_emulator_goes_quiet() {
    let (mut emu, capture) = emulator(64);
    emu.open(&Viewport::new(10.0, 10.0));
    capture.take();

    emu.dispose();
    emu.write(b"late");

    assert!(capture.take().is_empty());
    assert!(emu.history().is_empty());
}

#[test]
fn test_resize_is_recorded() {
    let (mut emu, _capture) = emulator(64);
    emu.resize(TermSize::new(132, 43));
    assert_eq!(emu.size(), Some(TermSize::new(132, 43)));
}

#[test]
fn test_terminal_fit_needs_visible_viewport() {
    let mut viewport = Viewport::new(100.0, 100.0);
    viewport.in_document = false;
    assert!(TerminalFit::default().compute_fit(&viewport).is_none());
}

#[test]
fn test_terminal_fit_prefers_real_terminal_size() {
    let fit = TerminalFit::new(MonospaceFit::new(10.0, 1.5));
    let viewport = Viewport::new(605.0, 152.0);
    assert_eq!(fit.fit_with(Some((132, 43)), &viewport), Some(TermSize::new(132, 43)));
    assert_eq!(fit.fit_with(Some((0, 0)), &viewport), Some(TermSize::new(1, 1)));
}

#[test]
fn test_terminal_fit_falls_back_to_font_metrics() {
    let fit = TerminalFit::new(MonospaceFit::new(10.0, 1.5));
    assert_eq!(
        fit.fit_with(None, &Viewport::new(605.0, 152.0)),
        Some(TermSize::new(100, 10))
    );
}

// ========================================================================
// Notice Tests (app.rs)
// ========================================================================

#[test]
fn test_spawn_failure_is_drawn_in_red() {
    let text = render_notice(&PanelNotice::SpawnFailed(
        "Failed to spawn terminal: no shell".to_string(),
    ));
    assert!(text.contains("\x1b[31mFailed to spawn terminal: no shell\x1b[0m"));
    assert!(text.contains("Ctrl-A c"));
    assert!(text.starts_with("\r\n"));
}
