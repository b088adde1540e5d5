use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use haptic_engine::{InputAction, InputCollector, KeyState, ShutdownHandle, TuningController};
use tokio::task::JoinHandle;
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Starts the key reader on a blocking thread. Returns `None` when the
/// terminal cannot enter raw mode (no tty); signals still stop the loop.
pub(crate) fn spawn(shutdown: ShutdownHandle, tuning: TuningController) -> Option<JoinHandle<()>> {
    let guard = match RawModeGuard::enable() {
        Ok(guard) => guard,
        Err(error) => {
            warn!(error = %error, "terminal_input_unavailable");
            return None;
        }
    };
    info!("keys: F1/+ raise max, F2/- lower max, q/Esc/Ctrl-C quit");

    Some(tokio::task::spawn_blocking(move || {
        let _guard = guard;
        read_keys(&shutdown, &tuning);
    }))
}

fn read_keys(shutdown: &ShutdownHandle, tuning: &TuningController) {
    let signal = shutdown.signal();
    // Windows consoles report releases; plain terminals only report presses.
    let mut input = InputCollector::new(cfg!(windows));

    while !signal.is_requested() {
        match event::poll(POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(error) => {
                warn!(error = %error, "terminal_poll_failed");
                return;
            }
        }
        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(error) => {
                warn!(error = %error, "terminal_read_failed");
                return;
            }
        };
        let Some((action, state)) = map_key(&key) else {
            continue;
        };
        match input.handle_key(action, state) {
            Some(InputAction::Quit) => shutdown.request("quit_key"),
            Some(action) => {
                tuning.apply(action);
            }
            None => {}
        }
    }
}

fn map_key(key: &KeyEvent) -> Option<(InputAction, KeyState)> {
    let action = match key.code {
        KeyCode::F(1) | KeyCode::Char('+') | KeyCode::Char('=') => InputAction::RaiseMax,
        KeyCode::F(2) | KeyCode::Char('-') => InputAction::LowerMax,
        KeyCode::Esc | KeyCode::Char('q') => InputAction::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => InputAction::Quit,
        _ => return None,
    };
    let state = match key.kind {
        KeyEventKind::Press => KeyState::Pressed,
        KeyEventKind::Repeat => KeyState::Repeat,
        KeyEventKind::Release => KeyState::Released,
    };
    Some((action, state))
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(error) = disable_raw_mode() {
            warn!(error = %error, "terminal_restore_failed");
        }
    }
}
