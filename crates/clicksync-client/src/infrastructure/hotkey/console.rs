//! Console-driven hotkey watcher for headless use.
//!
//! Without a desktop session there is no global keyboard hook to install, so
//! the shipped binary reads commands from stdin instead.  Typing a hotkey
//! label (`f5`, `press f5`) behaves exactly like pressing that key: the press
//! goes through the same [`GlobalHotkeyWatcher`] channel a platform hook
//! would use, and the lifecycle filters it against the configured hotkey.
//!
//! | Input                      | Command                         |
//! |----------------------------|---------------------------------|
//! | `f5`, `press f5`           | [`ConsoleCommand::Press`]       |
//! | `hotkey f6`, `set f6`      | [`ConsoleCommand::SetHotkey`]   |
//! | `move 100 200`             | [`ConsoleCommand::MoveCursor`]  |
//! | `retry`                    | [`ConsoleCommand::Retry`]       |
//! | `status`                   | [`ConsoleCommand::Status`]      |
//! | `help`, `?`                | [`ConsoleCommand::Help`]        |
//! | `quit`, `exit`             | [`ConsoleCommand::Quit`]        |

use std::sync::{Mutex, PoisonError};

use clicksync_core::{HotkeyLabel, KeyMapper};
use tokio::sync::mpsc;
use tracing::debug;

use crate::application::hotkey_watch::{GlobalHotkeyWatcher, HotkeyPress};
use crate::application::replay_click::PlatformError;

/// Help text printed for the `help` command.
pub const CONSOLE_HELP: &str = "\
commands:
  <key> | press <key>    simulate pressing <key> (e.g. f5)
  hotkey <key>           change the hotkey
  move <x> <y>           move the virtual cursor
  retry                  reconnect now instead of waiting
  status                 show connection state and hotkey
  quit                   exit";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Press(HotkeyLabel),
    SetHotkey(HotkeyLabel),
    MoveCursor(i32, i32),
    Retry,
    Status,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parses one line of console input.  Returns `Ok(None)` for blank lines.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message for anything unrecognised.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            return Ok(None);
        };
        let rest: Vec<&str> = words.collect();

        let command = match (first.to_ascii_lowercase().as_str(), rest.as_slice()) {
            ("quit" | "exit", []) => ConsoleCommand::Quit,
            ("retry", []) => ConsoleCommand::Retry,
            ("status", []) => ConsoleCommand::Status,
            ("help" | "?", []) => ConsoleCommand::Help,
            ("press", [key]) => ConsoleCommand::Press(parse_label(key)?),
            ("hotkey" | "set", [key]) => ConsoleCommand::SetHotkey(parse_label(key)?),
            ("move", [x, y]) => {
                let x = x.parse().map_err(|_| format!("invalid x coordinate: {x}"))?;
                let y = y.parse().map_err(|_| format!("invalid y coordinate: {y}"))?;
                ConsoleCommand::MoveCursor(x, y)
            }
            (word, []) => ConsoleCommand::Press(
                parse_label(word).map_err(|_| format!("unknown command: {word} (try 'help')"))?,
            ),
            _ => return Err(format!("unknown command: {} (try 'help')", line.trim())),
        };
        Ok(Some(command))
    }
}

fn parse_label(text: &str) -> Result<HotkeyLabel, String> {
    text.parse().map_err(|e| format!("{e}"))
}

/// A [`GlobalHotkeyWatcher`] fed from the console.
#[derive(Default)]
pub struct ConsoleHotkeyWatcher {
    sender: Mutex<Option<mpsc::Sender<HotkeyPress>>>,
}

impl ConsoleHotkeyWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a press of `label`.  Returns `false` when no watch is
    /// installed (e.g. while disconnected).
    pub fn fire(&self, label: HotkeyLabel) -> bool {
        let Some(native_code) = KeyMapper::native_code_for_current(label) else {
            return false;
        };
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match sender {
            Some(tx) => tx.try_send(HotkeyPress { native_code }).is_ok(),
            None => {
                debug!(key = %label, "no hotkey watch installed; press ignored");
                false
            }
        }
    }
}

impl GlobalHotkeyWatcher for ConsoleHotkeyWatcher {
    fn watch(&self, native_code: u32) -> Result<mpsc::Receiver<HotkeyPress>, PlatformError> {
        let (tx, rx) = mpsc::channel(8);
        *self.sender.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        debug!(native_code, "console hotkey watch installed");
        Ok(rx)
    }

    fn unwatch(&self) {
        *self.sender.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
