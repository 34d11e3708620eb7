//! Hotkey label translation tables.
//!
//! A user configures the trigger key by *label* (`"f5"`, `"escape"`), but the
//! global keyboard hook on each operating system reports a *native* key code:
//!
//! | OS family | Native code          | `f5` example |
//! |-----------|----------------------|--------------|
//! | Windows   | Virtual-Key code     | `0x74` (116) |
//! | Linux     | X11 KeySym           | `0xFFC2`     |
//! | macOS     | `CGKeyCode`          | `0x60`       |
//!
//! The same label therefore maps to a different number per OS family.  The
//! hotkey watch compares every reported key against the native code of the
//! configured label and ignores everything else.

pub mod linux_x11;
pub mod macos_cg;
pub mod windows_vk;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error returned when a string is not a supported hotkey label.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported hotkey label: {0:?}")]
pub struct UnknownHotkeyLabel(pub String);

/// The keys that may be bound as the click-sync trigger.
///
/// The set is deliberately limited to keys that are rarely used for text
/// entry, so a global hook on them does not interfere with typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HotkeyLabel {
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Escape,
    Enter,
    Tab,
    Space,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Pause,
    ScrollLock,
}

impl HotkeyLabel {
    /// Every supported label, in display order.
    pub const ALL: [HotkeyLabel; 24] = [
        HotkeyLabel::F1,
        HotkeyLabel::F2,
        HotkeyLabel::F3,
        HotkeyLabel::F4,
        HotkeyLabel::F5,
        HotkeyLabel::F6,
        HotkeyLabel::F7,
        HotkeyLabel::F8,
        HotkeyLabel::F9,
        HotkeyLabel::F10,
        HotkeyLabel::F11,
        HotkeyLabel::F12,
        HotkeyLabel::Escape,
        HotkeyLabel::Enter,
        HotkeyLabel::Tab,
        HotkeyLabel::Space,
        HotkeyLabel::Insert,
        HotkeyLabel::Delete,
        HotkeyLabel::Home,
        HotkeyLabel::End,
        HotkeyLabel::PageUp,
        HotkeyLabel::PageDown,
        HotkeyLabel::Pause,
        HotkeyLabel::ScrollLock,
    ];

    /// The canonical lower-case label, as written in config files and sent
    /// in `update_hotkey` messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            HotkeyLabel::F1 => "f1",
            HotkeyLabel::F2 => "f2",
            HotkeyLabel::F3 => "f3",
            HotkeyLabel::F4 => "f4",
            HotkeyLabel::F5 => "f5",
            HotkeyLabel::F6 => "f6",
            HotkeyLabel::F7 => "f7",
            HotkeyLabel::F8 => "f8",
            HotkeyLabel::F9 => "f9",
            HotkeyLabel::F10 => "f10",
            HotkeyLabel::F11 => "f11",
            HotkeyLabel::F12 => "f12",
            HotkeyLabel::Escape => "escape",
            HotkeyLabel::Enter => "enter",
            HotkeyLabel::Tab => "tab",
            HotkeyLabel::Space => "space",
            HotkeyLabel::Insert => "insert",
            HotkeyLabel::Delete => "delete",
            HotkeyLabel::Home => "home",
            HotkeyLabel::End => "end",
            HotkeyLabel::PageUp => "pageup",
            HotkeyLabel::PageDown => "pagedown",
            HotkeyLabel::Pause => "pause",
            HotkeyLabel::ScrollLock => "scrolllock",
        }
    }
}

impl Default for HotkeyLabel {
    fn default() -> Self {
        HotkeyLabel::F5
    }
}

impl fmt::Display for HotkeyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HotkeyLabel {
    type Err = UnknownHotkeyLabel;

    /// Parses a label case-insensitively.  A few common aliases are accepted
    /// (`esc`, `return`, `pgup`, `pgdn`, `del`, `ins`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let label = match lowered.as_str() {
            "esc" => HotkeyLabel::Escape,
            "return" => HotkeyLabel::Enter,
            "pgup" => HotkeyLabel::PageUp,
            "pgdn" => HotkeyLabel::PageDown,
            "del" => HotkeyLabel::Delete,
            "ins" => HotkeyLabel::Insert,
            other => *HotkeyLabel::ALL
                .iter()
                .find(|l| l.as_str() == other)
                .ok_or_else(|| UnknownHotkeyLabel(s.to_string()))?,
        };
        Ok(label)
    }
}

/// Operating system family, which determines the native key-code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFamily {
    Windows,
    Linux,
    MacOs,
}

impl PlatformFamily {
    /// Returns the family of the current compilation target.
    ///
    /// Other Unix-like targets use the X11 table.
    pub fn current() -> Self {
        #[cfg(target_os = "windows")]
        return PlatformFamily::Windows;
        #[cfg(target_os = "macos")]
        return PlatformFamily::MacOs;
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        return PlatformFamily::Linux;
    }
}

/// Unified key mapper over the per-platform tables.
pub struct KeyMapper;

impl KeyMapper {
    /// Translates a label to the native key code for `family`.
    ///
    /// Returns `None` if the key has no equivalent on that platform.
    pub fn native_code(label: HotkeyLabel, family: PlatformFamily) -> Option<u32> {
        match family {
            PlatformFamily::Windows => windows_vk::label_to_vk(label).map(u32::from),
            PlatformFamily::Linux => linux_x11::label_to_keysym(label),
            PlatformFamily::MacOs => macos_cg::label_to_cgkeycode(label).map(u32::from),
        }
    }

    /// Translates a label to the native key code for the running OS.
    pub fn native_code_for_current(label: HotkeyLabel) -> Option<u32> {
        Self::native_code(label, PlatformFamily::current())
    }

    /// Reverse lookup: finds the label whose native code on `family` is `code`.
    pub fn label_for_native(code: u32, family: PlatformFamily) -> Option<HotkeyLabel> {
        HotkeyLabel::ALL
            .iter()
            .copied()
            .find(|label| Self::native_code(*label, family) == Some(code))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
