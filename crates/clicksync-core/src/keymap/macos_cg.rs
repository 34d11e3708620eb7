//! Hotkey label to macOS `CGKeyCode` table.
//!
//! Values come from `HIToolbox/Events.h` (`kVK_*` constants).  Unlike the
//! Windows and X11 tables, macOS virtual key codes follow the physical ANSI
//! layout and are not contiguous for the function row.
//!
//! Apple keyboards have no Insert, Pause, or Scroll Lock keys; those labels
//! map to the keys that occupy the same position on extended keyboards
//! (Help, F15, F14).

use super::HotkeyLabel;

/// Translates a [`HotkeyLabel`] to a macOS `CGKeyCode`.
pub fn label_to_cgkeycode(label: HotkeyLabel) -> Option<u16> {
    let code = match label {
        HotkeyLabel::F1 => 0x7A, // kVK_F1
        HotkeyLabel::F2 => 0x78,
        HotkeyLabel::F3 => 0x63,
        HotkeyLabel::F4 => 0x76,
        HotkeyLabel::F5 => 0x60,
        HotkeyLabel::F6 => 0x61,
        HotkeyLabel::F7 => 0x62,
        HotkeyLabel::F8 => 0x64,
        HotkeyLabel::F9 => 0x65,
        HotkeyLabel::F10 => 0x6D,
        HotkeyLabel::F11 => 0x67,
        HotkeyLabel::F12 => 0x6F,
        HotkeyLabel::Escape => 0x35,     // kVK_Escape
        HotkeyLabel::Enter => 0x24,      // kVK_Return
        HotkeyLabel::Tab => 0x30,        // kVK_Tab
        HotkeyLabel::Space => 0x31,      // kVK_Space
        HotkeyLabel::Insert => 0x72,     // kVK_Help
        HotkeyLabel::Delete => 0x75,     // kVK_ForwardDelete
        HotkeyLabel::Home => 0x73,       // kVK_Home
        HotkeyLabel::End => 0x77,        // kVK_End
        HotkeyLabel::PageUp => 0x74,     // kVK_PageUp
        HotkeyLabel::PageDown => 0x79,   // kVK_PageDown
        HotkeyLabel::Pause => 0x71,      // kVK_F15
        HotkeyLabel::ScrollLock => 0x6B, // kVK_F14
    };
    Some(code)
}
