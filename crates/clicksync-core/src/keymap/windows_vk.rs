//! Hotkey label to Windows Virtual-Key code table.
//!
//! Reference: <https://learn.microsoft.com/en-us/windows/win32/inputdev/virtual-key-codes>
//!
//! A low-level keyboard hook (`WH_KEYBOARD_LL`) reports the `vkCode` field of
//! `KBDLLHOOKSTRUCT`; these are the values the hotkey watch compares against.

use super::HotkeyLabel;

/// Translates a [`HotkeyLabel`] to a Windows Virtual-Key code.
///
/// Every supported label has a VK equivalent.
pub fn label_to_vk(label: HotkeyLabel) -> Option<u8> {
    let vk = match label {
        HotkeyLabel::F1 => 0x70,
        HotkeyLabel::F2 => 0x71,
        HotkeyLabel::F3 => 0x72,
        HotkeyLabel::F4 => 0x73,
        HotkeyLabel::F5 => 0x74,
        HotkeyLabel::F6 => 0x75,
        HotkeyLabel::F7 => 0x76,
        HotkeyLabel::F8 => 0x77,
        HotkeyLabel::F9 => 0x78,
        HotkeyLabel::F10 => 0x79,
        HotkeyLabel::F11 => 0x7A,
        HotkeyLabel::F12 => 0x7B,
        HotkeyLabel::Escape => 0x1B,     // VK_ESCAPE
        HotkeyLabel::Enter => 0x0D,      // VK_RETURN
        HotkeyLabel::Tab => 0x09,        // VK_TAB
        HotkeyLabel::Space => 0x20,      // VK_SPACE
        HotkeyLabel::Insert => 0x2D,     // VK_INSERT
        HotkeyLabel::Delete => 0x2E,     // VK_DELETE
        HotkeyLabel::Home => 0x24,       // VK_HOME
        HotkeyLabel::End => 0x23,        // VK_END
        HotkeyLabel::PageUp => 0x21,     // VK_PRIOR
        HotkeyLabel::PageDown => 0x22,   // VK_NEXT
        HotkeyLabel::Pause => 0x13,      // VK_PAUSE
        HotkeyLabel::ScrollLock => 0x91, // VK_SCROLL
    };
    Some(vk)
}
