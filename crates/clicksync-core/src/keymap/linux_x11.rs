//! Hotkey label to X11 KeySym table for Linux.
//!
//! KeySym values are defined in `X11/keysymdef.h`.
//! Reference: <https://gitlab.freedesktop.org/xorg/proto/xorgproto/-/blob/master/include/X11/keysymdef.h>
//!
//! X11 hook libraries report the KeySym of the pressed key rather than a
//! hardware scan code, so the watch compares against these values.

use super::HotkeyLabel;

/// Translates a [`HotkeyLabel`] to an X11 KeySym value.
///
/// Every supported label has a KeySym equivalent.
pub fn label_to_keysym(label: HotkeyLabel) -> Option<u32> {
    let keysym = match label {
        HotkeyLabel::F1 => 0xFFBE, // XK_F1
        HotkeyLabel::F2 => 0xFFBF,
        HotkeyLabel::F3 => 0xFFC0,
        HotkeyLabel::F4 => 0xFFC1,
        HotkeyLabel::F5 => 0xFFC2,
        HotkeyLabel::F6 => 0xFFC3,
        HotkeyLabel::F7 => 0xFFC4,
        HotkeyLabel::F8 => 0xFFC5,
        HotkeyLabel::F9 => 0xFFC6,
        HotkeyLabel::F10 => 0xFFC7,
        HotkeyLabel::F11 => 0xFFC8,
        HotkeyLabel::F12 => 0xFFC9,
        HotkeyLabel::Escape => 0xFF1B,     // XK_Escape
        HotkeyLabel::Enter => 0xFF0D,      // XK_Return
        HotkeyLabel::Tab => 0xFF09,        // XK_Tab
        HotkeyLabel::Space => 0x0020,      // XK_space
        HotkeyLabel::Insert => 0xFF63,     // XK_Insert
        HotkeyLabel::Delete => 0xFFFF,     // XK_Delete
        HotkeyLabel::Home => 0xFF50,       // XK_Home
        HotkeyLabel::End => 0xFF57,        // XK_End
        HotkeyLabel::PageUp => 0xFF55,     // XK_Prior
        HotkeyLabel::PageDown => 0xFF56,   // XK_Next
        HotkeyLabel::Pause => 0xFF13,      // XK_Pause
        HotkeyLabel::ScrollLock => 0xFF14, // XK_Scroll_Lock
    };
    Some(keysym)
}
