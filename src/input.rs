//! Keyboard controls.
//!
//! | Key     | Command                |
//! |---------|------------------------|
//! | `B`     | toggle blur            |
//! | `T`     | toggle threshold       |
//! | `Space` | pause / resume physics |
//! | `Esc`   | quit                   |

use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// An action requested from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleBlur,
    ToggleThreshold,
    TogglePause,
    Quit,
}

impl Command {
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::KeyB => Some(Command::ToggleBlur),
            KeyCode::KeyT => Some(Command::ToggleThreshold),
            KeyCode::Space => Some(Command::TogglePause),
            KeyCode::Escape => Some(Command::Quit),
            _ => None,
        }
    }

    /// Command for a fresh key press. Releases and auto-repeat are ignored.
    pub fn from_event(event: &KeyEvent) -> Option<Self> {
        if event.state != ElementState::Pressed || event.repeat {
            return None;
        }
        match event.physical_key {
            PhysicalKey::Code(code) => Self::from_key(code),
            PhysicalKey::Unidentified(_) => None,
        }
    }
}
