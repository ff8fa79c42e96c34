// Input handling for heike-nav
// Turns key presses and mouse buttons into navigation commands

use crate::change::OpenFlags;
use crate::config::InputConfig;
use crate::ids::SlotId;
use crate::location::Location;

pub const PRIMARY_BUTTON: u16 = 1;
pub const MIDDLE_BUTTON: u16 = 2;

/// A command the application runs against a window's active slot.
#[derive(Clone, Debug, PartialEq)]
pub enum NavCommand {
    /// Steps past the nearest history entry; 0 goes back once.
    Back(usize),
    Forward(usize),
    Up,
    Home,
    Reload,
    Stop,
    OpenLocation { target: Location, flags: OpenFlags },
    NewTab,
    CloseTab,
    NextTab,
    PreviousTab,
    /// Zero-based position in the active pane
    SelectTab(usize),
    MoveTab(isize),
    ToggleSplitView,
    NextPane,
    ToggleSidebar,
    ActivateSlot(SlotId),
    CloseWindow,
}

/// Toolkit-neutral key names. The shell maps its own key codes onto these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavKey {
    Left,
    Right,
    Up,
    Home,
    PageUp,
    PageDown,
    Tab,
    Escape,
    Digit(u8),
    Char(char),
    F(u8),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        alt: false,
        ctrl: false,
        shift: false,
    };
    pub const ALT: Modifiers = Modifiers {
        alt: true,
        ctrl: false,
        shift: false,
    };
    pub const CTRL: Modifiers = Modifiers {
        alt: false,
        ctrl: true,
        shift: false,
    };
    pub const CTRL_SHIFT: Modifiers = Modifiers {
        alt: false,
        ctrl: true,
        shift: true,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    Key { key: NavKey, modifiers: Modifiers },
    /// Mouse button by X11-style number: 1 primary, 2 middle, 8/9 side buttons.
    Button(u16),
}

/// Maps gestures to commands using the configured button preferences.
#[derive(Clone, Debug, Default)]
pub struct GestureInterpreter {
    config: InputConfig,
}

impl GestureInterpreter {
    pub fn new(config: InputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: InputConfig) {
        self.config = config;
    }

    pub fn interpret(&self, gesture: Gesture) -> Option<NavCommand> {
        match gesture {
            Gesture::Button(button) => self.button(button),
            Gesture::Key { key, modifiers } => Self::key(key, modifiers),
        }
    }

    fn button(&self, button: u16) -> Option<NavCommand> {
        if !self.config.use_extra_mouse_buttons {
            return None;
        }
        if button == self.config.back_button {
            Some(NavCommand::Back(0))
        } else if button == self.config.forward_button {
            Some(NavCommand::Forward(0))
        } else {
            None
        }
    }

    fn key(key: NavKey, modifiers: Modifiers) -> Option<NavCommand> {
        let command = match (key, modifiers) {
            (NavKey::Left, Modifiers::ALT) => NavCommand::Back(0),
            (NavKey::Right, Modifiers::ALT) => NavCommand::Forward(0),
            (NavKey::Up, Modifiers::ALT) => NavCommand::Up,
            (NavKey::Home, Modifiers::ALT) => NavCommand::Home,
            (NavKey::F(5), Modifiers::NONE) | (NavKey::Char('r'), Modifiers::CTRL) => {
                NavCommand::Reload
            }
            (NavKey::Escape, Modifiers::NONE) => NavCommand::Stop,
            (NavKey::Char('t'), Modifiers::CTRL) => NavCommand::NewTab,
            (NavKey::Char('w'), Modifiers::CTRL) => NavCommand::CloseTab,
            (NavKey::Char('q'), Modifiers::CTRL) => NavCommand::CloseWindow,
            (NavKey::Tab, Modifiers::CTRL) | (NavKey::PageDown, Modifiers::CTRL) => {
                NavCommand::NextTab
            }
            (NavKey::Tab, Modifiers::CTRL_SHIFT) | (NavKey::PageUp, Modifiers::CTRL) => {
                NavCommand::PreviousTab
            }
            (NavKey::PageUp, Modifiers::CTRL_SHIFT) => NavCommand::MoveTab(-1),
            (NavKey::PageDown, Modifiers::CTRL_SHIFT) => NavCommand::MoveTab(1),
            // Alt+1 .. Alt+9
            (NavKey::Digit(n @ 1..=9), Modifiers::ALT) => NavCommand::SelectTab(usize::from(n - 1)),
            (NavKey::F(3), Modifiers::NONE) => NavCommand::ToggleSplitView,
            (NavKey::F(6), Modifiers::NONE) => NavCommand::NextPane,
            (NavKey::F(9), Modifiers::NONE) => NavCommand::ToggleSidebar,
            _ => return None,
        };
        Some(command)
    }

    /// Flags for activating an item with `button`: middle click opens a tab,
    /// ctrl+click a window.
    pub fn open_flags(&self, button: u16, modifiers: Modifiers) -> OpenFlags {
        if button == MIDDLE_BUTTON {
            OpenFlags::NEW_TAB
        } else if button == PRIMARY_BUTTON && modifiers.ctrl {
            OpenFlags::NEW_WINDOW
        } else {
            OpenFlags::empty()
        }
    }
}
