//! Keyboard model
//!
//! Platform-neutral key codes and modifier state. Hosts translate their
//! native key events into [`KeyEvent`]s, either from DOM `key` names or from
//! the raw virtual key codes desktop backends report.

/// A logical key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyCode {
    ArrowDown,
    ArrowUp,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    PageUp,
    PageDown,
    Enter,
    Escape,
    Tab,
    Space,
    Backspace,
    Delete,
    /// A key that produces a character
    Char(char),
    /// Anything else, carrying the platform code
    Other(u32),
}

impl KeyCode {
    /// Parse a DOM `KeyboardEvent.key` value
    pub fn from_key_name(name: &str) -> Self {
        match name {
            "ArrowDown" | "Down" => KeyCode::ArrowDown,
            "ArrowUp" | "Up" => KeyCode::ArrowUp,
            "ArrowLeft" | "Left" => KeyCode::ArrowLeft,
            "ArrowRight" | "Right" => KeyCode::ArrowRight,
            "Home" => KeyCode::Home,
            "End" => KeyCode::End,
            "PageUp" => KeyCode::PageUp,
            "PageDown" => KeyCode::PageDown,
            "Enter" => KeyCode::Enter,
            "Escape" | "Esc" => KeyCode::Escape,
            "Tab" => KeyCode::Tab,
            " " | "Space" | "Spacebar" => KeyCode::Space,
            "Backspace" => KeyCode::Backspace,
            "Delete" | "Del" => KeyCode::Delete,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => KeyCode::Other(0),
                }
            }
        }
    }

    /// Translate a raw virtual key code, falling back to the typed character
    pub fn from_platform(code: u32, key_char: Option<char>) -> Self {
        match code {
            8 => KeyCode::Backspace,
            9 => KeyCode::Tab,
            13 => KeyCode::Enter,
            27 => KeyCode::Escape,
            32 => KeyCode::Space,
            33 => KeyCode::PageUp,
            34 => KeyCode::PageDown,
            35 => KeyCode::End,
            36 => KeyCode::Home,
            37 => KeyCode::ArrowLeft,
            38 => KeyCode::ArrowUp,
            39 => KeyCode::ArrowRight,
            40 => KeyCode::ArrowDown,
            127 => KeyCode::Delete,
            _ => match key_char {
                Some(c) if !c.is_control() => KeyCode::Char(c),
                _ => KeyCode::Other(code),
            },
        }
    }

    /// Whether this key moves through a list and would scroll the page
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            KeyCode::ArrowDown
                | KeyCode::ArrowUp
                | KeyCode::Home
                | KeyCode::End
                | KeyCode::PageUp
                | KeyCode::PageDown
        )
    }
}

/// Modifier key state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Cmd on macOS, Win on Windows
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const ALT: Self = Self {
        shift: false,
        ctrl: false,
        alt: true,
        meta: false,
    };

    /// Whether a command-style modifier (ctrl, alt, meta) is held
    pub fn has_command(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// A key press
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    /// A key press with Alt held
    pub fn alt(key: KeyCode) -> Self {
        Self {
            key,
            modifiers: Modifiers::ALT,
        }
    }

    /// A character key press
    pub fn char(c: char) -> Self {
        if c == ' ' {
            Self::new(KeyCode::Space)
        } else {
            Self::new(KeyCode::Char(c))
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// The character this press would type, if any
    pub fn printable(&self) -> Option<char> {
        if self.modifiers.has_command() {
            return None;
        }
        match self.key {
            KeyCode::Char(c) if !c.is_control() => Some(c),
            KeyCode::Space => Some(' '),
            _ => None,
        }
    }
}

impl From<KeyCode> for KeyEvent {
    fn from(key: KeyCode) -> Self {
        KeyEvent::new(key)
    }
}
