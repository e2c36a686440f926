//! Editor keyboard shortcuts
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    Char(char),
    Delete,
    Backspace,
    Escape,
    Enter,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    /// Ctrl on Windows/Linux, Cmd on macOS.
    #[serde(default)]
    pub command: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        command: false,
        shift: false,
        alt: false,
    };
    pub const COMMAND: Self = Self {
        command: true,
        shift: false,
        alt: false,
    };
    pub const SHIFT: Self = Self {
        command: false,
        shift: true,
        alt: false,
    };
}

/// A key press together with the focus state it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInput {
    pub key: Key,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// An input or textarea owns the keyboard.
    #[serde(default)]
    pub text_field_focused: bool,
}

impl KeyInput {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self {
            key,
            modifiers,
            text_field_focused: false,
        }
    }

    pub fn in_text_field(mut self) -> Self {
        self.text_field_focused = true;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCommand {
    // Editing
    Copy,
    Paste,
    Duplicate,
    Delete,
    Undo,
    Redo,
    StartEditing,
    Escape,

    // Playhead
    StepBackward,
    StepForward,
    JumpToStart,
    JumpToEnd,
}

impl KeyCommand {
    /// Maps a key press to a command. Shortcuts that collide with native text
    /// editing are not claimed while a text field has focus.
    pub fn from_input(input: &KeyInput) -> Option<Self> {
        let m = input.modifiers;
        let command = match input.key {
            Key::Char(c) if m.command => match c.to_ascii_lowercase() {
                'c' => Self::Copy,
                'v' => Self::Paste,
                'd' => Self::Duplicate,
                'z' if m.shift => Self::Redo,
                'z' => Self::Undo,
                'y' => Self::Redo,
                _ => return None,
            },
            Key::Delete | Key::Backspace => Self::Delete,
            Key::Enter => Self::StartEditing,
            Key::Escape => Self::Escape,
            Key::ArrowLeft if !m.shift => Self::StepBackward,
            Key::ArrowRight if !m.shift => Self::StepForward,
            Key::Home => Self::JumpToStart,
            Key::End => Self::JumpToEnd,
            _ => return None,
        };

        if input.text_field_focused && command.is_text_editing_shortcut() {
            return None;
        }
        Some(command)
    }

    /// Commands a focused text field handles natively.
    pub fn is_text_editing_shortcut(&self) -> bool {
        !matches!(self, Self::Escape)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Copy => "Copy layer",
            Self::Paste => "Paste layer",
            Self::Duplicate => "Duplicate layer",
            Self::Delete => "Delete layer",
            Self::Undo => "Undo",
            Self::Redo => "Redo",
            Self::StartEditing => "Edit selected layer",
            Self::Escape => "Clear selection",
            Self::StepBackward => "Step backward 1 frame",
            Self::StepForward => "Step forward 1 frame",
            Self::JumpToStart => "Jump to start",
            Self::JumpToEnd => "Jump to end",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_editing_shortcuts() {
        let undo = KeyInput::new(Key::Char('z'), Modifiers::COMMAND);
        assert_eq!(KeyCommand::from_input(&undo), Some(KeyCommand::Undo));

        let redo = KeyInput::new(
            Key::Char('Z'),
            Modifiers {
                command: true,
                shift: true,
                alt: false,
            },
        );
        assert_eq!(KeyCommand::from_input(&redo), Some(KeyCommand::Redo));

        let delete = KeyInput::new(Key::Backspace, Modifiers::NONE);
        assert_eq!(KeyCommand::from_input(&delete), Some(KeyCommand::Delete));

        let plain_c = KeyInput::new(Key::Char('c'), Modifiers::NONE);
        assert_eq!(KeyCommand::from_input(&plain_c), None);
    }

    #[test]
    fn text_field_focus_blocks_editing_shortcuts() {
        for key in [Key::Delete, Key::Backspace, Key::Enter, Key::ArrowLeft] {
            let input = KeyInput::new(key, Modifiers::NONE).in_text_field();
            assert_eq!(KeyCommand::from_input(&input), None);
        }
        let paste = KeyInput::new(Key::Char('v'), Modifiers::COMMAND).in_text_field();
        assert_eq!(KeyCommand::from_input(&paste), None);

        let escape = KeyInput::new(Key::Escape, Modifiers::NONE).in_text_field();
        assert_eq!(KeyCommand::from_input(&escape), Some(KeyCommand::Escape));
    }

    #[test]
    fn shifted_arrows_are_not_steps() {
        let input = KeyInput::new(Key::ArrowRight, Modifiers::SHIFT);
        assert_eq!(KeyCommand::from_input(&input), None);
    }
}
