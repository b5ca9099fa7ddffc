// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Keys the commandline reducer distinguishes. Everything the terminal can
/// produce maps onto one of these or is ignored by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Delete,
}

pub const COMMAND_MARKER: char = ':';
const CURSOR_MARKER: char = '|';

/// Modal commandline state. Transitions replace the whole value; no variant
/// is ever mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandlineState {
    Empty,
    Typing { content: String },
    Error { message: String },
}

impl Default for CommandlineState {
    fn default() -> Self {
        Self::Empty
    }
}

impl CommandlineState {
    pub fn typing(content: impl Into<String>) -> Self {
        Self::Typing {
            content: content.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub const fn is_typing(&self) -> bool {
        matches!(self, Self::Typing { .. })
    }

    /// The transition function. Total: every key yields exactly one next
    /// state from every state.
    pub fn apply(&self, key: InputKey) -> Self {
        match self {
            Self::Empty | Self::Error { .. } => match key {
                InputKey::Char(COMMAND_MARKER) => Self::typing(COMMAND_MARKER.to_string()),
                InputKey::Escape => Self::Empty,
                _ => self.clone(),
            },
            Self::Typing { content } => match key {
                InputKey::Escape | InputKey::Enter => Self::Empty,
                InputKey::Backspace | InputKey::Delete => {
                    if content.chars().count() > 1 {
                        let mut shortened = content.clone();
                        shortened.pop();
                        Self::Typing { content: shortened }
                    } else {
                        Self::Empty
                    }
                }
                InputKey::Char(c) => {
                    let mut extended = content.clone();
                    extended.push(c);
                    Self::Typing { content: extended }
                }
            },
        }
    }

    /// Buffer content with the leading mode marker stripped, ready to hand
    /// to the backend. `None` unless typing.
    pub fn submission(&self) -> Option<String> {
        match self {
            Self::Typing { content } => {
                Some(content.trim_start_matches(COMMAND_MARKER).to_owned())
            }
            _ => None,
        }
    }

    pub fn display_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Typing { content } => format!("{content}{CURSOR_MARKER}"),
            Self::Error { message } => message.clone(),
        }
    }
}
