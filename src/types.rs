//! Common types used throughout the ollamacord bot.

use std::fmt;

/// Speaker tag used for the bot's own messages in conversation context.
pub const ASSISTANT_TAG: &str = "Assistant";

/// Who said a line of conversation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Speaker {
    /// A human, labelled by their raw username
    User(String),
    /// The bot itself
    Assistant,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User(name) => f.write_str(name),
            Speaker::Assistant => f.write_str(ASSISTANT_TAG),
        }
    }
}

/// One prior channel message, as shown to the model.
///
/// Renders as `<speaker>: <text>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLine {
    pub speaker: Speaker,
    pub text: String,
}

impl ContextLine {
    #[must_use]
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

impl fmt::Display for ContextLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.speaker, self.text)
    }
}
