/// A request to be sent to the model provider.
///
/// The model is expected to produce exactly one assistant message that
/// continues `messages`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The input messages.
    pub messages: Vec<ModelMessage>,
}

impl ModelRequest {
    /// Returns the last message of the request, if any.
    #[inline]
    pub fn last_message(&self) -> Option<&ModelMessage> {
        self.messages.last()
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}

impl ModelMessage {
    /// Returns the text content of the message.
    #[inline]
    pub fn content(&self) -> &str {
        match self {
            ModelMessage::System(text)
            | ModelMessage::User(text)
            | ModelMessage::Assistant(text) => text,
        }
    }
}
