use chrono::{DateTime, Local};

pub const WELCOME_MESSAGE: &str = "Welcome! How can I help you today?";

/// Who produced a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Assistant,
    /// A failed turn. Rendered on the assistant side with the "Error: ..." text.
    Error,
}

/// A single chat entry. Immutable once created.
#[derive(Debug, Clone)]
pub struct Message {
    text: String,
    kind: MessageKind,
    sent_at: DateTime<Local>,
}

impl Message {
    pub fn new(text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            text: text.into(),
            kind,
            sent_at: Local::now(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn is_user(&self) -> bool {
        self.kind == MessageKind::User
    }

    pub fn sender_label(&self) -> &'static str {
        if self.is_user() {
            "You:"
        } else {
            "Assistant:"
        }
    }

    /// Local wall-clock time, e.g. "14:03".
    pub fn time_label(&self) -> String {
        self.sent_at.format("%H:%M").to_string()
    }
}

/// Append-only, in-memory chat history. Insertion order is display order.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Text is taken as-is, including empty strings.
    pub fn append(&mut self, text: impl Into<String>, is_user: bool) -> &Message {
        let kind = if is_user {
            MessageKind::User
        } else {
            MessageKind::Assistant
        };
        self.push(Message::new(text, kind))
    }

    pub fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Entries from `index` onward; empty when `index` is past the end.
    pub fn since(&self, index: usize) -> &[Message] {
        self.messages().get(index..).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_keep_call_order() {
        let mut conversation = Conversation::new();
        let flags = [true, false, false, true, true, false];
        for (i, &is_user) in flags.iter().enumerate() {
            conversation.append(format!("m{i}"), is_user);
        }

        assert_eq!(conversation.len(), flags.len());
        for (i, (message, &is_user)) in conversation.messages().iter().zip(&flags).enumerate() {
            assert_eq!(message.text(), format!("m{i}"));
            assert_eq!(message.is_user(), is_user);
        }
    }

    #[test]
    fn empty_text_is_accepted() {
        let mut conversation = Conversation::new();
        conversation.append("", false);
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].text(), "");
    }

    #[test]
    fn since_returns_tail() {
        let mut conversation = Conversation::new();
        conversation.append("a", true);
        conversation.append("b", false);
        conversation.append("c", true);

        let tail: Vec<_> = conversation.since(1).iter().map(Message::text).collect();
        assert_eq!(tail, ["b", "c"]);
        assert!(conversation.since(3).is_empty());
        assert!(conversation.since(10).is_empty());
    }

    #[test]
    fn error_entries_render_as_assistant() {
        let message = Message::new("Error: No valid response", MessageKind::Error);
        assert!(!message.is_user());
        assert_eq!(message.sender_label(), "Assistant:");
        assert_eq!(Message::new("hi", MessageKind::User).sender_label(), "You:");
    }
}
