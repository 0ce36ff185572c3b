use crate::conversation::{Conversation, Message, MessageKind, WELCOME_MESSAGE};
use crate::inference::{BlockingClient, InferenceError};
use crate::speech::CommandSpeaker;

/// Produces a reply for one prompt, blocking the caller.
pub trait Generate {
    fn generate(&self, prompt: &str) -> Result<String, InferenceError>;
}

impl Generate for BlockingClient {
    fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        BlockingClient::generate(self, prompt)
    }
}

/// Speaks text aloud, returning when playback ends.
pub trait Speak {
    fn speak(&self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl Speak for CommandSpeaker {
    fn speak(&self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        CommandSpeaker::speak(self, text)
    }
}

/// Per-window chat state: the conversation, the TTS toggle, and whether a voice
/// capture is in flight.
#[derive(Debug)]
pub struct Session {
    conversation: Conversation,
    tts_enabled: bool,
    capturing: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh session holding only the welcome message. TTS starts off.
    pub fn new() -> Self {
        let mut conversation = Conversation::new();
        conversation.append(WELCOME_MESSAGE, false);
        Self {
            conversation,
            tts_enabled: false,
            capturing: false,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn tts_enabled(&self) -> bool {
        self.tts_enabled
    }

    /// Flip the TTS flag and return the new value.
    pub fn toggle_tts(&mut self) -> bool {
        self.tts_enabled = !self.tts_enabled;
        log::info!("TTS {}", if self.tts_enabled { "enabled" } else { "disabled" });
        self.tts_enabled
    }

    /// Run one user turn.
    ///
    /// A blank draft is ignored and returns `None`. Otherwise the trimmed prompt is
    /// appended, `generator` is called, and the reply (or an "Error: ..." entry) is
    /// appended and returned.
    pub fn submit(&mut self, draft: &str, generator: &impl Generate) -> Option<&Message> {
        let prompt = draft.trim();
        if prompt.is_empty() {
            return None;
        }

        self.conversation.append(prompt, true);

        let reply = match generator.generate(prompt) {
            Ok(text) => Message::new(text, MessageKind::Assistant),
            Err(e) => {
                log::warn!("Generation failed: {e}");
                Message::new(format!("Error: {e}"), MessageKind::Error)
            }
        };
        Some(self.conversation.push(reply))
    }

    /// Speak `reply` if TTS is on and it is a genuine assistant answer. Blocks until
    /// playback ends. Returns whether anything was spoken.
    pub fn speak_reply(&self, reply: &Message, speaker: &impl Speak) -> bool {
        if !self.tts_enabled || reply.kind() != MessageKind::Assistant {
            return false;
        }
        match speaker.speak(reply.text()) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Speech output failed: {e}");
                false
            }
        }
    }

    /// Mark a voice capture as started. Returns `false` if one is already running.
    pub fn begin_capture(&mut self) -> bool {
        if self.capturing {
            return false;
        }
        self.capturing = true;
        true
    }

    /// Finish the running capture. Returns the text to place in the input and send,
    /// or `None` when nothing was recognized.
    pub fn finish_capture(&mut self, transcript: String) -> Option<String> {
        self.capturing = false;
        if transcript.is_empty() {
            log::info!("Voice capture produced no text");
            return None;
        }
        Some(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::cell::RefCell;

    /// Replies from a fixed script and records the prompts it saw.
    struct ScriptedGenerator {
        reply: fn() -> Result<String, InferenceError>,
        prompts: RefCell<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(reply: fn() -> Result<String, InferenceError>) -> Self {
            Self {
                reply,
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl Generate for ScriptedGenerator {
        fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            (self.reply)()
        }
    }

    #[derive(Default)]
    struct RecordingSpeaker {
        spoken: RefCell<Vec<String>>,
    }

    impl Speak for RecordingSpeaker {
        fn speak(&self, text: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.spoken.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    fn texts(session: &Session) -> Vec<&str> {
        session.conversation().messages().iter().map(Message::text).collect()
    }

    #[test]
    fn starts_with_welcome() {
        let session = Session::new();
        assert_eq!(texts(&session), [WELCOME_MESSAGE]);
        assert!(!session.conversation().messages()[0].is_user());
        assert!(!session.tts_enabled());
    }

    #[test]
    fn successful_turn_appends_prompt_and_reply() {
        let mut session = Session::new();
        let generator = ScriptedGenerator::new(|| Ok("Hi there".into()));

        let reply = session.submit("  Hello \n", &generator).unwrap();
        assert_eq!(reply.text(), "Hi there");
        assert_eq!(reply.kind(), MessageKind::Assistant);

        assert_eq!(*generator.prompts.borrow(), ["Hello"]);
        assert_eq!(texts(&session), [WELCOME_MESSAGE, "Hello", "Hi there"]);
        assert!(session.conversation().messages()[1].is_user());
    }

    #[test]
    fn blank_draft_is_ignored() {
        let mut session = Session::new();
        let generator = ScriptedGenerator::new(|| Ok("unused".into()));

        assert!(session.submit("", &generator).is_none());
        assert!(session.submit(" \n\t ", &generator).is_none());
        assert!(generator.prompts.borrow().is_empty());
        assert_eq!(session.conversation().len(), 1);
    }

    #[test]
    fn failures_become_error_entries() {
        let cases: [(fn() -> Result<String, InferenceError>, &str); 3] = [
            (
                || Err(InferenceError::ConnectionFailed(StatusCode::INTERNAL_SERVER_ERROR)),
                "Error: Could not connect to LLM",
            ),
            (|| Err(InferenceError::EmptyResponse), "Error: No valid response"),
            (
                || Err(InferenceError::Request("connection refused".into())),
                "Error: connection refused",
            ),
        ];

        for (reply, expected) in cases {
            let mut session = Session::new();
            let generator = ScriptedGenerator::new(reply);
            let message = session.submit("Hello", &generator).unwrap();
            assert_eq!(message.text(), expected);
            assert_eq!(message.kind(), MessageKind::Error);
            assert!(!message.is_user());
            assert_eq!(session.conversation().len(), 3);
        }
    }

    #[test]
    fn toggling_twice_restores_state() {
        let mut session = Session::new();
        assert!(session.toggle_tts());
        assert!(!session.toggle_tts());
        assert!(!session.tts_enabled());
    }

    #[test]
    fn tts_does_not_change_appends() {
        let generator = ScriptedGenerator::new(|| Ok("reply".into()));
        let mut quiet = Session::new();
        let mut loud = Session::new();
        loud.toggle_tts();

        quiet.submit("a", &generator);
        loud.submit("a", &generator);
        assert_eq!(texts(&quiet), texts(&loud));
    }

    #[test]
    fn speaks_only_assistant_replies_when_enabled() {
        let speaker = RecordingSpeaker::default();
        let mut session = Session::new();
        let ok = ScriptedGenerator::new(|| Ok("spoken".into()));
        let failing = ScriptedGenerator::new(|| Err(InferenceError::EmptyResponse));

        let reply = session.submit("x", &ok).unwrap().clone();
        assert!(!session.speak_reply(&reply, &speaker));

        session.toggle_tts();
        assert!(session.speak_reply(&reply, &speaker));

        let error = session.submit("y", &failing).unwrap().clone();
        assert!(!session.speak_reply(&error, &speaker));

        assert_eq!(*speaker.spoken.borrow(), ["spoken"]);
    }

    #[test]
    fn empty_transcript_leaves_input_alone() {
        let mut session = Session::new();
        assert!(session.begin_capture());
        assert!(!session.begin_capture());

        assert_eq!(session.finish_capture(String::new()), None);
        assert!(session.begin_capture());
        assert_eq!(session.conversation().len(), 1);
    }

    #[test]
    fn transcript_is_handed_back_for_sending() {
        let mut session = Session::new();
        session.begin_capture();
        assert_eq!(
            session.finish_capture("what is rust".into()).as_deref(),
            Some("what is rust")
        );
        assert!(session.begin_capture());
    }
}
