use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::config::Config;
use crate::inference::{BlockingClient, OllamaClient};
use crate::speech::{self, CommandSpeaker};
use crate::ui::window::ChatWindowWidgets;
use crate::voice::CapturePhase;

use super::session::Session;

/// Events sent from background work to the GTK main thread.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    CapturePhase(CapturePhase),
    ModelDownloadProgress(u64, u64),
    ModelDownloadComplete,
    /// Outcome of the startup `/api/tags` check; `None` means all is well.
    EndpointChecked(Option<String>),
    ProcessingError(String),
}

/// What the status line is showing.
#[derive(Debug, Clone, PartialEq)]
pub enum AppStatus {
    Ready,
    Listening,
    Transcribing,
    Thinking,
    ModelDownloading,
    LoadingModel,
}

/// Central application state. Lives on the GTK main thread inside Rc<RefCell<>>.
pub struct AppState {
    pub status: AppStatus,
    pub config: Config,
    pub session: Session,
    pub tokio_rt: tokio::runtime::Runtime,
    pub generator: BlockingClient,
    pub speaker: CommandSpeaker,
    pub whisper_ctx: Option<Arc<whisper_rs::WhisperContext>>,
    pub backend_sender: async_channel::Sender<BackendEvent>,

    /// Number of conversation entries already shown in the window.
    pub rendered: usize,

    // UI handles
    pub window: Option<ChatWindowWidgets>,
}

impl AppState {
    pub fn new(
        config: Config,
        sender: async_channel::Sender<BackendEvent>,
    ) -> std::io::Result<Self> {
        let tokio_rt = tokio::runtime::Runtime::new()?;
        let generator = BlockingClient::new(OllamaClient::new(&config), tokio_rt.handle().clone());
        let speaker = CommandSpeaker::new(speech::speech_command(config.tts_command.as_deref()));

        Ok(Self {
            status: AppStatus::LoadingModel,
            config,
            session: Session::new(),
            tokio_rt,
            generator,
            speaker,
            whisper_ctx: None,
            backend_sender: sender,
            rendered: 0,
            window: None,
        })
    }
}

/// Helper to update status label and state.
pub fn update_status(state: &Rc<RefCell<AppState>>, status: AppStatus, label_text: &str) {
    let mut s = state.borrow_mut();
    s.status = status;
    if let Some(ref win) = s.window {
        win.status_label.set_text(label_text);
    }
}

/// Show every conversation entry the window has not drawn yet, then scroll to the end.
pub fn render_new_messages(state: &Rc<RefCell<AppState>>) {
    let mut s = state.borrow_mut();
    let start = s.rendered;
    let total = s.session.conversation().len();
    if let Some(ref win) = s.window {
        for message in s.session.conversation().since(start) {
            win.chat.append(message);
        }
    }
    s.rendered = total;
}
