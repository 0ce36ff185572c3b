mod event_handler;
mod model;
mod probe;
mod session;
mod state;
mod turn;
mod voice_input;

pub use event_handler::handle_backend_event;
pub use model::ensure_whisper_model;
pub use probe::check_endpoint;
pub use state::{render_new_messages, AppState, BackendEvent};
pub use turn::{send_message, toggle_tts};
pub use voice_input::start_voice_input;
