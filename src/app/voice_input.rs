use std::cell::RefCell;
use std::rc::Rc;

use gtk4::glib;
use gtk4::prelude::*;

use super::state::{update_status, AppState, AppStatus, BackendEvent};
use super::turn::send_message;
use crate::voice::{self, CaptureJob};

/// Start a one-shot voice capture. The Voice button stays disabled until the
/// transcript comes back.
pub fn start_voice_input(state: &Rc<RefCell<AppState>>) {
    let job = {
        let mut s = state.borrow_mut();
        let Some(whisper) = s.whisper_ctx.clone() else {
            log::info!("Voice input requested before the speech model is ready");
            return;
        };
        if !s.session.begin_capture() {
            log::info!("Ignoring voice input while a capture is running");
            return;
        }
        if let Some(ref win) = s.window {
            win.voice_button.set_sensitive(false);
        }
        CaptureJob {
            whisper,
            capture: s.config.capture.clone(),
            language: s.config.language.clone(),
        }
    };

    update_status(state, AppStatus::Listening, "Listening...");

    let phase_sender = state.borrow().backend_sender.clone();
    let rx = voice::spawn_capture(move || {
        job.run(|phase| {
            let _ = phase_sender.try_send(BackendEvent::CapturePhase(phase));
        })
    });

    // Single consumer for the single transcript.
    let state_clone = state.clone();
    glib::spawn_future_local(async move {
        let transcript = voice::recv_transcript(rx).await;
        on_transcript(&state_clone, transcript);
    });
}

fn on_transcript(state: &Rc<RefCell<AppState>>, transcript: String) {
    let prompt = {
        let mut s = state.borrow_mut();
        if let Some(ref win) = s.window {
            win.voice_button.set_sensitive(true);
        }
        s.session.finish_capture(transcript)
    };

    let Some(prompt) = prompt else {
        update_status(state, AppStatus::Ready, "Didn't catch that");
        return;
    };

    log::info!("Transcript: {prompt}");
    if let Some(ref win) = state.borrow().window {
        win.set_draft(&prompt);
    }
    send_message(state);
}
