use std::cell::RefCell;
use std::rc::Rc;

use super::model::load_whisper_model;
use super::state::{update_status, AppState, AppStatus, BackendEvent};
use crate::voice::CapturePhase;

/// Handle a backend event on the GTK main thread.
pub fn handle_backend_event(state: &Rc<RefCell<AppState>>, event: BackendEvent) {
    match event {
        BackendEvent::CapturePhase(phase) => {
            log::debug!("Capture phase: {phase:?}");
            match phase {
                CapturePhase::Recording => {
                    update_status(state, AppStatus::Listening, "Listening...")
                }
                CapturePhase::Recognizing => {
                    update_status(state, AppStatus::Transcribing, "Transcribing...")
                }
                CapturePhase::Done => {}
            }
        }
        BackendEvent::ModelDownloadProgress(downloaded, total) => {
            let text = download_progress_text(downloaded, total);
            if let Some(ref win) = state.borrow().window {
                win.status_label.set_text(&text);
            }
        }
        BackendEvent::ModelDownloadComplete => load_whisper_model(state),
        BackendEvent::EndpointChecked(problem) => match problem {
            Some(warning) => {
                log::warn!("{warning}");
                let ready = state.borrow().status == AppStatus::Ready;
                if ready {
                    update_status(state, AppStatus::Ready, &warning);
                }
            }
            None => log::info!("LLM server reachable"),
        },
        BackendEvent::ProcessingError(err) => {
            log::error!("Processing error: {err}");
            update_status(state, AppStatus::Ready, &err);
        }
    }
}

fn download_progress_text(downloaded: u64, total: u64) -> String {
    let mb_done = downloaded as f64 / 1_048_576.0;
    if total > 0 {
        let mb_total = total as f64 / 1_048_576.0;
        let pct = downloaded as f64 / total as f64 * 100.0;
        format!("Downloading speech model: {mb_done:.1} / {mb_total:.1} MB ({pct:.0}%)")
    } else {
        format!("Downloading speech model: {mb_done:.1} MB")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_text() {
        assert_eq!(
            download_progress_text(1_048_576, 4_194_304),
            "Downloading speech model: 1.0 / 4.0 MB (25%)"
        );
        assert_eq!(
            download_progress_text(3_145_728, 0),
            "Downloading speech model: 3.0 MB"
        );
    }
}
