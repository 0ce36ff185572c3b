use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use gtk4::glib;
use gtk4::prelude::*;

use super::state::{update_status, AppState, AppStatus, BackendEvent};

/// Download the whisper model if needed, then load it.
pub fn ensure_whisper_model(state: &Rc<RefCell<AppState>>) {
    let filename = state.borrow().config.whisper_model.clone();
    if crate::transcriber::model_path(&filename).exists() {
        load_whisper_model(state);
        return;
    }

    log::info!("Whisper model {filename} not found, starting download");
    update_status(state, AppStatus::ModelDownloading, "Downloading speech model...");
    let sender = state.borrow().backend_sender.clone();
    let progress_sender = sender.clone();

    state.borrow().tokio_rt.spawn(async move {
        let result = crate::transcriber::download_model(&filename, move |downloaded, total| {
            let _ = progress_sender.try_send(BackendEvent::ModelDownloadProgress(downloaded, total));
        })
        .await;

        let event = match result {
            Ok(()) => BackendEvent::ModelDownloadComplete,
            Err(e) => BackendEvent::ProcessingError(format!("Speech model download failed: {e}")),
        };
        let _ = sender.send(event).await;
    });
}

/// Load the whisper model in a blocking task, then deliver it to the main thread.
pub fn load_whisper_model(state: &Rc<RefCell<AppState>>) {
    log::info!("Loading whisper model...");
    update_status(state, AppStatus::LoadingModel, "Loading speech model...");

    let sender = state.borrow().backend_sender.clone();
    let path = crate::transcriber::model_path(&state.borrow().config.whisper_model);

    // Rc<RefCell> can't cross into tokio; the context comes back on its own channel.
    let (ctx_tx, ctx_rx) = async_channel::bounded::<whisper_rs::WhisperContext>(1);

    state.borrow().tokio_rt.spawn(async move {
        let result =
            tokio::task::spawn_blocking(move || crate::transcriber::load_model(&path)).await;

        let error = match result {
            Ok(Ok(ctx)) => {
                let _ = ctx_tx.send(ctx).await;
                return;
            }
            Ok(Err(e)) => format!("Failed to load speech model: {e}"),
            Err(e) => format!("Speech model load panicked: {e}"),
        };
        let _ = sender.send(BackendEvent::ProcessingError(error)).await;
    });

    let state_clone = state.clone();
    glib::spawn_future_local(async move {
        if let Ok(ctx) = ctx_rx.recv().await {
            {
                let mut s = state_clone.borrow_mut();
                s.whisper_ctx = Some(Arc::new(ctx));
                if let Some(ref win) = s.window {
                    win.voice_button.set_sensitive(true);
                }
            }
            update_status(&state_clone, AppStatus::Ready, "Ready");
            log::info!("Whisper model ready");
        }
    });
}
