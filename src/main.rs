mod app;
mod config;
mod conversation;
mod cue;
mod inference;
mod recorder;
mod speech;
mod transcriber;
mod ui;
mod voice;

use std::cell::RefCell;
use std::rc::Rc;

use gtk4::gdk;
use gtk4::glib;
use gtk4::prelude::*;

use app::{AppState, BackendEvent};
use config::Config;

/// Actions registered on the application, targeted as `app.<name>`.
const APP_ACTIONS: [&str; 2] = ["about", "quit"];

fn main() -> glib::ExitCode {
    env_logger::init();
    log::info!("Voice Chat starting");

    let application = libadwaita::Application::builder()
        .application_id("com.github.tr4m0ryp.voice-chat")
        .build();

    application.connect_activate(on_activate);
    application.run()
}

fn on_activate(app: &libadwaita::Application) {
    let config = Config::load();
    log::info!("Using model {} at {}", config.model, config.endpoint);

    // Background work → UI main thread
    let (backend_tx, backend_rx) = async_channel::unbounded::<BackendEvent>();

    let state = match AppState::new(config, backend_tx) {
        Ok(state) => Rc::new(RefCell::new(state)),
        Err(e) => {
            log::error!("Failed to start async runtime: {e}");
            app.quit();
            return;
        }
    };

    let window = ui::window::build_window(app, "Loading speech model...");

    // Send button
    {
        let state_clone = state.clone();
        window.send_button.connect_clicked(move |_| {
            app::send_message(&state_clone);
        });
    }

    // Ctrl+Enter in the input box sends too
    {
        let state_clone = state.clone();
        let keys = gtk4::EventControllerKey::new();
        // Capture phase, or the text view consumes Enter first.
        keys.set_propagation_phase(gtk4::PropagationPhase::Capture);
        keys.connect_key_pressed(move |_, key, _, modifiers| {
            let enter = matches!(key, gdk::Key::Return | gdk::Key::KP_Enter);
            if enter && modifiers.contains(gdk::ModifierType::CONTROL_MASK) {
                app::send_message(&state_clone);
                glib::Propagation::Stop
            } else {
                glib::Propagation::Proceed
            }
        });
        window.input.add_controller(keys);
    }

    // Voice button
    {
        let state_clone = state.clone();
        window.voice_button.connect_clicked(move |_| {
            app::start_voice_input(&state_clone);
        });
    }

    // TTS toggle
    {
        let state_clone = state.clone();
        window.tts_button.connect_clicked(move |_| {
            app::toggle_tts(&state_clone);
        });
    }

    // Header menu actions, plus Ctrl+Q
    for name in APP_ACTIONS {
        let action = gtk4::gio::SimpleAction::new(name, None);
        let app_clone = app.clone();
        action.connect_activate(move |action, _| activate_app_action(&app_clone, &action.name()));
        app.add_action(&action);
    }
    app.set_accels_for_action("app.quit", &["<Ctrl>q"]);

    state.borrow_mut().window = Some(window);
    app::render_new_messages(&state);

    if let Some(ref win) = state.borrow().window {
        win.window.present();
        win.input.grab_focus();
    }

    // Attach backend event handler
    {
        let state_clone = state.clone();
        glib::spawn_future_local(async move {
            while let Ok(event) = backend_rx.recv().await {
                app::handle_backend_event(&state_clone, event);
            }
        });
    }

    app::ensure_whisper_model(&state);
    app::check_endpoint(&state);
}

fn activate_app_action(app: &libadwaita::Application, name: &str) {
    match name {
        "about" => ui::window::show_about(app),
        "quit" => app.quit(),
        other => log::warn!("Unhandled action app.{other}"),
    }
}
