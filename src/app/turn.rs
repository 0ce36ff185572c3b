use std::cell::RefCell;
use std::rc::Rc;

use gtk4::glib;
use gtk4::prelude::*;

use super::state::{render_new_messages, update_status, AppState, AppStatus};
use crate::ui::window::tts_label;

/// Send whatever is in the input box as one chat turn.
///
/// Runs the request on the GTK main thread: the window does not repaint until the
/// server closes its stream.
pub fn send_message(state: &Rc<RefCell<AppState>>) {
    let draft = match state.borrow().window {
        Some(ref win) => win.draft(),
        None => return,
    };
    if draft.trim().is_empty() {
        return;
    }

    if let Some(ref win) = state.borrow().window {
        win.set_draft("");
    }
    update_status(state, AppStatus::Thinking, "Thinking...");

    // Redraw runs ahead of idle callbacks, so the cleared input and the status line
    // are painted before the request blocks the main loop.
    let state_clone = state.clone();
    glib::idle_add_local_once(move || run_turn(&state_clone, &draft));
}

fn run_turn(state: &Rc<RefCell<AppState>>, draft: &str) {
    let reply = {
        let mut guard = state.borrow_mut();
        let s = &mut *guard;
        s.session.submit(draft, &s.generator).cloned()
    };
    render_new_messages(state);
    update_status(state, AppStatus::Ready, "Ready");

    let Some(reply) = reply else {
        return;
    };
    if !state.borrow().session.tts_enabled() {
        return;
    }

    // Let the reply paint before playback takes over the main loop.
    let state_clone = state.clone();
    glib::idle_add_local_once(move || {
        let s = state_clone.borrow();
        if let Some(ref win) = s.window {
            win.status_label.set_text("Speaking...");
        }
        s.session.speak_reply(&reply, &s.speaker);
        if let Some(ref win) = s.window {
            win.status_label.set_text("Ready");
        }
    });
}

/// Flip speech output on or off and relabel the button.
pub fn toggle_tts(state: &Rc<RefCell<AppState>>) {
    let mut s = state.borrow_mut();
    let enabled = s.session.toggle_tts();
    if let Some(ref win) = s.window {
        win.tts_button.set_label(tts_label(enabled));
    }
}
