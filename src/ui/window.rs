use gtk4::prelude::*;
use libadwaita::prelude::*;

use super::chat_view::{ChatView, STYLES};

/// Handles returned from building the chat window.
pub struct ChatWindowWidgets {
    pub window: libadwaita::ApplicationWindow,
    pub chat: ChatView,
    pub input: gtk4::TextView,
    pub send_button: gtk4::Button,
    pub voice_button: gtk4::Button,
    pub tts_button: gtk4::Button,
    pub status_label: gtk4::Label,
}

impl ChatWindowWidgets {
    /// Current input text.
    pub fn draft(&self) -> String {
        let buffer = self.input.buffer();
        buffer
            .text(&buffer.start_iter(), &buffer.end_iter(), false)
            .to_string()
    }

    pub fn set_draft(&self, text: &str) {
        self.input.buffer().set_text(text);
    }
}

pub fn tts_label(enabled: bool) -> &'static str {
    if enabled {
        "\u{1F50A} TTS: On"
    } else {
        "\u{1F50A} TTS: Off"
    }
}

/// Header menu entries as (label, detailed action name).
pub const MENU_ITEMS: [(&str, &str); 2] = [("About Voice Chat", "app.about"), ("Quit", "app.quit")];

/// Show the About dialog over the active window.
pub fn show_about(app: &libadwaita::Application) {
    let about = libadwaita::AboutWindow::builder()
        .application_name("Voice Chat")
        .application_icon("audio-input-microphone-symbolic")
        .version(env!("CARGO_PKG_VERSION"))
        .comments(env!("CARGO_PKG_DESCRIPTION"))
        .website(env!("CARGO_PKG_REPOSITORY"))
        .license_type(gtk4::License::MitX11)
        .modal(true)
        .build();
    if let Some(parent) = app.active_window() {
        about.set_transient_for(Some(&parent));
    }
    about.present();
}

/// Build the main chat window.
pub fn build_window(app: &libadwaita::Application, initial_status: &str) -> ChatWindowWidgets {
    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("AI Chat Assistant")
        .default_width(1000)
        .default_height(800)
        .build();

    let css_provider = gtk4::CssProvider::new();
    css_provider.load_from_string(STYLES);
    if let Some(display) = gtk4::gdk::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &css_provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }

    let toolbar_view = libadwaita::ToolbarView::new();
    let header = libadwaita::HeaderBar::new();

    let menu_button = gtk4::MenuButton::new();
    menu_button.set_icon_name("open-menu-symbolic");
    let menu = gtk4::gio::Menu::new();
    for (label, action) in MENU_ITEMS {
        menu.append(Some(label), Some(action));
    }
    menu_button.set_menu_model(Some(&menu));
    header.pack_end(&menu_button);
    toolbar_view.add_top_bar(&header);

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 12);
    content.set_margin_start(20);
    content.set_margin_end(20);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    let chat = ChatView::new();
    content.append(&chat.scrolled);

    // --- Input ---
    let input = gtk4::TextView::builder()
        .wrap_mode(gtk4::WrapMode::WordChar)
        .accepts_tab(false)
        .top_margin(8)
        .bottom_margin(8)
        .left_margin(8)
        .right_margin(8)
        .build();
    input.set_tooltip_text(Some("Type your message here... (Ctrl+Enter to send)"));
    let input_scroll = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .min_content_height(90)
        .max_content_height(200)
        .propagate_natural_height(true)
        .child(&input)
        .build();
    input_scroll.add_css_class("card");
    content.append(&input_scroll);

    // --- Buttons ---
    let button_row = gtk4::Box::new(gtk4::Orientation::Horizontal, 10);
    button_row.set_homogeneous(true);

    let send_button = gtk4::Button::builder().label("Send").build();
    send_button.add_css_class("suggested-action");
    let voice_button = gtk4::Button::builder()
        .label("\u{1F3A4} Voice")
        .sensitive(false)
        .build();
    let tts_button = gtk4::Button::builder().label(tts_label(false)).build();

    button_row.append(&send_button);
    button_row.append(&voice_button);
    button_row.append(&tts_button);
    content.append(&button_row);

    // --- Status line ---
    let status_label = gtk4::Label::new(Some(initial_status));
    status_label.add_css_class("dim-label");
    status_label.set_xalign(0.0);
    content.append(&status_label);

    toolbar_view.set_content(Some(&content));
    window.set_content(Some(&toolbar_view));

    ChatWindowWidgets {
        window,
        chat,
        input,
        send_button,
        voice_button,
        tts_button,
        status_label,
    }
}
