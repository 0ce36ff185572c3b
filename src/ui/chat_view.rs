use gtk4::prelude::*;

use crate::conversation::{Message, MessageKind};

/// Scrolling list of message blocks. Only touch from the GTK main thread.
pub struct ChatView {
    pub scrolled: gtk4::ScrolledWindow,
    list: gtk4::Box,
}

impl ChatView {
    pub fn new() -> Self {
        let list = gtk4::Box::new(gtk4::Orientation::Vertical, 10);
        list.set_valign(gtk4::Align::Start);
        list.set_margin_start(8);
        list.set_margin_end(8);
        list.set_margin_top(8);
        list.set_margin_bottom(8);

        let scrolled = gtk4::ScrolledWindow::builder()
            .hscrollbar_policy(gtk4::PolicyType::Never)
            .vscrollbar_policy(gtk4::PolicyType::Automatic)
            .vexpand(true)
            .min_content_width(400)
            .child(&list)
            .build();

        // New blocks grow the adjustment after layout; follow them to the bottom.
        let adjustment = scrolled.vadjustment();
        adjustment.connect_upper_notify(|adj| {
            adj.set_value(adj.upper() - adj.page_size());
        });

        Self { scrolled, list }
    }

    /// Add a block for `message` at the end of the list.
    pub fn append(&self, message: &Message) {
        let block = gtk4::Box::new(gtk4::Orientation::Vertical, 4);
        block.add_css_class("message");
        block.add_css_class(match message.kind() {
            MessageKind::User => "from-user",
            MessageKind::Assistant => "from-assistant",
            MessageKind::Error => "from-error",
        });

        let header = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
        let sender = gtk4::Label::new(Some(message.sender_label()));
        sender.add_css_class("message-sender");
        sender.set_xalign(0.0);
        let time = gtk4::Label::new(Some(&message.time_label()));
        time.add_css_class("dim-label");
        header.append(&sender);
        header.append(&time);

        let body = gtk4::Label::new(Some(message.text()));
        body.set_wrap(true);
        body.set_wrap_mode(gtk4::pango::WrapMode::WordChar);
        body.set_xalign(0.0);
        body.set_selectable(true);
        body.set_margin_start(10);
        body.add_css_class("message-text");

        block.append(&header);
        block.append(&body);
        self.list.append(&block);
    }
}

pub const STYLES: &str = r#"
.message {
    border-radius: 10px;
    padding: 10px;
}
.message.from-user {
    background-color: alpha(@accent_bg_color, 0.15);
}
.message.from-assistant {
    background-color: alpha(@view_fg_color, 0.06);
}
.message.from-error {
    background-color: alpha(@error_bg_color, 0.15);
}
.message-sender {
    font-weight: bold;
}
.from-user .message-sender {
    color: @accent_color;
}
.from-error .message-sender {
    color: @error_color;
}
"#;
