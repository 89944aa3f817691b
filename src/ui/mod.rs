pub mod drag_bar;

use iced::{
    widget::{button, column, row, text, text_input, Space},
    Element, Length,
};

/// Stand-in for the embedded page: bridge payloads typed here go through
/// the same navigation hook the browser would call.
pub struct BridgeConsole {
    pub payload: String,
    pub status_message: String,
    pub downloads_dir: String,
    pub page_url: String,
}

impl Default for BridgeConsole {
    fn default() -> Self {
        Self {
            payload: String::new(),
            status_message: "Waiting for the page".to_string(),
            downloads_dir: String::new(),
            page_url: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ConsoleMessage {
    PayloadChanged(String),
    SendPressed,
    ChooseFolderPressed,
}

impl BridgeConsole {
    pub fn update(&mut self, message: ConsoleMessage) {
        match message {
            ConsoleMessage::PayloadChanged(payload) => {
                self.payload = payload;
            }
            ConsoleMessage::SendPressed | ConsoleMessage::ChooseFolderPressed => {
                // Will be handled by the app
            }
        }
    }

    pub fn view(&self) -> Element<'_, ConsoleMessage> {
        column![
            text("444 Radio").size(32),
            text(&self.page_url).size(12),
            Space::new().height(Length::Fixed(20.0)),
            text("Bridge message:").size(16),
            text_input("juce-bridge://... or {\"action\": ...}", &self.payload)
                .on_input(ConsoleMessage::PayloadChanged)
                .on_submit(ConsoleMessage::SendPressed)
                .padding(10),
            button("Send")
                .on_press(ConsoleMessage::SendPressed)
                .padding([10, 20]),
            Space::new().height(Length::Fixed(10.0)),
            text(&self.status_message).size(14),
            Space::new().height(Length::Fill),
            row![
                text(&self.downloads_dir).size(12).width(Length::Fill),
                button("Change folder").on_press(ConsoleMessage::ChooseFolderPressed),
            ]
            .spacing(10),
        ]
        .padding(20)
        .spacing(10)
        .height(Length::Fill)
        .into()
    }
}
