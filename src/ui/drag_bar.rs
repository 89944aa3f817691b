use std::path::{Path, PathBuf};

use iced::{
    mouse,
    widget::{container, mouse_area, text},
    Element, Length, Point,
};

use crate::domain::PublishedFile;

/// Distance the pointer must travel with the button held before a drag starts.
pub const DRAG_THRESHOLD: f32 = 5.0;

/// Request to hand a file to the OS drag-and-drop subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalDrag {
    pub path: PathBuf,
    /// Always true: the host receives a copy, the download stays in place.
    pub copy: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum DragBarMessage {
    Moved(Point),
    Pressed,
    Released,
    Exited,
}

/// Holds the most recently published file and turns pointer gestures into
/// external drags.
#[derive(Debug, Default)]
pub struct DragSource {
    published: PublishedFile,
    cursor: Option<Point>,
    press_origin: Option<Point>,
    dragging: bool,
}

impl DragSource {
    pub fn set_file(&mut self, name: &str, path: &Path) {
        self.published = PublishedFile {
            display_name: name.to_string(),
            file_path: path.to_path_buf(),
            ready: true,
        };
    }

    pub fn clear_file(&mut self) {
        self.published = PublishedFile::default();
        self.dragging = false;
    }

    pub fn is_ready(&self) -> bool {
        self.published.ready
    }

    pub fn published(&self) -> &PublishedFile {
        &self.published
    }

    pub fn update(&mut self, message: DragBarMessage) -> Option<ExternalDrag> {
        match message {
            DragBarMessage::Pressed => {
                self.press_origin = self.cursor;
                self.dragging = false;
                None
            }
            DragBarMessage::Moved(position) => {
                self.cursor = Some(position);
                self.drag_moved(position)
            }
            DragBarMessage::Released | DragBarMessage::Exited => {
                self.press_origin = None;
                self.dragging = false;
                None
            }
        }
    }

    fn drag_moved(&mut self, position: Point) -> Option<ExternalDrag> {
        let origin = self.press_origin?;
        if self.dragging || !self.is_ready() {
            return None;
        }
        if origin.distance(position) <= DRAG_THRESHOLD {
            return None;
        }
        if !self.published.file_path.is_file() {
            log::warn!(
                "Published file vanished: {}",
                self.published.file_path.display()
            );
            return None;
        }

        self.dragging = true;
        Some(ExternalDrag {
            path: self.published.file_path.clone(),
            copy: true,
        })
    }

    pub fn view(&self) -> Element<'_, DragBarMessage> {
        let label = if self.is_ready() {
            text(format!(
                "\u{2195}  Drag to your DAW: {}",
                self.published.display_name
            ))
            .size(13)
        } else {
            text("Generate something to drag into your project").size(12)
        };

        let interaction = if self.is_ready() {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::Idle
        };

        mouse_area(
            container(label)
                .padding([10, 14])
                .width(Length::Fill)
                .height(Length::Fixed(40.0))
                .style(container::rounded_box),
        )
        .on_press(DragBarMessage::Pressed)
        .on_release(DragBarMessage::Released)
        .on_exit(DragBarMessage::Exited)
        .on_move(DragBarMessage::Moved)
        .interaction(interaction)
        .into()
    }
}
