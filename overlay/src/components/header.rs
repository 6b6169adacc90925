//! Header component for section titles with separator lines

use camoverlay_types::{Color, TextAlign, TextOverflow};

use crate::components::colors;
use crate::frame::Frame;

/// Thickness of the separator line
const SEPARATOR_HEIGHT: f32 = 2.0;

/// A section header with title and optional separator
#[derive(Debug, Clone)]
pub struct Header {
    pub title: String,
    pub color: Color,
    pub align: TextAlign,
    pub show_separator: bool,
}

impl Header {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: colors::white(),
            align: TextAlign::Left,
            show_separator: true,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    pub fn with_separator(mut self, show: bool) -> Self {
        self.show_separator = show;
        self
    }

    /// Build the header as a frame named `key`.
    ///
    /// The title occupies `title_height`; the separator (if any) sits
    /// `spacing` below it. Use [`Header::height`] to place the next row.
    pub fn build(
        &self,
        key: &str,
        x: f32,
        y: f32,
        width: f32,
        title_height: f32,
        spacing: f32,
    ) -> Frame {
        let mut title = Frame::named(format!("{key}.title"), 0.0, 0.0, width, title_height);
        title.set_text(
            self.title.as_str(),
            self.align,
            TextOverflow::Truncate,
            self.color,
        );

        let mut header = Frame::named(key, x, y, width, self.height(title_height, spacing));
        header.push(title);

        if self.show_separator {
            let mut separator = Frame::named(
                format!("{key}.separator"),
                0.0,
                title_height + spacing,
                width,
                SEPARATOR_HEIGHT,
            );
            separator.set_background(colors::separator());
            header.push(separator);
        }
        header
    }

    /// Calculate the total height this header will use
    pub fn height(&self, title_height: f32, spacing: f32) -> f32 {
        if self.show_separator {
            title_height + spacing + SEPARATOR_HEIGHT + spacing
        } else {
            title_height + spacing
        }
    }
}
