//! Labeled value row for displaying key-value pairs
//!
//! Builds a row with a label on the left and a value right-aligned on the
//! right. The value node is named `<key>.value` so scenes can update it.

use camoverlay_types::{Color, TextAlign, TextOverflow};

use crate::components::colors;
use crate::error::OverlayError;
use crate::frame::Frame;

/// Share of the row width given to the label
const LABEL_SHARE: f32 = 0.5;

/// A row displaying a label and right-aligned value
#[derive(Debug, Clone)]
pub struct LabeledValue {
    pub label: String,
    pub value: String,
    pub label_color: Color,
    pub value_color: Color,
}

impl LabeledValue {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            label_color: colors::label_dim(),
            value_color: colors::white(),
        }
    }

    pub fn with_label_color(mut self, color: Color) -> Self {
        self.label_color = color;
        self
    }

    pub fn with_value_color(mut self, color: Color) -> Self {
        self.value_color = color;
        self
    }

    /// Name of the value node for a row built under `key`
    pub fn value_key(key: &str) -> String {
        format!("{key}.value")
    }

    /// Build the row as a frame named `key` at (x, y) relative to its parent
    pub fn build(&self, key: &str, x: f32, y: f32, width: f32, height: f32) -> Frame {
        let label_width = width * LABEL_SHARE;

        let mut label = Frame::named(format!("{key}.label"), 0.0, 0.0, label_width, height);
        label.set_text(
            self.label.as_str(),
            TextAlign::Left,
            TextOverflow::Truncate,
            self.label_color,
        );

        let mut value = Frame::named(
            Self::value_key(key),
            label_width,
            0.0,
            width - label_width,
            height,
        );
        value.set_text(
            self.value.as_str(),
            TextAlign::Right,
            TextOverflow::ScaleToFit,
            self.value_color,
        );

        let mut row = Frame::named(key, x, y, width, height);
        row.insert([label, value]);
        row
    }

    /// Replace the value text of a row previously built under `key`
    pub fn set_value(
        root: &mut Frame,
        key: &str,
        value: impl Into<String>,
        color: Color,
    ) -> Result<(), OverlayError> {
        root.require_mut(&Self::value_key(key))?.set_text(
            value,
            TextAlign::Right,
            TextOverflow::ScaleToFit,
            color,
        );
        Ok(())
    }
}
