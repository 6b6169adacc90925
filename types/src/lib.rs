//! Shared configuration types for camoverlay
//!
//! This crate contains the serializable settings and presentation enums that
//! are shared between the compositor library (camoverlay-overlay) and the
//! application binary. It performs no I/O.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Color Type
// ─────────────────────────────────────────────────────────────────────────────

/// RGBA color as [r, g, b, a] bytes
pub type Color = [u8; 4];

// ─────────────────────────────────────────────────────────────────────────────
// Enum Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// An enumeration name that is not part of the accepted set.
///
/// Unknown names are never mapped to a fallback value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `FromStr`, `Display` and `name()` for a fieldless enum from a
/// single table of (variant, snake_case name) pairs.
macro_rules! named_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// All variants in declaration order
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// The configuration name of this variant
            pub fn name(&self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Presentation Enums
// ─────────────────────────────────────────────────────────────────────────────

/// Anchor used to place a rendered overlay box within the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

named_enum!(Alignment, "alignment", {
    TopLeft => "top_left",
    TopCenter => "top_center",
    TopRight => "top_right",
    CenterLeft => "center_left",
    Center => "center",
    CenterRight => "center_right",
    BottomLeft => "bottom_left",
    BottomCenter => "bottom_center",
    BottomRight => "bottom_right",
});

impl Alignment {
    /// Returns true for the four corner anchors
    pub fn is_corner(&self) -> bool {
        matches!(
            self,
            Alignment::TopLeft | Alignment::TopRight | Alignment::BottomLeft | Alignment::BottomRight
        )
    }
}

/// Horizontal alignment of text inside its frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

named_enum!(TextAlign, "text alignment", {
    Left => "left",
    Center => "center",
    Right => "right",
});

/// What the text layout does when text is wider than its box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOverflow {
    /// Draw past the box edge
    Overflow,
    /// Shrink the font until the text fits
    #[default]
    ScaleToFit,
    /// Cut the text and append an ellipsis
    Truncate,
}

named_enum!(TextOverflow, "text overflow policy", {
    Overflow => "overflow",
    ScaleToFit => "scale_to_fit",
    Truncate => "truncate",
});

/// How a background image is sized into its frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Scale each axis so the image covers the frame box
    #[default]
    Fit,
    /// The frame takes the natural size of the image
    Stretch,
    /// Copy source pixels 1:1 (only the render scale applies)
    Plain,
}

named_enum!(FitMode, "fit mode", {
    Fit => "fit",
    Stretch => "stretch",
    Plain => "plain",
});

/// Coordinate convention used when compositing onto the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSystem {
    /// Pixel offsets from the stream's top-left corner
    #[default]
    Absolute,
    /// Each axis spans [-1, 1]: -1 flush left/top, 1 flush right/bottom
    Normalized,
}

named_enum!(CoordinateSystem, "coordinate system", {
    Absolute => "absolute",
    Normalized => "normalized",
});

/// Kind of a registered resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Image,
    Font,
}

named_enum!(ResourceKind, "resource kind", {
    Image => "image",
    Font => "font",
});

/// Which application scene the binary drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    #[default]
    FlowMeter,
    Scale,
    AirQuality,
}

named_enum!(SceneKind, "scene", {
    FlowMeter => "flow_meter",
    Scale => "scale",
    AirQuality => "air_quality",
});

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Connection parameters for the camera's drawing service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    #[serde(default = "default_ip")]
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
    #[serde(default)]
    pub tls: bool,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            port: default_port(),
            user: String::new(),
            pass: String::new(),
            tls: false,
        }
    }
}

/// Geometry and placement of the overlay box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySettings {
    #[serde(default)]
    pub pos_x: f32,
    #[serde(default)]
    pub pos_y: f32,
    #[serde(default = "default_width")]
    pub width: f32,
    #[serde(default = "default_height")]
    pub height: f32,
    #[serde(default)]
    pub alignment: Alignment,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_stream_width")]
    pub stream_width: u32,
    #[serde(default = "default_stream_height")]
    pub stream_height: u32,
    #[serde(default)]
    pub coordinates: CoordinateSystem,
    /// Refresh interval for polled sources, in milliseconds
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
    #[serde(default = "default_font_color")]
    pub font_color: Color,
    #[serde(default = "default_background_color")]
    pub background_color: Color,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            pos_x: 0.0,
            pos_y: 0.0,
            width: default_width(),
            height: default_height(),
            alignment: Alignment::default(),
            scale: default_scale(),
            stream_width: default_stream_width(),
            stream_height: default_stream_height(),
            coordinates: CoordinateSystem::default(),
            refresh_ms: default_refresh_ms(),
            font_color: default_font_color(),
            background_color: default_background_color(),
        }
    }
}

/// A file registered under a logical moniker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    pub moniker: String,
    pub path: String,
    pub kind: ResourceKind,
}

/// Complete settings for one overlay process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub scene: SceneKind,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub overlay: OverlaySettings,
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
    /// Delay before a reconnect attempt, in milliseconds
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Remove the stale overlay before the first draw after a reconnect
    #[serde(default = "default_true")]
    pub clear_on_reconnect: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            scene: SceneKind::default(),
            camera: CameraSettings::default(),
            overlay: OverlaySettings::default(),
            resources: Vec::new(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            clear_on_reconnect: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    80
}

fn default_width() -> f32 {
    500.0
}

fn default_height() -> f32 {
    760.0
}

fn default_scale() -> f32 {
    1.0
}

fn default_stream_width() -> u32 {
    1920
}

fn default_stream_height() -> u32 {
    1080
}

fn default_refresh_ms() -> u64 {
    1000
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_font_color() -> Color {
    overlay_colors::WHITE
}

fn default_background_color() -> Color {
    overlay_colors::PANEL
}

// ─────────────────────────────────────────────────────────────────────────────
// Default Color Constants
// ─────────────────────────────────────────────────────────────────────────────

pub mod overlay_colors {
    use super::Color;

    pub const WHITE: Color = [255, 255, 255, 255];
    pub const BLACK: Color = [0, 0, 0, 255];
    pub const PANEL: Color = [30, 30, 30, 180];
    pub const GOOD: Color = [50, 180, 50, 255]; // Green
    pub const MODERATE: Color = [220, 190, 40, 255]; // Yellow
    pub const POOR: Color = [230, 120, 30, 255]; // Orange
    pub const BAD: Color = [180, 50, 50, 255]; // Red
}
