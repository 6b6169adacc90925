//! Scene-graph node
//!
//! A `Frame` is a positioned rectangle that may carry a background (solid
//! color or image), a border, text and child frames. Rendering flattens the
//! tree depth-first into a list of [`CairoOp`]s:
//!
//! ```text
//!   identity ─► background ─► border ─► text ─► children (insertion order)
//! ```
//!
//! Children are positioned relative to their parent. Later children paint over
//! earlier ones and over the parent's own background and text.

use std::f64::consts::PI;

use camoverlay_types::{Color, FitMode, TextAlign, TextOverflow};

use crate::client::{CairoOp, ContextHandle, DrawingClient, FontHandle, ImageDescriptor, Rgba};
use crate::error::{ClientError, OverlayError};

/// Corner radius of filled and stroked frame outlines at scale 1
pub const CORNER_RADIUS: f64 = 30.0;

/// Accumulated position of a parent in surface coordinates (unscaled)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub const ORIGIN: Offset = Offset { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

/// Background state of a frame. Only one can be active at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Background {
    #[default]
    None,
    Solid(Color),
    Image {
        image: ImageDescriptor,
        fit: FitMode,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub color: Color,
    pub width: f32,
}

/// Text content and its presentation
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub content: String,
    pub align: TextAlign,
    pub overflow: TextOverflow,
    pub color: Color,
}

/// A positioned node in the overlay scene graph
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    key: Option<String>,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    background: Background,
    text: Option<Text>,
    font: Option<FontHandle>,
    border: Option<Border>,
    rotation: f32,
    padding: Padding,
    visible: bool,
    children: Vec<Frame>,
}

impl Frame {
    /// Create a frame at (x, y) relative to its parent. Negative sizes are
    /// clamped to zero.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            key: None,
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
            background: Background::None,
            text: None,
            font: None,
            border: None,
            rotation: 0.0,
            padding: Padding::default(),
            visible: true,
            children: Vec::new(),
        }
    }

    /// Create a frame that can be looked up later with [`Frame::find_mut`]
    pub fn named(key: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        let mut frame = Self::new(x, y, width, height);
        frame.key = Some(key.into());
        frame
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Geometry
    // ─────────────────────────────────────────────────────────────────────────

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Content
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the text and its presentation. Geometry is unchanged.
    pub fn set_text(
        &mut self,
        text: impl Into<String>,
        align: TextAlign,
        overflow: TextOverflow,
        color: Color,
    ) {
        self.text = Some(Text {
            content: text.into(),
            align,
            overflow,
            color,
        });
    }

    pub fn clear_text(&mut self) {
        self.text = None;
    }

    pub fn text(&self) -> Option<&Text> {
        self.text.as_ref()
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = Background::Solid(color);
    }

    /// Set an image background. With [`FitMode::Stretch`] the frame takes the
    /// image's natural size.
    pub fn set_background_image(&mut self, image: ImageDescriptor, fit: FitMode) {
        if fit == FitMode::Stretch {
            self.width = image.width() as f32;
            self.height = image.height() as f32;
        }
        self.background = Background::Image { image, fit };
    }

    pub fn clear_background(&mut self) {
        self.background = Background::None;
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn set_border(&mut self, color: Color, width: f32) {
        self.border = Some(Border {
            color,
            width: width.max(0.0),
        });
    }

    pub fn clear_border(&mut self) {
        self.border = None;
    }

    pub fn set_padding(&mut self, top: f32, right: f32, bottom: f32, left: f32) {
        self.padding = Padding {
            top,
            right,
            bottom,
            left,
        };
    }

    pub fn set_font(&mut self, font: FontHandle) {
        self.font = Some(font);
    }

    /// Use `font` for this frame and every frame below it
    pub fn set_font_all(&mut self, font: FontHandle) {
        self.font = Some(font);
        for child in &mut self.children {
            child.set_font_all(font);
        }
    }

    /// Rotation in radians, applied to the background image around the
    /// frame's center
    pub fn rotate(&mut self, radians: f32) {
        self.rotation = radians;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Children
    // ─────────────────────────────────────────────────────────────────────────

    /// Append children. Insertion order is paint order.
    pub fn insert(&mut self, children: impl IntoIterator<Item = Frame>) {
        self.children.extend(children);
    }

    pub fn push(&mut self, child: Frame) {
        self.children.push(child);
    }

    pub fn remove_children(&mut self) {
        self.children.clear();
    }

    pub fn children(&self) -> &[Frame] {
        &self.children
    }

    /// Depth-first search for a frame by key, including `self`
    pub fn find_mut(&mut self, key: &str) -> Option<&mut Frame> {
        if self.key.as_deref() == Some(key) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(key))
    }

    pub fn find(&self, key: &str) -> Option<&Frame> {
        if self.key.as_deref() == Some(key) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(key))
    }

    /// Like [`Frame::find_mut`], but a missing key is an error
    pub fn require_mut(&mut self, key: &str) -> Result<&mut Frame, OverlayError> {
        self.find_mut(key).ok_or_else(|| OverlayError::MissingFrame {
            key: key.to_string(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────────

    /// Draw this frame and its subtree into `context`.
    ///
    /// `parent` is the accumulated position of the parent; every coordinate is
    /// multiplied by `scale` before it reaches the backend.
    pub async fn render<C: DrawingClient>(
        &self,
        client: &mut C,
        context: ContextHandle,
        parent: Offset,
        scale: f64,
    ) -> Result<(), ClientError> {
        let mut ops = Vec::new();
        self.emit(parent, scale, &mut ops);
        client.draw(context, &ops).await
    }

    /// Flatten this frame and its subtree into drawing verbs
    pub fn emit(&self, parent: Offset, scale: f64, ops: &mut Vec<CairoOp>) {
        if !self.visible {
            return;
        }

        let origin = Offset::new(parent.x + self.x as f64, parent.y + self.y as f64);
        let x = origin.x * scale;
        let y = origin.y * scale;
        let w = self.width as f64 * scale;
        let h = self.height as f64 * scale;

        // Every node starts from a clean transform
        ops.push(CairoOp::IdentityMatrix);

        match &self.background {
            Background::None => {}
            Background::Solid(color) => {
                rounded_rect_path(ops, x, y, w, h, CORNER_RADIUS * scale);
                ops.push(CairoOp::SetSourceRgba(Rgba::from_bytes(*color)));
                ops.push(CairoOp::Fill);
            }
            Background::Image { image, fit } => {
                if self.rotation != 0.0 {
                    let cx = x + w / 2.0;
                    let cy = y + h / 2.0;
                    ops.push(CairoOp::Translate { x: cx, y: cy });
                    ops.push(CairoOp::Rotate {
                        radians: self.rotation as f64,
                    });
                    ops.push(CairoOp::Translate { x: -cx, y: -cy });
                }
                ops.push(CairoOp::Translate { x, y });
                let (sx, sy) = match fit {
                    FitMode::Fit => (
                        scale * self.width as f64 / image.width() as f64,
                        scale * self.height as f64 / image.height() as f64,
                    ),
                    FitMode::Stretch | FitMode::Plain => (scale, scale),
                };
                ops.push(CairoOp::Scale { sx, sy });
                ops.push(CairoOp::SetSourceImage {
                    image: image.handle(),
                    x: 0.0,
                    y: 0.0,
                });
                ops.push(CairoOp::Paint);
                ops.push(CairoOp::IdentityMatrix);
            }
        }

        let border_width = self.border.map_or(0.0, |b| b.width as f64);

        if let Some(border) = &self.border {
            rounded_rect_path(ops, x, y, w, h, CORNER_RADIUS * scale);
            ops.push(CairoOp::SetSourceRgba(Rgba::from_bytes(border.color)));
            ops.push(CairoOp::SetLineWidth(border_width * scale));
            ops.push(CairoOp::Stroke);
        }

        if let Some(text) = self.text.as_ref().filter(|t| !t.content.is_empty()) {
            if let Some(font) = self.font {
                ops.push(CairoOp::SetFontFace(font));
            }
            ops.push(CairoOp::SetSourceRgba(Rgba::from_bytes(text.color)));
            let pad = &self.padding;
            let inner_w = self.width as f64 - (pad.left + pad.right) as f64 - 2.0 * border_width;
            let inner_h = self.height as f64 - (pad.top + pad.bottom) as f64 - 2.0 * border_width;
            ops.push(CairoOp::WriteText {
                text: text.content.clone(),
                x: (origin.x + pad.left as f64 + border_width) * scale,
                y: (origin.y + pad.top as f64 + border_width) * scale,
                width: inner_w.max(0.0) * scale,
                height: inner_h.max(0.0) * scale,
                align: text.align,
                overflow: text.overflow,
            });
        }

        for child in &self.children {
            child.emit(origin, scale, ops);
        }
    }
}

/// Append a closed rounded-rectangle path. The radius is clamped so opposite
/// corners never overlap.
fn rounded_rect_path(ops: &mut Vec<CairoOp>, x: f64, y: f64, w: f64, h: f64, r: f64) {
    let r = r.min(w / 2.0).min(h / 2.0).max(0.0);

    ops.push(CairoOp::NewPath);
    for (xc, yc, start) in [
        (x + w - r, y + r, -PI / 2.0),
        (x + w - r, y + h - r, 0.0),
        (x + r, y + h - r, PI / 2.0),
        (x + r, y + r, PI),
    ] {
        ops.push(CairoOp::Arc {
            xc,
            yc,
            radius: r,
            angle1: start,
            angle2: start + PI / 2.0,
        });
    }
    ops.push(CairoOp::ClosePath);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ImageHandle;
    use camoverlay_types::overlay_colors;

    fn emit(frame: &Frame, scale: f64) -> Vec<CairoOp> {
        let mut ops = Vec::new();
        frame.emit(Offset::ORIGIN, scale, &mut ops);
        ops
    }

    fn texts(ops: &[CairoOp]) -> Vec<(String, f64, f64)> {
        ops.iter()
            .filter_map(|op| match op {
                CairoOp::WriteText { text, x, y, .. } => Some((text.clone(), *x, *y)),
                _ => None,
            })
            .collect()
    }

    fn labeled(key: &str, x: f32, y: f32) -> Frame {
        let mut frame = Frame::named(key, x, y, 50.0, 20.0);
        frame.set_text(key, TextAlign::Left, TextOverflow::Overflow, overlay_colors::WHITE);
        frame
    }

    #[test]
    fn children_paint_in_insertion_order_after_parent() {
        let mut root = Frame::new(0.0, 0.0, 200.0, 200.0);
        root.set_text("root", TextAlign::Left, TextOverflow::Overflow, overlay_colors::WHITE);
        let mut first = labeled("first", 0.0, 0.0);
        first.push(labeled("nested", 5.0, 5.0));
        root.insert([first, labeled("second", 0.0, 50.0)]);

        let names: Vec<_> = texts(&emit(&root, 1.0)).into_iter().map(|t| t.0).collect();
        assert_eq!(names, ["root", "first", "nested", "second"]);
    }

    #[test]
    fn child_offsets_accumulate() {
        let mut root = Frame::new(10.0, 10.0, 500.0, 760.0);
        let mut panel = Frame::new(20.0, 30.0, 200.0, 200.0);
        panel.push(labeled("value", 5.0, 6.0));
        root.push(panel);

        let found = texts(&emit(&root, 1.0));
        assert_eq!(found, [("value".to_string(), 35.0, 46.0)]);

        let scaled = texts(&emit(&root, 2.0));
        assert_eq!(scaled, [("value".to_string(), 70.0, 92.0)]);
    }

    #[test]
    fn fit_scales_each_axis_independently() {
        let image = ImageDescriptor::new(ImageHandle(7), 200, 100).unwrap();
        let mut frame = Frame::new(0.0, 0.0, 100.0, 100.0);
        frame.set_background_image(image, FitMode::Fit);

        let ops = emit(&frame, 1.0);
        assert!(ops.contains(&CairoOp::Scale { sx: 0.5, sy: 1.0 }));
        assert!(ops.contains(&CairoOp::SetSourceImage {
            image: ImageHandle(7),
            x: 0.0,
            y: 0.0
        }));
    }

    #[test]
    fn stretch_takes_natural_size() {
        let image = ImageDescriptor::new(ImageHandle(1), 320, 240).unwrap();
        let mut frame = Frame::new(0.0, 0.0, 10.0, 10.0);
        frame.set_background_image(image, FitMode::Stretch);

        assert_eq!((frame.width(), frame.height()), (320.0, 240.0));
        assert!(emit(&frame, 1.5).contains(&CairoOp::Scale { sx: 1.5, sy: 1.5 }));
    }

    #[test]
    fn zero_sized_images_cannot_be_described() {
        assert!(ImageDescriptor::new(ImageHandle(1), 0, 10).is_none());
        assert!(ImageDescriptor::new(ImageHandle(1), 10, 0).is_none());
    }

    #[test]
    fn background_states_are_exclusive() {
        let image = ImageDescriptor::new(ImageHandle(1), 10, 10).unwrap();
        let mut frame = Frame::new(0.0, 0.0, 10.0, 10.0);
        frame.set_background_image(image, FitMode::Plain);
        frame.set_background(overlay_colors::PANEL);
        assert_eq!(frame.background(), &Background::Solid(overlay_colors::PANEL));

        let ops = emit(&frame, 1.0);
        assert!(!ops.iter().any(|op| matches!(op, CairoOp::SetSourceImage { .. })));
        assert_eq!(ops.iter().filter(|op| **op == CairoOp::Fill).count(), 1);
    }

    #[test]
    fn rotation_pivots_around_center() {
        let image = ImageDescriptor::new(ImageHandle(1), 100, 50).unwrap();
        let mut frame = Frame::new(10.0, 20.0, 100.0, 50.0);
        frame.set_background_image(image, FitMode::Plain);
        frame.rotate(0.5);

        let ops = emit(&frame, 1.0);
        assert_eq!(
            &ops[1..4],
            &[
                CairoOp::Translate { x: 60.0, y: 45.0 },
                CairoOp::Rotate { radians: 0.5 },
                CairoOp::Translate { x: -60.0, y: -45.0 },
            ]
        );
    }

    #[test]
    fn text_box_excludes_padding_and_border() {
        let mut frame = Frame::new(0.0, 0.0, 100.0, 40.0);
        frame.set_padding(4.0, 6.0, 4.0, 10.0);
        frame.set_border(overlay_colors::WHITE, 2.0);
        frame.set_text("x", TextAlign::Right, TextOverflow::Truncate, overlay_colors::WHITE);

        let ops = emit(&frame, 1.0);
        let write = ops
            .iter()
            .find(|op| matches!(op, CairoOp::WriteText { .. }))
            .unwrap();
        assert_eq!(
            write,
            &CairoOp::WriteText {
                text: "x".into(),
                x: 12.0,
                y: 6.0,
                width: 80.0,
                height: 28.0,
                align: TextAlign::Right,
                overflow: TextOverflow::Truncate,
            }
        );
        // Border strokes before the text is written
        let stroke = ops.iter().position(|op| *op == CairoOp::Stroke).unwrap();
        let text = ops
            .iter()
            .position(|op| matches!(op, CairoOp::WriteText { .. }))
            .unwrap();
        assert!(stroke < text);
    }

    #[test]
    fn empty_text_is_skipped() {
        let mut frame = Frame::new(0.0, 0.0, 10.0, 10.0);
        frame.set_text("", TextAlign::Left, TextOverflow::Overflow, overlay_colors::WHITE);
        assert_eq!(emit(&frame, 1.0), [CairoOp::IdentityMatrix]);
    }

    #[test]
    fn hidden_frames_skip_their_subtree() {
        let mut root = Frame::new(0.0, 0.0, 100.0, 100.0);
        let mut hidden = labeled("hidden", 0.0, 0.0);
        hidden.push(labeled("inner", 0.0, 0.0));
        hidden.set_visible(false);
        root.insert([hidden, labeled("shown", 0.0, 0.0)]);

        let names: Vec<_> = texts(&emit(&root, 1.0)).into_iter().map(|t| t.0).collect();
        assert_eq!(names, ["shown"]);
    }

    #[test]
    fn rounded_rect_radius_is_clamped() {
        let mut frame = Frame::new(0.0, 0.0, 20.0, 100.0);
        frame.set_background(overlay_colors::PANEL);
        let ops = emit(&frame, 1.0);
        let radii: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                CairoOp::Arc { radius, .. } => Some(*radius),
                _ => None,
            })
            .collect();
        assert_eq!(radii, [10.0; 4]);
    }

    #[test]
    fn find_by_key() {
        let mut root = Frame::named("root", 0.0, 0.0, 10.0, 10.0);
        let mut group = Frame::new(0.0, 0.0, 10.0, 10.0);
        group.push(labeled("deep", 1.0, 1.0));
        root.push(group);

        assert!(root.find("root").is_some());
        root.require_mut("deep").unwrap().set_position(3.0, 4.0);
        assert_eq!(root.find("deep").map(|f| (f.x(), f.y())), Some((3.0, 4.0)));
        assert!(matches!(
            root.require_mut("missing"),
            Err(OverlayError::MissingFrame { .. })
        ));
    }

    #[test]
    fn font_applies_to_the_whole_subtree() {
        let mut root = Frame::new(0.0, 0.0, 100.0, 100.0);
        root.push(labeled("child", 0.0, 0.0));
        root.set_font_all(FontHandle(7));

        let ops = emit(&root, 1.0);
        assert!(ops.contains(&CairoOp::SetFontFace(FontHandle(7))));
    }
}
