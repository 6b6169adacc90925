//! Root frame that owns a drawing surface
//!
//! A `Painter` is a [`Frame`] that knows the size of the video stream it is
//! composited onto and where on that stream it belongs. Each render:
//!
//! 1. allocates a surface of `width x height x scale` pixels and a context,
//! 2. draws the whole tree with the painter as coordinate origin,
//! 3. composites the surface at the position given by the alignment anchor,
//! 4. releases the context and surface, on success and on failure alike.
//!
//! # Placement
//!
//! Pixel placement for the corner anchors, with `box` the surface size:
//!
//! ```text
//!   top_left      x = pos_x                       y = pos_y
//!   top_right     x = stream_w - box_w - pos_x    y = pos_y
//!   bottom_left   x = pos_x                       y = stream_h - box_h - pos_y
//!   bottom_right  x = stream_w - box_w - pos_x    y = stream_h - box_h - pos_y
//! ```
//!
//! Centered axes use `(stream - box) / 2 + pos` (the offset nudges the box).
//! With [`CoordinateSystem::Normalized`] the same placement is mapped to
//! `2 * x / (stream - box) - 1` per axis before compositing.
//!
//! # Offset inside the surface
//!
//! The painter is also an ordinary [`Frame`], so its own `(x, y)` is applied
//! a second time when the tree is drawn. A painter at `(20, 20)` paints its
//! background from `(20, 20)` to `(120, 120)` on a 100x100 surface, and the
//! right and bottom 20 pixels are cut off. Trees that should fill the surface
//! put their content in a full-size child at `(-x, -y)`.

use std::ops::{Deref, DerefMut};

use camoverlay_types::{Alignment, CoordinateSystem, OverlaySettings};

use crate::client::{ContextHandle, DrawingClient, SurfaceHandle};
use crate::error::OverlayError;
use crate::frame::{Frame, Offset};

/// Top-left corner of the rendered box on the stream, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
}

impl Placement {
    /// Map this placement to [-1, 1] per axis. An axis the box fills
    /// completely maps to 0.
    pub fn normalized(&self, box_size: (u32, u32), stream_size: (u32, u32)) -> (f64, f64) {
        (
            normalize(self.x, box_size.0, stream_size.0),
            normalize(self.y, box_size.1, stream_size.1),
        )
    }
}

fn normalize(pos: f64, box_len: u32, stream_len: u32) -> f64 {
    let free = stream_len as f64 - box_len as f64;
    if free <= 0.0 {
        0.0
    } else {
        2.0 * pos / free - 1.0
    }
}

/// Compute where a `box_w x box_h` box lands on the stream for `alignment`
pub fn place(
    alignment: Alignment,
    pos_x: f64,
    pos_y: f64,
    box_w: f64,
    box_h: f64,
    stream_w: f64,
    stream_h: f64,
) -> Placement {
    let left = pos_x;
    let right = stream_w - box_w - pos_x;
    let h_center = (stream_w - box_w) / 2.0 + pos_x;
    let top = pos_y;
    let bottom = stream_h - box_h - pos_y;
    let v_center = (stream_h - box_h) / 2.0 + pos_y;

    let (x, y) = match alignment {
        Alignment::TopLeft => (left, top),
        Alignment::TopCenter => (h_center, top),
        Alignment::TopRight => (right, top),
        Alignment::CenterLeft => (left, v_center),
        Alignment::Center => (h_center, v_center),
        Alignment::CenterRight => (right, v_center),
        Alignment::BottomLeft => (left, bottom),
        Alignment::BottomCenter => (h_center, bottom),
        Alignment::BottomRight => (right, bottom),
    };
    Placement { x, y }
}

/// A root frame mapped onto a target video stream
#[derive(Debug, Clone, PartialEq)]
pub struct Painter {
    frame: Frame,
    stream_width: u32,
    stream_height: u32,
    alignment: Alignment,
    coordinates: CoordinateSystem,
}

impl Painter {
    /// Create a painter. `(x, y)` is the offset from the anchor edge(s).
    pub fn new(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        stream_width: u32,
        stream_height: u32,
        alignment: Alignment,
    ) -> Self {
        Self {
            frame: Frame::new(x, y, width, height),
            stream_width,
            stream_height,
            alignment,
            coordinates: CoordinateSystem::Absolute,
        }
    }

    pub fn from_settings(settings: &OverlaySettings) -> Self {
        let mut painter = Self::new(
            settings.pos_x,
            settings.pos_y,
            settings.width,
            settings.height,
            settings.stream_width,
            settings.stream_height,
            settings.alignment,
        );
        painter.coordinates = settings.coordinates;
        painter
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = alignment;
    }

    pub fn set_coordinates(&mut self, coordinates: CoordinateSystem) {
        self.coordinates = coordinates;
    }

    pub fn stream_size(&self) -> (u32, u32) {
        (self.stream_width, self.stream_height)
    }

    pub fn set_stream_size(&mut self, width: u32, height: u32) {
        self.stream_width = width;
        self.stream_height = height;
    }

    /// Pixel size of the surface for `scale`, floored to whole pixels
    pub fn surface_size(&self, scale: f64) -> (u32, u32) {
        (
            (self.frame.width() as f64 * scale).floor().max(0.0) as u32,
            (self.frame.height() as f64 * scale).floor().max(0.0) as u32,
        )
    }

    /// Where the rendered surface lands on the stream
    pub fn placement(&self, scale: f64) -> Placement {
        let (box_w, box_h) = self.surface_size(scale);
        place(
            self.alignment,
            self.frame.x() as f64,
            self.frame.y() as f64,
            box_w as f64,
            box_h as f64,
            self.stream_width as f64,
            self.stream_height as f64,
        )
    }

    /// Render the tree and composite it onto the stream.
    ///
    /// The surface and context are released on every exit path. Release
    /// failures are logged; the render result is what gets returned.
    pub async fn render<C: DrawingClient>(
        &self,
        client: &mut C,
        scale: f64,
    ) -> Result<(), OverlayError> {
        let (width, height) = self.surface_size(scale);
        if width == 0 || height == 0 {
            return Err(OverlayError::EmptySurface { width, height });
        }

        let surface = client.create_surface(width, height).await?;
        let context = match client.create_context(surface).await {
            Ok(context) => context,
            Err(err) => {
                release_surface(client, surface).await;
                return Err(err.into());
            }
        };

        let result = self.draw_and_show(client, surface, context, scale).await;

        if let Err(err) = client.destroy_context(context).await {
            tracing::warn!(error = %err, context = context.0, "Failed to destroy drawing context");
        }
        release_surface(client, surface).await;

        result
    }

    async fn draw_and_show<C: DrawingClient>(
        &self,
        client: &mut C,
        surface: SurfaceHandle,
        context: ContextHandle,
        scale: f64,
    ) -> Result<(), OverlayError> {
        self.frame
            .render(client, context, Offset::ORIGIN, scale)
            .await?;

        let placement = self.placement(scale);
        match self.coordinates {
            CoordinateSystem::Absolute => {
                client
                    .composite_onto_overlay(
                        surface,
                        placement.x,
                        placement.y,
                        self.stream_width,
                        self.stream_height,
                    )
                    .await?
            }
            CoordinateSystem::Normalized => {
                let (nx, ny) = placement.normalized(self.surface_size(scale), self.stream_size());
                client.composite_normalized(surface, nx, ny).await?
            }
        }
        Ok(())
    }
}

async fn release_surface<C: DrawingClient>(client: &mut C, surface: SurfaceHandle) {
    if let Err(err) = client.destroy_surface(surface).await {
        tracing::warn!(error = %err, surface = surface.0, "Failed to destroy surface");
    }
}

impl Deref for Painter {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.frame
    }
}

impl DerefMut for Painter {
    fn deref_mut(&mut self) -> &mut Frame {
        &mut self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{CairoOp, ContextHandle, SurfaceHandle};
    use crate::testing::{Call, RecordingClient};
    use camoverlay_types::{TextAlign, TextOverflow, overlay_colors};

    #[test]
    fn corner_placements_touch_their_corner() {
        let (stream_w, stream_h) = (1920.0, 1080.0);
        for (pos_x, pos_y) in [(0.0, 0.0), (10.0, 10.0), (37.0, 125.0)] {
            for (w, h) in [(1.0, 1.0), (500.0, 760.0), (1920.0, 1080.0)] {
                let p = place(Alignment::TopLeft, pos_x, pos_y, w, h, stream_w, stream_h);
                assert_eq!((p.x, p.y), (pos_x, pos_y));

                let p = place(Alignment::TopRight, pos_x, pos_y, w, h, stream_w, stream_h);
                assert_eq!((p.x + w, p.y), (stream_w - pos_x, pos_y));

                let p = place(Alignment::BottomLeft, pos_x, pos_y, w, h, stream_w, stream_h);
                assert_eq!((p.x, p.y + h), (pos_x, stream_h - pos_y));

                let p = place(Alignment::BottomRight, pos_x, pos_y, w, h, stream_w, stream_h);
                assert_eq!((p.x + w, p.y + h), (stream_w - pos_x, stream_h - pos_y));
            }
        }
    }

    #[test]
    fn center_placement_is_nudged_by_offset() {
        let p = place(Alignment::Center, 0.0, 0.0, 100.0, 100.0, 1000.0, 500.0);
        assert_eq!((p.x, p.y), (450.0, 200.0));

        let p = place(Alignment::BottomCenter, 5.0, 10.0, 100.0, 100.0, 1000.0, 500.0);
        assert_eq!((p.x, p.y), (455.0, 390.0));

        let p = place(Alignment::CenterRight, 5.0, -20.0, 100.0, 100.0, 1000.0, 500.0);
        assert_eq!((p.x, p.y), (895.0, 180.0));
    }

    #[test]
    fn normalized_coordinates_span_unit_range() {
        let stream = (1000, 500);
        let size = (100, 100);
        assert_eq!(Placement { x: 0.0, y: 0.0 }.normalized(size, stream), (-1.0, -1.0));
        assert_eq!(Placement { x: 900.0, y: 400.0 }.normalized(size, stream), (1.0, 1.0));
        assert_eq!(Placement { x: 450.0, y: 200.0 }.normalized(size, stream), (0.0, 0.0));
        assert_eq!(Placement { x: 0.0, y: 0.0 }.normalized((1000, 500), stream), (0.0, 0.0));
    }

    #[test]
    fn surface_size_is_floored() {
        let painter = Painter::new(0.0, 0.0, 101.0, 33.0, 1920, 1080, Alignment::TopLeft);
        assert_eq!(painter.surface_size(0.5), (50, 16));
    }

    #[tokio::test]
    async fn renders_tree_and_composites_in_order() {
        let (mut client, _events) = RecordingClient::new();
        let mut painter = Painter::new(10.0, 10.0, 500.0, 760.0, 1920, 1080, Alignment::TopLeft);
        let mut label = Frame::new(50.0, 500.0, 300.0, 60.0);
        label.set_text(
            "62.00 l",
            TextAlign::Center,
            TextOverflow::ScaleToFit,
            overlay_colors::WHITE,
        );
        painter.push(label);

        painter.render(&mut client, 1.0).await.unwrap();

        let surface = SurfaceHandle(1);
        let context = ContextHandle(2);
        assert_eq!(client.calls.len(), 6);
        assert_eq!(
            client.calls[0],
            Call::CreateSurface {
                width: 500,
                height: 760
            }
        );
        assert_eq!(client.calls[1], Call::CreateContext(surface));

        let Call::Draw(ctx, ops) = &client.calls[2] else {
            panic!("expected draw call, got {:?}", client.calls[2]);
        };
        assert_eq!(*ctx, context);
        let text_at = ops.iter().find_map(|op| match op {
            CairoOp::WriteText { text, x, y, .. } => Some((text.as_str(), *x, *y)),
            _ => None,
        });
        assert_eq!(text_at, Some(("62.00 l", 60.0, 510.0)));

        assert_eq!(
            client.calls[3],
            Call::Composite {
                surface,
                x: 10.0,
                y: 10.0,
                stream_width: 1920,
                stream_height: 1080
            }
        );
        assert_eq!(client.calls[4], Call::DestroyContext(context));
        assert_eq!(client.calls[5], Call::DestroySurface(surface));
    }

    #[tokio::test]
    async fn normalized_painter_uses_normalized_composite() {
        let (mut client, _events) = RecordingClient::new();
        let mut painter = Painter::new(0.0, 0.0, 100.0, 100.0, 1100, 600, Alignment::BottomRight);
        painter.set_coordinates(CoordinateSystem::Normalized);

        painter.render(&mut client, 1.0).await.unwrap();

        assert!(client.calls.contains(&Call::CompositeNormalized {
            surface: SurfaceHandle(1),
            x: 1.0,
            y: 1.0
        }));
    }

    #[tokio::test]
    async fn releases_handles_when_drawing_fails() {
        let (mut client, _events) = RecordingClient::new();
        client.fail_draw = true;
        let painter = Painter::new(0.0, 0.0, 100.0, 100.0, 1920, 1080, Alignment::TopLeft);

        let err = painter.render(&mut client, 1.0).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!client.calls.iter().any(|c| matches!(c, Call::Composite { .. })));
        assert_eq!(
            &client.calls[client.calls.len() - 2..],
            &[
                Call::DestroyContext(ContextHandle(2)),
                Call::DestroySurface(SurfaceHandle(1))
            ]
        );
    }

    #[tokio::test]
    async fn releases_surface_when_context_creation_fails() {
        let (mut client, _events) = RecordingClient::new();
        client.fail_context = true;
        let painter = Painter::new(0.0, 0.0, 100.0, 100.0, 1920, 1080, Alignment::TopLeft);

        let err = painter.render(&mut client, 1.0).await.unwrap_err();

        assert!(err.is_transport());
        assert_eq!(
            client.calls,
            [
                Call::CreateSurface {
                    width: 100,
                    height: 100
                },
                Call::CreateContext(SurfaceHandle(1)),
                Call::DestroySurface(SurfaceHandle(1)),
            ]
        );
    }

    #[tokio::test]
    async fn releases_handles_when_compositing_fails() {
        for coordinates in [CoordinateSystem::Absolute, CoordinateSystem::Normalized] {
            let (mut client, _events) = RecordingClient::new();
            client.fail_composite = true;
            let mut painter = Painter::new(0.0, 0.0, 100.0, 100.0, 1920, 1080, Alignment::TopLeft);
            painter.set_coordinates(coordinates);

            let err = painter.render(&mut client, 1.0).await.unwrap_err();

            assert!(err.is_transport());
            assert_eq!(
                &client.calls[client.calls.len() - 2..],
                &[
                    Call::DestroyContext(ContextHandle(2)),
                    Call::DestroySurface(SurfaceHandle(1))
                ]
            );
        }
    }

    /// Horizontal extent of every filled path, as (left, right)
    fn filled_spans(ops: &[CairoOp]) -> Vec<(f64, f64)> {
        let mut spans = Vec::new();
        let mut current: Option<(f64, f64)> = None;
        for op in ops {
            match op {
                CairoOp::NewPath => current = None,
                CairoOp::Arc { xc, radius, .. } => {
                    let (left, right) = current.unwrap_or((f64::MAX, f64::MIN));
                    current = Some((left.min(xc - radius), right.max(xc + radius)));
                }
                CairoOp::Fill => spans.extend(current.take()),
                _ => {}
            }
        }
        spans
    }

    async fn drawn_ops(painter: &Painter) -> Vec<CairoOp> {
        let (mut client, _events) = RecordingClient::new();
        painter.render(&mut client, 1.0).await.unwrap();
        client
            .calls
            .into_iter()
            .find_map(|call| match call {
                Call::Draw(_, ops) => Some(ops),
                _ => None,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn own_position_offsets_content_inside_the_surface() {
        let mut painter = Painter::new(20.0, 20.0, 100.0, 100.0, 640, 480, Alignment::TopLeft);
        painter.set_background(overlay_colors::WHITE);

        assert_eq!(filled_spans(&drawn_ops(&painter).await), [(20.0, 120.0)]);
        assert_eq!(painter.placement(1.0), Placement { x: 20.0, y: 20.0 });
    }

    #[tokio::test]
    async fn child_at_negative_position_fills_the_surface() {
        let mut painter = Painter::new(20.0, 20.0, 100.0, 100.0, 640, 480, Alignment::TopLeft);
        let mut panel = Frame::new(-20.0, -20.0, 100.0, 100.0);
        panel.set_background(overlay_colors::WHITE);
        painter.push(panel);

        assert_eq!(filled_spans(&drawn_ops(&painter).await), [(0.0, 100.0)]);
    }

    #[tokio::test]
    async fn empty_surface_is_rejected_without_remote_calls() {
        let (mut client, _events) = RecordingClient::new();
        let painter = Painter::new(0.0, 0.0, 100.0, 100.0, 1920, 1080, Alignment::TopLeft);

        let err = painter.render(&mut client, 0.001).await.unwrap_err();
        assert!(matches!(err, OverlayError::EmptySurface { .. }));
        assert!(client.calls.is_empty());
    }
}
