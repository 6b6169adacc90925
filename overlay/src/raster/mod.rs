//! Software drawing backend using tiny-skia and cosmic-text
//!
//! `RasterClient` implements [`DrawingClient`] entirely on the CPU. Surfaces
//! are pixmaps, contexts track a transform, a source and a path like a Cairo
//! context does, and composited surfaces land on a stream-sized framebuffer
//! that can be written to a PNG after every composite. It lets the compositor
//! run without a camera.
//!
//! Connecting always succeeds. Handles are dropped on every connect and
//! disconnect, matching a remote backend that forgets them with the session.

mod image;
mod text;

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;
use std::path::{Path, PathBuf};

use tiny_skia::{
    Color, FillRule, FilterQuality, LineCap, LineJoin, Paint, PathBuilder, Pattern, Pixmap,
    PixmapPaint, Rect, SpreadMode, Stroke, Transform,
};

use crate::client::{
    CairoOp, ConnectionEvent, ContextHandle, DrawingClient, EventReceiver, EventSender, FontHandle,
    ImageDescriptor, ImageHandle, Rgba, SurfaceHandle, event_channel,
};
use crate::error::ClientError;

pub use image::decode_png;
pub use text::{TextBox, TextEngine};

// ─────────────────────────────────────────────────────────────────────────────
// Context State
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Source {
    Solid(Rgba),
    /// Image pattern, fixed in device space when it was set
    Image {
        image: ImageHandle,
        transform: Transform,
    },
}

struct Context {
    surface: SurfaceHandle,
    ctm: Transform,
    source: Source,
    path: PathBuilder,
    has_current_point: bool,
    line_width: f64,
    font: Option<FontHandle>,
}

impl Context {
    fn new(surface: SurfaceHandle) -> Self {
        Self {
            surface,
            ctm: Transform::identity(),
            source: Source::Solid(Rgba {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            }),
            path: PathBuilder::new(),
            has_current_point: false,
            line_width: 2.0,
            font: None,
        }
    }

    /// Map a user-space point through the current transform
    fn to_device(&self, x: f64, y: f64) -> (f32, f32) {
        let (x, y) = (x as f32, y as f32);
        let t = &self.ctm;
        (t.sx * x + t.kx * y + t.tx, t.ky * x + t.sy * y + t.ty)
    }

    /// Uniform scale factor of the current transform
    fn ctm_scale(&self) -> f32 {
        let t = &self.ctm;
        (t.sx * t.sy - t.kx * t.ky).abs().sqrt()
    }

    fn take_path(&mut self) -> Option<tiny_skia::Path> {
        self.has_current_point = false;
        std::mem::replace(&mut self.path, PathBuilder::new()).finish()
    }

    /// Append a circular arc, joined to the current point with a line like
    /// Cairo does. Cubic segments span at most a quarter turn.
    fn arc(&mut self, xc: f64, yc: f64, radius: f64, angle1: f64, mut angle2: f64) {
        while angle2 < angle1 {
            angle2 += std::f64::consts::TAU;
        }

        let point = |a: f64| (xc + radius * a.cos(), yc + radius * a.sin());
        let (sx, sy) = self.to_device(point(angle1).0, point(angle1).1);
        if self.has_current_point {
            self.path.line_to(sx, sy);
        } else {
            self.path.move_to(sx, sy);
            self.has_current_point = true;
        }
        if radius <= 0.0 {
            return;
        }

        let segments = ((angle2 - angle1) / FRAC_PI_2).ceil().max(1.0) as usize;
        let step = (angle2 - angle1) / segments as f64;
        let k = 4.0 / 3.0 * (step / 4.0).tan() * radius;

        for i in 0..segments {
            let a0 = angle1 + step * i as f64;
            let a1 = a0 + step;
            let (x0, y0) = point(a0);
            let (x3, y3) = point(a1);
            let c1 = self.to_device(x0 - k * a0.sin(), y0 + k * a0.cos());
            let c2 = self.to_device(x3 + k * a1.sin(), y3 - k * a1.cos());
            let end = self.to_device(x3, y3);
            self.path.cubic_to(c1.0, c1.1, c2.0, c2.1, end.0, end.1);
        }
    }
}

fn color(rgba: Rgba) -> Color {
    let c = |v: f64| v.clamp(0.0, 1.0) as f32;
    Color::from_rgba(c(rgba.r), c(rgba.g), c(rgba.b), c(rgba.a)).unwrap_or(Color::BLACK)
}

fn color_bytes(rgba: Rgba) -> [u8; 4] {
    let c = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [c(rgba.r), c(rgba.g), c(rgba.b), c(rgba.a)]
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

pub struct RasterClient {
    events: EventSender,
    connected: bool,
    next_id: u64,
    surfaces: HashMap<SurfaceHandle, Pixmap>,
    contexts: HashMap<ContextHandle, Context>,
    images: HashMap<ImageHandle, Pixmap>,
    fonts: HashMap<FontHandle, String>,
    text: TextEngine,
    stream: Pixmap,
    snapshot_path: Option<PathBuf>,
}

impl RasterClient {
    /// Create a backend compositing onto a `stream_width` x `stream_height`
    /// framebuffer
    pub fn new(stream_width: u32, stream_height: u32) -> Result<(Self, EventReceiver), ClientError> {
        let stream = new_pixmap("stream", stream_width, stream_height)?;
        let (events, rx) = event_channel();
        let client = Self {
            events,
            connected: false,
            next_id: 1,
            surfaces: HashMap::new(),
            contexts: HashMap::new(),
            images: HashMap::new(),
            fonts: HashMap::new(),
            text: TextEngine::new(),
            stream,
            snapshot_path: None,
        };
        Ok((client, rx))
    }

    /// Write the stream framebuffer to `path` after every change
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    /// The composited stream framebuffer
    pub fn stream(&self) -> &Pixmap {
        &self.stream
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Encode the stream framebuffer as PNG and write it to `path`
    pub async fn save_png(&self, path: &Path) -> Result<(), ClientError> {
        let data = self.stream.encode_png().map_err(|e| ClientError::Rejected {
            call: "save_png",
            reason: e.to_string(),
        })?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        if self.connected {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn reset_handles(&mut self) {
        self.contexts.clear();
        self.surfaces.clear();
        self.images.clear();
        self.fonts.clear();
    }

    async fn show(&mut self, surface: SurfaceHandle, x: f64, y: f64) -> Result<(), ClientError> {
        let pixmap = self.surfaces.get(&surface).ok_or(ClientError::UnknownHandle {
            kind: "surface",
            id: surface.0,
        })?;

        // One overlay per client; a new composite replaces the previous one
        self.stream.fill(Color::TRANSPARENT);
        self.stream.draw_pixmap(
            x.round() as i32,
            y.round() as i32,
            pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        tracing::trace!(surface = surface.0, x, y, "Composited surface");
        self.write_snapshot().await;
        Ok(())
    }

    async fn write_snapshot(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        if let Err(err) = self.save_png(path).await {
            tracing::warn!(error = %err, path = %path.display(), "Failed to write overlay snapshot");
        }
    }
}

fn new_pixmap(what: &'static str, width: u32, height: u32) -> Result<Pixmap, ClientError> {
    Pixmap::new(width, height).ok_or_else(|| ClientError::Rejected {
        call: what,
        reason: format!("invalid size {width}x{height}"),
    })
}

/// Execute one verb against a context and its surface
fn execute(
    op: &CairoOp,
    ctx: &mut Context,
    pixmap: &mut Pixmap,
    images: &HashMap<ImageHandle, Pixmap>,
    fonts: &HashMap<FontHandle, String>,
    text: &mut TextEngine,
) -> Result<(), ClientError> {
    match op {
        CairoOp::IdentityMatrix => ctx.ctm = Transform::identity(),
        CairoOp::Translate { x, y } => ctx.ctm = ctx.ctm.pre_translate(*x as f32, *y as f32),
        CairoOp::Scale { sx, sy } => ctx.ctm = ctx.ctm.pre_scale(*sx as f32, *sy as f32),
        CairoOp::Rotate { radians } => {
            ctx.ctm = ctx
                .ctm
                .pre_concat(Transform::from_rotate(radians.to_degrees() as f32))
        }
        CairoOp::SetSourceRgba(rgba) => ctx.source = Source::Solid(*rgba),
        CairoOp::SetSourceImage { image, x, y } => {
            if !images.contains_key(image) {
                return Err(ClientError::UnknownHandle {
                    kind: "image",
                    id: image.0,
                });
            }
            ctx.source = Source::Image {
                image: *image,
                transform: ctx.ctm.pre_translate(*x as f32, *y as f32),
            };
        }
        CairoOp::Paint => match ctx.source {
            Source::Solid(rgba) => {
                let mut paint = Paint::default();
                paint.set_color(color(rgba));
                let (w, h) = (pixmap.width() as f32, pixmap.height() as f32);
                if let Some(rect) = Rect::from_xywh(0.0, 0.0, w, h) {
                    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
                }
            }
            Source::Image { image, transform } => {
                if let Some(src) = images.get(&image) {
                    let paint = PixmapPaint {
                        quality: FilterQuality::Bilinear,
                        ..PixmapPaint::default()
                    };
                    pixmap.draw_pixmap(0, 0, src.as_ref(), &paint, transform, None);
                }
            }
        },
        CairoOp::NewPath => {
            ctx.take_path();
        }
        CairoOp::Arc {
            xc,
            yc,
            radius,
            angle1,
            angle2,
        } => ctx.arc(*xc, *yc, *radius, *angle1, *angle2),
        CairoOp::ClosePath => {
            ctx.path.close();
            ctx.has_current_point = false;
        }
        CairoOp::Fill => {
            if let Some(path) = ctx.take_path() {
                let paint = source_paint(ctx.source, images);
                pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }
        CairoOp::Stroke => {
            let width = ctx.line_width as f32 * ctx.ctm_scale();
            if let Some(path) = ctx.take_path() {
                let paint = source_paint(ctx.source, images);
                let stroke = Stroke {
                    width,
                    line_cap: LineCap::Butt,
                    line_join: LineJoin::Round,
                    ..Default::default()
                };
                pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
            }
        }
        CairoOp::SetLineWidth(width) => ctx.line_width = *width,
        CairoOp::SetFontFace(font) => {
            if !fonts.contains_key(font) {
                return Err(ClientError::UnknownHandle {
                    kind: "font",
                    id: font.0,
                });
            }
            ctx.font = Some(*font);
        }
        CairoOp::WriteText {
            text: content,
            x,
            y,
            width,
            height,
            align,
            overflow,
        } => {
            let (bx, by) = ctx.to_device(*x, *y);
            let scale = ctx.ctm_scale();
            let bounds = TextBox {
                x: bx,
                y: by,
                width: *width as f32 * scale,
                height: *height as f32 * scale,
            };
            let fill = match ctx.source {
                Source::Solid(rgba) => color_bytes(rgba),
                Source::Image { .. } => [255, 255, 255, 255],
            };
            let family = ctx.font.and_then(|f| fonts.get(&f)).map(String::as_str);
            text.draw(pixmap, content, bounds, *align, *overflow, fill, family);
        }
    }
    Ok(())
}

fn source_paint<'a>(source: Source, images: &'a HashMap<ImageHandle, Pixmap>) -> Paint<'a> {
    let mut paint = Paint {
        anti_alias: true,
        ..Paint::default()
    };
    match source {
        Source::Solid(rgba) => paint.set_color(color(rgba)),
        Source::Image { image, transform } => {
            if let Some(src) = images.get(&image) {
                paint.shader = Pattern::new(
                    src.as_ref(),
                    SpreadMode::Pad,
                    FilterQuality::Bilinear,
                    1.0,
                    transform,
                );
            }
        }
    }
    paint
}

impl DrawingClient for RasterClient {
    async fn connect(&mut self) -> Result<(), ClientError> {
        self.reset_handles();
        self.connected = true;
        tracing::debug!("Raster backend connected");
        let _ = self.events.send(ConnectionEvent::Open);
        Ok(())
    }

    async fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        self.reset_handles();
        let _ = self.events.send(ConnectionEvent::Close);
    }

    async fn create_surface(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<SurfaceHandle, ClientError> {
        self.ensure_connected()?;
        let pixmap = new_pixmap("create_surface", width, height)?;
        let handle = SurfaceHandle(self.next());
        self.surfaces.insert(handle, pixmap);
        Ok(handle)
    }

    async fn create_context(&mut self, surface: SurfaceHandle) -> Result<ContextHandle, ClientError> {
        self.ensure_connected()?;
        if !self.surfaces.contains_key(&surface) {
            return Err(ClientError::UnknownHandle {
                kind: "surface",
                id: surface.0,
            });
        }
        let handle = ContextHandle(self.next());
        self.contexts.insert(handle, Context::new(surface));
        Ok(handle)
    }

    async fn destroy_surface(&mut self, surface: SurfaceHandle) -> Result<(), ClientError> {
        self.ensure_connected()?;
        self.surfaces
            .remove(&surface)
            .map(|_| ())
            .ok_or(ClientError::UnknownHandle {
                kind: "surface",
                id: surface.0,
            })
    }

    async fn destroy_context(&mut self, context: ContextHandle) -> Result<(), ClientError> {
        self.ensure_connected()?;
        self.contexts
            .remove(&context)
            .map(|_| ())
            .ok_or(ClientError::UnknownHandle {
                kind: "context",
                id: context.0,
            })
    }

    async fn draw(&mut self, context: ContextHandle, ops: &[CairoOp]) -> Result<(), ClientError> {
        self.ensure_connected()?;
        let Self {
            contexts,
            surfaces,
            images,
            fonts,
            text,
            ..
        } = self;

        let ctx = contexts.get_mut(&context).ok_or(ClientError::UnknownHandle {
            kind: "context",
            id: context.0,
        })?;
        let pixmap = surfaces.get_mut(&ctx.surface).ok_or(ClientError::UnknownHandle {
            kind: "surface",
            id: ctx.surface.0,
        })?;

        for op in ops {
            execute(op, ctx, pixmap, images, fonts, text)?;
        }
        Ok(())
    }

    async fn upload_image_data(&mut self, data: &[u8]) -> Result<ImageDescriptor, ClientError> {
        self.ensure_connected()?;
        let pixmap = decode_png(data)?;
        let handle = ImageHandle(self.next());
        let descriptor = ImageDescriptor::new(handle, pixmap.width(), pixmap.height())
            .ok_or_else(|| ClientError::Decode {
                what: "image",
                reason: "zero-sized".into(),
            })?;
        self.images.insert(handle, pixmap);
        Ok(descriptor)
    }

    async fn upload_font_data(&mut self, data: &[u8]) -> Result<FontHandle, ClientError> {
        self.ensure_connected()?;
        let family = self
            .text
            .load_font(data.to_vec())
            .ok_or_else(|| ClientError::Decode {
                what: "font",
                reason: "no usable face".into(),
            })?;
        let handle = FontHandle(self.next());
        tracing::debug!(family = %family, font = handle.0, "Loaded font");
        self.fonts.insert(handle, family);
        Ok(handle)
    }

    async fn composite_onto_overlay(
        &mut self,
        surface: SurfaceHandle,
        x: f64,
        y: f64,
        stream_width: u32,
        stream_height: u32,
    ) -> Result<(), ClientError> {
        self.ensure_connected()?;
        if (stream_width, stream_height) != (self.stream.width(), self.stream.height()) {
            self.stream = new_pixmap("composite_onto_overlay", stream_width, stream_height)?;
        }
        self.show(surface, x, y).await
    }

    async fn composite_normalized(
        &mut self,
        surface: SurfaceHandle,
        x: f64,
        y: f64,
    ) -> Result<(), ClientError> {
        self.ensure_connected()?;
        let (box_w, box_h) = self
            .surfaces
            .get(&surface)
            .map(|p| (p.width(), p.height()))
            .ok_or(ClientError::UnknownHandle {
                kind: "surface",
                id: surface.0,
            })?;
        let free_w = (self.stream.width() as f64 - box_w as f64).max(0.0);
        let free_h = (self.stream.height() as f64 - box_h as f64).max(0.0);
        self.show(surface, (x + 1.0) / 2.0 * free_w, (y + 1.0) / 2.0 * free_h)
            .await
    }

    async fn remove_overlay(&mut self) -> Result<(), ClientError> {
        self.ensure_connected()?;
        self.stream.fill(Color::TRANSPARENT);
        tracing::debug!("Overlay removed");
        self.write_snapshot().await;
        Ok(())
    }
}
