//! Remote drawing client contract
//!
//! The compositor never draws pixels itself. It flattens a frame tree into
//! Cairo-style verbs and hands them to a [`DrawingClient`], which executes them
//! on a surface owned by the backend (the camera's drawing service, or the
//! local [`RasterClient`](crate::raster::RasterClient) used for previews).
//!
//! # Ordering
//!
//! A client is driven through `&mut self` by exactly one owner, so calls reach
//! the backend in program order. Backends must execute them in submission
//! order; a transport without that guarantee has to serialize calls behind a
//! single writer before implementing this trait.
//!
//! # Lifecycle events
//!
//! Connection state changes (`Open`, `Error`, `Close`) are delivered out of
//! band through an [`EventSender`]/[`EventReceiver`] pair created with
//! [`event_channel`]. The client keeps the sender; the widget owning the
//! client consumes the receiver.

use camoverlay_types::{TextAlign, TextOverflow};
use tokio::sync::mpsc;

use crate::error::ClientError;

// ─────────────────────────────────────────────────────────────────────────────
// Handles
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque handle to a backend image surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Opaque handle to a drawing context bound to a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u64);

/// Opaque handle to an uploaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub u64);

/// Opaque handle to an uploaded font face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontHandle(pub u64);

/// An uploaded image together with its natural size.
///
/// Both dimensions are always non-zero, so fit-mode scaling can divide by
/// them without checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor {
    handle: ImageHandle,
    width: u32,
    height: u32,
}

impl ImageDescriptor {
    /// Returns `None` if either dimension is zero
    pub fn new(handle: ImageHandle, width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self {
            handle,
            width,
            height,
        })
    }

    pub fn handle(&self) -> ImageHandle {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Drawing Verbs
// ─────────────────────────────────────────────────────────────────────────────

/// Source color with components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub fn from_bytes(rgba: [u8; 4]) -> Self {
        Self {
            r: rgba[0] as f64 / 255.0,
            g: rgba[1] as f64 / 255.0,
            b: rgba[2] as f64 / 255.0,
            a: rgba[3] as f64 / 255.0,
        }
    }
}

/// One Cairo-style drawing verb, executed against a context
#[derive(Debug, Clone, PartialEq)]
pub enum CairoOp {
    IdentityMatrix,
    Translate { x: f64, y: f64 },
    Scale { sx: f64, sy: f64 },
    Rotate { radians: f64 },
    SetSourceRgba(Rgba),
    SetSourceImage { image: ImageHandle, x: f64, y: f64 },
    Paint,
    NewPath,
    Arc {
        xc: f64,
        yc: f64,
        radius: f64,
        angle1: f64,
        angle2: f64,
    },
    ClosePath,
    Fill,
    Stroke,
    SetLineWidth(f64),
    SetFontFace(FontHandle),
    /// Lay out `text` inside the box, delegated to the backend's text engine
    WriteText {
        text: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        align: TextAlign,
        overflow: TextOverflow,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle Events
// ─────────────────────────────────────────────────────────────────────────────

/// Connection lifecycle notifications emitted by a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The connection is usable; previously uploaded handles are gone
    Open,
    /// Informational; state changes are signalled by `Close`
    Error(String),
    /// The connection dropped; all handles are invalid
    Close,
}

pub type EventSender = mpsc::UnboundedSender<ConnectionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ConnectionEvent>;

/// Create the channel a client uses to report lifecycle events
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

// ─────────────────────────────────────────────────────────────────────────────
// Client Trait
// ─────────────────────────────────────────────────────────────────────────────

/// The operations the compositor needs from a drawing backend.
///
/// Handles returned by a client are scoped to the connection that created
/// them and must not be used after a `Close` event.
#[allow(async_fn_in_trait)]
pub trait DrawingClient {
    /// Start connecting. Success is reported with `ConnectionEvent::Open`.
    async fn connect(&mut self) -> Result<(), ClientError>;

    /// Close the connection. A `ConnectionEvent::Close` follows.
    async fn disconnect(&mut self);

    async fn create_surface(&mut self, width: u32, height: u32)
    -> Result<SurfaceHandle, ClientError>;

    async fn create_context(&mut self, surface: SurfaceHandle) -> Result<ContextHandle, ClientError>;

    async fn destroy_surface(&mut self, surface: SurfaceHandle) -> Result<(), ClientError>;

    async fn destroy_context(&mut self, context: ContextHandle) -> Result<(), ClientError>;

    /// Execute a batch of verbs in order against `context`
    async fn draw(&mut self, context: ContextHandle, ops: &[CairoOp]) -> Result<(), ClientError>;

    async fn upload_image_data(&mut self, data: &[u8]) -> Result<ImageDescriptor, ClientError>;

    async fn upload_font_data(&mut self, data: &[u8]) -> Result<FontHandle, ClientError>;

    /// Show `surface` on the live video at pixel offset (x, y), within a
    /// target stream of `stream_width` x `stream_height`
    async fn composite_onto_overlay(
        &mut self,
        surface: SurfaceHandle,
        x: f64,
        y: f64,
        stream_width: u32,
        stream_height: u32,
    ) -> Result<(), ClientError>;

    /// Show `surface` at normalized coordinates, each axis in [-1, 1]
    async fn composite_normalized(
        &mut self,
        surface: SurfaceHandle,
        x: f64,
        y: f64,
    ) -> Result<(), ClientError>;

    /// Remove whatever this client currently shows on the video
    async fn remove_overlay(&mut self) -> Result<(), ClientError>;
}
