//! CamOverlay Compositor Library
//!
//! Retained-mode scene graph for drawing overlays onto a network camera's
//! live video through a remote, Cairo-style drawing service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    widget                           │
//! │        Widget state machine + Scene trait           │
//! │     (connection lifecycle, reconnect, policy)       │
//! ├─────────────────────────────────────────────────────┤
//! │              components/  resources                 │
//! │     LabeledValue, Header     ResourceCache          │
//! │   (frame builders)      (moniker -> upload handle)  │
//! ├─────────────────────────────────────────────────────┤
//! │                painter  /  frame                    │
//! │     Painter (surface + placement), Frame tree       │
//! │        (flattened into drawing verbs)               │
//! ├─────────────────────────────────────────────────────┤
//! │                    client                           │
//! │     DrawingClient trait, CairoOp, handles           │
//! ├─────────────────────────────────────────────────────┤
//! │                    raster                           │
//! │           tiny-skia + cosmic-text backend           │
//! │               (local preview)                       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod components;
pub mod error;
pub mod frame;
pub mod painter;
pub mod raster;
pub mod resources;
pub mod utils;
pub mod widget;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use client::{ConnectionEvent, DrawingClient, EventReceiver, FontHandle, ImageDescriptor};
pub use error::{ClientError, OverlayError};
pub use frame::Frame;
pub use painter::Painter;
pub use raster::RasterClient;
pub use resources::ResourceCache;
pub use widget::{ConnectionState, Scene, SceneContext, Widget, WidgetOptions};
