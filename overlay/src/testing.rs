//! Recording drawing client for tests
//!
//! Captures every call in order, hands out sequential handles starting at 1,
//! and can be told to fail selected operations.

use crate::client::{
    CairoOp, ConnectionEvent, ContextHandle, DrawingClient, EventReceiver, EventSender, FontHandle,
    ImageDescriptor, ImageHandle, SurfaceHandle, event_channel,
};
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect,
    Disconnect,
    CreateSurface {
        width: u32,
        height: u32,
    },
    CreateContext(SurfaceHandle),
    DestroySurface(SurfaceHandle),
    DestroyContext(ContextHandle),
    Draw(ContextHandle, Vec<CairoOp>),
    UploadImage(usize),
    UploadFont(usize),
    Composite {
        surface: SurfaceHandle,
        x: f64,
        y: f64,
        stream_width: u32,
        stream_height: u32,
    },
    CompositeNormalized {
        surface: SurfaceHandle,
        x: f64,
        y: f64,
    },
    RemoveOverlay,
}

pub struct RecordingClient {
    pub calls: Vec<Call>,
    pub image_size: (u32, u32),
    pub fail_connect: bool,
    /// Accept `connect` without ever reporting `Open`
    pub silent_connect: bool,
    pub fail_context: bool,
    pub fail_composite: bool,
    pub fail_draw: bool,
    pub fail_uploads: bool,
    events: EventSender,
    next_id: u64,
}

impl RecordingClient {
    pub fn new() -> (Self, EventReceiver) {
        let (events, rx) = event_channel();
        let client = Self {
            calls: Vec::new(),
            image_size: (200, 100),
            fail_connect: false,
            silent_connect: false,
            fail_context: false,
            fail_composite: false,
            fail_draw: false,
            fail_uploads: false,
            events,
            next_id: 1,
        };
        (client, rx)
    }

    /// Push a lifecycle event as if the transport had reported it
    pub fn emit(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }

    pub fn uploads(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::UploadImage(_) | Call::UploadFont(_)))
            .count()
    }

    /// Calls other than connection management
    pub fn drawing_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| !matches!(c, Call::Connect | Call::Disconnect))
            .count()
    }

    fn next(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl DrawingClient for RecordingClient {
    async fn connect(&mut self) -> Result<(), ClientError> {
        self.calls.push(Call::Connect);
        if self.fail_connect {
            return Err(ClientError::Rejected {
                call: "connect",
                reason: "refused".into(),
            });
        }
        if !self.silent_connect {
            self.emit(ConnectionEvent::Open);
        }
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.calls.push(Call::Disconnect);
        self.emit(ConnectionEvent::Close);
    }

    async fn create_surface(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<SurfaceHandle, ClientError> {
        self.calls.push(Call::CreateSurface { width, height });
        Ok(SurfaceHandle(self.next()))
    }

    async fn create_context(&mut self, surface: SurfaceHandle) -> Result<ContextHandle, ClientError> {
        self.calls.push(Call::CreateContext(surface));
        if self.fail_context {
            return Err(ClientError::Closed);
        }
        Ok(ContextHandle(self.next()))
    }

    async fn destroy_surface(&mut self, surface: SurfaceHandle) -> Result<(), ClientError> {
        self.calls.push(Call::DestroySurface(surface));
        Ok(())
    }

    async fn destroy_context(&mut self, context: ContextHandle) -> Result<(), ClientError> {
        self.calls.push(Call::DestroyContext(context));
        Ok(())
    }

    async fn draw(&mut self, context: ContextHandle, ops: &[CairoOp]) -> Result<(), ClientError> {
        self.calls.push(Call::Draw(context, ops.to_vec()));
        if self.fail_draw {
            return Err(ClientError::Closed);
        }
        Ok(())
    }

    async fn upload_image_data(&mut self, data: &[u8]) -> Result<ImageDescriptor, ClientError> {
        self.calls.push(Call::UploadImage(data.len()));
        if self.fail_uploads {
            return Err(ClientError::Closed);
        }
        let (width, height) = self.image_size;
        let handle = ImageHandle(self.next());
        ImageDescriptor::new(handle, width, height).ok_or(ClientError::Decode {
            what: "image",
            reason: "zero-sized".into(),
        })
    }

    async fn upload_font_data(&mut self, data: &[u8]) -> Result<FontHandle, ClientError> {
        self.calls.push(Call::UploadFont(data.len()));
        if self.fail_uploads {
            return Err(ClientError::Closed);
        }
        Ok(FontHandle(self.next()))
    }

    async fn composite_onto_overlay(
        &mut self,
        surface: SurfaceHandle,
        x: f64,
        y: f64,
        stream_width: u32,
        stream_height: u32,
    ) -> Result<(), ClientError> {
        self.calls.push(Call::Composite {
            surface,
            x,
            y,
            stream_width,
            stream_height,
        });
        if self.fail_composite {
            return Err(ClientError::Closed);
        }
        Ok(())
    }

    async fn composite_normalized(
        &mut self,
        surface: SurfaceHandle,
        x: f64,
        y: f64,
    ) -> Result<(), ClientError> {
        self.calls.push(Call::CompositeNormalized { surface, x, y });
        if self.fail_composite {
            return Err(ClientError::Closed);
        }
        Ok(())
    }

    async fn remove_overlay(&mut self) -> Result<(), ClientError> {
        self.calls.push(Call::RemoveOverlay);
        Ok(())
    }
}
