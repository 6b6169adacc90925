//! Error types for the compositor and its drawing backends

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a drawing client (the transport side)
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("drawing client is not connected")]
    NotConnected,

    #[error("connection closed")]
    Closed,

    #[error("backend rejected {call}: {reason}")]
    Rejected { call: &'static str, reason: String },

    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u64 },

    #[error("failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Errors raised while building or rendering a frame tree
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("resource '{moniker}' is not registered")]
    UnknownMoniker { moniker: String },

    #[error("resource '{moniker}' is registered as {registered}, requested as {requested}")]
    WrongResourceKind {
        moniker: String,
        registered: &'static str,
        requested: &'static str,
    },

    #[error("failed to read resource {path}")]
    ReadResource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("frame '{key}' not found in tree")]
    MissingFrame { key: String },

    #[error("surface would be empty ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl OverlayError {
    /// True when the error comes from the connection rather than from
    /// configuration. Transport errors are recovered by reconnecting.
    pub fn is_transport(&self) -> bool {
        matches!(self, OverlayError::Client(_))
    }
}
