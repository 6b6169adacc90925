//! Image and font upload cache
//!
//! Resources are registered up front under a logical moniker and uploaded to
//! the drawing backend the first time they are requested. Uploaded handles
//! belong to the connection that created them, so the cache must be
//! [invalidated](ResourceCache::invalidate) whenever the connection opens or
//! closes; the next request uploads again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use camoverlay_types::{ResourceEntry, ResourceKind};

use crate::client::{DrawingClient, FontHandle, ImageDescriptor};
use crate::error::OverlayError;

#[derive(Debug, Clone, Copy)]
enum Uploaded {
    Image(ImageDescriptor),
    Font(FontHandle),
}

#[derive(Debug)]
struct Resource {
    path: PathBuf,
    kind: ResourceKind,
    uploaded: Option<Uploaded>,
}

/// Moniker -> file registrations with memoized upload results
#[derive(Debug, Default)]
pub struct ResourceCache {
    resources: HashMap<String, Resource>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from configured resource entries
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a ResourceEntry>) -> Self {
        let mut cache = Self::new();
        for entry in entries {
            cache.register(&entry.moniker, &entry.path, entry.kind);
        }
        cache
    }

    pub fn register_image(&mut self, moniker: impl Into<String>, path: impl AsRef<Path>) {
        self.register(moniker, path, ResourceKind::Image);
    }

    pub fn register_font(&mut self, moniker: impl Into<String>, path: impl AsRef<Path>) {
        self.register(moniker, path, ResourceKind::Font);
    }

    /// Register (or re-register) a moniker. No I/O happens here.
    pub fn register(
        &mut self,
        moniker: impl Into<String>,
        path: impl AsRef<Path>,
        kind: ResourceKind,
    ) {
        self.resources.insert(
            moniker.into(),
            Resource {
                path: path.as_ref().to_path_buf(),
                kind,
                uploaded: None,
            },
        );
    }

    pub fn is_registered(&self, moniker: &str) -> bool {
        self.resources.contains_key(moniker)
    }

    /// Number of resources currently holding an uploaded handle
    pub fn uploaded_count(&self) -> usize {
        self.resources
            .values()
            .filter(|r| r.uploaded.is_some())
            .count()
    }

    /// Forget every uploaded handle. Registrations are kept.
    pub fn invalidate(&mut self) {
        for resource in self.resources.values_mut() {
            resource.uploaded = None;
        }
    }

    /// Get an uploaded image, uploading it on first use
    pub async fn image<C: DrawingClient>(
        &mut self,
        client: &mut C,
        moniker: &str,
    ) -> Result<ImageDescriptor, OverlayError> {
        let resource = self.lookup(moniker, ResourceKind::Image)?;
        if let Some(Uploaded::Image(image)) = resource.uploaded {
            return Ok(image);
        }

        let data = read_resource(&resource.path).await?;
        let image = client.upload_image_data(&data).await?;
        tracing::debug!(
            moniker,
            width = image.width(),
            height = image.height(),
            "Uploaded image"
        );
        resource.uploaded = Some(Uploaded::Image(image));
        Ok(image)
    }

    /// Get an uploaded font, uploading it on first use
    pub async fn font<C: DrawingClient>(
        &mut self,
        client: &mut C,
        moniker: &str,
    ) -> Result<FontHandle, OverlayError> {
        let resource = self.lookup(moniker, ResourceKind::Font)?;
        if let Some(Uploaded::Font(font)) = resource.uploaded {
            return Ok(font);
        }

        let data = read_resource(&resource.path).await?;
        let font = client.upload_font_data(&data).await?;
        tracing::debug!(moniker, bytes = data.len(), "Uploaded font");
        resource.uploaded = Some(Uploaded::Font(font));
        Ok(font)
    }

    fn lookup(&mut self, moniker: &str, requested: ResourceKind) -> Result<&mut Resource, OverlayError> {
        let resource = self
            .resources
            .get_mut(moniker)
            .ok_or_else(|| OverlayError::UnknownMoniker {
                moniker: moniker.to_string(),
            })?;
        if resource.kind != requested {
            return Err(OverlayError::WrongResourceKind {
                moniker: moniker.to_string(),
                registered: resource.kind.name(),
                requested: requested.name(),
            });
        }
        Ok(resource)
    }
}

async fn read_resource(path: &Path) -> Result<Vec<u8>, OverlayError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| OverlayError::ReadResource {
            path: path.to_path_buf(),
            source,
        })
}
