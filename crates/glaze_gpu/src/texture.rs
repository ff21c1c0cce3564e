//! Texture cache keyed by image identity
//!
//! Lookup is by `Arc` pointer identity, not pixel content: the same image
//! object is uploaded once, a clone of its bytes in a fresh `Arc` is a
//! different image. A linear scan is fine at the distinct-image counts
//! canvases see in practice. There is no eviction and no re-upload when a
//! buffer mutates after upload; the entry keeps serving the stale texture.

use std::sync::Arc;

use glaze_core::ImageData;

use crate::backend::{RenderBackend, TextureId};
use crate::error::BackendError;

/// Upload-once cache of image textures.
#[derive(Debug, Default)]
pub struct TextureCache {
    entries: Vec<(Arc<ImageData>, TextureId)>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct images uploaded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the texture for `image`, uploading it on first sight.
    pub fn get_or_create<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        image: &Arc<ImageData>,
    ) -> Result<TextureId, BackendError> {
        for (cached, texture) in &self.entries {
            if Arc::ptr_eq(cached, image) {
                return Ok(*texture);
            }
        }
        tracing::debug!(
            width = image.width(),
            height = image.height(),
            "uploading image texture"
        );
        let texture = backend.create_texture(image)?;
        self.entries.push((Arc::clone(image), texture));
        Ok(texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;

    #[test]
    fn test_identity_deduplicates() {
        let mut backend = RecordingBackend::new(64, 64);
        let mut cache = TextureCache::new();
        let image = Arc::new(ImageData::new(4, 4));

        let a = cache.get_or_create(&mut backend, &image).unwrap();
        let b = cache.get_or_create(&mut backend, &image).unwrap();

        assert_eq!(a, b);
        assert_eq!(backend.texture_uploads(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_equal_content_distinct_identity_uploads_twice() {
        let mut backend = RecordingBackend::new(64, 64);
        let mut cache = TextureCache::new();
        let a = Arc::new(ImageData::new(4, 4));
        let b = Arc::new(ImageData::new(4, 4));

        let ta = cache.get_or_create(&mut backend, &a).unwrap();
        let tb = cache.get_or_create(&mut backend, &b).unwrap();

        assert_ne!(ta, tb);
        assert_eq!(backend.texture_uploads(), 2);
    }
}
