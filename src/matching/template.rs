//! Process-wide template cache

use image::GrayImage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Decoded grayscale templates keyed by identifier (normally a file path).
///
/// A cached identifier is never decoded again. When two threads race on the
/// same miss, the first insert wins and both get that raster.
#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: RwLock<HashMap<String, Arc<GrayImage>>>,
    decodes: AtomicUsize,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Arc<GrayImage>> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Return the cached raster for `id`, decoding the file on a miss.
    pub fn get_or_load(&self, id: &str) -> Result<Arc<GrayImage>, image::ImageError> {
        if let Some(template) = self.get(id) {
            return Ok(template);
        }

        // Decode outside the lock; other strategies keep reading meanwhile.
        let decoded = image::open(id)?.to_luma8();
        self.decodes.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "📐 Loaded template {} ({}x{})",
            id,
            decoded.width(),
            decoded.height()
        );
        Ok(self.insert(id, decoded))
    }

    /// Cache an already decoded raster. Returns the cached entry, which is
    /// the existing one if `id` was present.
    pub fn insert(&self, id: &str, template: GrayImage) -> Arc<GrayImage> {
        let mut templates = self
            .templates
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            templates
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(template)),
        )
    }

    pub fn len(&self) -> usize {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of file decodes performed so far.
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}
