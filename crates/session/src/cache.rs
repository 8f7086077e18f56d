//! Stable gallery objects keyed by image id.
//!
//! Consumers compare gallery entries by pointer to decide whether anything
//! changed, so an image whose visible fields are unchanged must come back
//! as the same [`Arc`]. The cache is owned by one session and dropped with
//! it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use studio_core::generation::{Generation, ImageRecord};
use studio_core::types::{GenerationId, ImageId, Timestamp};

/// An image denormalized with its generation's context, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    pub id: ImageId,
    pub url: String,
    pub model_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub is_placeholder: bool,
    pub generation_id: GenerationId,
    pub prompt: String,
    pub aspect_ratio: String,
    pub created_at: Timestamp,
}

impl GalleryImage {
    fn new(image: &ImageRecord, generation: &Generation) -> Self {
        Self {
            id: image.id.clone(),
            url: image.url.clone(),
            model_name: image.model_name.clone(),
            width: image.width,
            height: image.height,
            is_placeholder: image.is_placeholder,
            generation_id: generation.id.clone(),
            prompt: generation.prompt.clone(),
            aspect_ratio: generation.aspect_ratio.clone(),
            created_at: generation.created_at,
        }
    }
}

/// The fields whose change forces a new object.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Signature {
    url: String,
    model_name: String,
    is_placeholder: bool,
}

impl Signature {
    fn of(image: &ImageRecord) -> Self {
        Self {
            url: image.url.clone(),
            model_name: image.model_name.clone(),
            is_placeholder: image.is_placeholder,
        }
    }
}

struct CacheEntry {
    image: Arc<GalleryImage>,
    signature: Signature,
}

#[derive(Default)]
pub struct ImageCache {
    entries: HashMap<ImageId, CacheEntry>,
    previous_generation_ids: HashSet<GenerationId>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached object for `image` when its signature is
    /// unchanged, otherwise build and cache a fresh one.
    pub fn get_or_create(&mut self, image: &ImageRecord, generation: &Generation) -> Arc<GalleryImage> {
        let signature = Signature::of(image);

        if let Some(entry) = self.entries.get(&image.id) {
            if entry.signature == signature {
                return Arc::clone(&entry.image);
            }
        }

        let created = Arc::new(GalleryImage::new(image, generation));
        self.entries.insert(
            image.id.clone(),
            CacheEntry {
                image: Arc::clone(&created),
                signature,
            },
        );
        created
    }

    /// Recompute the gallery feed for the whole generation list.
    ///
    /// A list sharing no generation id with the previous call clears the
    /// cache first. After the pass, entries for images not seen are evicted,
    /// so the cache holds exactly the visible set. The feed is ordered by
    /// generation `created_at` (newest first), then image id.
    pub fn gallery(&mut self, generations: &[Generation]) -> Vec<Arc<GalleryImage>> {
        let current: HashSet<GenerationId> = generations.iter().map(|g| g.id.clone()).collect();

        if !self.previous_generation_ids.is_empty()
            && self.previous_generation_ids.is_disjoint(&current)
        {
            tracing::debug!(
                evicted = self.entries.len(),
                "Generation set replaced, clearing image cache",
            );
            self.entries.clear();
        }

        let mut seen: HashSet<ImageId> = HashSet::new();
        let mut feed = Vec::new();
        for generation in generations {
            for image in &generation.images {
                seen.insert(image.id.clone());
                feed.push(self.get_or_create(image, generation));
            }
        }

        self.entries.retain(|id, _| seen.contains(id));
        self.previous_generation_ids = current;

        feed.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        feed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, image_id: &str) -> bool {
        self.entries.contains_key(image_id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.previous_generation_ids.clear();
    }
}
