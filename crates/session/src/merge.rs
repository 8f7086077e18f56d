//! Folding stream events into the generation list.
//!
//! [`reconcile`] is a pure function of the current list and one event.
//! Re-applying the same `image_complete` is a no-op because the second
//! application hits the exact-id branch with identical data.

use studio_core::generation::{Generation, ImageRecord};
use studio_core::stream_events::StreamEvent;

/// Where an incoming image landed inside its generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMerge {
    /// An image with the same id was overwritten at this index.
    ReplacedById(usize),
    /// The first placeholder for the same model was replaced at this index.
    ReplacedPlaceholder(usize),
    /// No match; the image was pushed to the end.
    Appended,
}

/// Apply one stream event to the generation list.
///
/// - `image_complete`: merged into its generation via [`merge_image`];
///   unknown generations are left untouched.
/// - `generation_complete`: every remaining placeholder of that generation
///   is dropped.
/// - `error`: no change.
pub fn reconcile(mut generations: Vec<Generation>, event: &StreamEvent) -> Vec<Generation> {
    match event {
        StreamEvent::ImageComplete(data) => {
            match find_mut(&mut generations, &data.generation_id) {
                Some(generation) => {
                    let outcome = merge_image(generation, data.to_record());
                    tracing::debug!(
                        generation_id = %data.generation_id,
                        image_id = %data.id,
                        model_name = %data.model_name,
                        ?outcome,
                        "Merged image into generation",
                    );
                }
                None => {
                    tracing::debug!(
                        generation_id = %data.generation_id,
                        image_id = %data.id,
                        "Image for unknown generation ignored",
                    );
                }
            }
        }
        StreamEvent::GenerationComplete(data) => {
            if let Some(generation) = find_mut(&mut generations, &data.generation_id) {
                let dropped = strip_placeholders(generation);
                if dropped > 0 {
                    tracing::info!(
                        generation_id = %data.generation_id,
                        dropped,
                        "Dropped placeholders for images that never arrived",
                    );
                }
            }
        }
        StreamEvent::Error(_) => {}
    }
    generations
}

/// Merge one real image into `generation`.
///
/// Matching order: exact id, then the first placeholder whose model name
/// matches (iteration order decides when a model was requested twice),
/// then append.
pub fn merge_image(generation: &mut Generation, image: ImageRecord) -> ImageMerge {
    if let Some(idx) = generation.images.iter().position(|img| img.id == image.id) {
        generation.images[idx] = image;
        return ImageMerge::ReplacedById(idx);
    }

    if let Some(idx) = generation
        .images
        .iter()
        .position(|img| img.is_placeholder && img.model_name == image.model_name)
    {
        generation.images[idx] = image;
        return ImageMerge::ReplacedPlaceholder(idx);
    }

    generation.images.push(image);
    ImageMerge::Appended
}

/// Remove every placeholder from `generation`, returning how many were
/// removed.
pub fn strip_placeholders(generation: &mut Generation) -> usize {
    let before = generation.images.len();
    generation.images.retain(|img| !img.is_placeholder);
    before - generation.images.len()
}

fn find_mut<'a>(generations: &'a mut [Generation], id: &str) -> Option<&'a mut Generation> {
    generations.iter_mut().find(|g| g.id == id)
}
