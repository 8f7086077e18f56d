//! Generation and image records, submission payloads and their validation.
//!
//! The same records serve both sides of the wire: the server stores and
//! returns them, the client session keeps them as its view state and folds
//! stream events into them.

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::error::CoreError;
use crate::types::{GenerationId, ImageId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle of a generation, and of each per-model row inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    /// `completed` and `failed` end the event stream for a generation.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One image inside a generation.
///
/// A placeholder stands in for a model whose image has not arrived yet; it
/// has an empty `url` and `is_placeholder == true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: ImageId,
    #[serde(alias = "r2Url")]
    pub url: String,
    pub model_name: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub is_placeholder: bool,
}

impl ImageRecord {
    /// Build the placeholder shown for `model_name` until its image arrives.
    pub fn placeholder(generation_id: &str, model_name: &str) -> Self {
        Self {
            id: format!("{generation_id}-{model_name}-placeholder"),
            url: String::new(),
            model_name: model_name.to_string(),
            width: None,
            height: None,
            is_placeholder: true,
        }
    }
}

/// A user-submitted request for images at one aspect ratio across one or
/// more models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    pub id: GenerationId,
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    pub aspect_ratio: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
}

impl Generation {
    /// Optimistic record inserted right after the server accepted a
    /// submission: one placeholder per requested model, in request order.
    pub fn optimistic(
        id: GenerationId,
        prompt: &str,
        aspect_ratio: &str,
        model_names: &[String],
        created_at: Timestamp,
    ) -> Self {
        let images = model_names
            .iter()
            .map(|name| ImageRecord::placeholder(&id, name))
            .collect();
        Self {
            id,
            prompt: prompt.to_string(),
            negative_prompt: None,
            aspect_ratio: aspect_ratio.to_string(),
            created_at,
            images,
        }
    }

    pub fn placeholder_count(&self) -> usize {
        self.images.iter().filter(|img| img.is_placeholder).count()
    }
}

// ---------------------------------------------------------------------------
// Submission payloads
// ---------------------------------------------------------------------------

/// A reference image previously uploaded by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImage {
    pub url: String,
    pub key: String,
    pub original_name: String,
}

/// Body of `POST /api/generations`. One request covers one aspect ratio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitGenerationRequest {
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    pub model_ids: Vec<String>,
    #[serde(default, alias = "referenceImageUrls")]
    pub reference_images: Vec<ReferenceImage>,
}

fn default_aspect_ratio() -> String {
    catalog::DEFAULT_ASPECT_RATIO.to_string()
}

/// Response of `POST /api/generations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitGenerationResponse {
    pub generation_id: GenerationId,
    pub status: GenerationStatus,
}

/// Validate a submission before any record is created.
pub fn validate_submit_request(input: &SubmitGenerationRequest) -> Result<(), CoreError> {
    if input.prompt.trim().is_empty() {
        return Err(CoreError::Validation("Prompt is required".to_string()));
    }
    if input.model_ids.is_empty() {
        return Err(CoreError::Validation(
            "At least one model must be selected".to_string(),
        ));
    }
    if !catalog::is_known_aspect_ratio(&input.aspect_ratio) {
        return Err(CoreError::Validation(format!(
            "Unsupported aspect ratio '{}'",
            input.aspect_ratio
        )));
    }
    Ok(())
}
