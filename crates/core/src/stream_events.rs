//! Wire format of the per-generation event stream.
//!
//! Every SSE `data` field carries one JSON object of the shape
//! `{"type": "<kind>", "data": {...}}`. The server serializes
//! [`StreamEvent`]; the client parses it back.

use serde::{Deserialize, Serialize};

use crate::generation::{GenerationStatus, ImageRecord};
use crate::types::{GenerationId, ImageId, Timestamp};

/// A model finished one image for a generation.
pub const MSG_TYPE_IMAGE_COMPLETE: &str = "image_complete";

/// The generation reached a terminal status; no further events follow.
pub const MSG_TYPE_GENERATION_COMPLETE: &str = "generation_complete";

/// The producer reported a failure.
pub const MSG_TYPE_ERROR: &str = "error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StreamEvent {
    #[serde(rename = "image_complete")]
    ImageComplete(ImageCompleteData),

    #[serde(rename = "generation_complete")]
    GenerationComplete(GenerationCompleteData),

    #[serde(rename = "error")]
    Error(ErrorData),
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ImageComplete(_) => MSG_TYPE_IMAGE_COMPLETE,
            Self::GenerationComplete(_) => MSG_TYPE_GENERATION_COMPLETE,
            Self::Error(_) => MSG_TYPE_ERROR,
        }
    }

    /// `generation_complete` and `error` both end a subscription.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::GenerationComplete(_) | Self::Error(_))
    }
}

/// Payload for `image_complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCompleteData {
    pub id: ImageId,
    pub generation_id: GenerationId,
    #[serde(alias = "r2Url")]
    pub url: String,
    pub model_name: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl ImageCompleteData {
    /// The real (non-placeholder) image record carried by this event.
    pub fn to_record(&self) -> ImageRecord {
        ImageRecord {
            id: self.id.clone(),
            url: self.url.clone(),
            model_name: self.model_name.clone(),
            width: self.width,
            height: self.height,
            is_placeholder: false,
        }
    }
}

/// Payload for `generation_complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationCompleteData {
    pub generation_id: GenerationId,
    pub status: GenerationStatus,
    pub total_images: u32,
}

/// Payload for `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
}
