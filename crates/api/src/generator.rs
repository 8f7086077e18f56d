//! Background generation processing.
//!
//! [`process_generation`] runs after the submit handler has returned. It
//! walks the requested models one at a time and records every image as soon
//! as the provider hands it back, so open event streams pick images up while
//! later models are still running.

use std::sync::Arc;

use async_trait::async_trait;
use studio_core::catalog;
use studio_core::generation::GenerationStatus;

use crate::store::{GenerationStore, NewImage, StoreError};

/// One image returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// A fetchable URL or a `data:` URL.
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// What a provider is asked to produce for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub model_id: String,
    pub prompt: String,
    pub aspect_ratio: String,
    pub reference_urls: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider API error: {status} - {message}")]
    Api { status: u16, message: String },
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<GeneratedImage>, ProviderError>;
}

/// Everything background processing needs about one generation.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub generation_id: String,
    pub prompt: String,
    pub aspect_ratio: String,
    pub model_ids: Vec<String>,
    pub reference_urls: Vec<String>,
}

/// Run every model for `job` and settle the generation's status.
///
/// A failing model is recorded on its own row and does not stop the
/// others; the generation still ends `completed`. Only a store failure ends
/// it `failed`.
pub async fn process_generation(
    store: Arc<dyn GenerationStore>,
    provider: Arc<dyn ImageProvider>,
    job: GenerationJob,
) {
    let generation_id = job.generation_id.clone();

    let final_status = match run_models(store.as_ref(), provider.as_ref(), &job).await {
        Ok(()) => GenerationStatus::Completed,
        Err(e) => {
            tracing::error!(generation_id = %generation_id, error = %e, "Background generation failed");
            GenerationStatus::Failed
        }
    };

    if let Err(e) = store.set_status(&generation_id, final_status).await {
        tracing::error!(generation_id = %generation_id, error = %e, "Failed to settle generation status");
        return;
    }

    tracing::info!(
        generation_id = %generation_id,
        status = final_status.as_str(),
        "Generation finished",
    );
}

async fn run_models(
    store: &dyn GenerationStore,
    provider: &dyn ImageProvider,
    job: &GenerationJob,
) -> Result<(), StoreError> {
    for model_id in &job.model_ids {
        let model_name = catalog::model_display_name(model_id);

        store
            .set_model_status(&job.generation_id, model_id, GenerationStatus::Processing, None)
            .await?;

        let request = ImageRequest {
            model_id: model_id.clone(),
            prompt: job.prompt.clone(),
            aspect_ratio: job.aspect_ratio.clone(),
            reference_urls: job.reference_urls.clone(),
        };

        match provider.generate(&request).await {
            Ok(images) => {
                let count = images.len();
                for image in images {
                    store
                        .add_image(
                            &job.generation_id,
                            NewImage {
                                url: image.url,
                                model_name: model_name.clone(),
                                width: image.width,
                                height: image.height,
                            },
                        )
                        .await?;
                }
                store
                    .set_model_status(&job.generation_id, model_id, GenerationStatus::Completed, None)
                    .await?;
                tracing::info!(
                    generation_id = %job.generation_id,
                    model_id = %model_id,
                    images = count,
                    "Model run completed",
                );
            }
            Err(e) => {
                tracing::warn!(
                    generation_id = %job.generation_id,
                    model_id = %model_id,
                    error = %e,
                    "Model run failed",
                );
                store
                    .set_model_status(
                        &job.generation_id,
                        model_id,
                        GenerationStatus::Failed,
                        Some(e.to_string()),
                    )
                    .await?;
            }
        }
    }
    Ok(())
}
