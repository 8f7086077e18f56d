//! Generation CRUD handlers.
//!
//! Routes:
//! - `GET    /api/models`              - model catalog
//! - `POST   /api/generations`         - submit and start background work
//! - `GET    /api/generations`         - list, newest first
//! - `GET    /api/generations/{id}`    - detail with per-model status
//! - `DELETE /api/generations/{id}`    - delete

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use studio_core::catalog::{self, ModelInfo};
use studio_core::error::CoreError;
use studio_core::generation::{
    validate_submit_request, Generation, GenerationStatus, SubmitGenerationRequest,
    SubmitGenerationResponse,
};

use crate::error::AppResult;
use crate::generator::{process_generation, GenerationJob};
use crate::response::{DataResponse, DeleteResponse};
use crate::state::AppState;
use crate::store::{GenerationRecord, ModelRun};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// GET /api/models
pub async fn list_models() -> Json<DataResponse<&'static [ModelInfo]>> {
    Json(DataResponse {
        data: catalog::AVAILABLE_MODELS,
    })
}

/// POST /api/generations
///
/// Creates a `processing` generation with one `pending` row per model,
/// spawns background processing without awaiting it, and answers right
/// away with the new id.
pub async fn submit_generation(
    State(state): State<AppState>,
    Json(input): Json<SubmitGenerationRequest>,
) -> AppResult<impl IntoResponse> {
    validate_submit_request(&input)?;

    let now = Utc::now();
    let generation_id = uuid::Uuid::now_v7().to_string();
    let record = GenerationRecord {
        id: generation_id.clone(),
        prompt: input.prompt.clone(),
        negative_prompt: input.negative_prompt.clone(),
        aspect_ratio: input.aspect_ratio.clone(),
        status: GenerationStatus::Processing,
        created_at: now,
        updated_at: now,
        models: input
            .model_ids
            .iter()
            .map(|id| ModelRun {
                model_id: id.clone(),
                model_name: catalog::model_display_name(id),
                status: GenerationStatus::Pending,
                error: None,
            })
            .collect(),
        images: Vec::new(),
        reference_images: input.reference_images.clone(),
    };
    state.store.insert(record).await?;

    let job = GenerationJob {
        generation_id: generation_id.clone(),
        prompt: input.prompt,
        aspect_ratio: input.aspect_ratio,
        model_ids: input.model_ids,
        reference_urls: input.reference_images.into_iter().map(|r| r.url).collect(),
    };
    tracing::info!(
        generation_id = %generation_id,
        models = job.model_ids.len(),
        aspect_ratio = %job.aspect_ratio,
        "Generation accepted",
    );
    tokio::spawn(process_generation(
        state.store.clone(),
        state.provider.clone(),
        job,
    ));

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmitGenerationResponse {
                generation_id,
                status: GenerationStatus::Processing,
            },
        }),
    ))
}

/// GET /api/generations?limit=&offset=
pub async fn list_generations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<Vec<Generation>>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = params.offset.unwrap_or(0);

    let records = state.store.list(limit, offset).await?;
    Ok(Json(DataResponse {
        data: records.iter().map(GenerationRecord::to_generation).collect(),
    }))
}

/// GET /api/generations/{id}
pub async fn get_generation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<GenerationRecord>>> {
    let record = state.store.get(&id).await?.ok_or(CoreError::NotFound {
        entity: "Generation",
        id,
    })?;
    Ok(Json(DataResponse { data: record }))
}

/// DELETE /api/generations/{id}
pub async fn delete_generation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<DeleteResponse>>> {
    if !state.store.delete(&id).await? {
        return Err(CoreError::NotFound {
            entity: "Generation",
            id,
        }
        .into());
    }
    tracing::info!(generation_id = %id, "Generation deleted");
    Ok(Json(DataResponse {
        data: DeleteResponse { success: true },
    }))
}
