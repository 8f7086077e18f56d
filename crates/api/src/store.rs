//! Generation persistence.
//!
//! [`GenerationStore`] is the seam between handlers / background processing
//! and whatever holds the records. [`MemoryStore`] keeps everything in
//! process; records are lost on restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use studio_core::generation::{Generation, GenerationStatus, ImageRecord, ReferenceImage};
use studio_core::types::{GenerationId, ImageId, Timestamp};
use tokio::sync::RwLock;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Progress of one model inside a generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRun {
    pub model_id: String,
    pub model_name: String,
    pub status: GenerationStatus,
    pub error: Option<String>,
}

/// A finished image as stored.
///
/// `seq` is assigned by the store and strictly increases across all
/// images, so "images newer than the last one sent" is a plain comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub id: ImageId,
    pub generation_id: GenerationId,
    pub url: String,
    pub model_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub created_at: Timestamp,
    #[serde(skip)]
    pub seq: u64,
}

/// Image data handed to [`GenerationStore::add_image`].
#[derive(Debug, Clone)]
pub struct NewImage {
    pub url: String,
    pub model_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub id: GenerationId,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub aspect_ratio: String,
    pub status: GenerationStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub models: Vec<ModelRun>,
    pub images: Vec<StoredImage>,
    pub reference_images: Vec<ReferenceImage>,
}

impl GenerationRecord {
    /// The client-facing projection used by list responses.
    pub fn to_generation(&self) -> Generation {
        Generation {
            id: self.id.clone(),
            prompt: self.prompt.clone(),
            negative_prompt: self.negative_prompt.clone(),
            aspect_ratio: self.aspect_ratio.clone(),
            created_at: self.created_at,
            images: self
                .images
                .iter()
                .map(|img| ImageRecord {
                    id: img.id.clone(),
                    url: img.url.clone(),
                    model_name: img.model_name.clone(),
                    width: img.width,
                    height: img.height,
                    is_placeholder: false,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Generation {0} not found")]
    NotFound(GenerationId),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn insert(&self, record: GenerationRecord) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<GenerationRecord>, StoreError>;

    /// Newest first.
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<GenerationRecord>, StoreError>;

    /// Returns `false` when nothing was deleted.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    async fn set_status(&self, id: &str, status: GenerationStatus) -> Result<(), StoreError>;

    async fn set_model_status(
        &self,
        id: &str,
        model_id: &str,
        status: GenerationStatus,
        error: Option<String>,
    ) -> Result<(), StoreError>;

    async fn add_image(&self, id: &str, image: NewImage) -> Result<StoredImage, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<GenerationId, GenerationRecord>>,
    next_seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, id: &str, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut GenerationRecord),
    {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        f(record);
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl GenerationStore for MemoryStore {
    async fn insert(&self, record: GenerationRecord) -> Result<(), StoreError> {
        self.records.write().await.insert(record.id.clone(), record);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<GenerationRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<GenerationRecord>, StoreError> {
        let records = self.records.read().await;
        let mut all: Vec<&GenerationRecord> = records.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(id).is_some())
    }

    async fn set_status(&self, id: &str, status: GenerationStatus) -> Result<(), StoreError> {
        self.update(id, |record| record.status = status).await
    }

    async fn set_model_status(
        &self,
        id: &str,
        model_id: &str,
        status: GenerationStatus,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        self.update(id, |record| {
            for run in record.models.iter_mut().filter(|m| m.model_id == model_id) {
                run.status = status;
                run.error = error.clone();
            }
        })
        .await
    }

    async fn add_image(&self, id: &str, image: NewImage) -> Result<StoredImage, StoreError> {
        let stored = StoredImage {
            id: uuid::Uuid::new_v4().to_string(),
            generation_id: id.to_string(),
            url: image.url,
            model_name: image.model_name,
            width: image.width,
            height: image.height,
            created_at: Utc::now(),
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst) + 1,
        };
        let pushed = stored.clone();
        self.update(id, move |record| record.images.push(pushed)).await?;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Duration;

    use super::*;

    fn record(id: &str, age_minutes: i64) -> GenerationRecord {
        let created_at = Utc::now() - Duration::minutes(age_minutes);
        GenerationRecord {
            id: id.to_string(),
            prompt: "p".into(),
            negative_prompt: None,
            aspect_ratio: "1:1".into(),
            status: GenerationStatus::Processing,
            created_at,
            updated_at: created_at,
            models: vec![ModelRun {
                model_id: "m1".into(),
                model_name: "M1".into(),
                status: GenerationStatus::Pending,
                error: None,
            }],
            images: Vec::new(),
            reference_images: Vec::new(),
        }
    }

    fn image() -> NewImage {
        NewImage {
            url: "https://cdn/x.png".into(),
            model_name: "M1".into(),
            width: None,
            height: None,
        }
    }

    #[tokio::test]
    async fn list_is_newest_first_and_paginated() {
        let store = MemoryStore::new();
        store.insert(record("old", 10)).await.unwrap();
        store.insert(record("mid", 5)).await.unwrap();
        store.insert(record("new", 0)).await.unwrap();

        let page: Vec<String> = store
            .list(2, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(page, vec!["new", "mid"]);

        let rest = store.list(2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, "old");
    }

    #[tokio::test]
    async fn image_sequence_increases() {
        let store = MemoryStore::new();
        store.insert(record("g", 0)).await.unwrap();

        let a = store.add_image("g", image()).await.unwrap();
        let b = store.add_image("g", image()).await.unwrap();

        assert!(b.seq > a.seq);
        assert_eq!(store.get("g").await.unwrap().unwrap().images.len(), 2);
    }

    #[tokio::test]
    async fn model_status_records_error() {
        let store = MemoryStore::new();
        store.insert(record("g", 0)).await.unwrap();

        store
            .set_model_status("g", "m1", GenerationStatus::Failed, Some("boom".into()))
            .await
            .unwrap();

        let run = &store.get("g").await.unwrap().unwrap().models[0];
        assert_eq!(run.status, GenerationStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn updates_to_missing_generation_are_not_found() {
        let store = MemoryStore::new();
        let err = store
            .set_status("nope", GenerationStatus::Completed)
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::NotFound(id) if id == "nope");
        assert!(store.add_image("nope", image()).await.is_err());
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let store = MemoryStore::new();
        store.insert(record("g", 0)).await.unwrap();

        assert!(store.delete("g").await.unwrap());
        assert!(!store.delete("g").await.unwrap());
    }
}
