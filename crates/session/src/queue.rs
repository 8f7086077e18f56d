//! Client-side job queue with a single-concurrency drain guard.
//!
//! Items are held in insertion order. [`JobQueue::try_claim_next`] claims the
//! first `pending` item and sets the drain guard; nothing else can be claimed
//! until [`JobQueue::finish`] removes that item and releases the guard.

use std::sync::atomic::{AtomicBool, Ordering};

use studio_core::generation::ReferenceImage;

/// Lifecycle of a queue item.
///
/// Items only reach `Completed` or `Failed` on their way out of the queue,
/// so a snapshot normally shows `Pending` and at most one `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One user submission: a prompt fanned out over aspect ratios and models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    pub id: String,
    pub prompt: String,
    pub negative_prompt: Option<String>,
    pub aspect_ratios: Vec<String>,
    pub model_ids: Vec<String>,
    /// Display names used for the optimistic placeholders.
    pub model_names: Vec<String>,
    /// Style ids already folded into `prompt`.
    pub selected_styles: Vec<String>,
    pub reference_images: Vec<ReferenceImage>,
    pub status: QueueStatus,
    pub error: Option<String>,
}

/// Ordered list of queue items plus the "drain in progress" flag.
#[derive(Debug, Default)]
pub struct JobQueue {
    items: Vec<QueueItem>,
    draining: AtomicBool,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item; it is forced to `Pending`.
    pub fn push(&mut self, mut item: QueueItem) {
        item.status = QueueStatus::Pending;
        item.error = None;
        self.items.push(item);
    }

    /// Claim the first pending item for submission.
    ///
    /// Returns `None` when a drain is already in progress or nothing is
    /// pending. On success the item is marked `Processing` and the guard
    /// stays set until [`finish`](Self::finish) is called for it.
    pub fn try_claim_next(&mut self) -> Option<QueueItem> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        match self
            .items
            .iter_mut()
            .find(|item| item.status == QueueStatus::Pending)
        {
            Some(item) => {
                item.status = QueueStatus::Processing;
                Some(item.clone())
            }
            None => {
                self.draining.store(false, Ordering::Release);
                None
            }
        }
    }

    /// Remove a claimed item and release the drain guard.
    ///
    /// `outcome` is `Err(message)` when submission failed. The removed item
    /// is returned with its final status for logging; `None` means the id
    /// was unknown (the guard is still released).
    pub fn finish(&mut self, item_id: &str, outcome: Result<(), String>) -> Option<QueueItem> {
        let removed = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .map(|idx| {
                let mut item = self.items.remove(idx);
                match outcome {
                    Ok(()) => item.status = QueueStatus::Completed,
                    Err(message) => {
                        item.status = QueueStatus::Failed;
                        item.error = Some(message);
                    }
                }
                item
            });

        self.draining.store(false, Ordering::Release);
        removed
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.count(QueueStatus::Pending)
    }

    pub fn processing_count(&self) -> usize {
        self.count(QueueStatus::Processing)
    }

    fn count(&self, status: QueueStatus) -> usize {
        self.items.iter().filter(|item| item.status == status).count()
    }
}
