// libs/schedule-cell/src/services/committer.rs
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::store::StoreClient;

use crate::models::{
    CandidateSlot, CommitProgress, RejectedSlot, ScheduleError, SlotCommitItem, SlotCommitOutcome,
};

pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// Submits candidate slots to the backing store in bounded, strictly
/// sequential chunks. Sequential submission keeps progress monotonic and
/// gives the store's overlap validation a consistent view between chunks;
/// the store remains the authority on per-item accept/reject.
pub struct SlotCommitService {
    store: StoreClient,
    chunk_size: usize,
}

impl SlotCommitService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(config: &AppConfig, chunk_size: usize) -> Self {
        Self {
            store: StoreClient::new(config),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Commit candidates, reporting `(processed, total)` after every chunk.
    ///
    /// Partial success is an accepted outcome: rejected candidates are
    /// returned with their reasons alongside whatever was created. A
    /// transport-level failure aborts the unsent remainder and surfaces the
    /// aggregate committed so far; already-created slots are never rolled
    /// back. No retry, no backoff.
    pub async fn commit_slots<F>(
        &self,
        candidates: &[CandidateSlot],
        mut on_progress: F,
        auth_token: &str,
    ) -> Result<SlotCommitOutcome, ScheduleError>
    where
        F: FnMut(CommitProgress),
    {
        if candidates.is_empty() {
            return Err(ScheduleError::Validation(
                "no candidate slots to commit".to_string(),
            ));
        }

        let total = candidates.len();
        let mut created = Vec::new();
        let mut rejected = Vec::new();
        let mut processed = 0usize;

        for chunk in candidates.chunks(self.chunk_size) {
            debug!(
                "Submitting chunk of {} candidate slots ({}/{} processed)",
                chunk.len(),
                processed,
                total
            );

            let body = json!({ "candidates": chunk });
            let results: Vec<SlotCommitItem> = match self
                .store
                .request(Method::POST, "/rest/v1/rpc/commit_slots", Some(auth_token), Some(body))
                .await
            {
                Ok(items) => items,
                Err(e) => {
                    warn!(
                        "Batch commit aborted after {}/{} slots: {}",
                        processed, total, e
                    );
                    return Err(ScheduleError::Transport {
                        message: e.to_string(),
                        created,
                        rejected,
                        processed,
                        total,
                    });
                }
            };

            for item in results {
                match item {
                    SlotCommitItem::Created { slot } => created.push(slot),
                    SlotCommitItem::Rejected { candidate, reason } => {
                        rejected.push(RejectedSlot { candidate, reason })
                    }
                }
            }

            processed += chunk.len();
            on_progress(CommitProgress { processed, total });
        }

        if created.is_empty() && !rejected.is_empty() {
            warn!(
                "All {} candidate slots rejected by overlap validation",
                rejected.len()
            );
            return Err(ScheduleError::AllRejected { rejected });
        }

        info!(
            "Committed {} slots for schedule, {} rejected",
            created.len(),
            rejected.len()
        );

        Ok(SlotCommitOutcome { created, rejected })
    }
}
