use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use sftpflow_contract::{decode_sns_event, SnsEvent};
use sftpflow_providers::ObjectStore;
use tracing::{error, info, warn};

use crate::error::{ArchiveError, MoveFailure, MoveStage};
use crate::plan::{plan_moves, MoveTask};

/// Upper bound on moves in flight within one invocation.
pub const DEFAULT_CONCURRENCY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Moved,
    /// The source was already gone and the archive already holds the key,
    /// i.e. a redelivery of a batch that was moved before.
    AlreadyArchived,
}

#[derive(Debug)]
pub struct MoveOutcome {
    pub source_bucket: String,
    /// Key as delivered, still URL-encoded.
    pub source_key: String,
    pub archive_key: String,
    pub result: Result<Disposition, MoveFailure>,
}

impl MoveOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ArchiveReceipt {
    pub success: bool,
}

#[derive(Clone)]
pub struct ArchiveMover {
    store: Arc<dyn ObjectStore>,
    archive_bucket: String,
    concurrency: usize,
}

impl ArchiveMover {
    pub fn new(store: Arc<dyn ObjectStore>, archive_bucket: impl Into<String>) -> Self {
        Self {
            store,
            archive_bucket: archive_bucket.into(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn archive_bucket(&self) -> &str {
        &self.archive_bucket
    }

    /// Entry point for one invocation payload from the topic subscription.
    pub async fn handle(&self, payload: Value) -> Result<ArchiveReceipt, ArchiveError> {
        info!(event = %payload, "archive mover received event");
        let result = match decode_sns_event(payload) {
            Ok(event) => self.archive_event(&event).await,
            Err(err) => Err(err.into()),
        };

        if let Err(err) = &result {
            error!(error = %err, "archive mover failed");
        }
        result
    }

    pub async fn archive_event(&self, event: &SnsEvent) -> Result<ArchiveReceipt, ArchiveError> {
        let tasks = plan_moves(event)?;
        info!(
            count = tasks.len(),
            keys = ?tasks.iter().map(|task| task.key.decoded()).collect::<Vec<_>>(),
            "flattened S3 records"
        );
        summarize(self.run(tasks).await)
    }

    /// Run every task concurrently and return outcomes in task order.
    pub async fn run(&self, tasks: Vec<MoveTask>) -> Vec<MoveOutcome> {
        let mut outcomes: Vec<(usize, MoveOutcome)> = stream::iter(tasks.into_iter().enumerate())
            .map(|(idx, task)| async move { (idx, self.move_object(task).await) })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        outcomes.sort_by_key(|(idx, _)| *idx);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn move_object(&self, task: MoveTask) -> MoveOutcome {
        let result = self.try_move(&task).await;
        match &result {
            Ok(disposition) => info!(
                bucket = %task.source_bucket,
                key = task.key.decoded(),
                archive = %self.archive_bucket,
                disposition = ?disposition,
                "object archived"
            ),
            Err(failure) => warn!(
                bucket = %task.source_bucket,
                key = task.key.decoded(),
                stage = %failure.stage,
                error = %failure.source,
                "object move failed"
            ),
        }

        MoveOutcome {
            source_bucket: task.source_bucket,
            source_key: task.key.encoded().to_string(),
            archive_key: task.key.decoded().to_string(),
            result,
        }
    }

    /// Copy, then delete. The source is only deleted after a confirmed copy.
    async fn try_move(&self, task: &MoveTask) -> Result<Disposition, MoveFailure> {
        let source = task.key.copy_source(&task.source_bucket);
        let archive_key = task.key.decoded();

        match self
            .store
            .copy_object(&source, &self.archive_bucket, archive_key)
            .await
        {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                let archived = self
                    .store
                    .object_exists(&self.archive_bucket, archive_key)
                    .await
                    .map_err(|lookup| MoveFailure::new(MoveStage::Verify, lookup))?;
                if archived {
                    return Ok(Disposition::AlreadyArchived);
                }
                return Err(MoveFailure::new(MoveStage::Copy, err));
            }
            Err(err) => return Err(MoveFailure::new(MoveStage::Copy, err)),
        }

        match self
            .store
            .delete_object(&task.source_bucket, archive_key)
            .await
        {
            Ok(()) => Ok(Disposition::Moved),
            Err(err) if err.is_not_found() => Ok(Disposition::Moved),
            Err(err) => Err(MoveFailure::new(MoveStage::Delete, err)),
        }
    }
}

/// Collapse per-object outcomes into the invocation result. Any failure fails
/// the whole batch so the event source redelivers it.
pub fn summarize(outcomes: Vec<MoveOutcome>) -> Result<ArchiveReceipt, ArchiveError> {
    let total = outcomes.len();
    let failed = outcomes.iter().filter(|outcome| !outcome.succeeded()).count();

    let first = outcomes.into_iter().find_map(|outcome| {
        let MoveOutcome {
            archive_key, result, ..
        } = outcome;
        result.err().map(|failure| (archive_key, failure))
    });

    match first {
        Some((key, first)) => Err(ArchiveError::PartialBatch {
            failed,
            total,
            key,
            first,
        }),
        None => Ok(ArchiveReceipt { success: true }),
    }
}
