use std::collections::HashSet;

use sftpflow_contract::{ContractError, ObjectKey, SnsEvent};
use tracing::{debug, info};

/// One object to move out of the staging bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveTask {
    pub source_bucket: String,
    pub key: ObjectKey,
}

/// Flatten messages → records → objects into a single list of move tasks.
///
/// Every message is parsed and every key decoded before any task is returned,
/// so a malformed batch fails before a single copy is issued. A key repeated
/// within the batch is only moved once.
pub fn plan_moves(event: &SnsEvent) -> Result<Vec<MoveTask>, ContractError> {
    let mut seen = HashSet::new();
    let mut tasks = Vec::new();

    for record in &event.records {
        let notification = record.s3_notification()?;
        if notification.is_test_event() {
            info!(
                message_id = record.sns.message_id.as_deref().unwrap_or_default(),
                "skipping S3 test event"
            );
        }

        for s3_record in notification.into_records()? {
            let bucket = s3_record.s3.bucket.name;
            let key = ObjectKey::from_encoded(s3_record.s3.object.key)?;
            if !seen.insert((bucket.clone(), key.decoded().to_string())) {
                debug!(bucket = %bucket, key = key.decoded(), "duplicate record in batch");
                continue;
            }
            tasks.push(MoveTask {
                source_bucket: bucket,
                key,
            });
        }
    }

    Ok(tasks)
}
