use std::sync::Arc;

use sftpflow_contract::S3Notification;
use sftpflow_providers::InMemoryObjectStore;
use tracing::info;

use crate::topic::Topic;

/// A staging bucket that publishes an object-created notification to a topic
/// after every completed write.
#[derive(Clone)]
pub struct BucketNotifier {
    bucket: String,
    store: Arc<InMemoryObjectStore>,
}

impl BucketNotifier {
    pub fn new(bucket: impl Into<String>, store: Arc<InMemoryObjectStore>) -> Self {
        Self {
            bucket: bucket.into(),
            store,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store the object, then publish. Returns the published message id.
    pub async fn put_object(
        &self,
        topic: &Topic,
        key: &str,
        body: impl Into<Vec<u8>>,
    ) -> anyhow::Result<String> {
        let body = body.into();
        let size = body.len() as u64;
        self.store.put_object(&self.bucket, key, body).await;

        let notification = S3Notification::object_created(&self.bucket, key, Some(size));
        let message = serde_json::to_string(&notification)?;
        let message_id = topic.publish(Some("Amazon S3 Notification"), message);
        info!(bucket = %self.bucket, key, message_id = %message_id, "upload notification published");
        Ok(message_id)
    }
}
