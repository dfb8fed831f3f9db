use async_trait::async_trait;
use sftpflow_contract::CopySource;

use crate::error::ProviderError;

/// Bucket/key object storage with server-side copy.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Copy `source` to `dest_bucket/dest_key` without moving bytes through the caller.
    /// Returns [`ProviderError::ObjectNotFound`] when the source does not exist.
    async fn copy_object(
        &self,
        source: &CopySource,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<(), ProviderError>;

    /// Deleting a key that does not exist succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ProviderError>;

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, ProviderError>;
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn secret_string(&self, secret_id: &str) -> Result<String, ProviderError>;
}

/// Management API of the SFTP endpoint.
#[async_trait]
pub trait EndpointManager: Send + Sync {
    /// Install `host_key` on the server and return the server id it reports.
    async fn update_host_key(&self, server_id: &str, host_key: &str)
        -> Result<String, ProviderError>;
}
