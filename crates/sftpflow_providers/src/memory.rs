use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sftpflow_contract::CopySource;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::ProviderError;
use crate::traits::{EndpointManager, ObjectStore, SecretStore};

type Bucket = BTreeMap<String, Vec<u8>>;

#[derive(Debug, Default)]
struct FailurePlan {
    copy: HashSet<String>,
    delete: HashSet<String>,
}

/// Object storage held in process memory. Keys are plain (decoded) names.
///
/// Copies and deletes can be made to fail per key, and every call is counted
/// so tests can assert which network calls a handler would have made.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    buckets: RwLock<HashMap<String, Bucket>>,
    failures: RwLock<FailurePlan>,
    latency: Option<Duration>,
    copy_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    exists_calls: AtomicUsize,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every copy and delete, to make concurrent dispatch observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn put_object(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.into());
    }

    pub async fn get_object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        let buckets = self.buckets.read().await;
        buckets.get(bucket).and_then(|objects| objects.get(key)).cloned()
    }

    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        self.get_object(bucket, key).await.is_some()
    }

    pub async fn list_keys(&self, bucket: &str) -> Vec<String> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn fail_copy(&self, key: &str) {
        self.failures.write().await.copy.insert(key.to_string());
    }

    pub async fn fail_delete(&self, key: &str) {
        self.failures.write().await.delete.insert(key.to_string());
    }

    pub async fn clear_failures(&self) {
        let mut failures = self.failures.write().await;
        failures.copy.clear();
        failures.delete.clear();
    }

    pub fn copy_calls(&self) -> usize {
        self.copy_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn copy_object(
        &self,
        source: &CopySource,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<(), ProviderError> {
        self.copy_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        let source_key = source
            .decoded_key()
            .map_err(|err| ProviderError::upstream("CopyObject", err.to_string()))?;
        if self.failures.read().await.copy.contains(&source_key) {
            return Err(ProviderError::upstream(
                "CopyObject",
                format!("injected failure for {source_key}"),
            ));
        }

        let mut buckets = self.buckets.write().await;
        let body = buckets
            .get(&source.bucket)
            .and_then(|objects| objects.get(&source_key))
            .cloned()
            .ok_or_else(|| ProviderError::ObjectNotFound {
                bucket: source.bucket.clone(),
                key: source_key.clone(),
            })?;
        buckets
            .entry(dest_bucket.to_string())
            .or_default()
            .insert(dest_key.to_string(), body);
        debug!(source = %source, dest_bucket, dest_key, "in-memory copy");
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ProviderError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.failures.read().await.delete.contains(key) {
            return Err(ProviderError::upstream(
                "DeleteObject",
                format!("injected failure for {key}"),
            ));
        }

        let mut buckets = self.buckets.write().await;
        if let Some(objects) = buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, ProviderError> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.contains(bucket, key).await)
    }
}

#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
    fetches: AtomicUsize,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, secret_id: &str, value: &str) {
        self.secrets
            .write()
            .await
            .insert(secret_id.to_string(), value.to_string());
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn secret_string(&self, secret_id: &str) -> Result<String, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.secrets
            .read()
            .await
            .get(secret_id)
            .cloned()
            .ok_or_else(|| ProviderError::SecretNotFound(secret_id.to_string()))
    }
}

/// Records every host key pushed to it instead of calling a server.
#[derive(Debug, Default)]
pub struct InMemoryEndpointManager {
    applied: RwLock<Vec<(String, String)>>,
    updates: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryEndpointManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// `(server_id, host_key)` pairs in the order they were applied.
    pub async fn applied(&self) -> Vec<(String, String)> {
        self.applied.read().await.clone()
    }
}

#[async_trait]
impl EndpointManager for InMemoryEndpointManager {
    async fn update_host_key(
        &self,
        server_id: &str,
        host_key: &str,
    ) -> Result<String, ProviderError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::upstream(
                "UpdateServer",
                "endpoint management API unavailable",
            ));
        }
        self.applied
            .write()
            .await
            .push((server_id.to_string(), host_key.to_string()));
        Ok(server_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{InMemoryObjectStore, InMemorySecretStore};
    use crate::{ObjectStore, ProviderError, SecretStore};
    use sftpflow_contract::ObjectKey;

    #[tokio::test]
    async fn copy_resolves_encoded_source_key() {
        let store = InMemoryObjectStore::new();
        store.put_object("src", "home/alice/file 1.txt", b"data".to_vec()).await;

        let key = ObjectKey::from_encoded("home/alice/file+1.txt").expect("key");
        store
            .copy_object(&key.copy_source("src"), "archive", key.decoded())
            .await
            .expect("copy");

        assert_eq!(
            store.get_object("archive", "home/alice/file 1.txt").await,
            Some(b"data".to_vec())
        );
        assert!(store.contains("src", "home/alice/file 1.txt").await);
    }

    #[tokio::test]
    async fn copy_of_missing_source_is_not_found() {
        let store = InMemoryObjectStore::new();
        let key = ObjectKey::from_decoded("nothing.txt");
        let err = store
            .copy_object(&key.copy_source("src"), "archive", key.decoded())
            .await
            .expect_err("missing");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn deleting_absent_key_succeeds() {
        let store = InMemoryObjectStore::new();
        store.delete_object("src", "gone.txt").await.expect("delete");
        assert_eq!(store.delete_calls(), 1);
    }

    #[tokio::test]
    async fn injected_failures_are_upstream_errors() {
        let store = InMemoryObjectStore::new();
        store.put_object("src", "a.txt", b"a".to_vec()).await;
        store.fail_copy("a.txt").await;

        let key = ObjectKey::from_decoded("a.txt");
        let err = store
            .copy_object(&key.copy_source("src"), "archive", "a.txt")
            .await
            .expect_err("injected");
        assert!(matches!(err, ProviderError::Upstream { operation: "CopyObject", .. }));

        store.clear_failures().await;
        store
            .copy_object(&key.copy_source("src"), "archive", "a.txt")
            .await
            .expect("copy after clearing");
        assert_eq!(store.copy_calls(), 2);
    }

    #[tokio::test]
    async fn missing_secret_is_reported() {
        let secrets = InMemorySecretStore::new();
        let err = secrets.secret_string("arn:missing").await.expect_err("missing");
        assert!(matches!(err, ProviderError::SecretNotFound(id) if id == "arn:missing"));
        assert_eq!(secrets.fetches(), 1);
    }
}
