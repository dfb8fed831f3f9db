//! AWS SDK backed providers.
//!
//! Clients are built once from a shared [`SdkConfig`] and reused for the
//! lifetime of the process.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use sftpflow_contract::CopySource;
use tracing::debug;

use crate::error::ProviderError;
use crate::traits::{EndpointManager, ObjectStore, SecretStore};

/// Load region and credentials from the default provider chain.
pub async fn load_sdk_config() -> SdkConfig {
    aws_config::load_defaults(BehaviorVersion::latest()).await
}

fn upstream<E: std::error::Error>(operation: &'static str, err: E) -> ProviderError {
    ProviderError::upstream(operation, DisplayErrorContext(err).to_string())
}

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self::from_client(aws_sdk_s3::Client::new(sdk_config))
    }

    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn copy_object(
        &self,
        source: &CopySource,
        dest_bucket: &str,
        dest_key: &str,
    ) -> Result<(), ProviderError> {
        debug!(source = %source, dest_bucket, dest_key, "CopyObject");
        match self
            .client
            .copy_object()
            .bucket(dest_bucket)
            .copy_source(source.to_string())
            .key(dest_key)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.code() == Some("NoSuchKey") {
                    Err(ProviderError::ObjectNotFound {
                        bucket: source.bucket.clone(),
                        key: source
                            .decoded_key()
                            .unwrap_or_else(|_| source.encoded_key.clone()),
                    })
                } else {
                    Err(upstream("CopyObject", service_err))
                }
            }
        }
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ProviderError> {
        debug!(bucket, key, "DeleteObject");
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| upstream("DeleteObject", err.into_service_error()))?;
        Ok(())
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, ProviderError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(upstream("HeadObject", service_err))
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecretsManagerStore {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManagerStore {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl SecretStore for SecretsManagerStore {
    async fn secret_string(&self, secret_id: &str) -> Result<String, ProviderError> {
        let output = match self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_resource_not_found_exception() {
                    return Err(ProviderError::SecretNotFound(secret_id.to_string()));
                }
                return Err(upstream("GetSecretValue", service_err));
            }
        };

        output
            .secret_string()
            .map(str::to_owned)
            .ok_or_else(|| ProviderError::SecretNotString(secret_id.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct TransferEndpointManager {
    client: aws_sdk_transfer::Client,
}

impl TransferEndpointManager {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_transfer::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl EndpointManager for TransferEndpointManager {
    async fn update_host_key(
        &self,
        server_id: &str,
        host_key: &str,
    ) -> Result<String, ProviderError> {
        self.client
            .update_server()
            .server_id(server_id)
            .host_key(host_key)
            .send()
            .await
            .map_err(|err| upstream("UpdateServer", err.into_service_error()))?;
        Ok(server_id.to_string())
    }
}
