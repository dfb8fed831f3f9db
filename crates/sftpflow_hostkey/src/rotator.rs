use std::sync::Arc;

use serde_json::Value;
use sftpflow_contract::{
    decode_host_key_event, ContractError, CustomResourceResponse, HostKeyEvent, HostKeyRequest,
};
use sftpflow_providers::{EndpointManager, ProviderError, SecretStore};
use thiserror::Error;
use tracing::{error, info};

use crate::key_material::decode_host_key;

#[derive(Debug, Error)]
pub enum RotatorError {
    #[error(transparent)]
    Validation(#[from] ContractError),
    #[error("failed to read host key secret: {0}")]
    SecretFetch(#[source] ProviderError),
    #[error("host key secret is unusable: {0}")]
    KeyMaterial(String),
    #[error("failed to update server host key: {0}")]
    EndpointUpdate(#[source] ProviderError),
}

/// Pushes the host key stored in a secret onto the SFTP endpoint whenever the
/// deployment creates or updates the resource.
#[derive(Clone)]
pub struct HostKeyRotator {
    secrets: Arc<dyn SecretStore>,
    endpoint: Arc<dyn EndpointManager>,
}

impl HostKeyRotator {
    pub fn new(secrets: Arc<dyn SecretStore>, endpoint: Arc<dyn EndpointManager>) -> Self {
        Self { secrets, endpoint }
    }

    pub async fn handle(&self, payload: Value) -> Result<CustomResourceResponse, RotatorError> {
        info!(event = %payload, "host key rotator received event");
        let result = match decode_host_key_event(payload) {
            Ok(event) => self.reconcile(event).await,
            Err(err) => Err(err.into()),
        };

        if let Err(err) = &result {
            error!(error = %err, "host key rotation failed");
        }
        result
    }

    pub async fn reconcile(
        &self,
        event: HostKeyEvent,
    ) -> Result<CustomResourceResponse, RotatorError> {
        match event {
            HostKeyEvent::Delete {
                physical_resource_id,
                ..
            } => {
                // the server keeps whatever key it has
                info!("delete request received, nothing to do");
                Ok(CustomResourceResponse {
                    physical_resource_id,
                })
            }
            HostKeyEvent::Create {
                request_id,
                properties,
            } => {
                self.apply(&properties.validate()?).await?;
                Ok(CustomResourceResponse {
                    physical_resource_id: Some(request_id),
                })
            }
            HostKeyEvent::Update {
                physical_resource_id,
                properties,
                ..
            } => {
                self.apply(&properties.validate()?).await?;
                Ok(CustomResourceResponse {
                    physical_resource_id,
                })
            }
        }
    }

    /// Always re-applies the key; `host_key_version` is only reported.
    async fn apply(&self, request: &HostKeyRequest) -> Result<(), RotatorError> {
        info!(secret = %request.host_key_secret_arn, "fetching host key");
        let secret = self
            .secrets
            .secret_string(&request.host_key_secret_arn)
            .await
            .map_err(RotatorError::SecretFetch)?;
        let host_key = decode_host_key(&secret)?;

        info!(server_id = %request.server_id, "updating server host key");
        let server_id = self
            .endpoint
            .update_host_key(&request.server_id, &host_key)
            .await
            .map_err(RotatorError::EndpointUpdate)?;
        info!(
            server_id = %server_id,
            version = %request.host_key_version,
            "host key updated"
        );
        Ok(())
    }
}
