use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ContractError;

/// A lifecycle request from the deployment orchestrator for the host key resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "RequestType")]
pub enum HostKeyEvent {
    Create {
        #[serde(rename = "RequestId")]
        request_id: String,
        #[serde(rename = "ResourceProperties", default)]
        properties: HostKeyProperties,
    },
    Update {
        #[serde(rename = "RequestId")]
        request_id: String,
        #[serde(
            rename = "PhysicalResourceId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        physical_resource_id: Option<String>,
        #[serde(rename = "ResourceProperties", default)]
        properties: HostKeyProperties,
    },
    Delete {
        #[serde(rename = "RequestId")]
        request_id: String,
        #[serde(
            rename = "PhysicalResourceId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        physical_resource_id: Option<String>,
        #[serde(rename = "ResourceProperties", default)]
        properties: HostKeyProperties,
    },
}

impl HostKeyEvent {
    pub fn request_type(&self) -> &'static str {
        match self {
            Self::Create { .. } => "Create",
            Self::Update { .. } => "Update",
            Self::Delete { .. } => "Delete",
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            Self::Create { request_id, .. }
            | Self::Update { request_id, .. }
            | Self::Delete { request_id, .. } => request_id,
        }
    }

    pub fn properties(&self) -> &HostKeyProperties {
        match self {
            Self::Create { properties, .. }
            | Self::Update { properties, .. }
            | Self::Delete { properties, .. } => properties,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostKeyProperties {
    #[serde(rename = "serverId", default)]
    pub server_id: String,
    #[serde(rename = "hostKeySecretArn", default)]
    pub host_key_secret_arn: String,
    /// Changing this value is what makes the orchestrator send an `Update`.
    #[serde(rename = "hostKeyVersion", default)]
    pub host_key_version: String,
}

impl HostKeyProperties {
    pub fn validate(&self) -> Result<HostKeyRequest, ContractError> {
        if self.server_id.trim().is_empty() {
            return Err(ContractError::MissingField("serverId"));
        }
        if self.host_key_secret_arn.trim().is_empty() {
            return Err(ContractError::MissingField("hostKeySecretArn"));
        }
        Ok(HostKeyRequest {
            server_id: self.server_id.clone(),
            host_key_secret_arn: self.host_key_secret_arn.clone(),
            host_key_version: self.host_key_version.clone(),
        })
    }
}

/// Properties that passed validation for a `Create` or `Update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostKeyRequest {
    pub server_id: String,
    pub host_key_secret_arn: String,
    pub host_key_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomResourceResponse {
    #[serde(
        rename = "PhysicalResourceId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub physical_resource_id: Option<String>,
}

pub fn decode_host_key_event(payload: Value) -> Result<HostKeyEvent, ContractError> {
    let request_type = payload
        .get("RequestType")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !matches!(request_type, "Create" | "Update" | "Delete") {
        return Err(ContractError::InvalidRequestType(request_type.to_string()));
    }

    serde_json::from_value(payload).map_err(|source| ContractError::Payload {
        what: "custom resource request",
        source,
    })
}
