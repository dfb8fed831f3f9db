use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("object s3://{bucket}/{key} not found")]
    ObjectNotFound { bucket: String, key: String },
    #[error("secret `{0}` not found")]
    SecretNotFound(String),
    #[error("secret `{0}` has no string value")]
    SecretNotString(String),
    #[error("{operation} failed: {message}")]
    Upstream {
        operation: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn upstream(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Upstream {
            operation,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. })
    }
}
