use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("invalid {what} payload: {source}")]
    Payload {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("S3 notification carries no Records")]
    MissingRecords,
    #[error("malformed object key `{key}`: {reason}")]
    MalformedKey { key: String, reason: &'static str },
    #[error("invalid RequestType `{0}`")]
    InvalidRequestType(String),
    #[error("missing {0}")]
    MissingField(&'static str),
}
