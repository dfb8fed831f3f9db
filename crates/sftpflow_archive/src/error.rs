use std::fmt;

use sftpflow_contract::ContractError;
use sftpflow_providers::ProviderError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStage {
    Copy,
    Delete,
    /// Checking the archive after the source turned out to be gone.
    Verify,
}

impl fmt::Display for MoveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::Copy => "copy",
            Self::Delete => "delete",
            Self::Verify => "archive lookup",
        };
        f.write_str(stage)
    }
}

#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct MoveFailure {
    pub stage: MoveStage,
    #[source]
    pub source: ProviderError,
}

impl MoveFailure {
    pub fn new(stage: MoveStage, source: ProviderError) -> Self {
        Self { stage, source }
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Validation(#[from] ContractError),
    #[error("{failed} of {total} object moves failed, first `{key}`: {first}")]
    PartialBatch {
        failed: usize,
        total: usize,
        key: String,
        #[source]
        first: MoveFailure,
    },
}
