pub mod env;
pub mod stack;

pub use env::{ArchiveEnv, ARCHIVE_BUCKET_VAR, ARCHIVE_CONCURRENCY_VAR};
pub use stack::{BucketSection, ConfigError, HostKeySection, SftpSection, StackConfig, User};
