use crate::stack::ConfigError;

pub const ARCHIVE_BUCKET_VAR: &str = "ARCHIVE_BUCKET";
pub const ARCHIVE_CONCURRENCY_VAR: &str = "ARCHIVE_CONCURRENCY";

/// Settings the archive function reads from its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEnv {
    pub archive_bucket: String,
    /// `None` leaves the mover's default in place.
    pub concurrency: Option<usize>,
}

impl ArchiveEnv {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let archive_bucket = lookup(ARCHIVE_BUCKET_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::invalid(ARCHIVE_BUCKET_VAR, "must be set"))?;

        let concurrency = match lookup(ARCHIVE_CONCURRENCY_VAR) {
            None => None,
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => Some(value),
                _ => {
                    return Err(ConfigError::invalid(
                        ARCHIVE_CONCURRENCY_VAR,
                        format!("`{raw}` is not a positive integer"),
                    ))
                }
            },
        };

        Ok(Self {
            archive_bucket,
            concurrency,
        })
    }
}
