//! Stack configuration: which buckets the pipeline uses, who uploads, who is
//! notified and where the custom host key comes from.
//!
//! ```toml
//! notification_emails = ["ops@example.com"]
//!
//! [buckets]
//! source = "sftp-uploads"
//! archive = "sftp-archive"
//!
//! [sftp]
//! move_to_archive = true
//!
//! [host_key]
//! use_custom_key = true
//! server_id = "s-0123456789abcdef0"
//! host_key_secret_arn = "arn:aws:secretsmanager:eu-west-1:123456789012:secret:sftp-host-key"
//! host_key_version = "1"
//!
//! [[users]]
//! user_name = "testuser"
//! public_key = "ssh-ed25519 AAAA..."
//! ```

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;
const USER_NAME_MIN_LEN: usize = 3;
const USER_NAME_MAX_LEN: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StackConfig {
    pub buckets: BucketSection,
    #[serde(default)]
    pub sftp: SftpSection,
    #[serde(default)]
    pub host_key: HostKeySection,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub notification_emails: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketSection {
    pub source: String,
    #[serde(default)]
    pub archive: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SftpSection {
    #[serde(default = "default_move_to_archive")]
    pub move_to_archive: bool,
}

impl Default for SftpSection {
    fn default() -> Self {
        Self {
            move_to_archive: default_move_to_archive(),
        }
    }
}

fn default_move_to_archive() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostKeySection {
    #[serde(default)]
    pub use_custom_key: bool,
    #[serde(default)]
    pub server_id: String,
    #[serde(default)]
    pub host_key_secret_arn: String,
    /// Bump to force the key to be re-applied on the next deployment.
    #[serde(default = "default_host_key_version")]
    pub host_key_version: String,
}

impl Default for HostKeySection {
    fn default() -> Self {
        Self {
            use_custom_key: false,
            server_id: String::new(),
            host_key_secret_arn: String::new(),
            host_key_version: default_host_key_version(),
        }
    }
}

fn default_host_key_version() -> String {
    "0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub user_name: String,
    #[serde(default)]
    pub public_key: String,
}

impl User {
    /// Key prefix the user is confined to inside the source bucket.
    pub fn home_prefix(&self) -> String {
        format!("home/{}/", self.user_name)
    }
}

impl StackConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// The archive bucket, when archiving is switched on.
    pub fn archive_bucket(&self) -> Option<&str> {
        if self.sftp.move_to_archive {
            self.buckets.archive.as_deref()
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_bucket_name("buckets.source", &self.buckets.source)?;

        if self.sftp.move_to_archive {
            let archive = self.buckets.archive.as_deref().ok_or_else(|| {
                ConfigError::invalid("buckets.archive", "required when sftp.move_to_archive is set")
            })?;
            ensure_bucket_name("buckets.archive", archive)?;
            if archive == self.buckets.source {
                return Err(ConfigError::invalid(
                    "buckets.archive",
                    "must differ from buckets.source",
                ));
            }
        }

        if self.host_key.use_custom_key {
            if self.host_key.host_key_secret_arn.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "host_key.host_key_secret_arn",
                    "required when importing a custom host key",
                ));
            }
            if self.host_key.server_id.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "host_key.server_id",
                    "required when importing a custom host key",
                ));
            }
        }

        for user in &self.users {
            ensure_user_name(&user.user_name)?;
        }

        for email in &self.notification_emails {
            ensure_email(email)?;
        }

        Ok(())
    }
}

fn ensure_bucket_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if name.len() < BUCKET_NAME_MIN_LEN || name.len() > BUCKET_NAME_MAX_LEN {
        return Err(ConfigError::invalid(
            field,
            format!("`{name}` must be between 3 and 63 characters"),
        ));
    }
    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
    {
        return Err(ConfigError::invalid(
            field,
            format!("`{name}` may only contain lowercase letters, digits, dots and hyphens"),
        ));
    }
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
        return Err(ConfigError::invalid(
            field,
            format!("`{name}` must start and end with a letter or digit"),
        ));
    }
    Ok(())
}

fn ensure_user_name(name: &str) -> Result<(), ConfigError> {
    let field = format!("users.{name}");
    if name.len() < USER_NAME_MIN_LEN || name.len() > USER_NAME_MAX_LEN {
        return Err(ConfigError::invalid(field, "must be 3 to 100 characters"));
    }
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '@' | '.' | '-'));
    if !first_ok || !rest_ok {
        return Err(ConfigError::invalid(
            field,
            "allowed characters are letters, digits, `_`, `@`, `.` and `-`, not leading `@.-`",
        ));
    }
    Ok(())
}

fn ensure_email(email: &str) -> Result<(), ConfigError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && domain.contains('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            "notification_emails",
            format!("`{email}` is not an email address"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StackConfig};

    const FULL: &str = r#"
notification_emails = ["ops@example.com"]

[buckets]
source = "sftp-uploads"
archive = "sftp-archive"

[host_key]
use_custom_key = true
server_id = "s-0123456789abcdef0"
host_key_secret_arn = "arn:aws:secretsmanager:eu-west-1:123456789012:secret:sftp-host-key"

[[users]]
user_name = "testuser"
public_key = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5"
"#;

    fn invalid_field(err: ConfigError) -> String {
        match err {
            ConfigError::Invalid { field, .. } => field,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn full_config_parses_with_defaults() {
        let config = StackConfig::from_toml_str(FULL).expect("valid");
        assert!(config.sftp.move_to_archive);
        assert_eq!(config.archive_bucket(), Some("sftp-archive"));
        assert_eq!(config.host_key.host_key_version, "0");
        assert_eq!(config.users[0].home_prefix(), "home/testuser/");
    }

    #[test]
    fn archive_bucket_required_when_archiving() {
        let err = StackConfig::from_toml_str("[buckets]\nsource = \"sftp-uploads\"\n")
            .expect_err("missing archive");
        assert_eq!(invalid_field(err), "buckets.archive");
    }

    #[test]
    fn archiving_can_be_disabled() {
        let config = StackConfig::from_toml_str(
            "[buckets]\nsource = \"sftp-uploads\"\narchive = \"sftp-archive\"\n[sftp]\nmove_to_archive = false\n",
        )
        .expect("valid");
        assert_eq!(config.archive_bucket(), None);
    }

    #[test]
    fn custom_key_requires_secret_arn() {
        let source = FULL.replace(
            "host_key_secret_arn = \"arn:aws:secretsmanager:eu-west-1:123456789012:secret:sftp-host-key\"",
            "",
        );
        let err = StackConfig::from_toml_str(&source).expect_err("missing arn");
        assert_eq!(invalid_field(err), "host_key.host_key_secret_arn");
    }

    #[test]
    fn rejects_bad_names() {
        let bucket = FULL.replace("sftp-uploads", "Uploads_Bucket");
        assert_eq!(
            invalid_field(StackConfig::from_toml_str(&bucket).expect_err("bucket")),
            "buckets.source"
        );

        let user = FULL.replace("testuser", "-x");
        assert_eq!(
            invalid_field(StackConfig::from_toml_str(&user).expect_err("user")),
            "users.-x"
        );

        let email = FULL.replace("ops@example.com", "ops.example.com");
        assert_eq!(
            invalid_field(StackConfig::from_toml_str(&email).expect_err("email")),
            "notification_emails"
        );
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = StackConfig::from_toml_str("[buckets\nsource=").expect_err("toml");
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
