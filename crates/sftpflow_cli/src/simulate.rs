use std::sync::Arc;

use anyhow::{bail, Result};
use sftpflow_archive::ArchiveMover;
use sftpflow_config::StackConfig;
use sftpflow_fanout::{
    ArchiveSubscriber, BucketNotifier, Email, EmailSubscriber, RecordingMailTransport,
    SubscriptionReport, Topic,
};
use sftpflow_providers::InMemoryObjectStore;
use tracing::info;

#[derive(Debug)]
pub struct SimulationReport {
    pub subscriptions: Vec<SubscriptionReport>,
    pub source_keys: Vec<String>,
    pub archive_keys: Vec<String>,
    pub emails: Vec<Email>,
}

/// Upload every file into every configured user's home prefix through the
/// in-memory bucket, topic and subscribers, then drain the topic.
pub async fn simulate(config: &StackConfig, files: &[String]) -> Result<SimulationReport> {
    if config.users.is_empty() {
        bail!("no users configured, nothing to upload");
    }

    let store = Arc::new(InMemoryObjectStore::new());
    let mail = Arc::new(RecordingMailTransport::new());
    let mut topic = Topic::new(format!(
        "arn:aws:sns:local:000000000000:{}-uploads",
        config.buckets.source
    ));

    if !config.notification_emails.is_empty() {
        topic.subscribe(Arc::new(EmailSubscriber::new(
            config.notification_emails.clone(),
            mail.clone(),
        )));
    }
    if let Some(archive_bucket) = config.archive_bucket() {
        topic.subscribe(Arc::new(ArchiveSubscriber::new(ArchiveMover::new(
            store.clone(),
            archive_bucket,
        ))));
    }
    info!(subscribers = topic.subscriber_count(), "simulated topic ready");

    let notifier = BucketNotifier::new(config.buckets.source.clone(), store.clone());
    for user in &config.users {
        for file in files {
            let key = format!("{}{}", user.home_prefix(), file);
            let body = format!("simulated upload of {file} by {}", user.user_name);
            notifier.put_object(&topic, &key, body.into_bytes()).await?;
        }
    }

    let subscriptions = topic.shutdown().await;

    let mut source_keys = store.list_keys(&config.buckets.source).await;
    source_keys.sort();
    let mut archive_keys = match config.archive_bucket() {
        Some(bucket) => store.list_keys(bucket).await,
        None => Vec::new(),
    };
    archive_keys.sort();

    Ok(SimulationReport {
        subscriptions,
        source_keys,
        archive_keys,
        emails: mail.sent().await,
    })
}

#[cfg(test)]
mod tests {
    use sftpflow_config::StackConfig;

    use super::simulate;

    const CONFIG: &str = r#"
notification_emails = ["ops@example.com"]

[buckets]
source = "sftp-uploads"
archive = "sftp-archive"

[[users]]
user_name = "alice"

[[users]]
user_name = "bob"
"#;

    #[tokio::test]
    async fn uploads_end_up_archived_and_mailed() {
        let config = StackConfig::from_toml_str(CONFIG).expect("config");
        let files = vec!["report 1.csv".to_string()];

        let report = simulate(&config, &files).await.expect("simulate");

        assert!(report.source_keys.is_empty());
        assert_eq!(
            report.archive_keys,
            vec!["home/alice/report 1.csv", "home/bob/report 1.csv"]
        );
        assert_eq!(report.emails.len(), 2);
        assert!(report
            .subscriptions
            .iter()
            .all(|sub| sub.delivered == 2 && sub.dead_letters.is_empty()));
    }

    #[tokio::test]
    async fn archiving_disabled_leaves_uploads_in_place() {
        let source = CONFIG.replace(
            "archive = \"sftp-archive\"",
            "archive = \"sftp-archive\"\n\n[sftp]\nmove_to_archive = false",
        );
        let config = StackConfig::from_toml_str(&source).expect("config");

        let report = simulate(&config, &["a.txt".to_string()])
            .await
            .expect("simulate");

        assert_eq!(report.source_keys, vec!["home/alice/a.txt", "home/bob/a.txt"]);
        assert!(report.archive_keys.is_empty());
        assert_eq!(report.subscriptions.len(), 1);
    }

    #[tokio::test]
    async fn requires_at_least_one_user() {
        let source = CONFIG.split("[[users]]").next().unwrap_or_default().to_string();
        let config = StackConfig::from_toml_str(&source).expect("config");
        assert!(simulate(&config, &["a.txt".to_string()]).await.is_err());
    }
}
