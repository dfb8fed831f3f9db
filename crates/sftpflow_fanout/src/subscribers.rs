use std::sync::Arc;

use async_trait::async_trait;
use sftpflow_archive::ArchiveMover;
use sftpflow_contract::{decode_object_key, S3Notification, SnsEvent, SnsMessage};
use tokio::sync::RwLock;
use tracing::info;

use crate::topic::Subscriber;

const DEFAULT_SUBJECT: &str = "AWS Notification Message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Outbound mail dispatch. Real delivery lives outside this system.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

/// Keeps every email in memory and logs it.
#[derive(Debug, Default)]
pub struct RecordingMailTransport {
    sent: RwLock<Vec<Email>>,
}

impl RecordingMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailTransport {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, "email dispatched");
        self.sent.write().await.push(email);
        Ok(())
    }
}

pub struct EmailSubscriber {
    recipients: Vec<String>,
    transport: Arc<dyn MailTransport>,
}

impl EmailSubscriber {
    pub fn new(recipients: Vec<String>, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            recipients,
            transport,
        }
    }
}

/// One line per uploaded object, or the raw message when it is not an upload
/// notification.
fn render_body(message: &SnsMessage) -> String {
    let records = serde_json::from_str::<S3Notification>(&message.message)
        .ok()
        .and_then(|note| note.into_records().ok());

    match records {
        Some(records) if !records.is_empty() => records
            .iter()
            .map(|record| {
                let key = decode_object_key(&record.s3.object.key)
                    .unwrap_or_else(|_| record.s3.object.key.clone());
                match record.s3.object.size {
                    Some(size) => format!("s3://{}/{} ({size} bytes)", record.s3.bucket.name, key),
                    None => format!("s3://{}/{}", record.s3.bucket.name, key),
                }
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => message.message.clone(),
    }
}

#[async_trait]
impl Subscriber for EmailSubscriber {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, message: &SnsMessage) -> anyhow::Result<()> {
        let subject = message.subject.as_deref().unwrap_or(DEFAULT_SUBJECT);
        let body = render_body(message);
        for to in &self.recipients {
            self.transport
                .send(Email {
                    to: to.clone(),
                    subject: subject.to_string(),
                    body: body.clone(),
                })
                .await?;
        }
        Ok(())
    }
}

/// Invokes the archive mover with each notification, wrapped the way the
/// function subscription delivers it.
pub struct ArchiveSubscriber {
    mover: ArchiveMover,
}

impl ArchiveSubscriber {
    pub fn new(mover: ArchiveMover) -> Self {
        Self { mover }
    }
}

#[async_trait]
impl Subscriber for ArchiveSubscriber {
    fn name(&self) -> &str {
        "archive"
    }

    async fn deliver(&self, message: &SnsMessage) -> anyhow::Result<()> {
        let payload = serde_json::to_value(SnsEvent::from_messages(vec![message.clone()]))?;
        self.mover.handle(payload).await?;
        Ok(())
    }
}
