use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ContractError;
use crate::key::encode_object_key;

/// Event name S3 publishes for a completed `PutObject`.
pub const OBJECT_CREATED_PUT: &str = "ObjectCreated:Put";

/// Sent once by S3 when a notification configuration is attached to a topic.
pub const S3_TEST_EVENT: &str = "s3:TestEvent";

/// The payload a function subscribed to a topic is invoked with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnsEvent {
    #[serde(rename = "Records")]
    pub records: Vec<SnsRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnsRecord {
    #[serde(
        rename = "EventSource",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub event_source: Option<String>,
    #[serde(rename = "Sns")]
    pub sns: SnsMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnsMessage {
    #[serde(rename = "MessageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(rename = "TopicArn", default, skip_serializing_if = "Option::is_none")]
    pub topic_arn: Option<String>,
    #[serde(rename = "Subject", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(rename = "Timestamp", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// JSON text of the published message, an [`S3Notification`] for upload events.
    #[serde(rename = "Message")]
    pub message: String,
}

impl SnsEvent {
    pub fn from_messages(messages: Vec<SnsMessage>) -> Self {
        Self {
            records: messages
                .into_iter()
                .map(|sns| SnsRecord {
                    event_source: Some("aws:sns".to_string()),
                    sns,
                })
                .collect(),
        }
    }
}

impl SnsRecord {
    pub fn s3_notification(&self) -> Result<S3Notification, ContractError> {
        serde_json::from_str(&self.sns.message).map_err(|source| ContractError::Payload {
            what: "S3 notification",
            source,
        })
    }
}

/// Validate the shape of an SNS invocation payload before anything reads it.
pub fn decode_sns_event(payload: Value) -> Result<SnsEvent, ContractError> {
    serde_json::from_value(payload).map_err(|source| ContractError::Payload {
        what: "SNS event",
        source,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct S3Notification {
    #[serde(rename = "Records", default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<S3EventRecord>>,
    #[serde(rename = "Event", default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl S3Notification {
    pub fn object_created(bucket: &str, plain_key: &str, size: Option<u64>) -> Self {
        Self {
            records: Some(vec![S3EventRecord {
                event_name: Some(OBJECT_CREATED_PUT.to_string()),
                event_time: Some(Utc::now()),
                s3: S3Entity {
                    bucket: S3Bucket {
                        name: bucket.to_string(),
                    },
                    object: S3Object {
                        key: encode_object_key(plain_key),
                        size,
                    },
                },
            }]),
            event: None,
        }
    }

    pub fn is_test_event(&self) -> bool {
        self.records.is_none() && self.event.as_deref() == Some(S3_TEST_EVENT)
    }

    /// Records carried by the message. A test event carries none.
    pub fn into_records(self) -> Result<Vec<S3EventRecord>, ContractError> {
        if self.is_test_event() {
            return Ok(Vec::new());
        }
        self.records.ok_or(ContractError::MissingRecords)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct S3EventRecord {
    #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(rename = "eventTime", default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<DateTime<Utc>>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct S3Object {
    /// URL-encoded, spaces as `+`.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}
