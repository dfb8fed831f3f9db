//! Function entry points. The binaries only wire real AWS clients into these
//! handlers; everything below runs the same against the in-memory providers.

use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent};
use serde_json::Value;
use sftpflow_archive::ArchiveMover;
use sftpflow_config::ArchiveEnv;
use sftpflow_hostkey::HostKeyRotator;
use sftpflow_providers::ObjectStore;
use tracing::info;

/// CloudWatch stamps every line, so the subscriber skips its own timestamp.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aws_config=warn,aws_smithy_runtime=warn".into()),
        )
        .with_ansi(false)
        .without_time()
        .init();
}

pub fn archive_mover_from_env(
    store: Arc<dyn ObjectStore>,
    env: &ArchiveEnv,
) -> ArchiveMover {
    let mover = ArchiveMover::new(store, env.archive_bucket.clone());
    match env.concurrency {
        Some(limit) => mover.with_concurrency(limit),
        None => mover,
    }
}

pub async fn archive_handler(
    mover: &ArchiveMover,
    event: LambdaEvent<Value>,
) -> Result<Value, Error> {
    let (payload, context) = event.into_parts();
    info!(
        request_id = %context.request_id,
        archive_bucket = %mover.archive_bucket(),
        "archive invocation"
    );
    let receipt = mover.handle(payload).await?;
    Ok(serde_json::to_value(receipt)?)
}

pub async fn host_key_handler(
    rotator: &HostKeyRotator,
    event: LambdaEvent<Value>,
) -> Result<Value, Error> {
    let (payload, context) = event.into_parts();
    info!(request_id = %context.request_id, "host key invocation");
    let response = rotator.handle(payload).await?;
    Ok(serde_json::to_value(response)?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::{engine::general_purpose::STANDARD, Engine};
    use lambda_runtime::{Context, LambdaEvent};
    use serde_json::{json, Value};
    use sftpflow_config::ArchiveEnv;
    use sftpflow_contract::{S3Notification, SnsEvent, SnsMessage};
    use sftpflow_hostkey::HostKeyRotator;
    use sftpflow_providers::{InMemoryEndpointManager, InMemoryObjectStore, InMemorySecretStore};

    use super::{archive_handler, archive_mover_from_env, host_key_handler};

    fn invocation(payload: Value) -> LambdaEvent<Value> {
        LambdaEvent::new(payload, Context::default())
    }

    fn upload_event(bucket: &str, key: &str) -> Value {
        let note = S3Notification::object_created(bucket, key, Some(4));
        let event = SnsEvent::from_messages(vec![SnsMessage {
            message_id: Some("m-1".to_string()),
            topic_arn: None,
            subject: None,
            timestamp: None,
            message: serde_json::to_string(&note).expect("encode"),
        }]);
        serde_json::to_value(event).expect("encode")
    }

    #[tokio::test]
    async fn archive_handler_returns_success_receipt() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put_object("src", "home/alice/report 1.csv", b"data".to_vec()).await;
        let env = ArchiveEnv {
            archive_bucket: "archive".to_string(),
            concurrency: Some(4),
        };
        let mover = archive_mover_from_env(store.clone(), &env);

        let response = archive_handler(&mover, invocation(upload_event("src", "home/alice/report 1.csv")))
            .await
            .expect("archive");

        assert_eq!(response, json!({ "success": true }));
        assert!(store.contains("archive", "home/alice/report 1.csv").await);
        assert!(!store.contains("src", "home/alice/report 1.csv").await);
    }

    #[tokio::test]
    async fn archive_handler_surfaces_failures() {
        let store = Arc::new(InMemoryObjectStore::new());
        let env = ArchiveEnv {
            archive_bucket: "archive".to_string(),
            concurrency: None,
        };
        let mover = archive_mover_from_env(store, &env);

        let err = archive_handler(&mover, invocation(json!({ "Records": "nope" })))
            .await
            .expect_err("malformed");
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn host_key_handler_echoes_request_id_on_create() {
        let secrets = Arc::new(InMemorySecretStore::new());
        secrets.insert("arn:secret", &STANDARD.encode("KEY")).await;
        let endpoint = Arc::new(InMemoryEndpointManager::new());
        let rotator = HostKeyRotator::new(secrets, endpoint.clone());

        let response = host_key_handler(
            &rotator,
            invocation(json!({
                "RequestType": "Create",
                "RequestId": "req-42",
                "ResourceProperties": {
                    "serverId": "s-1",
                    "hostKeySecretArn": "arn:secret"
                }
            })),
        )
        .await
        .expect("create");

        assert_eq!(response, json!({ "PhysicalResourceId": "req-42" }));
        assert_eq!(endpoint.updates(), 1);
    }
}
