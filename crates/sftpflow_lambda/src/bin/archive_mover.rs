use std::sync::Arc;

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use sftpflow_config::ArchiveEnv;
use sftpflow_lambda::{archive_handler, archive_mover_from_env, init_tracing};
use sftpflow_providers::{load_sdk_config, S3ObjectStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let env = ArchiveEnv::from_env()?;
    let sdk_config = load_sdk_config().await;
    let mover = archive_mover_from_env(Arc::new(S3ObjectStore::new(&sdk_config)), &env);
    info!(archive_bucket = %env.archive_bucket, "archive mover ready");

    run(service_fn(|event: LambdaEvent<Value>| archive_handler(&mover, event))).await
}
