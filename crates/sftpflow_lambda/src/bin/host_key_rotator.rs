use std::sync::Arc;

use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;
use sftpflow_hostkey::HostKeyRotator;
use sftpflow_lambda::{host_key_handler, init_tracing};
use sftpflow_providers::{load_sdk_config, SecretsManagerStore, TransferEndpointManager};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let sdk_config = load_sdk_config().await;
    let rotator = HostKeyRotator::new(
        Arc::new(SecretsManagerStore::new(&sdk_config)),
        Arc::new(TransferEndpointManager::new(&sdk_config)),
    );

    run(service_fn(|event: LambdaEvent<Value>| host_key_handler(&rotator, event))).await
}
