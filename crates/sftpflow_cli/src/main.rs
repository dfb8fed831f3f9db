use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use sftpflow_archive::{plan_moves, ArchiveMover};
use sftpflow_config::StackConfig;
use sftpflow_contract::decode_sns_event;
use sftpflow_hostkey::HostKeyRotator;
use sftpflow_providers::{
    load_sdk_config, S3ObjectStore, SecretsManagerStore, TransferEndpointManager,
};
use tracing::{info, warn};
use uuid::Uuid;

mod simulate;

#[derive(Debug, Parser)]
#[command(author, version, about = "Operate the SFTP upload archive pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a stack config and print what it deploys.
    Check {
        #[arg(long, default_value = "config/stack.toml")]
        config: PathBuf,
    },
    /// Run the archive mover against AWS for a saved notification event.
    Archive {
        #[arg(long, default_value = "config/stack.toml")]
        config: PathBuf,
        #[arg(long)]
        event: PathBuf,
        /// Print the planned moves without touching any bucket.
        #[arg(long)]
        dry_run: bool,
    },
    /// Push the configured custom host key onto the SFTP server.
    RotateHostKey {
        #[arg(long, default_value = "config/stack.toml")]
        config: PathBuf,
        #[arg(long, value_enum, default_value_t = RequestType::Update)]
        request_type: RequestType,
        /// Identity reported back on update; defaults to the server id.
        #[arg(long)]
        physical_resource_id: Option<String>,
    },
    /// Upload files for every configured user through the in-memory pipeline.
    Simulate {
        #[arg(long, default_value = "config/stack.toml")]
        config: PathBuf,
        #[arg(long = "file", required = true)]
        files: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RequestType {
    Create,
    Update,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aws_config=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Check { config } => check(config),
        Command::Archive {
            config,
            event,
            dry_run,
        } => archive(config, event, dry_run).await,
        Command::RotateHostKey {
            config,
            request_type,
            physical_resource_id,
        } => rotate_host_key(config, request_type, physical_resource_id).await,
        Command::Simulate { config, files } => simulate_uploads(config, files).await,
    }
}

fn load_config(path: &Path) -> Result<StackConfig> {
    StackConfig::load(path).with_context(|| format!("invalid stack config {}", path.display()))
}

fn check(config_path: PathBuf) -> Result<()> {
    let config = load_config(&config_path)?;

    println!("source bucket:  {}", config.buckets.source);
    match config.archive_bucket() {
        Some(bucket) => println!("archive bucket: {bucket}"),
        None => println!("archive bucket: disabled"),
    }
    if config.host_key.use_custom_key {
        println!(
            "host key:       {} (version {}) -> {}",
            config.host_key.host_key_secret_arn,
            config.host_key.host_key_version,
            config.host_key.server_id
        );
    } else {
        println!("host key:       service generated");
    }
    for user in &config.users {
        let key = if user.public_key.is_empty() {
            "no public key"
        } else {
            "public key set"
        };
        println!("user:           {} -> {} ({key})", user.user_name, user.home_prefix());
    }
    for email in &config.notification_emails {
        println!("notify:         {email}");
    }

    if config.users.is_empty() {
        warn!("no users configured");
    }
    info!(config = %config_path.display(), "stack config is valid");
    Ok(())
}

async fn archive(config_path: PathBuf, event_path: PathBuf, dry_run: bool) -> Result<()> {
    let config = load_config(&config_path)?;
    let archive_bucket = config
        .archive_bucket()
        .ok_or_else(|| anyhow!("archiving is disabled in {}", config_path.display()))?
        .to_string();

    let source = std::fs::read_to_string(&event_path)
        .with_context(|| format!("failed to read event file {}", event_path.display()))?;
    let payload: Value = serde_json::from_str(&source)
        .with_context(|| format!("invalid event JSON at {}", event_path.display()))?;

    if dry_run {
        let event = decode_sns_event(payload)?;
        let tasks = plan_moves(&event)?;
        for task in &tasks {
            println!(
                "s3://{}/{} -> s3://{}/{}",
                task.source_bucket,
                task.key.decoded(),
                archive_bucket,
                task.key.decoded()
            );
        }
        info!(count = tasks.len(), "dry run, nothing moved");
        return Ok(());
    }

    let sdk_config = load_sdk_config().await;
    let mover = ArchiveMover::new(Arc::new(S3ObjectStore::new(&sdk_config)), archive_bucket);
    let receipt = mover.handle(payload).await.context("archive batch failed")?;
    println!("{}", serde_json::to_string(&receipt)?);
    Ok(())
}

async fn rotate_host_key(
    config_path: PathBuf,
    request_type: RequestType,
    physical_resource_id: Option<String>,
) -> Result<()> {
    let config = load_config(&config_path)?;
    let host_key = &config.host_key;
    if !host_key.use_custom_key {
        bail!(
            "host_key.use_custom_key is off in {}, nothing to rotate",
            config_path.display()
        );
    }

    let mut payload = json!({
        "RequestType": match request_type {
            RequestType::Create => "Create",
            RequestType::Update => "Update",
        },
        "RequestId": Uuid::now_v7().to_string(),
        "ResourceProperties": {
            "serverId": host_key.server_id,
            "hostKeySecretArn": host_key.host_key_secret_arn,
            "hostKeyVersion": host_key.host_key_version,
        },
    });
    if let RequestType::Update = request_type {
        payload["PhysicalResourceId"] =
            json!(physical_resource_id.unwrap_or_else(|| host_key.server_id.clone()));
    }

    let sdk_config = load_sdk_config().await;
    let rotator = HostKeyRotator::new(
        Arc::new(SecretsManagerStore::new(&sdk_config)),
        Arc::new(TransferEndpointManager::new(&sdk_config)),
    );
    let response = rotator
        .handle(payload)
        .await
        .context("host key rotation failed")?;
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

async fn simulate_uploads(config_path: PathBuf, files: Vec<String>) -> Result<()> {
    let config = load_config(&config_path)?;
    let report = simulate::simulate(&config, &files).await?;

    for subscription in &report.subscriptions {
        println!(
            "subscriber {}: delivered={} redeliveries={} dead_letters={}",
            subscription.subscriber,
            subscription.delivered,
            subscription.redeliveries,
            subscription.dead_letters.len()
        );
    }
    for email in &report.emails {
        println!("email to {}: {}", email.to, email.body.replace('\n', "; "));
    }
    for key in &report.source_keys {
        println!("s3://{}/{key}", config.buckets.source);
    }
    if let Some(bucket) = config.archive_bucket() {
        for key in &report.archive_keys {
            println!("s3://{bucket}/{key}");
        }
    }
    Ok(())
}
