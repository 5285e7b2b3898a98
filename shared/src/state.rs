use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use manage_task_atoms::media::S3ImageStore;
use manage_task_atoms::tasks::DynamoTaskStore;
use std::sync::Arc;
use tasks_block::TaskWorkflow;

use crate::config::{AppConfig, ConfigError};

/// Process-wide state, built once per Lambda cold start and shared by every
/// invocation.
#[derive(Clone)]
pub struct AppState {
    pub workflow: TaskWorkflow,
}

impl AppState {
    /// Load AWS settings and `AppConfig` from the environment and wire the
    /// DynamoDB and S3 stores into the workflow.
    pub async fn from_env() -> Result<Self, ConfigError> {
        let sdk_config = aws_config::load_from_env().await;
        let region = sdk_config.region().map(|r| r.as_ref().to_string());
        let config = AppConfig::from_env(region.as_deref())?;

        tracing::info!(
            table = %config.table_name,
            bucket = %config.bucket_name,
            public_url_base = %config.public_url_base,
            "app state configured"
        );

        Ok(Self::new(
            &config,
            DynamoClient::new(&sdk_config),
            S3Client::new(&sdk_config),
        ))
    }

    pub fn new(config: &AppConfig, dynamo_client: DynamoClient, s3_client: S3Client) -> Self {
        let tasks = DynamoTaskStore::new(dynamo_client, config.table_name.clone());
        let images = S3ImageStore::new(
            s3_client,
            config.bucket_name.clone(),
            config.public_url_base.clone(),
        );
        let workflow = TaskWorkflow::new(Arc::new(tasks), Arc::new(images));

        Self { workflow }
    }

    /// State around an already-built workflow (in-memory stores, tests).
    pub fn with_workflow(workflow: TaskWorkflow) -> Self {
        Self { workflow }
    }
}
