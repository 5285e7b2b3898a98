use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::HashMap;

use super::model::{NewTask, TaskPatch, TaskRecord};
use crate::error::RecordError;

const TASKS_PK: &str = "TASKS";
const TASK_SK_PREFIX: &str = "TASK#";

/// Record store for tasks. Implementations assign ids on create and apply
/// updates as a merge: fields left `None` in a [`TaskPatch`] are untouched.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Write a new record and return the id the store assigned to it.
    async fn create(&self, task: NewTask) -> Result<String, RecordError>;

    /// All records, in whatever order the store hands them back.
    async fn list(&self) -> Result<Vec<TaskRecord>, RecordError>;

    async fn get(&self, task_id: &str) -> Result<TaskRecord, RecordError>;

    /// Fails with [`RecordError::NotFound`] when the record does not exist.
    async fn update(&self, task_id: &str, patch: TaskPatch) -> Result<(), RecordError>;

    /// Deleting a missing record is not an error.
    async fn delete(&self, task_id: &str) -> Result<(), RecordError>;
}

/// DynamoDB-backed store. Tasks share one partition:
/// PK = `TASKS`, SK = `TASK#<id>`.
#[derive(Clone)]
pub struct DynamoTaskStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoTaskStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

fn task_sk(task_id: &str) -> String {
    format!("{}{}", TASK_SK_PREFIX, task_id)
}

/// First string attribute present under any of `names`.
fn string_attr(item: &HashMap<String, AttributeValue>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        item.get(*name)
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
    })
}

/// Decode a DynamoDB item. Legacy clients wrote `create_at` / `createAt`
/// (and the update equivalents), so those names are accepted too.
pub(crate) fn record_from_item(task_id: &str, item: &HashMap<String, AttributeValue>) -> TaskRecord {
    TaskRecord {
        task_id: task_id.to_string(),
        title: string_attr(item, &["title"]),
        detail: string_attr(item, &["detail"]),
        is_complete: item
            .get("is_complete")
            .and_then(|v| v.as_bool().ok())
            .copied(),
        image_url: string_attr(item, &["image_url"]),
        created_at: string_attr(item, &["created_at", "create_at", "createAt"]),
        updated_at: string_attr(item, &["updated_at", "update_at", "updateAt"]),
    }
}

#[async_trait]
impl TaskStore for DynamoTaskStore {
    async fn create(&self, task: NewTask) -> Result<String, RecordError> {
        let task_id = uuid::Uuid::new_v4().to_string();

        self.client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(TASKS_PK.to_string()))
            .item("SK", AttributeValue::S(task_sk(&task_id)))
            .item("title", AttributeValue::S(task.title))
            .item("detail", AttributeValue::S(task.detail))
            .item("is_complete", AttributeValue::Bool(task.is_complete))
            .item("image_url", AttributeValue::S(task.image_url))
            .item("created_at", AttributeValue::S(task.created_at))
            .item("updated_at", AttributeValue::S(task.updated_at))
            .condition_expression("attribute_not_exists(SK)")
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(PutItemError::ConditionalCheckFailedException(_)) => RecordError::backend(
                    "DynamoDB put_item",
                    format!("task id collision on {}", task_id),
                ),
                _ => RecordError::backend("DynamoDB put_item", DisplayErrorContext(&e)),
            })?;

        Ok(task_id)
    }

    async fn list(&self) -> Result<Vec<TaskRecord>, RecordError> {
        let mut records = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let result = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
                .expression_attribute_values(":pk", AttributeValue::S(TASKS_PK.to_string()))
                .expression_attribute_values(
                    ":sk_prefix",
                    AttributeValue::S(TASK_SK_PREFIX.to_string()),
                )
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| RecordError::backend("DynamoDB query", DisplayErrorContext(&e)))?;

            for item in result.items() {
                let task_id = item
                    .get("SK")
                    .and_then(|v| v.as_s().ok())
                    .and_then(|sk| sk.strip_prefix(TASK_SK_PREFIX));
                if let Some(task_id) = task_id {
                    records.push(record_from_item(task_id, item));
                }
            }

            match result.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn get(&self, task_id: &str) -> Result<TaskRecord, RecordError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(TASKS_PK.to_string()))
            .key("SK", AttributeValue::S(task_sk(task_id)))
            .send()
            .await
            .map_err(|e| RecordError::backend("DynamoDB get_item", DisplayErrorContext(&e)))?;

        match result.item() {
            Some(item) => Ok(record_from_item(task_id, item)),
            None => Err(RecordError::NotFound(task_id.to_string())),
        }
    }

    async fn update(&self, task_id: &str, patch: TaskPatch) -> Result<(), RecordError> {
        if patch.is_empty() {
            // Nothing to write, but the caller still expects NotFound for a missing id
            return self.get(task_id).await.map(|_| ());
        }

        let mut update_expr = vec![];
        let mut expr_names = HashMap::new();
        let mut expr_values = HashMap::new();

        let mut set = |field: &str, value: AttributeValue| {
            update_expr.push(format!("#{field} = :{field}"));
            expr_names.insert(format!("#{field}"), field.to_string());
            expr_values.insert(format!(":{field}"), value);
        };

        if let Some(title) = patch.title {
            set("title", AttributeValue::S(title));
        }
        if let Some(detail) = patch.detail {
            set("detail", AttributeValue::S(detail));
        }
        if let Some(is_complete) = patch.is_complete {
            set("is_complete", AttributeValue::Bool(is_complete));
        }
        if let Some(image_url) = patch.image_url {
            set("image_url", AttributeValue::S(image_url));
        }
        if let Some(updated_at) = patch.updated_at {
            set("updated_at", AttributeValue::S(updated_at));
        }

        let mut builder = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(TASKS_PK.to_string()))
            .key("SK", AttributeValue::S(task_sk(task_id)))
            .update_expression(format!("SET {}", update_expr.join(", ")))
            .condition_expression("attribute_exists(SK)");

        for (k, v) in expr_names {
            builder = builder.expression_attribute_names(k, v);
        }

        for (k, v) in expr_values {
            builder = builder.expression_attribute_values(k, v);
        }

        builder.send().await.map_err(|e| match e.as_service_error() {
            Some(UpdateItemError::ConditionalCheckFailedException(_)) => {
                RecordError::NotFound(task_id.to_string())
            }
            _ => RecordError::backend("DynamoDB update_item", DisplayErrorContext(&e)),
        })?;

        Ok(())
    }

    async fn delete(&self, task_id: &str) -> Result<(), RecordError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(TASKS_PK.to_string()))
            .key("SK", AttributeValue::S(task_sk(task_id)))
            .send()
            .await
            .map_err(|e| RecordError::backend("DynamoDB delete_item", DisplayErrorContext(&e)))?;

        Ok(())
    }
}
