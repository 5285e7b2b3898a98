use lambda_http::{http::StatusCode, Body, Error, Response};
use manage_task_atoms::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::WorkflowError;
use crate::types::{CreateTaskPayload, CreatedTask, UpdateTaskPayload};
use crate::workflow::TaskWorkflow;

fn json_response(status: StatusCode, body: String) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(body.into())
        .map_err(Box::new)?)
}

fn ok_json<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>, Error> {
    json_response(status, serde_json::to_string(value)?)
}

fn no_content() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .body(Body::Empty)
        .map_err(Box::new)?)
}

fn bad_request(message: String) -> Result<Response<Body>, Error> {
    json_response(
        StatusCode::BAD_REQUEST,
        serde_json::json!({ "error": message }).to_string(),
    )
}

pub fn status_for(err: &WorkflowError) -> StatusCode {
    match err {
        WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
        WorkflowError::NotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::Storage(StorageError::Conflict(_)) => StatusCode::CONFLICT,
        WorkflowError::Storage(_) | WorkflowError::Record(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Log once and turn a workflow failure into a JSON error response.
fn error_response(operation: &str, err: WorkflowError) -> Result<Response<Body>, Error> {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!("❌ {} failed: {}", operation, err);
    } else {
        tracing::warn!("⚠️ {} rejected: {}", operation, err);
    }
    json_response(status, serde_json::json!({ "error": err.to_string() }).to_string())
}

fn parse_body<T: DeserializeOwned>(operation: &str, body: &[u8]) -> Result<T, String> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::error!("Failed to parse {} request: {}", operation, e);
        format!("Invalid request body: {}", e)
    })
}

/// POST /tasks
pub async fn create_task(workflow: &TaskWorkflow, body: &[u8]) -> Result<Response<Body>, Error> {
    let payload: CreateTaskPayload = match parse_body("create_task", body) {
        Ok(payload) => payload,
        Err(message) => return bad_request(message),
    };
    let input = match payload.into_input() {
        Ok(input) => input,
        Err(e) => return bad_request(format!("Invalid image data: {}", e)),
    };

    match workflow.create_task(input).await {
        Ok(task_id) => {
            tracing::info!("✅ create_task success: task_id={}", task_id);
            ok_json(StatusCode::CREATED, &CreatedTask { id: task_id })
        }
        Err(e) => error_response("create_task", e),
    }
}

/// GET /tasks
pub async fn list_tasks(workflow: &TaskWorkflow) -> Result<Response<Body>, Error> {
    match workflow.list_tasks().await {
        Ok(tasks) => ok_json(StatusCode::OK, &tasks),
        Err(e) => error_response("list_tasks", e),
    }
}

/// GET /tasks/{id}
pub async fn get_task(workflow: &TaskWorkflow, task_id: &str) -> Result<Response<Body>, Error> {
    match workflow.get_task(task_id).await {
        Ok(task) => ok_json(StatusCode::OK, &task),
        Err(e) => error_response("get_task", e),
    }
}

/// PUT /tasks/{id}
pub async fn update_task(
    workflow: &TaskWorkflow,
    task_id: &str,
    body: &[u8],
) -> Result<Response<Body>, Error> {
    let payload: UpdateTaskPayload = match parse_body("update_task", body) {
        Ok(payload) => payload,
        Err(message) => return bad_request(message),
    };
    let input = match payload.into_input() {
        Ok(input) => input,
        Err(e) => return bad_request(format!("Invalid image data: {}", e)),
    };

    match workflow.update_task(task_id, input).await {
        Ok(()) => no_content(),
        Err(e) => error_response("update_task", e),
    }
}

/// DELETE /tasks/{id}
pub async fn delete_task(workflow: &TaskWorkflow, task_id: &str) -> Result<Response<Body>, Error> {
    match workflow.delete_task(task_id).await {
        Ok(()) => no_content(),
        Err(e) => error_response("delete_task", e),
    }
}

/// GET /images/orphans - dry run
pub async fn list_orphaned_images(workflow: &TaskWorkflow) -> Result<Response<Body>, Error> {
    match workflow.find_orphaned_images().await {
        Ok(keys) => ok_json(StatusCode::OK, &keys),
        Err(e) => error_response("list_orphaned_images", e),
    }
}

/// DELETE /images/orphans
pub async fn collect_orphaned_images(workflow: &TaskWorkflow) -> Result<Response<Body>, Error> {
    match workflow.collect_orphaned_images().await {
        Ok(keys) => {
            tracing::info!("🧹 collect_orphaned_images removed {} objects", keys.len());
            ok_json(StatusCode::OK, &keys)
        }
        Err(e) => error_response("collect_orphaned_images", e),
    }
}
