use lambda_http::http::header::{HeaderValue, VARY};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, Response,
};
use manage_task_shared::AppState;
use std::sync::Arc;
use tasks_block::tasks;

fn with_cors_headers(mut resp: Response<Body>) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,PUT,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type"),
    );
    headers.append(VARY, HeaderValue::from_static("Origin"));

    resp
}

fn finalize_response(resp: Result<Response<Body>, Error>) -> Result<Response<Body>, Error> {
    resp.map(with_cors_headers)
}

/// Main Lambda handler - routes task and image maintenance requests
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("🚀 API Lambda invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if *method == Method::OPTIONS {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp));
    }

    let workflow = &state.workflow;
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let resp = match (method, parts.as_slice()) {
        // GET /tasks - list tasks
        (&Method::GET, ["tasks"]) => tasks::list_tasks(workflow).await,
        // POST /tasks - create task (optional inline image)
        (&Method::POST, ["tasks"]) => tasks::create_task(workflow, body).await,
        // GET /tasks/{id} - get task
        (&Method::GET, ["tasks", task_id]) => tasks::get_task(workflow, task_id).await,
        // PUT /tasks/{id} - replace task fields (optional new image)
        (&Method::PUT, ["tasks", task_id]) => tasks::update_task(workflow, task_id, body).await,
        // DELETE /tasks/{id} - delete task (image object is kept)
        (&Method::DELETE, ["tasks", task_id]) => tasks::delete_task(workflow, task_id).await,
        // GET /images/orphans - list images no task references
        (&Method::GET, ["images", "orphans"]) => tasks::list_orphaned_images(workflow).await,
        // DELETE /images/orphans - delete them
        (&Method::DELETE, ["images", "orphans"]) => tasks::collect_orphaned_images(workflow).await,
        _ => {
            tracing::warn!("⚠️ No route matched - Method: {} Path: {}", method, path);
            not_found()
        }
    };

    finalize_response(resp)
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use manage_task_atoms::media::MemoryImageStore;
    use manage_task_atoms::tasks::MemoryTaskStore;
    use tasks_block::TaskWorkflow;

    fn state() -> Arc<AppState> {
        let workflow = TaskWorkflow::new(
            Arc::new(MemoryTaskStore::new()),
            Arc::new(MemoryImageStore::local()),
        );
        Arc::new(AppState::with_workflow(workflow))
    }

    fn request(method: Method, uri: &str, body: &str) -> Request {
        let body = if body.is_empty() {
            Body::Empty
        } else {
            Body::Text(body.to_string())
        };
        lambda_http::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap()
    }

    fn body_json(resp: &Response<Body>) -> serde_json::Value {
        let bytes: &[u8] = resp.body();
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn preflight_answers_with_cors_headers() {
        let resp = function_handler(request(Method::OPTIONS, "/tasks", ""), state())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["Access-Control-Allow-Methods"],
            "GET,POST,PUT,DELETE,OPTIONS"
        );
    }

    #[tokio::test]
    async fn task_lifecycle_through_the_router() {
        let state = state();

        let created = function_handler(
            request(Method::POST, "/tasks", r#"{"title":"Buy milk","detail":"2 litres"}"#),
            state.clone(),
        )
        .await
        .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(created.headers()["Access-Control-Allow-Origin"], "*");
        let id = body_json(&created)["id"].as_str().unwrap().to_string();

        let updated = function_handler(
            request(
                Method::PUT,
                &format!("/tasks/{}", id),
                r#"{"title":"Buy milk","detail":"2 litres","is_complete":true}"#,
            ),
            state.clone(),
        )
        .await
        .unwrap();
        assert_eq!(updated.status(), StatusCode::NO_CONTENT);

        let listed = function_handler(request(Method::GET, "/tasks", ""), state.clone())
            .await
            .unwrap();
        let json = body_json(&listed);
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["is_complete"], true);

        let deleted = function_handler(
            request(Method::DELETE, &format!("/tasks/{}", id), ""),
            state.clone(),
        )
        .await
        .unwrap();
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        let fetched = function_handler(request(Method::GET, &format!("/tasks/{}", id), ""), state)
            .await
            .unwrap();
        assert_eq!(fetched.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn orphan_routes_are_wired() {
        let state = state();

        let resp = function_handler(request(Method::GET, "/images/orphans", ""), state.clone())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(&resp), serde_json::json!([]));

        let resp = function_handler(request(Method::DELETE, "/images/orphans", ""), state)
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_routes_are_404() {
        let resp = function_handler(request(Method::PATCH, "/tasks/abc", "{}"), state())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(&resp)["error"], "Not found");
    }
}
