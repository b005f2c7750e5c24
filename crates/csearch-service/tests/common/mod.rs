use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use csearch_service::test_utils::FakeCloner;
use csearch_service::{router, AppState, ServiceConfig};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

pub fn app_in(dir: &Path, cloner: FakeCloner) -> Router {
    let config = ServiceConfig {
        workspace_root: dir.join("work"),
        master_index: dir.join(".csearchindex"),
        ..Default::default()
    };
    router(AppState::new(config, Arc::new(cloner)))
}

pub async fn call(app: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .expect("request");
    let resp = app.clone().oneshot(req).await.expect("response");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, String::from_utf8_lossy(&bytes).into_owned())
}
