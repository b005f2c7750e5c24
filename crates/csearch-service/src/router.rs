use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use csearch_rs::CsearchError;
use std::time::Instant;

use crate::service::AppState;

pub const INDEX_PATH: &str = "/cindex";
pub const SEARCH_PATH: &str = "/csearch";

/// Build the service router. Method checks live in the handlers so that a
/// wrong method is reported like any other pipeline error.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(INDEX_PATH, any(index_handler))
        .route(SEARCH_PATH, any(search_handler))
        .fallback(not_found)
        .with_state(state)
}

async fn index_handler(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    let arrival = Instant::now();
    if method != Method::POST {
        return error_response(INDEX_PATH, CsearchError::MethodNotAllowed);
    }
    let deadline = state.deadline(arrival);
    let result = run_blocking(move || {
        state
            .index_repo(&body, deadline)
            .map(|_| "Success".to_string())
    })
    .await;
    respond(INDEX_PATH, result)
}

async fn search_handler(
    State(state): State<AppState>,
    method: Method,
    RawQuery(raw): RawQuery,
) -> Response {
    let arrival = Instant::now();
    if method != Method::GET {
        return error_response(SEARCH_PATH, CsearchError::MethodNotAllowed);
    }
    let (q, args) = query_params(raw.as_deref().unwrap_or(""));
    let deadline = state.deadline(arrival);
    let result =
        run_blocking(move || state.search_repo(q.as_deref(), args.as_deref(), deadline)).await;
    respond(SEARCH_PATH, result)
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, CsearchError::NotFound.to_string()).into_response()
}

/// First `q` and `args` values of a raw query string.
fn query_params(raw: &str) -> (Option<String>, Option<String>) {
    let mut q = None;
    let mut args = None;
    for (k, v) in url::form_urlencoded::parse(raw.as_bytes()) {
        match k.as_ref() {
            "q" if q.is_none() => q = Some(v.into_owned()),
            "args" if args.is_none() => args = Some(v.into_owned()),
            _ => {}
        }
    }
    (q, args)
}

enum Failure {
    Pipeline(CsearchError),
    Panicked(String),
}

async fn run_blocking<F>(f: F) -> Result<String, Failure>
where
    F: FnOnce() -> Result<String, CsearchError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(r) => r.map_err(Failure::Pipeline),
        Err(e) => Err(Failure::Panicked(e.to_string())),
    }
}

fn respond(route: &str, result: Result<String, Failure>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(Failure::Pipeline(e)) => error_response(route, e),
        Err(Failure::Panicked(msg)) => {
            tracing::error!(route = %route, error = %msg, "request task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
        }
    }
}

fn error_response(route: &str, e: CsearchError) -> Response {
    match e {
        CsearchError::NoMatches => tracing::debug!(route = %route, "no matches"),
        _ => tracing::warn!(route = %route, error = %e, "request failed"),
    }
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_decode_and_keep_first() {
        let (q, a) = query_params("q=foo%20bar&args=-i%2C-n&q=ignored");
        assert_eq!(q.as_deref(), Some("foo bar"));
        assert_eq!(a.as_deref(), Some("-i,-n"));

        let (q, a) = query_params("args=");
        assert_eq!(q, None);
        assert_eq!(a.as_deref(), Some(""));
    }

    #[test]
    fn plus_decodes_to_space() {
        let (q, _) = query_params("q=a+b");
        assert_eq!(q.as_deref(), Some("a b"));
    }
}
