//! Session control and query routes.
//!
//! - `POST /startMonitoring` with `{"url": "...", "id": "..."}`
//! - `POST /stopMonitoring` with `{"id": "..."}`
//! - `GET /monitor?id=...` returns the session's segment history

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    routing::{get, post},
};
use monitor_engine::SegmentStatus;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::api::server::AppState;

/// Body of `POST /startMonitoring`.
#[derive(Debug, Deserialize)]
pub struct StartMonitoringRequest {
    pub url: String,
    pub id: String,
}

/// Body of `POST /stopMonitoring`.
#[derive(Debug, Deserialize)]
pub struct StopMonitoringRequest {
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MonitorQuery {
    pub id: Option<String>,
}

/// Create the monitoring router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/startMonitoring",
            post(start_monitoring).fallback(method_not_allowed),
        )
        .route(
            "/stopMonitoring",
            post(stop_monitoring).fallback(method_not_allowed),
        )
        .route("/monitor", get(get_history).fallback(method_not_allowed))
}

// Bodies are decoded by hand so that every malformed payload is a 400,
// whatever the Content-Type header says.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        debug!(error = %e, "Rejected malformed request body");
        ApiError::bad_request(format!("Bad request: {e}"))
    })
}

async fn start_monitoring(State(state): State<AppState>, body: Bytes) -> ApiResult<String> {
    let request: StartMonitoringRequest = parse_body(&body)?;
    state.sessions.start(&request.id, &request.url)?;
    Ok(format!("Monitoring started for {}", request.url))
}

async fn stop_monitoring(State(state): State<AppState>, body: Bytes) -> ApiResult<String> {
    let request: StopMonitoringRequest = parse_body(&body)?;
    state.sessions.stop(&request.id);
    Ok(format!("Monitoring stopped for {}", request.id))
}

async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<MonitorQuery>,
) -> ApiResult<Json<Vec<SegmentStatus>>> {
    let id = query.id.unwrap_or_default();
    let history = state.sessions.snapshot(&id)?;
    Ok(Json(history))
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed("Method not allowed")
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use monitor_engine::{ClientConfig, HttpFetcher, MonitorConfig, SessionStore};
    use tower::ServiceExt;

    fn app() -> (Router, AppState) {
        let fetcher = HttpFetcher::new(&ClientConfig::default()).unwrap();
        let state = AppState::new(SessionStore::with_http(fetcher, MonitorConfig::default()));
        let app = router().with_state(state.clone());
        (app, state)
    }

    fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn start_accepts_http_url() {
        let (app, state) = app();
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/startMonitoring",
                r#"{"url":"https://a.com/live/index.m3u8","id":"s1"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_string(response).await,
            "Monitoring started for https://a.com/live/index.m3u8"
        );
        assert!(state.sessions.contains("s1"));
        state.sessions.shutdown().await;
    }

    #[tokio::test]
    async fn start_rejects_invalid_url() {
        let (app, state) = app();
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/startMonitoring",
                r#"{"url":"rtmp://a.com/live","id":"s1"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn start_rejects_malformed_body() {
        for body in ["not json", r#"{"url":"https://a.com/x.m3u8"}"#, ""] {
            let (app, _) = app();
            let response = app
                .oneshot(json_request(Method::POST, "/startMonitoring", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        }
    }

    #[tokio::test]
    async fn start_after_shutdown_is_unavailable() {
        let (app, state) = app();
        state.sessions.shutdown().await;

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/startMonitoring",
                r#"{"url":"https://a.com/live/index.m3u8","id":"late"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!state.sessions.contains("late"));
    }

    #[tokio::test]
    async fn control_routes_require_post() {
        for uri in ["/startMonitoring", "/stopMonitoring"] {
            let (app, _) = app();
            let response = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        }
    }

    #[tokio::test]
    async fn stop_unknown_session_is_ok() {
        let (app, _) = app();
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/stopMonitoring",
                r#"{"id":"nobody"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn stop_rejects_malformed_body() {
        let (app, _) = app();
        let response = app
            .oneshot(json_request(Method::POST, "/stopMonitoring", "{"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn monitor_unknown_session_is_not_found() {
        for uri in ["/monitor?id=missing", "/monitor"] {
            let (app, _) = app();
            let response = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn monitor_returns_empty_history_for_new_session() {
        let (app, state) = app();
        state
            .sessions
            .start("fresh", "https://a.com/live/index.m3u8")
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/monitor?id=fresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "[]");
        state.sessions.shutdown().await;
    }
}
