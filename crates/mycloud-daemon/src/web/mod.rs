//! JSON web API module.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::registry::EntityState;
use crate::state::Integration;

/// Creates the web router with all routes.
pub fn create_router(state: Arc<Integration>) -> Router {
    Router::new()
        .route("/api/status", get(status))
        .route("/api/devices", get(devices))
        .route("/api/entities", get(entities))
        .route("/api/entities/:unique_id", get(entity))
        .route("/api/snapshot", get(snapshot))
        .route("/api/refresh", post(refresh))
        .route("/api/options", get(options_get).post(options_set))
        .route("/api/events", get(events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// GET /api/status - Coordinator status
async fn status(State(state): State<Arc<Integration>>) -> impl IntoResponse {
    Json(state.status())
}

/// GET /api/devices - Device registry
async fn devices(State(state): State<Arc<Integration>>) -> impl IntoResponse {
    Json(state.registry().devices().to_vec())
}

/// Query parameters for entity listing.
#[derive(Deserialize)]
struct EntitiesQuery {
    device: Option<String>,
}

/// GET /api/entities - All entities with their states
async fn entities(
    State(state): State<Arc<Integration>>,
    Query(query): Query<EntitiesQuery>,
) -> Response {
    let Some(snapshot) = state.latest() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "No data yet");
    };
    let mut states = state.registry().render(&snapshot);
    if let Some(device) = query.device {
        states.retain(|s| s.entity.device_id == device);
    }
    Json(states).into_response()
}

/// GET /api/entities/:unique_id - One entity
async fn entity(
    State(state): State<Arc<Integration>>,
    Path(unique_id): Path<String>,
) -> Response {
    let Some(entity) = state.registry().entity(&unique_id) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Unknown entity: {}", unique_id),
        );
    };
    let Some(snapshot) = state.latest() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "No data yet");
    };
    Json(EntityState {
        entity,
        state: entity.state(&snapshot),
    })
    .into_response()
}

/// GET /api/snapshot - Raw latest snapshot
async fn snapshot(State(state): State<Arc<Integration>>) -> Response {
    match state.latest() {
        Some(snapshot) => Json(snapshot.as_ref().clone()).into_response(),
        None => error_response(StatusCode::SERVICE_UNAVAILABLE, "No data yet"),
    }
}

/// POST /api/refresh - Run a fetch cycle now
async fn refresh(State(state): State<Arc<Integration>>) -> Response {
    match state.refresh().await {
        Ok(snapshot) => Json(json!({ "fetched_at": snapshot.fetched_at })).into_response(),
        Err(e) => {
            warn!("On-demand refresh failed: {}", e);
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

/// GET /api/options - Current options
async fn options_get(State(state): State<Arc<Integration>>) -> impl IntoResponse {
    Json(state.options())
}

/// Body for option updates.
#[derive(Deserialize)]
struct OptionsForm {
    update_interval: u64,
}

/// POST /api/options - Update options
async fn options_set(
    State(state): State<Arc<Integration>>,
    Json(form): Json<OptionsForm>,
) -> Response {
    match state.set_update_interval(form.update_interval) {
        Ok(()) => Json(state.options()).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

/// GET /api/events - Entity states for every published snapshot
async fn events(
    State(state): State<Arc<Integration>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = WatchStream::new(state.subscribe())
        .filter_map(|snapshot| snapshot)
        .map(move |snapshot| {
            let states = state.registry().render(&snapshot);
            let data = serde_json::to_string(&states).unwrap_or_else(|_| "[]".to_string());
            Ok(Event::default().event("state").data(data))
        });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{config, setup_integration, FakeNas};
    use axum::body::{to_bytes, Body, BodyDataStream};
    use axum::http::Request;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn setup(dir: &std::path::Path) -> (FakeNas, Router) {
        let nas = FakeNas::new();
        let integration = setup_integration(&nas, &config(dir)).await.unwrap();
        (nas, create_router(Arc::new(integration)))
    }

    async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_entities_listing() {
        let dir = tempfile::tempdir().unwrap();
        let (_nas, router) = setup(dir.path()).await;

        let (status, body) = call(&router, get("/api/entities")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 21);

        let (_, body) = call(&router, get("/api/entities?device=SN-A")).await;
        let disk_entities = body.as_array().unwrap();
        assert_eq!(disk_entities.len(), 6);
        assert!(disk_entities.iter().all(|e| e["device_id"] == "SN-A"));
    }

    #[tokio::test]
    async fn test_single_entity() {
        let dir = tempfile::tempdir().unwrap();
        let (_nas, router) = setup(dir.path()).await;

        let (status, body) = call(&router, get("/api/entities/WDNAS001_memory_usage")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], 75.0);
        assert_eq!(body["unit"], "%");
        assert_eq!(body["platform"], "sensor");

        let (status, _) = call(&router, get("/api/entities/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_refresh_failure_reports_bad_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let (nas, router) = setup(dir.path()).await;
        nas.fail_endpoint(Some("device_info"));

        let (status, body) = call(&router, post_json("/api/refresh", Value::Null)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("device_info"));

        let (_, body) = call(&router, get("/api/status")).await;
        assert_eq!(body["failures"], 1);
        assert_eq!(body["last_update_success"], false);
        assert_eq!(body["entity_count"], 21);
    }

    #[tokio::test]
    async fn test_options_validation() {
        let dir = tempfile::tempdir().unwrap();
        let (_nas, router) = setup(dir.path()).await;

        let (status, _) = call(
            &router,
            post_json("/api/options", json!({"update_interval": 29})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            &router,
            post_json("/api/options", json!({"update_interval": 30})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["update_interval"], 30);
    }

    #[tokio::test]
    async fn test_devices_and_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (_nas, router) = setup(dir.path()).await;

        let (_, devices) = call(&router, get("/api/devices")).await;
        assert_eq!(devices.as_array().unwrap().len(), 4);
        assert_eq!(devices[1]["via_device"], json!(["mycloud", "WDNAS001"]));

        let (status, snapshot) = call(&router, get("/api/snapshot")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["device_info"]["serial_number"], "WDNAS001");
        assert_eq!(snapshot["extended"]["share_names"][0], "Public");
    }

    /// Reads one SSE frame and returns its event name and JSON data.
    async fn next_event(body: &mut BodyDataStream) -> (String, Value) {
        let chunk = body.next().await.unwrap().unwrap();
        let text = String::from_utf8(chunk.to_vec()).unwrap();
        let field = |name: &str| {
            text.lines()
                .find_map(|line| line.strip_prefix(name))
                .map(|value| value.trim_start().to_string())
                .unwrap()
        };
        let data = serde_json::from_str(&field("data:")).unwrap();
        (field("event:"), data)
    }

    #[tokio::test]
    async fn test_events_follow_published_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let (nas, router) = setup(dir.path()).await;

        let response = router.clone().oneshot(get("/api/events")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let mut body = response.into_body().into_data_stream();

        // The snapshot from setup is delivered on connect.
        let (event, states) = next_event(&mut body).await;
        assert_eq!(event, "state");
        assert_eq!(states.as_array().unwrap().len(), 21);

        nas.update(|f| f.system_status.cpu = 55.0);
        let (status, _) = call(&router, post_json("/api/refresh", Value::Null)).await;
        assert_eq!(status, StatusCode::OK);

        let (event, states) = next_event(&mut body).await;
        assert_eq!(event, "state");
        let states = states.as_array().unwrap();
        assert_eq!(states.len(), 21);
        let cpu = states
            .iter()
            .find(|s| s["unique_id"] == "WDNAS001_cpu_usage")
            .unwrap();
        assert_eq!(cpu["state"], 55.0);

        // A failed cycle publishes nothing.
        nas.fail_endpoint(Some("system_info"));
        let (status, _) = call(&router, post_json("/api/refresh", Value::Null)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let quiet = tokio::time::timeout(Duration::from_millis(200), body.next()).await;
        assert!(quiet.is_err());
    }
}
