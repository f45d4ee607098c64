use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use sportcast_broker::{Envelope, TopicId};
use sportcast_sports::{PlayByPlayQuery, ScheduleQuery, ScheduleSnapshot, SportAdapter};

use crate::error::ApiError;
use crate::AppState;

/// Message type of the snapshot sent when a client connects.
pub const INITIAL_KIND: &str = "initial";

/// Build the axum router. Requests that outlive the I/O timeout get a 408.
pub fn router(state: Arc<AppState>) -> Router {
    let timeout = TimeoutLayer::new(state.io_timeout);
    Router::new()
        .route("/about", get(about))
        .route("/schedule/:sport", get(schedule))
        .route("/client/:sport", get(client))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(timeout)
        .with_state(state)
}

/// GET /about
async fn about(State(state): State<Arc<AppState>>) -> Json<Value> {
    let snapshot = match state.registry.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "registry snapshot unavailable");
            Default::default()
        }
    };
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "sports": state.catalog.names(),
        "topics": snapshot.topics,
        "dropped_publishes": snapshot.dropped_publishes,
        "clients": state.gateway.connected(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ScheduleParams {
    pub date: Option<String>,
}

fn lookup(state: &AppState, sport: &str) -> Result<Arc<dyn SportAdapter>, ApiError> {
    state
        .catalog
        .get(sport)
        .ok_or_else(|| ApiError::UnknownSport(sport.to_string()))
}

/// GET /schedule/:sport?date=YYYY-MM-DD
async fn schedule(
    State(state): State<Arc<AppState>>,
    Path(sport): Path<String>,
    Query(params): Query<ScheduleParams>,
) -> Result<Json<ScheduleSnapshot>, ApiError> {
    let adapter = lookup(&state, &sport)?;
    let query = match params.date.as_deref().map(str::trim) {
        None | Some("") => ScheduleQuery::today(),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(ScheduleQuery::on)
            .map_err(|_| ApiError::InvalidDate(raw.to_string()))?,
    };
    Ok(Json(adapter.schedule(&query).await?))
}

#[derive(Debug, Deserialize)]
pub struct ClientParams {
    #[serde(rename = "gameId")]
    pub game_id: Option<String>,
}

/// Browsers always send Origin on a websocket handshake; it must name this host.
fn check_origin(headers: &HeaderMap) -> Result<(), ApiError> {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let same_host = !host.is_empty()
        && (origin == format!("http://{host}") || origin == format!("https://{host}"));
    if same_host {
        Ok(())
    } else {
        Err(ApiError::OriginMismatch {
            origin: origin.to_string(),
            host: host.to_string(),
        })
    }
}

/// GET /client/:sport?gameId=ID (websocket)
async fn client(
    State(state): State<Arc<AppState>>,
    Path(sport): Path<String>,
    Query(params): Query<ClientParams>,
    headers: HeaderMap,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, ApiError> {
    let adapter = lookup(&state, &sport)?;
    let game_id = params
        .game_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(ApiError::MissingGameId)?;
    check_origin(&headers)?;
    let ws = ws.ok_or(ApiError::UpgradeRequired)?;

    let topic = TopicId::new(adapter.name(), game_id);
    Ok(ws.on_upgrade(move |socket| client_session(state, adapter, topic, socket)))
}

async fn client_session(
    state: Arc<AppState>,
    adapter: Arc<dyn SportAdapter>,
    topic: TopicId,
    socket: WebSocket,
) {
    let (client, inbound) = state.gateway.accept(socket);
    info!(client = %client, topic = %topic, "client connected");

    if !state.registry.subscribe(client, topic.clone()).await {
        info!(client = %client, topic = %topic, "event not tracked, sending snapshot only");
    }

    let query = PlayByPlayQuery {
        event_id: topic.event_id().to_string(),
        date: None,
        cursor: adapter.default_cursor(),
        current_period: 0,
    };
    let contents = match adapter.play_by_play(&query).await {
        Ok(Some(snapshot)) => snapshot.payload,
        Ok(None) => json!({}),
        Err(e) => {
            warn!(client = %client, topic = %topic, error = %e, "initial snapshot unavailable");
            json!({})
        }
    };
    state
        .gateway
        .write(client, &Envelope::new(INITIAL_KIND, contents))
        .await;

    state.gateway.read_loop(client, inbound).await;
}

/// GET /health
async fn health() -> &'static str {
    "ok"
}

/// GET /metrics
async fn metrics() -> impl IntoResponse {
    match crate::metrics::encode() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding error: {}", e),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{entry, schedule_date, ScriptedAdapter};
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use sportcast_sports::SportCatalog;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(adapter: Arc<ScriptedAdapter>) -> (Router, Arc<AppState>) {
        app_with_timeout(adapter, Duration::from_secs(5))
    }

    fn app_with_timeout(
        adapter: Arc<ScriptedAdapter>,
        io_timeout: Duration,
    ) -> (Router, Arc<AppState>) {
        let catalog = SportCatalog::new().with(adapter);
        let (state, _tasks) = AppState::start(catalog, io_timeout);
        (router(state.clone()), state)
    }

    async fn get_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(ScriptedAdapter::new("nhl"));
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_about_lists_sports_and_topics() {
        let (app, state) = app(ScriptedAdapter::new("nhl"));
        state.registry.create_topic(TopicId::new("nhl", "1"));

        let (status, body) = get_json(app, get("/about")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "sportcast");
        assert_eq!(body["sports"], json!(["nhl"]));
        assert_eq!(body["topics"], json!([{"topic": "nhl:1", "subscribers": 0}]));
        assert_eq!(body["dropped_publishes"], 0);
    }

    #[tokio::test]
    async fn test_schedule_for_date() {
        let adapter = ScriptedAdapter::new("nhl");
        let start = Utc::now();
        adapter.push_schedule(vec![entry("2023020001", start, 1)]);
        let (app, _) = app(adapter);

        let (status, body) = get_json(app, get("/schedule/NHL?date=2024-03-09")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sport"], "nhl");
        assert_eq!(body["date"], schedule_date().to_string());
        assert_eq!(body["events"][0]["eventId"], "2023020001");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_schedule_times_out() {
        let adapter = ScriptedAdapter::new("nhl");
        adapter.push_schedule(vec![entry("2023020001", Utc::now(), 1)]);
        adapter.delay_schedule(Duration::from_secs(60));
        let (app, _) = app_with_timeout(adapter, Duration::from_secs(2));

        let response = app.oneshot(get("/schedule/nhl")).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_schedule_rejects_unknown_sport() {
        let (app, _) = app(ScriptedAdapter::new("nhl"));
        let (status, body) = get_json(app, get("/schedule/curling")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid {sport} parameter");
    }

    #[tokio::test]
    async fn test_schedule_rejects_bad_date() {
        let (app, _) = app(ScriptedAdapter::new("nhl"));
        let (status, _) = get_json(app, get("/schedule/nhl?date=03-09-2024")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_schedule_provider_failure_is_bad_gateway() {
        let adapter = ScriptedAdapter::new("nhl");
        adapter.push_schedule_error();
        let (app, _) = app(adapter);
        let (status, body) = get_json(app, get("/schedule/nhl")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("provider down"));
    }

    fn client_request(uri: &str, origin: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri).header("host", "localhost:8080");
        if let Some(origin) = origin {
            builder = builder.header("origin", origin);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_client_rejects_unknown_sport_first() {
        let (app, _) = app(ScriptedAdapter::new("nhl"));
        let (status, body) = get_json(app, client_request("/client/cricket", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid {sport} parameter");
    }

    #[tokio::test]
    async fn test_client_requires_game_id() {
        let (app, _) = app(ScriptedAdapter::new("nhl"));
        let request = client_request("/client/nhl?gameId=", Some("http://localhost:8080"));
        let (status, body) = get_json(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required {gameId} query");
    }

    #[tokio::test]
    async fn test_client_rejects_foreign_origin() {
        let (app, _) = app(ScriptedAdapter::new("nhl"));
        let request = client_request("/client/nhl?gameId=1", Some("http://evil.example"));
        let (status, _) = get_json(app, request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_client_rejects_missing_origin() {
        let (app, _) = app(ScriptedAdapter::new("nhl"));
        let (status, _) = get_json(app, client_request("/client/nhl?gameId=1", None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_client_requires_upgrade() {
        let (app, _) = app(ScriptedAdapter::new("nhl"));
        let request = client_request("/client/nhl?gameId=1", Some("https://localhost:8080"));
        let (status, _) = get_json(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_renders_text() {
        crate::metrics::client_connected();
        crate::metrics::client_disconnected();
        let (app, _) = app(ScriptedAdapter::new("nhl"));
        let response = app.oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("sportcast_clients_connected"));
    }
}
