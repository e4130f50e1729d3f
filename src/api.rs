//! REST endpoints for the agents, environment lookups, message logs and
//! profiles.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::agents::planner::AgentKind;
use crate::agents::{
    AgentDeps, CosmeticAgent, CosmeticTurnInput, HistoryEntry, MedicalAgent, MedicalTurnInput,
    SessionState, Speaker,
};
use crate::agents::output::{AgentTurnOutput, HasThoughts};
use crate::error::{AgentError, WeatherError};
use crate::profile::UserProfile;
use crate::scan::{CosmeticScan, MedicalInference, MedicalScan};
use crate::store::{AgentMessageRecord, AgentStore, DEFAULT_RECENT_LIMIT};
use crate::weather::{Location, WeatherProvider, WeatherState};

/// Largest page a client may request from the message log.
const MAX_RECENT_LIMIT: usize = 200;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub cosmetic: Arc<CosmeticAgent>,
    pub medical: Arc<MedicalAgent>,
    pub store: Arc<dyn AgentStore>,
    pub weather: Arc<dyn WeatherProvider>,
    pub weather_timeout: Duration,
}

impl AppState {
    pub fn new(deps: AgentDeps, store: Arc<dyn AgentStore>) -> Self {
        Self {
            weather: Arc::clone(&deps.weather),
            weather_timeout: deps.config.weather_timeout,
            cosmetic: Arc::new(CosmeticAgent::new(deps.clone())),
            medical: Arc::new(MedicalAgent::new(deps)),
            store,
        }
    }
}

/// Build the full router with permissive CORS.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/agents/cosmetic", post(cosmetic_turn))
        .route("/api/agents/medical", post(medical_turn))
        .route("/api/agents/messages/{user_id}", get(list_messages))
        .route("/api/environment", get(environment))
        .route("/api/profile/{user_id}", get(get_profile).put(put_profile))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Errors ──────────────────────────────────────────────────────────────

/// JSON error body: `{"error": code, "message": text}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
            Self::BadGateway(m) => (StatusCode::BAD_GATEWAY, "upstream_error", m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", m),
        };
        (status, Json(json!({"error": code, "message": message}))).into_response()
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        AgentError::InvalidInput(rejection.body_text()).into()
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "dermaid"
    }))
}

// ── Agent turns ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CosmeticRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    scan: Option<CosmeticScan>,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    weather: Option<WeatherState>,
    #[serde(default)]
    user_profile: Option<UserProfile>,
    #[serde(default)]
    predicted_age: Option<f64>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

/// A medical scan, or the classifier's raw output awaiting normalization.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MedicalScanBody {
    Scan(MedicalScan),
    Inference(MedicalInference),
}

impl MedicalScanBody {
    fn into_scan(self) -> MedicalScan {
        match self {
            Self::Scan(scan) => scan,
            Self::Inference(inference) => inference.to_scan(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MedicalRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    scan: Option<MedicalScanBody>,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    weather: Option<WeatherState>,
    #[serde(default)]
    user_profile: Option<UserProfile>,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

fn require_user_id(user_id: Option<String>) -> Result<String, AgentError> {
    user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or(AgentError::MissingRequired)
}

async fn cosmetic_turn(
    State(state): State<AppState>,
    body: Result<Json<CosmeticRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let user_id = require_user_id(request.user_id)?;
    let scan = request
        .scan
        .ok_or(AgentError::MissingRequired)?;
    let user_profile = resolve_profile(&state, &user_id, request.user_profile).await;

    record_answer(&state, &user_id, AgentKind::Cosmetic, &request.history).await;

    let output = state
        .cosmetic
        .run(CosmeticTurnInput {
            user_id: user_id.clone(),
            scan,
            location: request.location,
            weather: request.weather,
            user_profile,
            predicted_age: request.predicted_age,
            history: request.history,
        })
        .await;

    record_output(&state, &user_id, AgentKind::Cosmetic, &output).await;
    Ok(Json(output))
}

async fn medical_turn(
    State(state): State<AppState>,
    body: Result<Json<MedicalRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let user_id = require_user_id(request.user_id)?;
    let scan = request
        .scan
        .map(MedicalScanBody::into_scan)
        .ok_or(AgentError::MissingRequired)?;
    let user_profile = resolve_profile(&state, &user_id, request.user_profile).await;

    record_answer(&state, &user_id, AgentKind::Medical, &request.history).await;

    let output = state
        .medical
        .run(MedicalTurnInput {
            user_id: user_id.clone(),
            scan,
            location: request.location,
            weather: request.weather,
            user_profile,
            history: request.history,
        })
        .await;

    record_output(&state, &user_id, AgentKind::Medical, &output).await;
    Ok(Json(output))
}

/// Use the supplied profile, else whatever was stored for the user.
async fn resolve_profile(
    state: &AppState,
    user_id: &str,
    supplied: Option<UserProfile>,
) -> Option<UserProfile> {
    if supplied.is_some() {
        return supplied;
    }
    match state.store.load_profile(user_id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(user_id = user_id, error = %e, "Failed to load stored profile");
            None
        }
    }
}

/// Log the user's latest answer when the history ends with one.
async fn record_answer(state: &AppState, user_id: &str, kind: AgentKind, history: &[HistoryEntry]) {
    let Some(answer) = SessionState::from_history(history).last_answer else {
        return;
    };
    let record = AgentMessageRecord::new(kind, Speaker::User, answer, None);
    if let Err(e) = state.store.append_message(user_id, &record).await {
        warn!(user_id = user_id, error = %e, "Failed to store user answer");
    }
}

async fn record_output<F>(
    state: &AppState,
    user_id: &str,
    kind: AgentKind,
    output: &AgentTurnOutput<F>,
) where
    F: HasThoughts + Serialize,
{
    let payload = match serde_json::to_value(output) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(user_id = user_id, error = %e, "Failed to serialize turn output");
            None
        }
    };
    let record = AgentMessageRecord::new(kind, Speaker::Agent, output.message(), payload);
    match state.store.append_message(user_id, &record).await {
        Ok(()) => debug!(user_id = user_id, agent = kind.label(), "Turn output stored"),
        Err(e) => warn!(user_id = user_id, error = %e, "Failed to store turn output"),
    }
}

// ── Message log ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MessagesQuery {
    limit: Option<usize>,
}

async fn list_messages(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    let messages = state
        .store
        .recent_messages(&user_id, limit)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(json!({ "messages": messages })))
}

// ── Environment ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EnvironmentQuery {
    lat: Option<String>,
    lon: Option<String>,
}

fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
}

async fn environment(
    State(state): State<AppState>,
    Query(query): Query<EnvironmentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(latitude), Some(longitude)) = (
        parse_coordinate(query.lat.as_deref()),
        parse_coordinate(query.lon.as_deref()),
    ) else {
        return Err(ApiError::BadRequest(
            "lat and lon query parameters are required".to_string(),
        ));
    };

    let location = Location {
        latitude,
        longitude,
    };
    location
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let lookup = tokio::time::timeout(state.weather_timeout, state.weather.current(location))
        .await
        .map_err(|_| WeatherError::Timeout(state.weather_timeout))
        .and_then(|result| result);

    match lookup {
        Ok(weather) => Ok(Json(weather)),
        Err(WeatherError::InvalidCoordinates { .. }) => Err(ApiError::BadRequest(
            "invalid coordinates".to_string(),
        )),
        Err(e) => {
            warn!(error = %e, "Environment lookup failed");
            Err(ApiError::BadGateway(e.to_string()))
        }
    }
}

// ── Profiles ────────────────────────────────────────────────────────────

async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.store.load_profile(&user_id).await {
        Ok(Some(profile)) => Ok(Json(profile)),
        Ok(None) => Err(ApiError::NotFound(format!("No profile for {user_id}"))),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

async fn put_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<UserProfile>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(mut profile) = body?;
    profile.id = user_id;
    state
        .store
        .save_profile(&profile)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(user_id = %profile.id, "Profile updated");
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::agents::{OfflinePlanner, TemplatePhraser};
    use crate::catalog::{CatalogMatcher, InMemoryCatalog, Product};
    use crate::config::AgentConfig;
    use crate::store::LibSqlStore;

    struct FixedWeather(Result<WeatherState, u16>);

    #[async_trait]
    impl WeatherProvider for FixedWeather {
        async fn current(&self, location: Location) -> Result<WeatherState, WeatherError> {
            location.validate()?;
            match self.0 {
                Ok(state) => Ok(state),
                Err(status) => Err(WeatherError::Upstream {
                    status,
                    body: "unavailable".into(),
                }),
            }
        }
    }

    async fn test_state(weather: FixedWeather) -> AppState {
        let catalog = InMemoryCatalog::new(vec![
            Product::new("p1", "Clear Gel", &["salicylic acid", "niacinamide"]),
            Product::new("p2", "Barrier Cream", &["ceramides", "niacinamide"]),
        ]);
        let deps = AgentDeps::new(
            Arc::new(OfflinePlanner),
            Arc::new(TemplatePhraser),
            Arc::new(weather),
            CatalogMatcher::new(Arc::new(catalog)),
            AgentConfig::default(),
        );
        let store: Arc<dyn AgentStore> = Arc::new(LibSqlStore::new_memory().await.unwrap());
        AppState::new(deps, store)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn missing_user_id_is_bad_request() {
        let app = routes(test_state(FixedWeather(Ok(WeatherState::neutral()))).await);
        let (status, body) = send(
            app,
            post_json("/api/agents/cosmetic", json!({"scan": {"severity_score": 0.2}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
        assert_eq!(body["message"], "userId and scan are required");
    }

    #[tokio::test]
    async fn missing_scan_is_bad_request() {
        let app = routes(test_state(FixedWeather(Ok(WeatherState::neutral()))).await);
        let (status, body) =
            send(app, post_json("/api/agents/medical", json!({"userId": "u1"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "userId and scan are required");
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let app = routes(test_state(FixedWeather(Ok(WeatherState::neutral()))).await);
        let request = Request::post("/api/agents/cosmetic")
            .header("content-type", "application/json")
            .body(Body::from("{\"userId\": \"u1\", \"scan\": "))
            .unwrap();
        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .starts_with("Invalid request body: ")
        );
    }

    #[test]
    fn agent_error_maps_to_bad_request() {
        match ApiError::from(AgentError::MissingRequired) {
            ApiError::BadRequest(message) => {
                assert_eq!(message, "userId and scan are required")
            }
            other => panic!("Expected BadRequest, got {:?}", other),
        }
        match require_user_id(Some("   ".into())) {
            Err(AgentError::MissingRequired) => {}
            other => panic!("Expected MissingRequired, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn cosmetic_turn_is_logged() {
        let state = test_state(FixedWeather(Ok(WeatherState::neutral()))).await;
        let store = Arc::clone(&state.store);
        let app = routes(state);

        let (status, body) = send(
            app,
            post_json(
                "/api/agents/cosmetic",
                json!({
                    "userId": "u1",
                    "scan": {"detected_conditions": ["acne_vulgaris"], "severity_score": 0.3},
                    "history": [
                        {"role": "agent", "content": "Which routine fits your day?"},
                        {"role": "user", "content": "Simple"}
                    ]
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "final");

        let log = store.recent_messages("u1", 20).await.unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.iter().any(|m| m.role == Speaker::User && m.content == "Simple"));
        let agent_entry = log.iter().find(|m| m.role == Speaker::Agent).unwrap();
        assert_eq!(agent_entry.agent, "cosmetic");
        assert_eq!(agent_entry.payload.as_ref().unwrap()["type"], "final");
    }

    #[tokio::test]
    async fn medical_accepts_raw_inference() {
        let app = routes(test_state(FixedWeather(Ok(WeatherState::neutral()))).await);
        let (status, body) = send(
            app,
            post_json(
                "/api/agents/medical",
                json!({
                    "userId": "u2",
                    "scan": {"predictedLabel": "Melanoma Skin Cancer Nevi and Moles", "score": 0.91}
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "final");
        assert_eq!(body["riskLevel"], "high");
        assert_eq!(body["requiresDermatologist"], true);
    }

    #[tokio::test]
    async fn environment_validates_and_maps_upstream_errors() {
        let ok = routes(test_state(FixedWeather(Ok(WeatherState::from_readings(9.0, 40.0, 25.0)))).await);
        let (status, body) = send(
            ok.clone(),
            Request::get("/api/environment?lat=40.4&lon=-3.7")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isHighUV"], true);

        let (status, _) = send(
            ok.clone(),
            Request::get("/api/environment?lat=abc&lon=1").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            ok,
            Request::get("/api/environment?lat=95&lon=1").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let failing = routes(test_state(FixedWeather(Err(503))).await);
        let (status, body) = send(
            failing,
            Request::get("/api/environment?lat=1&lon=1").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "upstream_error");
    }

    #[tokio::test]
    async fn profile_round_trip_and_not_found() {
        let app = routes(test_state(FixedWeather(Ok(WeatherState::neutral()))).await);

        let (status, _) = send(
            app.clone(),
            Request::get("/api/profile/u9").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let put = Request::put("/api/profile/u9")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"name": "Ada", "age": 34, "skinType": "dry", "allergies": ["fragrance"]})
                    .to_string(),
            ))
            .unwrap();
        let (status, body) = send(app.clone(), put).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "u9");

        let (status, body) = send(
            app,
            Request::get("/api/profile/u9").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ada");
    }
}
