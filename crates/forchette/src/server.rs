//! HTTP interface over the session service.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use forchette_core::{
    CategoryScores, CurrentTurn, RankingEntry, ResetMode, SessionConfig, SessionError,
    SessionSnapshot, SlotRef, Vote, VoteRequest,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info, instrument, warn};

use crate::service::{ServiceError, SessionService};
use crate::store::StoreError;

// ─────────────────────────────────────────────────────────────
// Request and response bodies
// ─────────────────────────────────────────────────────────────

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CreateSessionRequest {
    /// Id to store the session under.
    pub session_id: String,
    /// Creator of the session.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Initial draft; the server's default draft when absent.
    #[serde(default)]
    pub config: Option<SessionConfig>,
}

/// Body of `POST /sessions/{id}/votes`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubmitVoteRequest {
    /// Round being voted.
    pub round: usize,
    /// Participant voting.
    pub participant: usize,
    /// Category scores.
    pub scores: CategoryScores,
    /// Whether to spend the participant's bonus.
    #[serde(default)]
    pub wants_bonus: bool,
}

impl From<SubmitVoteRequest> for VoteRequest {
    fn from(body: SubmitVoteRequest) -> Self {
        VoteRequest::new(body.round, body.participant, body.scores, body.wants_bonus)
    }
}

/// Response of `POST /sessions/{id}/votes`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VoteResponse {
    /// The recorded vote.
    pub vote: Vote,
    /// The session after the vote.
    pub session: SessionSnapshot,
}

/// Body of `PUT /sessions/{id}/config`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConfigureRequest {
    /// The new draft.
    pub config: SessionConfig,
}

/// Body of `POST /sessions/{id}/reset`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResetRequest {
    /// Keep the finished config (`true`) or start over from defaults.
    #[serde(default = "keep_config_default")]
    pub keep_config: bool,
}

fn keep_config_default() -> bool {
    true
}

impl Default for ResetRequest {
    fn default() -> Self {
        Self {
            keep_config: keep_config_default(),
        }
    }
}

impl ResetRequest {
    /// The reset mode this body asks for.
    pub fn mode(&self) -> ResetMode {
        if self.keep_config {
            ResetMode::KeepConfig
        } else {
            ResetMode::FreshDefaults
        }
    }
}

/// Response of `GET /sessions/{id}/slot`. Every field is `null` unless the
/// session is active.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CurrentSlotResponse {
    /// The slot awaiting a vote.
    pub slot: Option<SlotRef>,
    /// Round being voted.
    pub round_name: Option<String>,
    /// Participant expected to vote.
    pub participant_name: Option<String>,
}

impl From<Option<CurrentTurn>> for CurrentSlotResponse {
    fn from(turn: Option<CurrentTurn>) -> Self {
        match turn {
            Some(turn) => Self {
                slot: Some(turn.slot),
                round_name: Some(turn.round_name),
                participant_name: Some(turn.participant_name),
            },
            None => Self {
                slot: None,
                round_name: None,
                participant_name: None,
            },
        }
    }
}

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable tag.
    pub kind: String,
}

// ─────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────

/// Failure of a request handler.
#[derive(Debug, derive_more::Display)]
pub enum ApiError {
    /// The service rejected the request.
    #[display("{}", _0)]
    Service(ServiceError),
    /// The blocking worker running the request failed.
    #[display("Worker failed: {}", _0)]
    Worker(String),
}

impl std::error::Error for ApiError {}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(ServiceError::Session(e)) => match e {
                SessionError::Config(_) | SessionError::ScoreOutOfRange { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                SessionError::InvalidPhase { .. }
                | SessionError::SlotMismatch { .. }
                | SessionError::DuplicateSlot(_) => StatusCode::CONFLICT,
                SessionError::InvariantViolation(_) | SessionError::CorruptSnapshot(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Service(ServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Service(ServiceError::InvalidSessionId(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Service(ServiceError::Store(StoreError::AlreadyExists(_)))
            | ApiError::Service(ServiceError::Store(StoreError::Conflict { .. }))
            | ApiError::Service(ServiceError::ConflictRetriesExhausted { .. }) => {
                StatusCode::CONFLICT
            }
            ApiError::Service(ServiceError::Store(_)) | ApiError::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Service(ServiceError::Session(e)) => e.kind(),
            ApiError::Service(ServiceError::NotFound(_)) => "not_found",
            ApiError::Service(ServiceError::InvalidSessionId(_)) => "invalid_session_id",
            ApiError::Service(ServiceError::Store(StoreError::AlreadyExists(_))) => {
                "already_exists"
            }
            ApiError::Service(ServiceError::Store(StoreError::Conflict { .. }))
            | ApiError::Service(ServiceError::ConflictRetriesExhausted { .. }) => "contended",
            ApiError::Service(ServiceError::Store(_)) => "storage",
            ApiError::Worker(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }
        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ─────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    service: SessionService,
    draft: SessionConfig,
}

impl AppState {
    /// Creates handler state; `draft` seeds sessions created without a config.
    pub fn new(service: SessionService, draft: SessionConfig) -> Self {
        Self { service, draft }
    }
}

/// Builds the HTTP router.
#[instrument(skip(state))]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/config", put(configure_session))
        .route("/sessions/{id}/start", post(start_session))
        .route("/sessions/{id}/votes", post(submit_vote))
        .route("/sessions/{id}/reset", post(reset_session))
        .route("/sessions/{id}/reveal", post(reveal_next))
        .route("/sessions/{id}/ranking", get(get_ranking))
        .route("/sessions/{id}/slot", get(get_current_slot))
        .with_state(state)
}

/// Serves the router until Ctrl+C.
///
/// # Errors
///
/// Returns an I/O error if the address cannot be bound.
#[instrument(skip(state))]
pub async fn serve(state: AppState, host: &str, port: u16) -> std::io::Result<()> {
    let address = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&address).await?;
    info!(%address, "Server running");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("Ctrl+C handler unavailable; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}

/// Runs a store-touching service call off the async executor.
async fn blocking<T, F>(service: SessionService, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SessionService) -> Result<T, ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))?
        .map_err(ApiError::from)
}

// ─────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────

#[instrument(skip(state, body), fields(session_id = %body.session_id))]
async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let config = body.config.unwrap_or(state.draft);
    let snapshot = blocking(state.service, move |s| {
        s.create_session(&body.session_id, body.owner_id, config)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

#[instrument(skip(state))]
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    blocking(state.service, move |s| s.get(&id)).await.map(Json)
}

#[instrument(skip(state, body))]
async fn configure_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ConfigureRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    blocking(state.service, move |s| s.configure(&id, body.config))
        .await
        .map(Json)
}

#[instrument(skip(state))]
async fn start_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    blocking(state.service, move |s| s.start_session(&id)).await.map(Json)
}

#[instrument(skip(state, body))]
async fn submit_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SubmitVoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let request = VoteRequest::from(body);
    let (session, vote) =
        blocking(state.service, move |s| s.submit_vote(&id, request)).await?;
    Ok(Json(VoteResponse { vote, session }))
}

#[instrument(skip(state, body))]
async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ResetRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let mode = body.mode();
    blocking(state.service, move |s| s.reset_session(&id, mode))
        .await
        .map(Json)
}

#[instrument(skip(state))]
async fn reveal_next(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    blocking(state.service, move |s| s.reveal_next(&id)).await.map(Json)
}

#[instrument(skip(state))]
async fn get_ranking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<RankingEntry>>, ApiError> {
    blocking(state.service, move |s| s.get_ranking(&id)).await.map(Json)
}

#[instrument(skip(state))]
async fn get_current_slot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CurrentSlotResponse>, ApiError> {
    let turn = blocking(state.service, move |s| s.get_current_slot(&id)).await?;
    Ok(Json(CurrentSlotResponse::from(turn)))
}
