// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

mod live;
mod room;

use axum::{
    Json, Router,
    extract::{Path, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::Parser;
use pregao::Command;
use pregao_api::{
    ApiError, PrepareSessionRequest, SessaoSnapshot, SessionOutcome, prepare_session,
};
use pregao_audit::SessionEvent;
use pregao_domain::{ItemId, ParticipantId};
use pregao_persistence::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
use room::{RoomHandle, RoomRegistry};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Pregão Server - live dispute sessions for electronic procurement
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory for session checkpoints. If not provided, checkpoints
    /// are kept in memory only.
    #[arg(short, long)]
    checkpoints: Option<String>,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    /// The registry of running session rooms.
    pub registry: Arc<RoomRegistry>,
}

/// API request to create a session from prepared procurement data.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionApiRequest {
    /// Optional explicit session identifier.
    #[serde(default)]
    sessao_id: Option<String>,
    /// The preparation handoff from the CRUD layer.
    #[serde(flatten)]
    prepare: PrepareSessionRequest,
}

/// API response for session creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionApiResponse {
    /// The session identifier.
    sessao_id: String,
    /// The session status.
    status: String,
    /// Number of admitted participants.
    participantes: usize,
    /// Number of items to dispute.
    itens: usize,
}

/// API request to submit a bid over HTTP.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBidApiRequest {
    /// The submitting supplier.
    fornecedor_id: String,
    /// Offered unit value in centavos.
    valor_centavos: i64,
    /// Optional explicit item; defaults to the item in dispute.
    #[serde(default)]
    item_id: Option<String>,
    /// Revision the caller last observed, for conflict detection.
    #[serde(default)]
    observed_revision: Option<u64>,
}

/// API response for an accepted bid.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBidApiResponse {
    /// Sequence of the accepted bid within the item history.
    sequencia: u64,
    /// Accepted unit value in centavos.
    valor_centavos: i64,
    /// Session revision after the commit.
    revision: u64,
}

/// API request carrying an auctioneer reason.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MotivoApiRequest {
    /// The reason given by the auctioneer.
    motivo: String,
}

/// API response for state-changing session operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteApiResponse {
    /// Success indicator.
    success: bool,
    /// Session revision after the commit.
    revision: u64,
}

/// Wrapper translating API errors into HTTP responses.
struct HttpError(ApiError);

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status: StatusCode = match self.0.code() {
            "VALIDATION" | "NOT_IMPROVED" | "DECREMENT_TOO_SMALL" => StatusCode::UNPROCESSABLE_ENTITY,
            "INVALID_STATE" | "CLOSED_ITEM" | "CONFLICT" => StatusCode::CONFLICT,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({
            "code": self.0.code(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

fn session_not_found(session_id: &str) -> HttpError {
    HttpError(ApiError::NotFound {
        resource: String::from("Session"),
        message: format!("session '{session_id}' is not running"),
    })
}

async fn get_room(state: &AppState, session_id: &str) -> Result<RoomHandle, HttpError> {
    state
        .registry
        .get(session_id)
        .await
        .ok_or_else(|| session_not_found(session_id))
}

/// POST /sessions - prepare and register a new dispute session.
async fn create_session_handler(
    AxumState(state): AxumState<AppState>,
    Json(request): Json<CreateSessionApiRequest>,
) -> Result<Json<CreateSessionApiResponse>, HttpError> {
    let session_id: String = request
        .sessao_id
        .unwrap_or_else(|| format!("sessao-{:016x}", rand::random::<u64>()));

    let session = prepare_session(&session_id, request.prepare, OffsetDateTime::now_utc())?;
    let response = CreateSessionApiResponse {
        sessao_id: session.id.value().to_string(),
        status: session.status.to_string(),
        participantes: session.participants.len(),
        itens: session.items.len(),
    };
    state.registry.create(session).await?;

    info!(session_id = %response.sessao_id, "Session created");
    Ok(Json(response))
}

/// POST /sessions/{id}/start - open the public session.
async fn start_session_handler(
    Path(session_id): Path<String>,
    AxumState(state): AxumState<AppState>,
) -> Result<Json<WriteApiResponse>, HttpError> {
    let room: RoomHandle = get_room(&state, &session_id).await?;
    let ack = room.execute(Command::Start, None).await?;
    Ok(Json(WriteApiResponse {
        success: true,
        revision: ack.revision,
    }))
}

/// POST /sessions/{id}/bids - submit a bid.
async fn submit_bid_handler(
    Path(session_id): Path<String>,
    AxumState(state): AxumState<AppState>,
    Json(request): Json<SubmitBidApiRequest>,
) -> Result<Json<SubmitBidApiResponse>, HttpError> {
    let room: RoomHandle = get_room(&state, &session_id).await?;
    let participant_id: ParticipantId = ParticipantId::new(&request.fornecedor_id);

    let ack = match request.item_id {
        Some(item_id) => {
            room.execute(
                Command::SubmitBid {
                    item_id: ItemId::new(&item_id),
                    participant_id,
                    unit_centavos: request.valor_centavos,
                },
                request.observed_revision,
            )
            .await?
        }
        None => {
            room.bid_on_current_item(
                participant_id,
                request.valor_centavos,
                request.observed_revision,
            )
            .await?
        }
    };

    let bid = ack.accepted_bid.ok_or(ApiError::Internal {
        message: String::from("bid commit returned no bid"),
    })?;
    Ok(Json(SubmitBidApiResponse {
        sequencia: bid.sequence,
        valor_centavos: bid.unit_value.centavos(),
        revision: ack.revision,
    }))
}

/// POST /sessions/{id}/pause - suspend the session.
async fn pause_session_handler(
    Path(session_id): Path<String>,
    AxumState(state): AxumState<AppState>,
    Json(request): Json<MotivoApiRequest>,
) -> Result<Json<WriteApiResponse>, HttpError> {
    let room: RoomHandle = get_room(&state, &session_id).await?;
    let ack = room
        .execute(
            Command::Pause {
                reason: request.motivo,
            },
            None,
        )
        .await?;
    Ok(Json(WriteApiResponse {
        success: true,
        revision: ack.revision,
    }))
}

/// POST /sessions/{id}/resume - resume a suspended session.
async fn resume_session_handler(
    Path(session_id): Path<String>,
    AxumState(state): AxumState<AppState>,
) -> Result<Json<WriteApiResponse>, HttpError> {
    let room: RoomHandle = get_room(&state, &session_id).await?;
    let ack = room.execute(Command::Resume, None).await?;
    Ok(Json(WriteApiResponse {
        success: true,
        revision: ack.revision,
    }))
}

/// POST /sessions/{id}/abort - administrative cancellation.
async fn abort_session_handler(
    Path(session_id): Path<String>,
    AxumState(state): AxumState<AppState>,
    Json(request): Json<MotivoApiRequest>,
) -> Result<Json<WriteApiResponse>, HttpError> {
    let room: RoomHandle = get_room(&state, &session_id).await?;
    let ack = room
        .execute(
            Command::Abort {
                reason: request.motivo,
            },
            None,
        )
        .await?;
    Ok(Json(WriteApiResponse {
        success: true,
        revision: ack.revision,
    }))
}

/// GET /sessions/{id}/snapshot - full state for rehydration.
async fn snapshot_handler(
    Path(session_id): Path<String>,
    AxumState(state): AxumState<AppState>,
) -> Result<Json<SessaoSnapshot>, HttpError> {
    let room: RoomHandle = get_room(&state, &session_id).await?;
    Ok(Json(room.snapshot().await?))
}

/// GET /sessions/{id}/outcome - final ranking of a closed session.
async fn outcome_handler(
    Path(session_id): Path<String>,
    AxumState(state): AxumState<AppState>,
) -> Result<Json<SessionOutcome>, HttpError> {
    let room: RoomHandle = get_room(&state, &session_id).await?;
    Ok(Json(room.outcome().await?))
}

/// GET /sessions/{id}/events - the session's audit event log.
async fn events_handler(
    Path(session_id): Path<String>,
    AxumState(state): AxumState<AppState>,
) -> Result<Json<Vec<SessionEvent>>, HttpError> {
    let room: RoomHandle = get_room(&state, &session_id).await?;
    Ok(Json(room.events().await?))
}

/// GET /healthz - liveness probe.
async fn healthz_handler() -> &'static str {
    "ok"
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/sessions", post(create_session_handler))
        .route("/sessions/{id}/start", post(start_session_handler))
        .route("/sessions/{id}/bids", post(submit_bid_handler))
        .route("/sessions/{id}/pause", post(pause_session_handler))
        .route("/sessions/{id}/resume", post(resume_session_handler))
        .route("/sessions/{id}/abort", post(abort_session_handler))
        .route("/sessions/{id}/snapshot", get(snapshot_handler))
        .route("/sessions/{id}/outcome", get(outcome_handler))
        .route("/sessions/{id}/events", get(events_handler))
        .route("/sessions/{id}/live", get(live::live_session_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Args = Args::parse();

    let store: Arc<dyn CheckpointStore> = match &args.checkpoints {
        Some(dir) => {
            info!(dir, "Using file checkpoint store");
            Arc::new(FileCheckpointStore::open(std::path::Path::new(dir))?)
        }
        None => {
            info!("Using in-memory checkpoint store");
            Arc::new(MemoryCheckpointStore::new())
        }
    };

    let registry: Arc<RoomRegistry> = Arc::new(RoomRegistry::new(store));
    let restored: usize = registry.restore_all().await;
    if restored > 0 {
        info!(restored, "Restored sessions from checkpoints");
    }

    let state: AppState = AppState { registry };
    let app: Router = build_router(state);

    let addr: SocketAddr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!(%addr, "Pregão server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
