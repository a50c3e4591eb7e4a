//! HTTP surface — one route that carries out an instruction.
//!
//! - `POST {route}`  `{"query": "..."}` → `{"result": "..."}`
//! - `GET /health`   → `ok`
//! - `GET /tools`    → derived tool list
//!
//! Each request gets its own run and cancellation token. The handler holds
//! the token's drop guard, so a client that disconnects cancels its run.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use scenepilot_agent::{AgentError, AgentLoop};

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AgentLoop>,
}

#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct InteractionResponse {
    pub result: String,
}

/// Failed run, rendered as `{error, reason}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub reason: &'static str,
}

struct ServerError {
    status: StatusCode,
    body: ErrorBody,
}

impl From<AgentError> for ServerError {
    fn from(err: AgentError) -> Self {
        let status = match &err {
            AgentError::UnparsableOutput { .. } | AgentError::StepLimitExceeded { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AgentError::Generation(_) => StatusCode::BAD_GATEWAY,
            AgentError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            body: ErrorBody {
                error: err.to_string(),
                reason: err.reason(),
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Build the router. `route` is the instruction endpoint path.
pub fn router(agent: Arc<AgentLoop>, route: &str) -> Router {
    Router::new()
        .route(route, post(interact))
        .route("/health", get(health))
        .route("/tools", get(tools))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { agent })
}

/// Bind and serve until Ctrl+C.
pub async fn run(agent: Arc<AgentLoop>, addr: &str, route: &str) -> Result<()> {
    let app = router(agent, route);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(addr = %addr, route = %route, "server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

async fn interact(
    State(state): State<AppState>,
    Json(request): Json<InteractionRequest>,
) -> Result<Json<InteractionResponse>, ServerError> {
    let token = CancellationToken::new();
    let _guard = token.clone().drop_guard();

    let agent = state.agent.clone();
    let query = request.query;
    let run = tokio::spawn(async move { agent.run(&query, &token).await });

    match run.await {
        Ok(Ok(output)) => Ok(Json(InteractionResponse { result: output.answer })),
        Ok(Err(e)) => Err(e.into()),
        Err(e) => {
            error!(error = %e, "agent task failed");
            Err(ServerError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: ErrorBody {
                    error: e.to_string(),
                    reason: "internal",
                },
            })
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn tools(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.agent.tools().summaries())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
