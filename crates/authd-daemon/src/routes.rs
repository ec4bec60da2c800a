//! Axum router and all HTTP handlers for the broker daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use authd_broker::FacadeError;
use authd_schemas::{AccessToken, LayoutDescriptor, SessionMode};

use crate::state::{uptime_secs, AppState};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/sessions", post(new_session))
        .route("/v1/sessions/:id/modes", post(get_authentication_modes))
        .route("/v1/sessions/:id/mode", post(select_authentication_mode))
        .route("/v1/sessions/:id/authenticate", post(is_authenticated))
        .route("/v1/sessions/:id/cancel", post(cancel_is_authenticated))
        .route("/v1/sessions/:id/end", post(end_session))
        .route("/v1/users/:username/precheck", get(user_precheck))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health, /v1/status
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
    version: &'static str,
}

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

#[derive(Serialize)]
struct StatusResponse {
    service: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(StatusResponse {
            service: st.build.service,
            version: st.build.version,
            uptime_secs: uptime_secs(),
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/sessions
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub(crate) struct NewSessionRequest {
    username: String,
    lang: String,
    #[serde(default)]
    mode: SessionModeWire,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
enum SessionModeWire {
    #[default]
    Login,
    ChangePassword,
}

impl From<SessionModeWire> for SessionMode {
    fn from(w: SessionModeWire) -> Self {
        match w {
            SessionModeWire::Login => SessionMode::Login,
            SessionModeWire::ChangePassword => SessionMode::ChangePassword,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct NewSessionResponseBody {
    session_id: String,
    encryption_key: String,
}

pub(crate) async fn new_session(
    State(st): State<Arc<AppState>>,
    Json(body): Json<NewSessionRequest>,
) -> Response {
    match st
        .facade
        .new_session(&body.username, &body.lang, body.mode.into())
        .await
    {
        Ok(resp) => {
            info!(username = %body.username, session_id = %resp.session_id, "session created");
            (
                StatusCode::OK,
                Json(NewSessionResponseBody {
                    session_id: resp.session_id,
                    encryption_key: resp.encryption_key,
                }),
            )
                .into_response()
        }
        Err(e) => {
            warn!(username = %body.username, error = %e, "new_session rejected");
            facade_error_response(e)
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/sessions/:id/modes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub(crate) struct GetModesRequest {
    #[serde(default)]
    layouts: Vec<LayoutDescriptor>,
}

pub(crate) async fn get_authentication_modes(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(body): Json<GetModesRequest>,
) -> Response {
    match st
        .facade
        .get_authentication_modes(&session_id, body.layouts)
        .await
    {
        Ok(modes) => {
            info!(session_id = %session_id, mode_count = modes.len(), "authentication modes listed");
            (StatusCode::OK, Json(modes)).into_response()
        }
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "get_authentication_modes failed");
            facade_error_response(e)
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/sessions/:id/mode
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub(crate) struct SelectModeRequest {
    id: String,
}

pub(crate) async fn select_authentication_mode(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(body): Json<SelectModeRequest>,
) -> Response {
    match st
        .facade
        .select_authentication_mode(&session_id, &body.id)
        .await
    {
        Ok(ui) => {
            info!(session_id = %session_id, mode = %body.id, "authentication mode selected");
            (StatusCode::OK, Json(ui)).into_response()
        }
        Err(e) => {
            warn!(session_id = %session_id, mode = %body.id, error = %e, "select_authentication_mode failed");
            facade_error_response(e)
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/sessions/:id/authenticate
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub(crate) struct IsAuthenticatedRequest {
    #[serde(default)]
    auth_data: String,
}

#[derive(Serialize)]
pub(crate) struct IsAuthenticatedResponse {
    access: AccessToken,
    data: String,
}

pub(crate) async fn is_authenticated(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(body): Json<IsAuthenticatedRequest>,
) -> Response {
    match st.facade.is_authenticated(&session_id, &body.auth_data).await {
        Ok((access, data)) => {
            match access {
                AccessToken::Denied | AccessToken::Cancelled => {
                    warn!(session_id = %session_id, access = ?access, "authentication step resolved")
                }
                _ => info!(session_id = %session_id, access = ?access, "authentication step resolved"),
            }
            (StatusCode::OK, Json(IsAuthenticatedResponse { access, data })).into_response()
        }
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "is_authenticated failed");
            facade_error_response(e)
        }
    }
}

// ---------------------------------------------------------------------------
// POST /v1/sessions/:id/cancel, /v1/sessions/:id/end
// ---------------------------------------------------------------------------

pub(crate) async fn cancel_is_authenticated(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    st.facade.cancel_is_authenticated(&session_id).await;
    info!(session_id = %session_id, "cancel_is_authenticated requested");
    StatusCode::NO_CONTENT
}

pub(crate) async fn end_session(
    State(st): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    st.facade.end_session(&session_id).await;
    info!(session_id = %session_id, "session ended");
    StatusCode::NO_CONTENT
}

// ---------------------------------------------------------------------------
// GET /v1/users/:username/precheck
// ---------------------------------------------------------------------------

pub(crate) async fn user_precheck(
    State(st): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Response {
    match st.facade.user_precheck(&username).await {
        Some(info) => (StatusCode::OK, Json(info)).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn facade_error_response(err: FacadeError) -> Response {
    let status = match &err {
        FacadeError::UserDoesNotExist(_) | FacadeError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        FacadeError::AlreadyInFlight(_) | FacadeError::ResetPolicyViolation(_) => StatusCode::CONFLICT,
        FacadeError::UnknownMode(_) | FacadeError::MalformedAuthData(_) => StatusCode::BAD_REQUEST,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}
