use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use notelock_core::db::Database;
use notelock_core::{Accounts, NoteService};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{extract_bearer_token, TokenAuthority};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::handlers::{auth, notes, shares};
use crate::rate_limit::{EndpointRateLimiter, RateLimitMetricsSnapshot};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub(crate) service: Arc<NoteService>,
    pub(crate) accounts: Arc<Accounts>,
    pub(crate) tokens: Arc<TokenAuthority>,
    pub(crate) endpoint_rate_limiter: Arc<EndpointRateLimiter>,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self, notelock_core::Error> {
        let db = Arc::new(Database::open(&config.database_path)?);
        Ok(Self::with_database(config, db))
    }

    pub fn with_database(config: Arc<AppConfig>, db: Arc<Database>) -> Self {
        Self {
            service: Arc::new(NoteService::new(db.clone(), config.lock_ttl)),
            accounts: Arc::new(Accounts::new(db)),
            tokens: Arc::new(TokenAuthority::from_config(&config)),
            endpoint_rate_limiter: Arc::new(EndpointRateLimiter::from_config(config.as_ref())),
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route("/notes/{note_id}", get(notes::get_note).put(notes::update_note))
        .route(
            "/notes/{note_id}/lock",
            post(notes::acquire_lock).delete(notes::release_lock),
        )
        .route("/shares/notes/{note_id}", post(shares::create_share))
        .route(
            "/shares/{share_id}",
            get(shares::open_share).put(shares::save_via_share),
        )
        .route("/shares/{share_id}/revoke", post(shares::revoke_share))
        .route("/shares/{share_id}/status", get(shares::share_status))
        .route(
            "/shares/{share_id}/lock",
            post(shares::acquire_lock).delete(shares::release_lock),
        )
        .route("/locks/{lock_id}", delete(notes::release_lock_by_token))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    rate_limit: RateLimitMetricsSnapshot,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        rate_limit: state.endpoint_rate_limiter.metrics_snapshot(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = state.tokens.verify(token)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Run blocking core work (SQLite, password hashing) off the async workers
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> notelock_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|error| AppError::internal(format!("Worker task failed: {error}")))?
        .map_err(AppError::from)
}

/// Unwrap a JSON body, reporting malformed input as a validation error
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// Parse an id taken from the request path
pub(crate) fn path_id<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::bad_request(format!("{name} is not a valid id")))
}
