use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use notelock_core::{Note, NoteId, Share, ShareId, ShareMode};
use serde::{Deserialize, Serialize};

use super::notes::SaveNoteRequest;
use super::LockResponse;
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::routes::{json_body, path_id, run_blocking, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateShareRequest {
    shared_with_user_id: String,
    mode: ShareMode,
    ttl_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ShareCreatedResponse {
    share_id: String,
    note_id: String,
    mode: ShareMode,
    expires_at: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ShareStatusResponse {
    share_id: String,
    note_id: String,
    owner_id: String,
    shared_with_user_id: String,
    mode: ShareMode,
    created_at: i64,
    expires_at: Option<i64>,
    revoked: bool,
}

impl From<Share> for ShareStatusResponse {
    fn from(share: Share) -> Self {
        Self {
            share_id: share.id.to_string(),
            note_id: share.note_id.to_string(),
            owner_id: share.owner_id,
            shared_with_user_id: share.recipient_id,
            mode: share.mode,
            created_at: share.created_at,
            expires_at: share.expires_at,
            revoked: share.revoked,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RevokedResponse {
    revoked: bool,
}

pub async fn create_share(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(note_id): Path<String>,
    payload: Result<Json<CreateShareRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShareCreatedResponse>), AppError> {
    let note_id = path_id::<NoteId>(&note_id, "note_id")?;
    let request = json_body(payload)?;
    let service = state.service.clone();
    let share = run_blocking(move || {
        service.create_share(
            &user.user_id,
            note_id,
            &request.shared_with_user_id,
            request.mode,
            request.ttl_minutes,
        )
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ShareCreatedResponse {
            share_id: share.id.to_string(),
            note_id: share.note_id.to_string(),
            mode: share.mode,
            expires_at: share.expires_at,
        }),
    ))
}

pub async fn revoke_share(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(share_id): Path<String>,
) -> Result<Json<RevokedResponse>, AppError> {
    let share_id = path_id::<ShareId>(&share_id, "share_id")?;
    let service = state.service.clone();
    run_blocking(move || service.revoke_share(&user.user_id, share_id)).await?;
    Ok(Json(RevokedResponse { revoked: true }))
}

pub async fn open_share(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(share_id): Path<String>,
) -> Result<Json<Note>, AppError> {
    let share_id = path_id::<ShareId>(&share_id, "share_id")?;
    let service = state.service.clone();
    let note = run_blocking(move || service.open_share(&user.user_id, share_id)).await?;
    Ok(Json(note))
}

pub async fn share_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(share_id): Path<String>,
) -> Result<Json<ShareStatusResponse>, AppError> {
    let share_id = path_id::<ShareId>(&share_id, "share_id")?;
    let service = state.service.clone();
    let share = run_blocking(move || service.share_status(&user.user_id, share_id)).await?;
    Ok(Json(share.into()))
}

pub async fn acquire_lock(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(share_id): Path<String>,
) -> Result<Json<LockResponse>, AppError> {
    let share_id = path_id::<ShareId>(&share_id, "share_id")?;
    let service = state.service.clone();
    let lock = run_blocking(move || service.acquire_share_lock(&user.user_id, share_id)).await?;
    Ok(Json(lock.into()))
}

pub async fn release_lock(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(share_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let share_id = path_id::<ShareId>(&share_id, "share_id")?;
    let service = state.service.clone();
    run_blocking(move || service.release_share_lock(&user.user_id, share_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn save_via_share(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(share_id): Path<String>,
    payload: Result<Json<SaveNoteRequest>, JsonRejection>,
) -> Result<Json<Note>, AppError> {
    let share_id = path_id::<ShareId>(&share_id, "share_id")?;
    let (edit, token) = json_body(payload)?.into_parts()?;
    let service = state.service.clone();
    let note =
        run_blocking(move || service.save_via_share(&user.user_id, share_id, &edit, token)).await?;
    Ok(Json(note))
}
