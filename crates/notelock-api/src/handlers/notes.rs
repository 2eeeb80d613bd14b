use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use notelock_core::{LockToken, Note, NoteEdit, NoteId};
use serde::Deserialize;

use super::LockResponse;
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::routes::{json_body, path_id, run_blocking, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    title: String,
    content: String,
}

/// Body of a save on either the owner or the share path
#[derive(Debug, Deserialize)]
pub struct SaveNoteRequest {
    title: String,
    content: String,
    lock_id: String,
    expected_version: Option<i64>,
}

impl SaveNoteRequest {
    pub(crate) fn into_parts(self) -> Result<(NoteEdit, LockToken), AppError> {
        let token = path_id::<LockToken>(&self.lock_id, "lock_id")?;
        let mut edit = NoteEdit::new(self.title, self.content);
        if let Some(version) = self.expected_version {
            edit = edit.based_on(version);
        }
        Ok((edit, token))
    }
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Note>>, AppError> {
    let service = state.service.clone();
    let notes = run_blocking(move || service.list_notes(&user.user_id)).await?;
    Ok(Json(notes))
}

pub async fn create_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Note>), AppError> {
    let request = json_body(payload)?;
    let service = state.service.clone();
    let note = run_blocking(move || {
        service.create_note(&user.user_id, &request.title, &request.content)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn get_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(note_id): Path<String>,
) -> Result<Json<Note>, AppError> {
    let note_id = path_id::<NoteId>(&note_id, "note_id")?;
    let service = state.service.clone();
    let note = run_blocking(move || service.get_note(&user.user_id, note_id)).await?;
    Ok(Json(note))
}

pub async fn update_note(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(note_id): Path<String>,
    payload: Result<Json<SaveNoteRequest>, JsonRejection>,
) -> Result<Json<Note>, AppError> {
    let note_id = path_id::<NoteId>(&note_id, "note_id")?;
    let (edit, token) = json_body(payload)?.into_parts()?;
    let service = state.service.clone();
    let note =
        run_blocking(move || service.update_note(&user.user_id, note_id, &edit, token)).await?;
    Ok(Json(note))
}

pub async fn acquire_lock(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(note_id): Path<String>,
) -> Result<Json<LockResponse>, AppError> {
    let note_id = path_id::<NoteId>(&note_id, "note_id")?;
    let service = state.service.clone();
    let lock = run_blocking(move || service.acquire_note_lock(&user.user_id, note_id)).await?;
    Ok(Json(lock.into()))
}

pub async fn release_lock(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(note_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let note_id = path_id::<NoteId>(&note_id, "note_id")?;
    let service = state.service.clone();
    run_blocking(move || service.release_note_lock(&user.user_id, note_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn release_lock_by_token(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(lock_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let token = path_id::<LockToken>(&lock_id, "lock_id")?;
    let service = state.service.clone();
    run_blocking(move || service.release_lock(&user.user_id, token)).await?;
    Ok(StatusCode::NO_CONTENT)
}
