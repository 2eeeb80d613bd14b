use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::Json;
use notelock_core::util::user_fingerprint;
use serde::{Deserialize, Serialize};

use crate::auth::IssuedToken;
use crate::error::AppError;
use crate::rate_limit::ProtectedEndpoint;
use crate::routes::{json_body, run_blocking, AppState};

#[derive(Deserialize)]
pub struct CredentialsRequest {
    user_id: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisteredResponse {
    user_id: String,
    created_at: i64,
}

pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisteredResponse>), AppError> {
    // Every registration uses a fresh user id, so budget by client address
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Register, &client.ip().to_string())
        .await?;
    let request = json_body(payload)?;

    let accounts = state.accounts.clone();
    let user = run_blocking(move || accounts.register(&request.user_id, &request.password)).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            user_id: user.user_id,
            created_at: user.created_at,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<IssuedToken>, AppError> {
    let request = json_body(payload)?;
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::Login, &request.user_id)
        .await?;

    let accounts = state.accounts.clone();
    let user =
        run_blocking(move || accounts.authenticate(&request.user_id, &request.password)).await?;
    let token = state.tokens.issue(&user.user_id)?;
    tracing::info!(
        endpoint = "login",
        user = user_fingerprint(&user.user_id),
        expires_at = %token.expires_at,
        "Issued access token"
    );
    Ok(Json(token))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::json;

    use super::*;
    use crate::handlers::test_support::{config, router, router_with, send};

    #[tokio::test]
    async fn register_then_login_issues_bearer_token() {
        let router = router();
        let credentials = json!({"user_id": "alice", "password": "correct horse"});

        let (status, body) = send(
            &router,
            Method::POST,
            "/auth/register",
            None,
            Some(credentials.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user_id"], "alice");

        let (status, body) =
            send(&router, Method::POST, "/auth/login", None, Some(credentials)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        assert!(body["access_token"].as_str().is_some());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let router = router();
        let credentials = json!({"user_id": "alice", "password": "correct horse"});
        send(
            &router,
            Method::POST,
            "/auth/register",
            None,
            Some(credentials.clone()),
        )
        .await;

        let (status, body) =
            send(&router, Method::POST, "/auth/register", None, Some(credentials)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "user_exists");
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let router = router();
        let (status, body) = send(
            &router,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"user_id": "ghost", "password": "whatever1"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "auth_error");
    }

    #[tokio::test]
    async fn missing_fields_are_validation_errors() {
        let router = router();
        let (status, body) = send(
            &router,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"user_id": "alice"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");
    }

    #[tokio::test]
    async fn registrations_from_one_client_are_rate_limited() {
        let mut config = config();
        config.register_rate_limit_per_window = 5;
        let router = router_with(config);

        let mut statuses = Vec::new();
        for i in 0..8 {
            let (status, _) = send(
                &router,
                Method::POST,
                "/auth/register",
                None,
                Some(json!({"user_id": format!("member{i}"), "password": "correct horse"})),
            )
            .await;
            statuses.push(status);
        }

        assert_eq!(statuses[..5], [StatusCode::CREATED; 5]);
        assert_eq!(statuses[5..], [StatusCode::TOO_MANY_REQUESTS; 3]);

        let (_, health) = send(&router, Method::GET, "/healthz", None, None).await;
        assert_eq!(health["rate_limit"]["register_allowed"], 5);
        assert_eq!(health["rate_limit"]["register_limited"], 3);
    }

    #[tokio::test]
    async fn login_attempts_are_rate_limited() {
        let mut config = config();
        config.login_rate_limit_per_window = 1;
        let router = router_with(config);
        let credentials = json!({"user_id": "ghost", "password": "whatever1"});

        let (status, _) = send(
            &router,
            Method::POST,
            "/auth/login",
            None,
            Some(credentials.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            send(&router, Method::POST, "/auth/login", None, Some(credentials)).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "rate_limited");

        let (_, health) = send(&router, Method::GET, "/healthz", None, None).await;
        assert_eq!(health["rate_limit"]["login_limited"], 1);
    }
}
