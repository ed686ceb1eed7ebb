//! The reqwest Identity Directory client against a local axum stub.

use anyhow::Result;
use auth_service::directory::{DirectoryError, HttpIdentityDirectory, IdentityDirectory};
use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use std::{net::SocketAddr, time::Duration};
use tokio::net::TcpListener;

#[derive(Deserialize)]
struct CredentialsRequest {
    username: String,
}

async fn credentials(Json(request): Json<CredentialsRequest>) -> impl IntoResponse {
    match request.username.as_str() {
        "alice" => (
            StatusCode::OK,
            Json(json!({
                "hashed_password": "$2b$04$stubbedhashvalue",
                "user": {
                    "id": "alice-id",
                    "username": "alice",
                    "roles": [{ "id": "r-1", "name": "admin" }, { "id": "r-2", "name": "user" }]
                }
            })),
        )
            .into_response(),
        "broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn user(Path(id): Path<String>) -> impl IntoResponse {
    match id.as_str() {
        "alice-id" => (
            StatusCode::OK,
            Json(json!({
                "user": { "id": "alice-id", "username": "alice", "roles": [{ "name": "user" }] }
            })),
        )
            .into_response(),
        "slow-id" => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::NOT_FOUND.into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_stub() -> Result<SocketAddr> {
    let app = Router::new()
        .route("/v1/users/credentials", post(credentials))
        .route("/v1/users/:id", get(user));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

async fn client(timeout: Duration) -> Result<HttpIdentityDirectory> {
    let addr = spawn_stub().await?;
    Ok(HttpIdentityDirectory::new(&format!("http://{addr}"), timeout)?)
}

#[tokio::test]
async fn credentials_are_mapped_to_identity() -> Result<()> {
    let directory = client(Duration::from_secs(2)).await?;

    let credentials = directory
        .get_credentials("alice")
        .await?
        .ok_or_else(|| anyhow::anyhow!("alice should exist"))?;

    assert_eq!(credentials.password_hash.expose_secret(), "$2b$04$stubbedhashvalue");
    assert_eq!(credentials.identity.user_id, "alice-id");
    assert_eq!(credentials.identity.username, "alice");
    assert_eq!(
        credentials.identity.roles,
        vec!["admin".to_string(), "user".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn unknown_users_are_none() -> Result<()> {
    let directory = client(Duration::from_secs(2)).await?;

    assert!(directory.get_credentials("mallory").await?.is_none());
    assert!(directory.get_user_by_id("missing-id").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn user_lookup_by_id() -> Result<()> {
    let directory = client(Duration::from_secs(2)).await?;

    let identity = directory
        .get_user_by_id("alice-id")
        .await?
        .ok_or_else(|| anyhow::anyhow!("alice-id should exist"))?;
    assert_eq!(identity.username, "alice");
    assert_eq!(identity.roles, vec!["user".to_string()]);
    Ok(())
}

#[tokio::test]
async fn server_errors_are_directory_failures() -> Result<()> {
    let directory = client(Duration::from_secs(2)).await?;

    let result = directory.get_credentials("broken").await;
    assert!(matches!(result, Err(DirectoryError::Status { status: 500 })));
    Ok(())
}

#[tokio::test]
async fn slow_directory_times_out() -> Result<()> {
    let directory = client(Duration::from_millis(200)).await?;

    let result = directory.get_user_by_id("slow-id").await;
    assert!(matches!(result, Err(DirectoryError::Transport(_))));
    Ok(())
}

#[tokio::test]
async fn unreachable_directory_is_a_transport_failure() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let directory = HttpIdentityDirectory::new(&format!("http://{addr}"), Duration::from_secs(1))?;
    let result = directory.get_user_by_id("alice-id").await;
    assert!(matches!(result, Err(DirectoryError::Transport(_))));
    Ok(())
}
