use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use super::types::{ErrorBody, RefreshRequest};
use super::{bad_request, error_response, no_store};
use crate::auth::Authenticator;

/// Logout: forget a refresh token. Unknown tokens also answer 204.
#[utoipa::path(
    post,
    path = "/v1/auth/revoke",
    request_body = RefreshRequest,
    responses(
        (status = 204, description = "Refresh token is no longer usable"),
        (status = 400, description = "Malformed request", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn revoke(
    authenticator: Extension<Arc<dyn Authenticator>>,
    payload: Option<Json<RefreshRequest>>,
) -> impl IntoResponse {
    let request: RefreshRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("missing payload"),
    };

    if request.refresh_token.trim().is_empty() {
        return bad_request("missing refresh_token");
    }

    match authenticator.revoke(&request.refresh_token).await {
        Ok(()) => (StatusCode::NO_CONTENT, no_store()).into_response(),
        Err(err) => error_response(&err),
    }
}
