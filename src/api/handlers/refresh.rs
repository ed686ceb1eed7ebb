use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use super::types::{ErrorBody, RefreshRequest, TokensResponse};
use super::{bad_request, error_response, no_store};
use crate::auth::Authenticator;

/// Exchange a refresh token for a new token pair. The presented token is consumed.
#[utoipa::path(
    post,
    path = "/v1/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token rotated, new token pair issued", body = TokensResponse),
        (status = 400, description = "Malformed request", body = ErrorBody),
        (status = 401, description = "Invalid, expired or already used refresh token", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody),
        (status = 503, description = "Identity directory unavailable", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn refresh(
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

    match authenticator.rotate_refresh_token(&request.refresh_token).await {
        Ok(tokens) => (
            StatusCode::OK,
            no_store(),
            Json(TokensResponse::from(tokens)),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}
