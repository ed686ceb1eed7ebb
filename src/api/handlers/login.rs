use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use secrecy::SecretString;
use std::sync::Arc;

use super::types::{ErrorBody, LoginRequest, TokensResponse};
use super::{bad_request, error_response, no_store};
use crate::auth::Authenticator;

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, new token pair issued", body = TokensResponse),
        (status = 400, description = "Malformed request", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody),
        (status = 503, description = "Identity directory unavailable", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login(
    authenticator: Extension<Arc<dyn Authenticator>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("missing payload"),
    };

    if request.username.trim().is_empty() || request.password.is_empty() {
        return bad_request("missing username or password");
    }

    let password = SecretString::from(request.password);
    match authenticator.login(&request.username, &password).await {
        Ok(tokens) => (
            StatusCode::OK,
            no_store(),
            Json(TokensResponse::from(tokens)),
        )
            .into_response(),
        Err(err) => error_response(&err),
    }
}
