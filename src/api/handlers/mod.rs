//! HTTP handlers and the shared error/response helpers.
//!
//! Every response that carries or concerns a token is marked `no-store`.

pub mod health;
pub mod login;
pub mod refresh;
pub mod revoke;
pub mod types;

use axum::{
    http::{
        header::{CACHE_CONTROL, PRAGMA},
        HeaderName, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json, Response},
};
use tracing::debug;

use crate::auth::{AuthError, ErrorClass};
use types::ErrorBody;

pub(crate) fn no_store() -> [(HeaderName, HeaderValue); 2] {
    [
        (CACHE_CONTROL, HeaderValue::from_static("no-store")),
        (PRAGMA, HeaderValue::from_static("no-cache")),
    ]
}

#[must_use]
pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorClass::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorClass::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a domain error to its status and generic public message.
///
/// The detailed error was already logged by the service.
pub fn error_response(err: &AuthError) -> Response {
    let status = status_for(err.class());
    (
        status,
        no_store(),
        Json(ErrorBody {
            error: err.public_message().to_string(),
        }),
    )
        .into_response()
}

pub(crate) fn bad_request(message: &str) -> Response {
    debug!("rejecting request: {message}");
    (
        StatusCode::BAD_REQUEST,
        no_store(),
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
