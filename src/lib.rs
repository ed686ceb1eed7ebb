//! # auth-service (token lifecycle authority)
//!
//! `auth-service` verifies credentials against an external Identity Directory and
//! issues paired tokens:
//!
//! - **Access tokens** are short-lived HS256 JWTs carrying the subject id, username
//!   and current role names. They are self-verifying and never stored.
//! - **Refresh tokens** are opaque 256-bit random values. Their only authority is
//!   the row in the refresh token store, which lets the service revoke them and
//!   enforce single use.
//!
//! ## Rotation
//!
//! Presenting a refresh token yields a new token pair and consumes the old token
//! inside one unit of work (delete-checked, then insert, then commit). Of any number
//! of concurrent rotations of the same token exactly one wins; the others observe
//! that nothing was deleted and are rejected. A failure anywhere before the final
//! unit of work leaves the old token valid.
//!
//! ## Error surface
//!
//! Unknown usernames and wrong passwords produce the same answer. Missing, expired
//! and already rotated refresh tokens also share one answer. Internal failures are
//! logged in full and reported generically.

use std::{future::Future, pin::Pin};

pub mod api;
pub mod auth;
pub mod cli;
pub mod directory;
pub mod store;

/// Boxed `Send` future returned by the object-safe async traits of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
