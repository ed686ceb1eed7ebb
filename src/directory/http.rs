//! HTTP/JSON Identity Directory client.
//!
//! - `POST {base}/v1/users/credentials` with `{"username"}` returns the stored hash
//!   and the user.
//! - `GET {base}/v1/users/{id}` returns the user.
//!
//! `404` means the user does not exist; any other non-success status is a
//! directory failure.

use reqwest::{Client, Response, StatusCode};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{Credentials, DirectoryError, Identity, IdentityDirectory};
use crate::{BoxFuture, APP_USER_AGENT};

#[derive(Serialize)]
struct CredentialsRequest<'a> {
    username: &'a str,
}

#[derive(Deserialize)]
struct CredentialsResponse {
    hashed_password: String,
    user: UserPayload,
}

#[derive(Deserialize)]
struct UserResponse {
    user: UserPayload,
}

#[derive(Deserialize)]
struct UserPayload {
    id: String,
    username: String,
    #[serde(default)]
    roles: Vec<RolePayload>,
}

#[derive(Deserialize)]
struct RolePayload {
    name: String,
}

impl From<UserPayload> for Identity {
    fn from(user: UserPayload) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            roles: user.roles.into_iter().map(|role| role.name).collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpIdentityDirectory {
    client: Client,
    base_url: Url,
}

impl HttpIdentityDirectory {
    /// Build a client for the directory rooted at `base_url`.
    ///
    /// Every request is bounded by `timeout`; dropping the calling future aborts
    /// the request.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(DirectoryError::CannotBeABase);
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, DirectoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| DirectoryError::CannotBeABase)?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    #[instrument(skip_all)]
    async fn fetch_credentials(&self, username: &str) -> Result<Option<Credentials>, DirectoryError> {
        let url = self.endpoint(&["v1", "users", "credentials"])?;
        let response = self
            .client
            .post(url)
            .json(&CredentialsRequest { username })
            .send()
            .await?;

        let Some(response) = accept(response)? else {
            debug!("directory has no credentials for the requested username");
            return Ok(None);
        };

        let body: CredentialsResponse = response.json().await?;
        Ok(Some(Credentials {
            password_hash: SecretString::from(body.hashed_password),
            identity: body.user.into(),
        }))
    }

    #[instrument(skip(self))]
    async fn fetch_user(&self, user_id: &str) -> Result<Option<Identity>, DirectoryError> {
        let url = self.endpoint(&["v1", "users", user_id])?;
        let response = self.client.get(url).send().await?;

        let Some(response) = accept(response)? else {
            debug!("directory has no user with the requested id");
            return Ok(None);
        };

        let body: UserResponse = response.json().await?;
        Ok(Some(body.user.into()))
    }
}

fn accept(response: Response) -> Result<Option<Response>, DirectoryError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(DirectoryError::Status {
            status: status.as_u16(),
        });
    }
    Ok(Some(response))
}

impl IdentityDirectory for HttpIdentityDirectory {
    fn get_credentials<'a>(
        &'a self,
        username: &'a str,
    ) -> BoxFuture<'a, Result<Option<Credentials>, DirectoryError>> {
        Box::pin(self.fetch_credentials(username))
    }

    fn get_user_by_id<'a>(
        &'a self,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Identity>, DirectoryError>> {
        Box::pin(self.fetch_user(user_id))
    }
}
