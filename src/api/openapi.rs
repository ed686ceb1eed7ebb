use super::handlers::{health, login, refresh, revoke};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Router that serves the documented endpoints and produces the `OpenAPI` document.
pub(crate) fn api_router() -> OpenApiRouter {
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(login::login))
        .routes(routes!(refresh::refresh))
        .routes(routes!(revoke::revoke))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).tags(Some(tags())).build()
}

fn tags() -> Vec<Tag> {
    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Login, refresh token rotation and logout".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Liveness and build information".to_string());

    vec![auth_tag, health_tag]
}

fn cargo_contact() -> Option<Contact> {
    let authors = env!("CARGO_PKG_AUTHORS");
    let (name, email) = parse_author(authors.split(':').next().map(str::trim)?);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

// "Name <email>", "Name" or "<email>".
fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(value: &str) -> Option<&str> {
        let value = value.trim();
        (!value.is_empty()).then_some(value)
    }

    match author.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, "auth-service");
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));

        let contact = spec.info.contact.expect("contact");
        assert_eq!(contact.name.as_deref(), Some("Auth Service Team"));
        assert_eq!(contact.email.as_deref(), Some("team@auth-service.dev"));

        let license = spec.info.license.expect("license");
        assert_eq!(license.identifier.as_deref(), Some("BSD-3-Clause"));
    }

    #[test]
    fn documented_paths() {
        let spec = openapi();
        for path in ["/health", "/v1/auth/login", "/v1/auth/refresh", "/v1/auth/revoke"] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
        let tags = spec.tags.unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "auth"));
        assert!(tags.iter().any(|tag| tag.name == "health"));
        let auth = tags.iter().find(|tag| tag.name == "auth").expect("auth tag");
        assert_eq!(
            auth.description.as_deref(),
            Some("Login, refresh token rotation and logout")
        );
    }

    #[test]
    fn author_parsing() {
        assert_eq!(parse_author("Jane <jane@x.dev>"), (Some("Jane"), Some("jane@x.dev")));
        assert_eq!(parse_author("Jane"), (Some("Jane"), None));
        assert_eq!(parse_author("<jane@x.dev>"), (None, Some("jane@x.dev")));
    }
}
