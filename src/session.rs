use axum::{
    extract::FromRequestParts,
    http::{Method, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::AppError;

pub const USER_EMAIL: &str = "user_email";
pub const EVENT_DRAFT: &str = "event_draft";

/// Signed-in user. Handlers taking this redirect anonymous visitors to the
/// login page.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub email: String,
}

/// Only same-site paths are followed after signing in.
pub fn safe_return_url(return_url: Option<&str>) -> &str {
    match return_url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") => url,
        _ => "/",
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match session.get::<String>(USER_EMAIL).await {
            Ok(Some(email)) => Ok(CurrentUser { email }),
            Ok(None) => {
                let login = if parts.method == Method::GET {
                    format!("/login?return_url={}", parts.uri.path())
                } else {
                    "/login".to_owned()
                };
                Err(Redirect::to(&login).into_response())
            }
            Err(err) => Err(AppError::from(err).into_response()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_url_stays_on_site() {
        assert_eq!(safe_return_url(Some("/e/new")), "/e/new");
        assert_eq!(safe_return_url(Some("//evil.example")), "/");
        assert_eq!(safe_return_url(Some("https://evil.example")), "/");
        assert_eq!(safe_return_url(None), "/");
    }
}
