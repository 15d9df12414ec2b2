//! The identity of the caller that every transaction is scoped to.

use std::fmt::Display;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The header the authentication layer uses to pass the caller's user ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// A newtype wrapper for the opaque user ID supplied by the authentication layer.
///
/// This helps disambiguate user IDs from transaction IDs and other strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The user ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(Error::MissingUserId)?;

        Ok(UserId::new(user_id))
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::FromRequestParts, http::Request};

    use crate::{Error, user::UserId};

    async fn extract(request: Request<()>) -> Result<UserId, Error> {
        let (mut parts, _) = request.into_parts();
        UserId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn extracts_user_id_from_header() {
        let request = Request::builder()
            .header("x-user-id", "u1")
            .body(())
            .unwrap();

        assert_eq!(extract(request).await, Ok(UserId::new("u1")));
    }

    #[tokio::test]
    async fn rejects_missing_or_blank_user_id() {
        let missing = Request::builder().body(()).unwrap();
        let blank = Request::builder()
            .header("x-user-id", "   ")
            .body(())
            .unwrap();

        assert_eq!(extract(missing).await, Err(Error::MissingUserId));
        assert_eq!(extract(blank).await, Err(Error::MissingUserId));
    }
}
