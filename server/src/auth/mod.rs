//! Caller identity extraction.
//!
//! The transport hands us an opaque identity token in the
//! `Authorization` header. It is never parsed or verified here, only
//! compared against stored owner ids and the admin set; requests
//! without the header still flow through and classify as anonymous.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// The caller's opaque identity, if one was presented.
///
/// # Example
///
/// ```ignore
/// async fn handler(caller: Caller) -> impl IntoResponse {
///     match caller.identity() {
///         Some(identity) => format!("hello {identity}"),
///         None => "hello anonymous".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Caller(Option<String>);

impl Caller {
    /// Build a caller directly; used by tests.
    #[must_use]
    pub fn new(identity: Option<String>) -> Self {
        Self(identity)
    }

    /// The identity token, if presented.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(ToOwned::to_owned),
        ))
    }
}
