use reqwest::RequestBuilder;
use std::fmt;

/// Credential for authorized API calls.
///
/// Only the session manager hands these out, after re-checking that the held
/// token is still usable.
#[derive(Clone, PartialEq, Eq)]
pub struct Bearer(String);

impl Bearer {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Bearer(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Bearer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Bearer(***)")
    }
}

/// Attaches `Authorization: Bearer <token>` to outgoing requests.
pub trait AuthMiddleware {
    fn authorized(self, bearer: &Bearer) -> Self;
}

impl AuthMiddleware for RequestBuilder {
    fn authorized(self, bearer: &Bearer) -> Self {
        self.bearer_auth(bearer.token())
    }
}
