use thiserror::Error;

/// Why a bearer token could not be turned into a usable session.
///
/// Never surfaced to end users on its own: the session manager downgrades to
/// an anonymous session, or wraps it in [`SessionError::InvalidToken`] when a
/// freshly issued token is unusable.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token does not have three segments")]
    Malformed,
    #[error("claims segment is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("claims segment is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("claim `{0}` is missing")]
    MissingClaim(&'static str),
    #[error("claim `{0}` has an unexpected value")]
    InvalidClaim(&'static str),
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    #[error("role profile `{claim}` could not be parsed: {source}")]
    RoleProfile {
        claim: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("token expired")]
    Expired,
    #[error("token signature rejected: {0}")]
    Signature(#[from] jsonwebtoken::errors::Error),
}

/// Failures of the persisted token slot.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("token storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the MealTimes REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded with {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Errors surfaced by the session manager.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad credentials or a failed login call. "Check your password."
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// The server reported success but issued a token we cannot use.
    /// "Contact support."
    #[error("server issued an invalid token: {0}")]
    InvalidToken(#[source] DecodeError),
    #[error("not signed in")]
    NotAuthenticated,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures of the third-party payment tokenizer.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment tokenizer is not configured")]
    NotConfigured,
    #[error("payment tokenizer unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("card rejected: {0}")]
    Declined(String),
    #[error("tokenizer returned no token")]
    MissingToken,
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("no subscription plan selected")]
    NoPlanSelected,
    #[error("subscription plan {0} is not offered")]
    UnknownPlan(i64),
    #[error("the signed-in user has no company profile")]
    MissingCompany,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("PDF rendering failed: {0}")]
    Render(String),
    #[error("writing report failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not set")]
    Missing { name: &'static str },
    #[error("{name} has an invalid value `{value}`")]
    Invalid { name: &'static str, value: String },
}
