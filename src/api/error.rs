//! Error taxonomy for the request pipeline.
//!
//! Everything here is returned as a value to the caller. HTTP failures and
//! transport errors on the main request are not in this enum: after the retry
//! budget is spent they come back inside [`ExecutionResult`] so the caller
//! still sees the last status code and body.
//!
//! [`ExecutionResult`]: crate::api::executor::ExecutionResult

use crate::api::resilience::RateLimitStatus;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed credential fields, rejected before anything is persisted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No usable service-principal credential is configured.
    #[error("no credentials configured; run `auth set` first")]
    MissingCredentials,

    /// The identity provider refused the client-credentials grant.
    #[error("authentication rejected: {reason}")]
    AuthRejected { reason: String },

    /// The token endpoint could not be reached.
    #[error("token request failed: {0}")]
    AuthNetwork(String),

    /// Admission denied: at least one rate-limit window for the service is
    /// exhausted. Never retried within the same call.
    #[error("rate limit exceeded for {service}")]
    RateLimited {
        service: String,
        status: RateLimitStatus,
    },

    /// The resolved request body is not well-formed JSON. No network call
    /// was made.
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),
}
