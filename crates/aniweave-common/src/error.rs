//! Unified error type for aniweave.
//!
//! Extractors surface [`ParseError`]; adapters surface `NotFound`, `Upstream`
//! and `Timeout`; the resolver surfaces `ProviderUnavailable` and
//! `NoValidSource`; the fallback orchestrator folds a chain of failures into
//! `AllProvidersFailed`. API handlers derive an HTTP status code via
//! [`Error::http_status`].

use std::time::Duration;

use crate::ids::ProviderId;

/// The document does not have the shape a provider extractor expects.
///
/// Raised only when the root anchor (a required container element or JSON
/// key) is entirely absent, never for a missing optional field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{provider}: unrecognized document ({anchor} not found)")]
pub struct ParseError {
    pub provider: ProviderId,
    /// The selector or JSON key that was expected.
    pub anchor: String,
}

impl ParseError {
    pub fn missing(provider: ProviderId, anchor: impl Into<String>) -> Self {
        Self {
            provider,
            anchor: anchor.into(),
        }
    }
}

/// Unified error type covering every failure mode of the aggregation layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A document's root anchor was missing.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The upstream answered 404 or has no matching record.
    #[error("{origin} not found: {what}")]
    NotFound { origin: String, what: String },

    /// Non-2xx/non-404 response, unexpected content type, or malformed payload.
    #[error("Upstream error [{origin}]: {message}")]
    Upstream { origin: String, message: String },

    /// The request deadline elapsed.
    #[error("Timeout [{origin}] after {}s", .after.as_secs())]
    Timeout { origin: String, after: Duration },

    /// Every provider in a fallback chain failed.
    #[error("All providers failed after {attempts} attempt(s); last error: {last}")]
    AllProvidersFailed { attempts: usize, last: Box<Error> },

    /// A proxy target whose host is not allow-listed.
    #[error("Invalid proxy target: {0}")]
    InvalidProxyTarget(String),

    /// The chosen provider has no usable reference for the request.
    #[error("{provider} unavailable: {reason}")]
    ProviderUnavailable { provider: ProviderId, reason: String },

    /// The upstream answered but the payload has no recognizable stream URL.
    #[error("{provider}: no valid stream source in response")]
    NoValidSource { provider: ProviderId },

    /// Request parameters failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_)
            | Error::InvalidProxyTarget(_)
            | Error::ProviderUnavailable { .. } => 400,
            Error::NotFound { .. } => 404,
            Error::Parse(_)
            | Error::Upstream { .. }
            | Error::Timeout { .. }
            | Error::NoValidSource { .. } => 502,
            Error::AllProvidersFailed { last, .. } => last.http_status(),
            Error::Internal(_) => 500,
        }
    }

    /// Stable snake_case label used in logs and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Parse(_) => "parse_error",
            Error::NotFound { .. } => "not_found",
            Error::Upstream { .. } => "upstream_error",
            Error::Timeout { .. } => "timeout",
            Error::AllProvidersFailed { .. } => "all_providers_failed",
            Error::InvalidProxyTarget(_) => "invalid_proxy_target",
            Error::ProviderUnavailable { .. } => "provider_unavailable",
            Error::NoValidSource { .. } => "no_valid_source",
            Error::Validation(_) => "validation_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(origin: impl ToString, what: impl Into<String>) -> Self {
        Error::NotFound {
            origin: origin.to_string(),
            what: what.into(),
        }
    }

    /// Convenience constructor for [`Error::Upstream`].
    pub fn upstream(origin: impl ToString, message: impl Into<String>) -> Self {
        Error::Upstream {
            origin: origin.to_string(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Timeout`].
    pub fn timeout(origin: impl ToString, after: Duration) -> Self {
        Error::Timeout {
            origin: origin.to_string(),
            after,
        }
    }

    /// Convenience constructor for [`Error::ProviderUnavailable`].
    pub fn unavailable(provider: ProviderId, reason: impl Into<String>) -> Self {
        Error::ProviderUnavailable {
            provider,
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`Error::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
