//! Error taxonomy shared by every foreman component

use thiserror::Error;

/// Convenience alias used throughout the workspace
pub type Result<T> = std::result::Result<T, Error>;

/// All failure kinds a caller-facing operation can surface.
///
/// Validation-type errors abort the triggering operation and reach the
/// caller verbatim. `GenerationFailed` is recovered locally inside the
/// delegation fan-out (replaced by an inline placeholder) and inside the
/// manager preface (replaced by a fixed fallback sentence).
#[derive(Debug, Error)]
pub enum Error {
    /// The provider rejected the secret, or the probe could not reach it.
    /// Bad key and network-down are deliberately indistinguishable here.
    #[error("invalid credential for provider '{provider}'")]
    InvalidCredential { provider: String },

    #[error("provider '{provider}' is not supported")]
    UnsupportedProvider { provider: String },

    #[error("provider '{provider}' unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error("model '{model}' is not offered by provider '{provider}'")]
    ModelNotOffered { provider: String, model: String },

    /// An enabled-model id did not resolve for the calling owner.
    #[error("enabled model not found")]
    ModelNotFound,

    /// The team does not exist or is not owned by the caller.
    #[error("team not found")]
    TeamNotFound,

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("generation failed: {reason}")]
    GenerationFailed { reason: String },

    /// Underlying persistence failure, engine-agnostic.
    #[error("storage error: {0}")]
    Store(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }
}
