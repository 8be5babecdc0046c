//! Typed errors for the sampling engine.
//!
//! `ShouldTrace` itself is infallible; this type only surfaces from
//! construction (configuration errors) and from the internals of the two
//! background pollers, where it is logged and does not propagate to the
//! caller.

use thiserror::Error;

pub type SamplingResult<T> = Result<T, SamplingError>;

#[derive(Debug, Error)]
pub enum SamplingError {
    /// Daemon address or local rule-file configuration rejected at
    /// construction time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The control-plane RPC failed (non-200, connection, or decode error).
    #[error("transport error: {0}")]
    Transport(String),

    /// A single rule or target record was rejected by validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// One poll cycle applied some records successfully but rejected others;
    /// carries the count and a summary of what was rejected.
    #[error("{rejected} of {total} records rejected: {summary}")]
    PartialApply {
        total: usize,
        rejected: usize,
        summary: String,
    },
}

impl SamplingError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
