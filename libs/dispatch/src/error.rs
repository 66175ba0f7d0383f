//! Vendor API error shapes and throttle classification.
//!
//! Vendor SDKs report rate limiting in two different shapes: a flat
//! `error_code` string on the error object, or a nested
//! `response["Error"]["Code"]` payload. Both are recognized here; every
//! other error passes through the dispatcher unchanged.

use thiserror::Error;

/// Error codes that identify a rate-limited call in the flat shape.
pub const THROTTLE_CODES: [&str; 3] = ["Throttling", "Rate exceeded", "reached max retries"];

/// An error returned by a vendor API call, or by the dispatch machinery
/// itself.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Flat shape: the error object carries an `error_code` string field.
    #[error("api error {code}: {message}")]
    Code { code: String, message: String },

    /// Nested shape: the error object carries a structured response with
    /// an `Error.Code` payload.
    #[error("api response error: {response}")]
    Response { response: serde_json::Value },

    /// The dispatcher itself failed (queue closed, worker task lost).
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// Any other vendor failure, passed through unchanged.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// Build a flat-shape error.
    pub fn code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Code {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a nested-shape error from a response payload.
    pub fn response(response: serde_json::Value) -> Self {
        Self::Response { response }
    }

    /// Whether this error reports a rate limit.
    ///
    /// Only the two recognized vendor shapes can classify as throttled;
    /// the same shapes with an unrecognized code, and everything else,
    /// surface to the caller.
    pub fn is_throttle(&self) -> bool {
        match self {
            Self::Code { code, .. } => THROTTLE_CODES.contains(&code.as_str()),
            Self::Response { response } => response["Error"]["Code"] == "Throttling",
            Self::Dispatch(_) | Self::Other(_) => false,
        }
    }
}
