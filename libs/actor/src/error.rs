//! Actor failure taxonomy.
//!
//! Every failure an actor can produce falls into a small set of kinds:
//!
//! - **Recoverable** — expected, acceptable-risk failures (deleting
//!   something already gone). Swallowed when the actor is configured to
//!   warn-and-continue; otherwise they halt the caller.
//! - **Unrecoverable** — bad credentials, malformed configuration,
//!   anything that must halt regardless of warn-and-continue.
//! - **InvalidOptions** / **Definition** — construction-time failures:
//!   the first for user input (missing/ill-typed options, unresolved
//!   tokens), the second for actor-implementation bugs (a property
//!   without a handler).
//! - **TimedOut** — the deadline expired before the work finished. The
//!   underlying work is not stopped, only the wait. Classified
//!   recoverable so warn-and-continue can absorb slow actors.
//! - **Unexpected** — anything outside the taxonomy, wrapped and logged
//!   loudly to flag the gap.
//!
//! Groups fold multiple child failures into one [`ActorError::Aggregate`]
//! whose severity is the most severe kind present.

use std::time::Duration;

use thiserror::Error;

use drover_dispatch::ApiError;

/// How a failure escalates. `Unrecoverable` dominates `Recoverable` when
/// failures are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// May be tolerated by warn-and-continue.
    Recoverable,

    /// Always halts the caller.
    Unrecoverable,
}

/// A failure raised by actor construction or execution.
#[derive(Debug, Error)]
pub enum ActorError {
    /// Expected, acceptable-risk failure.
    #[error("recoverable failure: {0}")]
    Recoverable(String),

    /// Failure that must halt the run.
    #[error("unrecoverable failure: {0}")]
    Unrecoverable(String),

    /// Construction failed on user-supplied options. Every violation
    /// found is listed, not just the first.
    #[error("invalid options: {}", .0.join("; "))]
    InvalidOptions(Vec<String>),

    /// Construction failed on the actor definition itself — a bug in the
    /// actor implementation, not in user input.
    #[error("actor definition error: {0}")]
    Definition(String),

    /// The deadline expired before the work completed.
    #[error("execution timed out after {0:?}")]
    TimedOut(Duration),

    /// Multiple child failures folded into one.
    #[error("{summary}")]
    Aggregate {
        summary: String,
        total: usize,
        failures: Vec<ActorError>,
    },

    /// A failure outside the declared taxonomy.
    #[error("unexpected failure: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl ActorError {
    /// Fold child failures into a single escalated failure.
    ///
    /// `total` is the number of acts that ran; severity is the most
    /// severe kind among the children.
    pub fn aggregate(total: usize, failures: Vec<ActorError>) -> Self {
        let details: Vec<String> = failures.iter().map(|f| f.to_string()).collect();
        let summary = format!(
            "{} of {} acts failed: [{}]",
            failures.len(),
            total,
            details.join(", ")
        );

        Self::Aggregate {
            summary,
            total,
            failures,
        }
    }

    /// The escalation kind of this failure.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Recoverable(_) | Self::TimedOut(_) => Severity::Recoverable,
            Self::Aggregate { failures, .. } => failures
                .iter()
                .map(ActorError::severity)
                .max()
                .unwrap_or(Severity::Recoverable),
            Self::Unrecoverable(_)
            | Self::InvalidOptions(_)
            | Self::Definition(_)
            | Self::Unexpected(_) => Severity::Unrecoverable,
        }
    }
}

impl From<ApiError> for ActorError {
    /// Vendor errors an actor did not classify itself are unexpected by
    /// definition; classification is the actor's job.
    fn from(error: ApiError) -> Self {
        Self::Unexpected(anyhow::Error::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Unrecoverable > Severity::Recoverable);
    }

    #[test]
    fn test_timeout_is_recoverable() {
        let err = ActorError::TimedOut(Duration::from_secs(5));
        assert_eq!(err.severity(), Severity::Recoverable);
    }

    #[test]
    fn test_invalid_options_lists_every_problem() {
        let err = ActorError::InvalidOptions(vec![
            "option `name` is required".to_string(),
            "option `count` expects a number".to_string(),
        ]);
        let message = err.to_string();
        assert!(message.contains("`name`"));
        assert!(message.contains("`count`"));
    }

    #[test]
    fn test_aggregate_takes_most_severe_kind() {
        let recoverable_only = ActorError::aggregate(
            3,
            vec![
                ActorError::Recoverable("gone already".to_string()),
                ActorError::TimedOut(Duration::from_secs(1)),
            ],
        );
        assert_eq!(recoverable_only.severity(), Severity::Recoverable);

        let mixed = ActorError::aggregate(
            3,
            vec![
                ActorError::Recoverable("gone already".to_string()),
                ActorError::Unrecoverable("bad credentials".to_string()),
            ],
        );
        assert_eq!(mixed.severity(), Severity::Unrecoverable);
    }

    #[test]
    fn test_aggregate_summary_counts() {
        let err = ActorError::aggregate(5, vec![ActorError::Recoverable("x".to_string())]);
        assert!(err.to_string().starts_with("1 of 5 acts failed"));
    }

    #[test]
    fn test_api_error_wraps_as_unexpected() {
        let err = ActorError::from(ApiError::code("AccessDenied", "no"));
        assert_eq!(err.severity(), Severity::Unrecoverable);
        assert!(err.to_string().contains("unexpected failure"));
    }
}
