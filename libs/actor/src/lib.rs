//! # drover-actor
//!
//! Actor lifecycle framework and group composition for declarative
//! infrastructure automation.
//!
//! ## Design Principles
//!
//! - Configuration errors fail at construction, before any side effect,
//!   so dry runs and real runs detect them identically
//! - The framework owns the uniform concerns — option validation, token
//!   substitution, run conditions, timeouts, failure classification —
//!   and actors own only their work
//! - Dry-run is a propagated flag, not centralized control flow: each
//!   actor knows best what "would happen" looks like
//! - Failures carry a severity; groups fold child failures into one
//!   aggregate whose severity is the most severe observed
//!
//! ## Modules
//!
//! - [`base`] — option-validated actor core, `Act` trait, execute pipeline
//! - [`options`] — option schemas: kind, default-or-required, help
//! - [`tokens`] — `{KEY}` substitution over strings and option trees
//! - [`error`] — the failure taxonomy and severity rules
//! - [`ensure`] — generic get/compare/set reconciliation actors
//! - [`group`] — sequential and bounded-concurrency composition
//! - [`misc`] — small utility actors

pub mod base;
pub mod ensure;
pub mod error;
pub mod group;
pub mod misc;
pub mod options;
pub mod tokens;

pub use base::{str2bool, Act, Actor, ActorBuilder, ActorCore, Condition, ExecContext, Outcome};
pub use ensure::{EnsureActor, Ensurable, Property, ResourceState};
pub use error::{ActorError, Severity};
pub use group::{ActTemplate, ChildSeed, ConcurrentGroup, GroupBuilder, SyncGroup};
pub use options::{OptionDefault, OptionKind, OptionSchema, OptionSpec};
pub use tokens::{substitute, substitute_value, TokenMap, UnresolvedTokens};
