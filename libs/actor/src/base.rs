//! Core actor lifecycle: construction, validation, and execution.
//!
//! An [`Actor`] pairs framework state (validated options, dry-run flag,
//! run condition, timeout) with a boxed [`Act`] implementation carrying
//! the actor-specific work. Construction goes through [`ActorBuilder`],
//! which fills option defaults, validates kinds, and substitutes `{KEY}`
//! tokens — failing fast on any violation before a side effect can occur,
//! so dry runs and real runs detect configuration errors identically.
//!
//! Execution is uniform for every actor:
//!
//! ```text
//! constructed → (condition check) → perform under timeout →
//!     {succeeded, warned-and-continued, failed}
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use drover_dispatch::Dispatcher;

use crate::error::{ActorError, Severity};
use crate::options::OptionSchema;
use crate::tokens::{self, TokenMap};

/// Default deadline for a single actor's work.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Shared execution context handed to every actor.
///
/// Carries the process-wide dispatcher; actors issue their vendor calls
/// through it, either on a named serialized queue or directly on the
/// worker pool.
#[derive(Clone)]
pub struct ExecContext {
    dispatcher: Arc<Dispatcher>,
}

impl ExecContext {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// The process-wide call dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

/// Truthiness of a condition string: empty, `"false"`, and `"0"` are
/// false (case-insensitive, trimmed); everything else is true.
pub fn str2bool(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "false" | "0"
    )
}

/// An actor's run condition: a boolean, or a string evaluated with
/// [`str2bool`] after token substitution.
#[derive(Debug, Clone)]
pub enum Condition {
    Bool(bool),
    Expr(String),
}

impl Condition {
    /// Build from a JSON value. Non-bool, non-string values are truthy
    /// by their mere presence, matching script semantics.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Self::Bool(*b),
            Value::String(s) => Self::Expr(s.clone()),
            Value::Null => Self::Bool(true),
            _ => Self::Bool(true),
        }
    }

    /// Whether the actor should run.
    pub fn holds(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Expr(s) => str2bool(s),
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::Bool(true)
    }
}

/// How an execution concluded without failing the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The work ran to completion.
    Done,

    /// The run condition was false; nothing was attempted.
    Skipped,

    /// The work failed recoverably but the actor is configured to
    /// warn-and-continue; the failure is visible only in the log stream.
    Warned,
}

/// Framework-owned state of one constructed actor: resolved description,
/// validated options, and execution flags.
#[derive(Debug, Clone)]
pub struct ActorCore {
    kind: &'static str,
    desc: String,
    options: Map<String, Value>,
    dry: bool,
    warn_on_failure: bool,
    condition: Condition,
    timeout: Option<Duration>,
    init_context: TokenMap,
    strict: bool,
}

impl ActorCore {
    /// The actor's type name.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// The resolved human description.
    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Whether this is a dry run. The framework only propagates the
    /// flag; each actor decides what "would happen" logging looks like.
    pub fn dry(&self) -> bool {
        self.dry
    }

    pub fn warn_on_failure(&self) -> bool {
        self.warn_on_failure
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The substitution context this actor was built with. Groups merge
    /// their per-copy context on top of it when building children.
    pub fn init_context(&self) -> &TokenMap {
        &self.init_context
    }

    /// Whether unresolved tokens were a construction error.
    pub fn strict(&self) -> bool {
        self.strict
    }

    /// A validated option value.
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// A validated string option.
    pub fn str_option(&self, name: &str) -> Result<&str, ActorError> {
        self.option(name)
            .and_then(Value::as_str)
            .ok_or_else(|| ActorError::Definition(format!("option `{name}` is not a string")))
    }

    /// A validated boolean option.
    pub fn bool_option(&self, name: &str) -> Result<bool, ActorError> {
        self.option(name)
            .and_then(Value::as_bool)
            .ok_or_else(|| ActorError::Definition(format!("option `{name}` is not a bool")))
    }

    /// A validated numeric option.
    pub fn f64_option(&self, name: &str) -> Result<f64, ActorError> {
        self.option(name)
            .and_then(Value::as_f64)
            .ok_or_else(|| ActorError::Definition(format!("option `{name}` is not a number")))
    }
}

/// Actor-specific work. Implementations receive their validated core and
/// the shared execution context; everything else (conditions, timeouts,
/// warn-and-continue, logging) is the framework's job.
#[async_trait]
pub trait Act: Send + 'static {
    async fn perform(&mut self, core: &ActorCore, ctx: &ExecContext) -> Result<(), ActorError>;
}

#[async_trait]
impl Act for Box<dyn Act> {
    async fn perform(&mut self, core: &ActorCore, ctx: &ExecContext) -> Result<(), ActorError> {
        (**self).perform(core, ctx).await
    }
}

/// One fully-constructed unit of work.
///
/// Built once, executed at most once, never reused across runs.
pub struct Actor {
    core: ActorCore,
    act: Box<dyn Act>,
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor").field("core", &self.core).finish_non_exhaustive()
    }
}

impl Actor {
    /// The framework state.
    pub fn core(&self) -> &ActorCore {
        &self.core
    }

    /// Run the actor: condition check, then the work under its timeout,
    /// then failure classification.
    pub async fn execute(self, ctx: &ExecContext) -> Result<Outcome, ActorError> {
        let Actor { core, mut act } = self;

        if !core.condition.holds() {
            info!(
                actor = core.kind,
                desc = %core.desc,
                "condition is false; skipping"
            );
            return Ok(Outcome::Skipped);
        }

        debug!(actor = core.kind, desc = %core.desc, dry = core.dry, "executing");

        let result = match core.timeout {
            Some(limit) => match tokio::time::timeout(limit, act.perform(&core, ctx)).await {
                Ok(result) => result,
                Err(_) => {
                    // The wait is over but the work is not cancelled: a
                    // blocking call already on a worker thread runs to
                    // completion and its result is discarded.
                    Err(ActorError::TimedOut(limit))
                }
            },
            None => act.perform(&core, ctx).await,
        };

        match result {
            Ok(()) => {
                info!(actor = core.kind, desc = %core.desc, "finished");
                Ok(Outcome::Done)
            }
            Err(err) if core.warn_on_failure && err.severity() == Severity::Recoverable => {
                warn!(
                    actor = core.kind,
                    desc = %core.desc,
                    error = %err,
                    "failure tolerated; continuing"
                );
                Ok(Outcome::Warned)
            }
            Err(err) => {
                if matches!(err, ActorError::Unexpected(_)) {
                    // A failure the actor did not classify: a gap in its
                    // error handling worth reporting upstream.
                    error!(
                        actor = core.kind,
                        desc = %core.desc,
                        error = %err,
                        "unclassified failure; report this to the actor's maintainer"
                    );
                } else {
                    error!(actor = core.kind, desc = %core.desc, error = %err, "execution failed");
                }
                Err(err)
            }
        }
    }
}

/// Builder for [`Actor`]. Construction validates options and resolves
/// tokens; any violation fails the build with every problem listed.
pub struct ActorBuilder {
    kind: &'static str,
    schema: OptionSchema,
    desc: Option<String>,
    options: Map<String, Value>,
    dry: bool,
    warn_on_failure: bool,
    condition: Condition,
    timeout: Option<Duration>,
    init_context: TokenMap,
    strict: bool,
}

impl ActorBuilder {
    /// Start building an actor of the given type.
    pub fn new(kind: &'static str, schema: OptionSchema) -> Self {
        Self {
            kind,
            schema,
            desc: None,
            options: Map::new(),
            dry: false,
            warn_on_failure: false,
            condition: Condition::default(),
            timeout: Some(DEFAULT_TIMEOUT),
            init_context: TokenMap::new(),
            strict: true,
        }
    }

    /// Human description; may contain `{KEY}` tokens.
    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    /// Set one option.
    pub fn option(mut self, name: impl Into<String>, value: Value) -> Self {
        self.options.insert(name.into(), value);
        self
    }

    /// Replace the whole option mapping.
    pub fn options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    /// Propagate the dry-run flag.
    pub fn dry(mut self, dry: bool) -> Self {
        self.dry = dry;
        self
    }

    /// Tolerate recoverable failures, reporting them as warnings.
    pub fn warn_on_failure(mut self, warn: bool) -> Self {
        self.warn_on_failure = warn;
        self
    }

    /// Run condition as a JSON value (bool or token-bearing string).
    pub fn condition(mut self, condition: &Value) -> Self {
        self.condition = Condition::from_value(condition);
        self
    }

    /// Deadline in seconds; `0` disables the deadline entirely.
    pub fn timeout_secs(mut self, seconds: f64) -> Self {
        self.timeout = if seconds <= 0.0 {
            None
        } else {
            Some(Duration::from_secs_f64(seconds))
        };
        self
    }

    /// Disable the deadline.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Substitution context for `{KEY}` tokens.
    pub fn init_context(mut self, context: TokenMap) -> Self {
        self.init_context = context;
        self
    }

    /// Whether unresolved tokens fail construction. Nested groups relax
    /// this because their outer tokens resolve later; leaf actors must
    /// stay strict.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Validate, substitute, and produce the actor.
    pub fn build(self, act: impl Act) -> Result<Actor, ActorError> {
        let Self {
            kind,
            schema,
            desc,
            mut options,
            dry,
            warn_on_failure,
            condition,
            timeout,
            init_context,
            strict,
        } = self;

        let mut problems = schema.validate(kind, &mut options);

        let desc = desc.unwrap_or_else(|| kind.to_string());
        let desc = resolve_str(&desc, "description", &init_context, strict, &mut problems);

        let condition = match condition {
            Condition::Expr(expr) => Condition::Expr(resolve_str(
                &expr,
                "condition",
                &init_context,
                strict,
                &mut problems,
            )),
            fixed => fixed,
        };

        for (name, value) in options.iter_mut() {
            match tokens::substitute_value(value, &init_context, strict) {
                Ok(resolved) => *value = resolved,
                Err(unresolved) => {
                    problems.push(format!("option `{name}`: {unresolved}"));
                }
            }
        }

        if !problems.is_empty() {
            let err = ActorError::InvalidOptions(problems);
            error!(actor = kind, desc = %desc, error = %err, "construction failed");
            return Err(err);
        }

        Ok(Actor {
            core: ActorCore {
                kind,
                desc,
                options,
                dry,
                warn_on_failure,
                condition,
                timeout,
                init_context,
                strict,
            },
            act: Box::new(act),
        })
    }
}

fn resolve_str(
    input: &str,
    what: &str,
    context: &TokenMap,
    strict: bool,
    problems: &mut Vec<String>,
) -> String {
    match tokens::substitute(input, context, strict) {
        Ok(resolved) => resolved,
        Err(unresolved) => {
            problems.push(format!("{what}: {unresolved}"));
            input.to_string()
        }
    }
}
