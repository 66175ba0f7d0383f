//! Group composition: execute a list of child actors as one actor.
//!
//! A group expands `contexts × acts` into a flat list of fully-built
//! children at construction time, then runs them either strictly in
//! order ([`sync`]) or concurrently with an optional in-flight cap
//! ([`concurrent`]). Child failures fold into one aggregated failure
//! whose severity is the most severe kind observed.
//!
//! One subtlety worth knowing: a child built with `warn_on_failure`
//! swallows its own recoverable failures, so they never reach the
//! parent's aggregation — the group sees that child as a success.

pub mod concurrent;
pub mod sync;

use serde_json::Value;
use tracing::debug;

use crate::base::{Actor, ActorBuilder, Condition};
use crate::error::ActorError;
use crate::options::OptionSchema;
use crate::tokens::TokenMap;

pub use concurrent::ConcurrentGroup;
pub use sync::SyncGroup;

/// Everything a child needs from its enclosing group at build time.
pub struct ChildSeed {
    /// The group's init-context merged with this copy's context dict.
    pub context: TokenMap,

    /// The group's dry-run flag, propagated unchanged.
    pub dry: bool,
}

/// A deferred child definition: builds one [`Actor`] per context copy.
pub struct ActTemplate {
    build: Box<dyn Fn(&ChildSeed) -> Result<Actor, ActorError> + Send + Sync>,
}

impl ActTemplate {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&ChildSeed) -> Result<Actor, ActorError> + Send + Sync + 'static,
    {
        Self {
            build: Box::new(build),
        }
    }

    fn build(&self, seed: &ChildSeed) -> Result<Actor, ActorError> {
        (self.build)(seed)
    }
}

/// Which execution strategy a group uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Sync,
    Concurrent,
}

/// Builder for group actors.
///
/// Groups are actors themselves: they carry a description, a run
/// condition, and a warn-on-failure flag, and nest freely. Unlike leaf
/// actors they default to no timeout — with an unbounded number of
/// children a single deadline would be meaningless — and to non-strict
/// token handling, since outer tokens may resolve in a later layer.
pub struct GroupBuilder {
    kind: &'static str,
    strategy: Strategy,
    desc: Option<String>,
    dry: bool,
    warn_on_failure: bool,
    condition: Condition,
    init_context: TokenMap,
    strict: bool,
    contexts: Vec<TokenMap>,
    acts: Vec<ActTemplate>,
    concurrency: Option<usize>,
}

impl GroupBuilder {
    /// A group that executes children strictly in list order.
    pub fn sync() -> Self {
        Self::new("group.sync", Strategy::Sync)
    }

    /// A group that executes children concurrently.
    pub fn concurrent() -> Self {
        Self::new("group.async", Strategy::Concurrent)
    }

    fn new(kind: &'static str, strategy: Strategy) -> Self {
        Self {
            kind,
            strategy,
            desc: None,
            dry: false,
            warn_on_failure: false,
            condition: Condition::default(),
            init_context: TokenMap::new(),
            strict: false,
            contexts: Vec::new(),
            acts: Vec::new(),
            concurrency: None,
        }
    }

    pub fn desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn dry(mut self, dry: bool) -> Self {
        self.dry = dry;
        self
    }

    pub fn warn_on_failure(mut self, warn: bool) -> Self {
        self.warn_on_failure = warn;
        self
    }

    pub fn condition(mut self, condition: &Value) -> Self {
        self.condition = Condition::from_value(condition);
        self
    }

    pub fn init_context(mut self, context: TokenMap) -> Self {
        self.init_context = context;
        self
    }

    /// Require token resolution at group construction time.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Replicate the act list once per context dict.
    pub fn contexts(mut self, contexts: Vec<TokenMap>) -> Self {
        self.contexts = contexts;
        self
    }

    /// Append one child definition.
    pub fn act(mut self, template: ActTemplate) -> Self {
        self.acts.push(template);
        self
    }

    /// Replace all child definitions.
    pub fn acts(mut self, acts: Vec<ActTemplate>) -> Self {
        self.acts = acts;
        self
    }

    /// Cap on concurrently in-flight children. Only meaningful for
    /// concurrent groups; `None` (or zero) means unbounded.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Expand contexts × acts into children and produce the group actor.
    pub fn build(self) -> Result<Actor, ActorError> {
        let children = expand(
            &self.init_context,
            &self.contexts,
            &self.acts,
            self.dry,
        )?;

        debug!(
            group = self.kind,
            children = children.len(),
            contexts = self.contexts.len(),
            "group expanded"
        );

        let mut builder = ActorBuilder::new(self.kind, OptionSchema::new())
            .dry(self.dry)
            .warn_on_failure(self.warn_on_failure)
            .init_context(self.init_context)
            .strict(self.strict)
            .no_timeout();
        if let Some(desc) = self.desc {
            builder = builder.desc(desc);
        }
        builder = match self.condition {
            Condition::Bool(b) => builder.condition(&Value::Bool(b)),
            Condition::Expr(s) => builder.condition(&Value::String(s)),
        };

        match self.strategy {
            Strategy::Sync => builder.build(SyncGroup::new(children)),
            Strategy::Concurrent => {
                builder.build(ConcurrentGroup::new(children, self.concurrency))
            }
        }
    }
}

/// Build one child per context dict per act definition.
///
/// Construction failures across all children are folded into a single
/// invalid-options failure so a broken script reports everything wrong
/// with it at once.
fn expand(
    init_context: &TokenMap,
    contexts: &[TokenMap],
    acts: &[ActTemplate],
    dry: bool,
) -> Result<Vec<Actor>, ActorError> {
    let empty = TokenMap::new();
    let copies: &[TokenMap] = if contexts.is_empty() {
        std::slice::from_ref(&empty)
    } else {
        contexts
    };

    let mut children = Vec::with_capacity(copies.len() * acts.len());
    let mut problems = Vec::new();

    for context in copies {
        let seed = ChildSeed {
            context: init_context.merged(context),
            dry,
        };

        for template in acts {
            match template.build(&seed) {
                Ok(actor) => children.push(actor),
                Err(err) => problems.push(err.to_string()),
            }
        }
    }

    if problems.is_empty() {
        Ok(children)
    } else {
        Err(ActorError::InvalidOptions(problems))
    }
}
