//! Sequential group execution.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::base::{Act, Actor, ActorCore, ExecContext};
use crate::error::ActorError;

/// Executes children strictly in list order.
///
/// On a real run the first failure aborts every remaining child and
/// propagates immediately. On a dry run every child still executes so the
/// operator sees everything that would go wrong, and the collected
/// failures escalate as one aggregate at the end.
pub struct SyncGroup {
    children: Vec<Actor>,
}

impl SyncGroup {
    pub fn new(children: Vec<Actor>) -> Self {
        Self { children }
    }
}

#[async_trait]
impl Act for SyncGroup {
    async fn perform(&mut self, core: &ActorCore, ctx: &ExecContext) -> Result<(), ActorError> {
        let children = std::mem::take(&mut self.children);
        let total = children.len();
        let mut failures = Vec::new();

        info!(group = core.kind(), desc = %core.desc(), acts = total, "running acts in order");

        for (position, child) in children.into_iter().enumerate() {
            let child_desc = child.core().desc().to_string();

            match child.execute(ctx).await {
                Ok(_) => {}
                Err(err) if core.dry() => {
                    warn!(
                        group = core.kind(),
                        act = position,
                        desc = %child_desc,
                        error = %err,
                        "act failed during dry run; continuing to collect failures"
                    );
                    failures.push(err);
                }
                Err(err) => {
                    error!(
                        group = core.kind(),
                        act = position,
                        desc = %child_desc,
                        remaining = total - position - 1,
                        "act failed; aborting remaining acts"
                    );
                    return Err(err);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ActorError::aggregate(total, failures))
        }
    }
}
