//! Concurrent group execution.

use async_trait::async_trait;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tracing::info;

use crate::base::{Act, Actor, ActorCore, ExecContext, Outcome};
use crate::error::ActorError;

/// Executes children concurrently, optionally capping how many are in
/// flight at once.
///
/// Every child runs to completion no matter what its siblings do —
/// cancelling work mid-flight against a remote API would leave resources
/// in unknown states. Failures are collected and escalate as one
/// aggregate after the last child finishes, dry run or not.
pub struct ConcurrentGroup {
    children: Vec<Actor>,
    concurrency: Option<usize>,
}

impl ConcurrentGroup {
    pub fn new(children: Vec<Actor>, concurrency: Option<usize>) -> Self {
        Self {
            children,
            concurrency,
        }
    }
}

#[async_trait]
impl Act for ConcurrentGroup {
    async fn perform(&mut self, core: &ActorCore, ctx: &ExecContext) -> Result<(), ActorError> {
        let children = std::mem::take(&mut self.children);
        let total = children.len();

        let cap = match self.concurrency {
            Some(cap) if cap > 0 => cap.min(total.max(1)),
            _ => total.max(1),
        };

        info!(
            group = core.kind(),
            desc = %core.desc(),
            acts = total,
            concurrency = cap,
            "launching acts"
        );

        let mut pending = children.into_iter();
        let mut in_flight: FuturesUnordered<_> = pending
            .by_ref()
            .take(cap)
            .map(|child| run_child(child, ctx.clone()))
            .collect();

        let mut failures = Vec::new();
        while let Some(result) = in_flight.next().await {
            if let Err(err) = result {
                failures.push(err);
            }

            // A slot freed up; launch the next waiting child, if any.
            if let Some(child) = pending.next() {
                in_flight.push(run_child(child, ctx.clone()));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ActorError::aggregate(total, failures))
        }
    }
}

async fn run_child(child: Actor, ctx: ExecContext) -> Result<Outcome, ActorError> {
    child.execute(&ctx).await
}
