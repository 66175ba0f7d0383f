//! Shared fixtures for actor integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use drover_actor::{
    Act, ActTemplate, Actor, ActorBuilder, ActorCore, ActorError, ExecContext, OptionSchema,
};
use drover_dispatch::{DispatchConfig, Dispatcher};
use tracing_subscriber::EnvFilter;

pub fn ctx() -> ExecContext {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .try_init();

    ExecContext::new(Arc::new(Dispatcher::new(DispatchConfig::default())))
}

/// How a [`Probe`] concludes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fail {
    Never,
    Recoverable,
    Unrecoverable,
}

/// Test actor that records its execution, optionally sleeps, and fails
/// on command.
pub struct Probe {
    executed: Arc<AtomicUsize>,
    sleep: Duration,
    fail: Fail,
}

impl Probe {
    pub fn new(executed: &Arc<AtomicUsize>) -> Self {
        Self {
            executed: Arc::clone(executed),
            sleep: Duration::ZERO,
            fail: Fail::Never,
        }
    }

    pub fn sleeping(mut self, sleep: Duration) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn failing(mut self, fail: Fail) -> Self {
        self.fail = fail;
        self
    }

    /// Wrap into a ready-to-run actor.
    pub fn into_actor(self, desc: &str) -> Actor {
        ActorBuilder::new("test.probe", OptionSchema::new())
            .desc(desc)
            .build(self)
            .expect("probe actors have no options to get wrong")
    }
}

#[async_trait]
impl Act for Probe {
    async fn perform(&mut self, _core: &ActorCore, _ctx: &ExecContext) -> Result<(), ActorError> {
        self.executed.fetch_add(1, Ordering::SeqCst);

        if !self.sleep.is_zero() {
            tokio::time::sleep(self.sleep).await;
        }

        match self.fail {
            Fail::Never => Ok(()),
            Fail::Recoverable => Err(ActorError::Recoverable("probe tripped".to_string())),
            Fail::Unrecoverable => {
                Err(ActorError::Unrecoverable("probe tripped hard".to_string()))
            }
        }
    }
}

/// A group child definition wrapping a [`Probe`].
pub fn probe_template(
    executed: &Arc<AtomicUsize>,
    fail: Fail,
    sleep: Duration,
    warn_on_failure: bool,
) -> ActTemplate {
    let executed = Arc::clone(executed);
    ActTemplate::new(move |seed| {
        ActorBuilder::new("test.probe", OptionSchema::new())
            .desc("probe")
            .dry(seed.dry)
            .warn_on_failure(warn_on_failure)
            .init_context(seed.context.clone())
            .build(
                Probe::new(&executed)
                    .sleeping(sleep)
                    .failing(fail),
            )
    })
}
