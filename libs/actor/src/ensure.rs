//! Reconcile-to-desired-state actors.
//!
//! An ensurable actor converges a remote resource toward its declared
//! options through a generic get/compare/set loop, eliminating the
//! per-resource boilerplate: ensure existence first, then walk every
//! managed property in declaration order and update the ones that drifted.
//!
//! Property handlers are explicit [`Property`] objects registered in a
//! table at construction. A managed option without a handler is an
//! actor-definition bug and fails construction, not execution.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::base::{Act, ActorCore, ExecContext};
use crate::error::ActorError;
use crate::options::{OptionKind, OptionSchema, OptionSpec};

/// Name of the implicit presence option every ensurable actor carries.
pub const STATE_OPTION: &str = "state";

/// Declared presence of the managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Present,
    Absent,
}

impl ResourceState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }

    fn from_option(value: &str) -> Result<Self, ActorError> {
        match value {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            other => Err(ActorError::Definition(format!(
                "state `{other}` escaped option validation"
            ))),
        }
    }
}

/// Schema entry for the implicit `state` option.
pub fn state_option() -> OptionSpec {
    OptionSpec::optional(
        OptionKind::Str,
        Value::String("present".to_string()),
        "desired presence of the resource",
    )
    .with_validator(|value| match value.as_str() {
        Some("present") | Some("absent") => Ok(()),
        _ => Err("must be `present` or `absent`".to_string()),
    })
}

/// Handler for one managed property: how to read it remotely, how to
/// write it, and (optionally) how to compare.
#[async_trait]
pub trait Property: Send + Sync {
    /// The option name this handler manages.
    fn name(&self) -> &'static str;

    /// Fetch the property's current remote value.
    async fn get(&self, core: &ActorCore, ctx: &ExecContext) -> Result<Value, ActorError>;

    /// Drive the remote value toward `desired`. Called only on drift;
    /// the handler decides what a dry run logs instead of doing.
    async fn set(
        &self,
        core: &ActorCore,
        ctx: &ExecContext,
        desired: &Value,
    ) -> Result<(), ActorError>;

    /// Whether the current value already satisfies the desired one.
    /// Defaults to equality.
    fn matches(&self, current: &Value, desired: &Value) -> bool {
        current == desired
    }
}

/// Resource-level operations of an ensurable actor: existence handling
/// plus an optional pre-cache hook.
#[async_trait]
pub trait Ensurable: Send + 'static {
    /// Batch-fetch remote state before reconciliation begins. Purely an
    /// optimization hook; the default does nothing.
    async fn precache(&mut self, _core: &ActorCore, _ctx: &ExecContext) -> Result<(), ActorError> {
        Ok(())
    }

    /// The resource's current presence.
    async fn state(&self, core: &ActorCore, ctx: &ExecContext)
        -> Result<ResourceState, ActorError>;

    /// Create or destroy the resource to match `desired`.
    async fn set_state(
        &mut self,
        core: &ActorCore,
        ctx: &ExecContext,
        desired: ResourceState,
    ) -> Result<(), ActorError>;
}

/// The generic reconciliation driver. Wraps an [`Ensurable`] resource and
/// its property table into an [`Act`].
pub struct EnsureActor<E: Ensurable> {
    resource: E,
    properties: Vec<Box<dyn Property>>,
}

impl<E: Ensurable> std::fmt::Debug for EnsureActor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsureActor")
            .field("properties", &self.properties.len())
            .finish_non_exhaustive()
    }
}

impl<E: Ensurable> EnsureActor<E> {
    /// Build the driver, checking the property table against the schema.
    ///
    /// Every schema option except `state` and the `unmanaged` set must
    /// have a handler, and every handler must correspond to a schema
    /// option. Either mismatch is fatal here, at construction.
    pub fn new(
        resource: E,
        schema: &OptionSchema,
        unmanaged: &[&str],
        properties: Vec<Box<dyn Property>>,
    ) -> Result<Self, ActorError> {
        let managed: Vec<&str> = schema
            .names()
            .filter(|name| *name != STATE_OPTION && !unmanaged.contains(name))
            .collect();

        let missing: Vec<&str> = managed
            .iter()
            .copied()
            .filter(|name| !properties.iter().any(|p| p.name() == *name))
            .collect();
        if !missing.is_empty() {
            return Err(ActorError::Definition(format!(
                "managed options without a property handler: {}",
                missing.join(", ")
            )));
        }

        let unknown: Vec<&str> = properties
            .iter()
            .map(|p| p.name())
            .filter(|name| !managed.contains(name))
            .collect();
        if !unknown.is_empty() {
            return Err(ActorError::Definition(format!(
                "property handlers without a managed option: {}",
                unknown.join(", ")
            )));
        }

        // Reconcile in the schema's declaration order, not registration
        // order.
        let mut ordered = properties;
        ordered.sort_by_key(|p| managed.iter().position(|name| *name == p.name()));

        Ok(Self {
            resource,
            properties: ordered,
        })
    }
}

#[async_trait]
impl<E: Ensurable> Act for EnsureActor<E> {
    async fn perform(&mut self, core: &ActorCore, ctx: &ExecContext) -> Result<(), ActorError> {
        self.resource.precache(core, ctx).await?;

        let desired = ResourceState::from_option(core.str_option(STATE_OPTION)?)?;
        let current = self.resource.state(core, ctx).await?;

        if current == desired {
            debug!(actor = core.kind(), state = desired.as_str(), "resource state in sync");
        } else {
            info!(
                actor = core.kind(),
                state = desired.as_str(),
                "resource state drifted; applying"
            );
            self.resource.set_state(core, ctx, desired).await?;
        }

        // No property means anything on a resource that should not exist.
        if desired == ResourceState::Absent {
            return Ok(());
        }

        for property in &self.properties {
            let Some(want) = core.option(property.name()) else {
                continue;
            };
            if want.is_null() {
                continue;
            }

            let have = property.get(core, ctx).await?;
            if property.matches(&have, want) {
                debug!(actor = core.kind(), property = property.name(), "property in sync");
            } else {
                info!(
                    actor = core.kind(),
                    property = property.name(),
                    "property drifted; updating"
                );
                property.set(core, ctx, want).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use drover_dispatch::{DispatchConfig, Dispatcher};

    use crate::base::ActorBuilder;

    /// In-memory stand-in for a remote resource.
    #[derive(Clone, Default)]
    struct FakeRemote {
        exists: Arc<Mutex<bool>>,
        size: Arc<Mutex<Value>>,
        set_calls: Arc<AtomicUsize>,
    }

    struct FakeResource {
        remote: FakeRemote,
    }

    #[async_trait]
    impl Ensurable for FakeResource {
        async fn state(
            &self,
            _core: &ActorCore,
            _ctx: &ExecContext,
        ) -> Result<ResourceState, ActorError> {
            if *self.remote.exists.lock().unwrap() {
                Ok(ResourceState::Present)
            } else {
                Ok(ResourceState::Absent)
            }
        }

        async fn set_state(
            &mut self,
            _core: &ActorCore,
            _ctx: &ExecContext,
            desired: ResourceState,
        ) -> Result<(), ActorError> {
            *self.remote.exists.lock().unwrap() = desired == ResourceState::Present;
            Ok(())
        }
    }

    struct SizeProperty {
        remote: FakeRemote,
    }

    #[async_trait]
    impl Property for SizeProperty {
        fn name(&self) -> &'static str {
            "size"
        }

        async fn get(&self, _core: &ActorCore, _ctx: &ExecContext) -> Result<Value, ActorError> {
            Ok(self.remote.size.lock().unwrap().clone())
        }

        async fn set(
            &self,
            _core: &ActorCore,
            _ctx: &ExecContext,
            desired: &Value,
        ) -> Result<(), ActorError> {
            self.remote.set_calls.fetch_add(1, Ordering::SeqCst);
            *self.remote.size.lock().unwrap() = desired.clone();
            Ok(())
        }
    }

    fn schema() -> OptionSchema {
        OptionSchema::new()
            .option("state", state_option())
            .option("size", OptionSpec::required(OptionKind::Number, "capacity"))
    }

    fn build_actor(remote: &FakeRemote, desired_state: &str) -> crate::base::Actor {
        let act = EnsureActor::new(
            FakeResource {
                remote: remote.clone(),
            },
            &schema(),
            &[],
            vec![Box::new(SizeProperty {
                remote: remote.clone(),
            })],
        )
        .unwrap();

        ActorBuilder::new("test.ensure", schema())
            .desc("keep the fake sized")
            .option("state", json!(desired_state))
            .option("size", json!(4))
            .build(act)
            .unwrap()
    }

    fn ctx() -> ExecContext {
        ExecContext::new(Arc::new(Dispatcher::new(DispatchConfig::default())))
    }

    #[tokio::test]
    async fn test_creates_then_converges_properties() {
        let remote = FakeRemote::default();
        *remote.size.lock().unwrap() = json!(1);

        build_actor(&remote, "present")
            .execute(&ctx())
            .await
            .unwrap();

        assert!(*remote.exists.lock().unwrap());
        assert_eq!(*remote.size.lock().unwrap(), json!(4));
        assert_eq!(remote.set_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let remote = FakeRemote::default();
        *remote.size.lock().unwrap() = json!(1);

        build_actor(&remote, "present")
            .execute(&ctx())
            .await
            .unwrap();
        build_actor(&remote, "present")
            .execute(&ctx())
            .await
            .unwrap();

        // Nothing drifted between runs, so the second run sets nothing.
        assert_eq!(remote.set_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_absent_skips_property_reconciliation() {
        let remote = FakeRemote::default();
        *remote.exists.lock().unwrap() = true;
        *remote.size.lock().unwrap() = json!(1);

        build_actor(&remote, "absent").execute(&ctx()).await.unwrap();

        assert!(!*remote.exists.lock().unwrap());
        assert_eq!(remote.set_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_handler_is_a_definition_error() {
        let err = EnsureActor::new(
            FakeResource {
                remote: FakeRemote::default(),
            },
            &schema(),
            &[],
            Vec::new(),
        )
        .unwrap_err();

        match err {
            ActorError::Definition(reason) => assert!(reason.contains("size")),
            other => panic!("expected Definition, got {other:?}"),
        }
    }

    #[test]
    fn test_unmanaged_options_need_no_handler() {
        let result = EnsureActor::new(
            FakeResource {
                remote: FakeRemote::default(),
            },
            &schema(),
            &["size"],
            Vec::new(),
        );
        assert!(result.is_ok());
    }
}
