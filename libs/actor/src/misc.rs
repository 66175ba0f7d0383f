//! Miscellaneous utility actors.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::base::{Act, ActorBuilder, ActorCore, ExecContext};
use crate::error::ActorError;
use crate::options::{OptionKind, OptionSchema, OptionSpec};

/// Pauses the pipeline for a configured number of seconds.
///
/// Useful as a settle delay between acts whose effects take a moment to
/// propagate. Sleeps in dry runs too, so dry-run timing resembles the
/// real thing.
pub struct Sleep;

impl Sleep {
    pub fn schema() -> OptionSchema {
        OptionSchema::new().option(
            "sleep",
            OptionSpec::required(OptionKind::Number, "seconds to pause"),
        )
    }

    /// A builder preloaded with this actor's type name and schema.
    pub fn builder() -> ActorBuilder {
        ActorBuilder::new("misc.sleep", Self::schema())
    }
}

#[async_trait]
impl Act for Sleep {
    async fn perform(&mut self, core: &ActorCore, _ctx: &ExecContext) -> Result<(), ActorError> {
        let seconds = core.f64_option("sleep")?;
        debug!(actor = core.kind(), seconds, "pausing");
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
        Ok(())
    }
}
