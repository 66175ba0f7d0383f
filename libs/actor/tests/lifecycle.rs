//! Integration tests for the actor execute pipeline: conditions,
//! timeouts, and failure classification.

mod harness;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;
use serde_json::json;

use drover_actor::{ActorBuilder, ActorError, OptionSchema, Outcome, Severity, TokenMap};

use harness::{ctx, Fail, Probe};

#[tokio::test]
async fn false_condition_skips_without_effect() {
    let executed = Arc::new(AtomicUsize::new(0));

    let actor = ActorBuilder::new("test.probe", OptionSchema::new())
        .desc("never runs")
        .condition(&json!(false))
        .build(Probe::new(&executed))
        .unwrap();

    let outcome = actor.execute(&ctx()).await.unwrap();
    assert_eq!(outcome, Outcome::Skipped);
    assert_eq!(executed.load(Ordering::SeqCst), 0);
}

#[rstest]
#[case("false", Outcome::Skipped)]
#[case("0", Outcome::Skipped)]
#[case("", Outcome::Skipped)]
#[case("FALSE", Outcome::Skipped)]
#[case("true", Outcome::Done)]
#[case("maybe", Outcome::Done)]
#[case("1", Outcome::Done)]
#[tokio::test]
async fn condition_strings_follow_truthiness_rules(
    #[case] condition: &str,
    #[case] expected: Outcome,
) {
    let executed = Arc::new(AtomicUsize::new(0));

    let actor = ActorBuilder::new("test.probe", OptionSchema::new())
        .condition(&json!(condition))
        .build(Probe::new(&executed))
        .unwrap();

    assert_eq!(actor.execute(&ctx()).await.unwrap(), expected);
}

#[tokio::test]
async fn condition_resolves_tokens_before_evaluation() {
    let executed = Arc::new(AtomicUsize::new(0));

    let actor = ActorBuilder::new("test.probe", OptionSchema::new())
        .condition(&json!("{DEPLOY_ENABLED}"))
        .init_context(TokenMap::new().with("DEPLOY_ENABLED", "false"))
        .build(Probe::new(&executed))
        .unwrap();

    assert_eq!(actor.execute(&ctx()).await.unwrap(), Outcome::Skipped);
    assert_eq!(executed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn deadline_expiry_raises_a_recoverable_timeout() {
    let executed = Arc::new(AtomicUsize::new(0));

    let actor = ActorBuilder::new("test.probe", OptionSchema::new())
        .desc("too slow")
        .timeout_secs(0.05)
        .build(Probe::new(&executed).sleeping(Duration::from_millis(500)))
        .unwrap();

    let err = actor.execute(&ctx()).await.unwrap_err();
    assert!(matches!(err, ActorError::TimedOut(_)));
    assert_eq!(err.severity(), Severity::Recoverable);
}

#[tokio::test]
async fn warn_on_failure_absorbs_a_timeout() {
    let executed = Arc::new(AtomicUsize::new(0));

    let actor = ActorBuilder::new("test.probe", OptionSchema::new())
        .timeout_secs(0.05)
        .warn_on_failure(true)
        .build(Probe::new(&executed).sleeping(Duration::from_millis(500)))
        .unwrap();

    assert_eq!(actor.execute(&ctx()).await.unwrap(), Outcome::Warned);
}

#[tokio::test]
async fn warn_on_failure_absorbs_recoverable_only() {
    let executed = Arc::new(AtomicUsize::new(0));

    let tolerated = Probe::new(&executed).failing(Fail::Recoverable);
    let actor = ActorBuilder::new("test.probe", OptionSchema::new())
        .warn_on_failure(true)
        .build(tolerated)
        .unwrap();
    assert_eq!(actor.execute(&ctx()).await.unwrap(), Outcome::Warned);

    let fatal = Probe::new(&executed).failing(Fail::Unrecoverable);
    let actor = ActorBuilder::new("test.probe", OptionSchema::new())
        .warn_on_failure(true)
        .build(fatal)
        .unwrap();
    let err = actor.execute(&ctx()).await.unwrap_err();
    assert_eq!(err.severity(), Severity::Unrecoverable);
}

#[tokio::test]
async fn recoverable_failure_propagates_without_warn_flag() {
    let executed = Arc::new(AtomicUsize::new(0));

    let actor = ActorBuilder::new("test.probe", OptionSchema::new())
        .build(Probe::new(&executed).failing(Fail::Recoverable))
        .unwrap();

    let err = actor.execute(&ctx()).await.unwrap_err();
    assert_eq!(err.severity(), Severity::Recoverable);
}
