//! Resilient generator behavior under a paused clock.
//!
//! Tokio's paused time auto-advances through sleeps, so the gaps recorded
//! by the scripted client are exactly the pauses the generator took.

mod common;

use common::mocks::ScriptedLLMClient;
use nexus::llm::{
    GenerateOptions, LlmError, LlmErrorKind, ModelRoster, ResilientGenerator, RetryPolicy,
    TaskCategory,
};
use nexus::types::AppError;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn roster() -> ModelRoster {
    ModelRoster {
        model: "primary".to_string(),
        high_effort_model: "thinker".to_string(),
        fallback_model: "backup".to_string(),
    }
}

fn generator(client: Arc<ScriptedLLMClient>, policy: RetryPolicy) -> ResilientGenerator {
    ResilientGenerator::new(client, roster(), policy)
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_backoff_doubles() {
    let client = Arc::new(ScriptedLLMClient::new(vec![
        Err(LlmError::rate_limited("429 RESOURCE_EXHAUSTED")),
        Err(LlmError::rate_limited("429 RESOURCE_EXHAUSTED")),
        Ok("done".to_string()),
    ]));
    let generator = generator(client.clone(), RetryPolicy::default().with_max_retries(3));

    let text = generator
        .generate("prompt", TaskCategory::MarketAnalysis, &GenerateOptions::default())
        .await
        .unwrap();

    assert_eq!(text, "done");
    assert_eq!(
        client.gaps(),
        vec![Duration::from_secs(5), Duration::from_secs(10)]
    );
    assert_eq!(client.models_called(), vec!["primary"; 3]);
    assert_eq!(generator.stats().retries, 2);
}

#[tokio::test(start_paused = true)]
async fn test_other_errors_pause_flat() {
    let client = Arc::new(ScriptedLLMClient::new(vec![
        Err(LlmError::other("invalid argument")),
        Err(LlmError::other("invalid argument")),
        Ok("done".to_string()),
    ]));
    let generator = generator(client.clone(), RetryPolicy::default().with_max_retries(3));

    generator
        .generate("prompt", TaskCategory::TechTrend, &GenerateOptions::default())
        .await
        .unwrap();

    assert_eq!(
        client.gaps(),
        vec![Duration::from_secs(2), Duration::from_secs(2)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_falls_back_without_waiting() {
    let client = Arc::new(ScriptedLLMClient::new(vec![
        Err(LlmError::unavailable("503 UNAVAILABLE")),
        Ok("from backup".to_string()),
    ]));
    let generator = generator(client.clone(), RetryPolicy::default());

    let text = generator
        .generate("prompt", TaskCategory::PatentAnalysis, &GenerateOptions::default())
        .await
        .unwrap();

    assert_eq!(text, "from backup");
    assert_eq!(client.models_called(), vec!["primary", "backup"]);
    assert_eq!(client.gaps(), vec![Duration::ZERO]);
    assert_eq!(generator.stats().model_fallbacks, 1);
}

#[tokio::test(start_paused = true)]
async fn test_high_effort_starts_with_high_effort_model() {
    let client = Arc::new(ScriptedLLMClient::always("{}"));
    let generator = generator(client.clone(), RetryPolicy::default());

    generator
        .generate("prompt", TaskCategory::Verification, &GenerateOptions::high_effort())
        .await
        .unwrap();

    assert_eq!(client.models_called(), vec!["thinker"]);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_candidates_return_last_error() {
    let client = Arc::new(ScriptedLLMClient::new(vec![
        Err(LlmError::rate_limited("429 first")),
        Err(LlmError::rate_limited("429 second")),
        Err(LlmError::rate_limited("429 third")),
        Err(LlmError::other("final failure")),
    ]));
    let generator = generator(client.clone(), RetryPolicy::default());

    let err = generator
        .generate("prompt", TaskCategory::Synthesis, &GenerateOptions::default())
        .await
        .unwrap_err();

    match err {
        AppError::Llm(e) => {
            assert_eq!(e.kind, LlmErrorKind::Other);
            assert_eq!(e.message, "final failure");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Two attempts per model; the backoff does not carry over to the fallback.
    assert_eq!(client.models_called(), vec!["primary", "primary", "backup", "backup"]);
    assert_eq!(
        client.gaps(),
        vec![Duration::from_secs(5), Duration::ZERO, Duration::from_secs(5)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_per_call_retry_override() {
    let client = Arc::new(ScriptedLLMClient::failing(LlmError::other("nope")));
    let generator = generator(client.clone(), RetryPolicy::default().with_max_retries(4));

    let result = generator
        .generate(
            "prompt",
            TaskCategory::Whitespace,
            &GenerateOptions::default().with_max_retries(1),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(client.models_called(), vec!["primary", "backup"]);
}

#[tokio::test(start_paused = true)]
async fn test_success_cooldown_is_applied() {
    let client = Arc::new(ScriptedLLMClient::always("ok"));
    let generator = generator(client.clone(), RetryPolicy::default());

    let before = tokio::time::Instant::now();
    generator
        .generate("prompt", TaskCategory::MarketAnalysis, &GenerateOptions::default())
        .await
        .unwrap();
    assert!(before.elapsed() >= Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_json_payload_is_live() {
    let client = Arc::new(ScriptedLLMClient::always(
        "```json\n{\"key_insights\": [\"Filings doubled since 2020\"]}\n```",
    ));
    let generator = generator(client, RetryPolicy::default());

    let payload = generator
        .generate_json_or_demo(
            "prompt",
            TaskCategory::PatentAnalysis,
            &GenerateOptions::default(),
            || json!({ "demo": true }),
        )
        .await;

    assert!(!payload.is_degraded());
    assert_eq!(payload.get()["key_insights"][0], "Filings doubled since 2020");
}

#[tokio::test(start_paused = true)]
async fn test_prose_response_degrades_to_demo() {
    let client = Arc::new(ScriptedLLMClient::always("I cannot help with that."));
    let generator = generator(client, RetryPolicy::default());

    let payload = generator
        .generate_json_or_demo(
            "prompt",
            TaskCategory::PatentAnalysis,
            &GenerateOptions::default(),
            || json!({ "demo": true }),
        )
        .await;

    assert!(payload.is_degraded());
    assert_eq!(payload.get()["demo"], true);
    assert_eq!(generator.stats().degraded, 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_call_degrades_to_demo() {
    let client = Arc::new(ScriptedLLMClient::failing(LlmError::unavailable("503")));
    let generator = generator(client.clone(), RetryPolicy::default());

    let payload = generator
        .generate_json_or_demo(
            "prompt",
            TaskCategory::MarketAnalysis,
            &GenerateOptions::default(),
            || json!({ "demo": true }),
        )
        .await;

    assert!(payload.is_degraded());
    // One attempt per model: unavailable never retries the same model.
    assert_eq!(client.models_called(), vec!["primary", "backup"]);
}
