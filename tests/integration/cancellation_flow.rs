//! Integration tests for cooperative cancellation

use super::test_utils::{
    collect, nda_model, nda_model_with, pipeline, pipeline_with_retry, section_events,
    streamed_text,
};
use clausecraft::cancellation::CancellationRegistry;
use clausecraft::drafting::{ScriptedModel, SectionStep};
use clausecraft::error::ApiError;
use clausecraft::generation::JobHandle;
use clausecraft::job::{JobId, OutputEvent};
use clausecraft::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Ten seconds between attempts, no jitter.
fn slow_retry() -> RetryPolicy {
    RetryPolicy::immediate(3)
        .with_base_delay(Duration::from_secs(10))
        .with_max_delay(Duration::from_secs(10))
}

/// Read events until one matches `stop`, returning everything read.
async fn read_until(
    handle: &mut JobHandle,
    stop: impl Fn(&OutputEvent) -> bool,
) -> Vec<OutputEvent> {
    let mut seen = Vec::new();
    while let Some(event) = handle.next_event().await {
        let done = stop(&event);
        seen.push(event);
        if done {
            break;
        }
    }
    seen
}

#[tokio::test]
async fn test_cancel_before_plan_yields_started_then_cancelled() {
    let p = pipeline(nda_model(), 3);
    let handle = p.generation.start("NDA between Acme and Bob").await.unwrap();
    assert!(p.generation.cancel(&handle.job_id).await);

    let events = collect(handle).await;
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], OutputEvent::JobStarted { .. }));
    assert_eq!(events[1], OutputEvent::Cancelled);
    assert_eq!(p.model.plan_calls(), 0);
    assert_eq!(p.registry.live_jobs().await, 0);
}

#[tokio::test]
async fn test_cancel_racing_the_plan_call_is_cancelled_not_failed() {
    let gate = Arc::new(Notify::new());
    let p = pipeline(nda_model().with_plan_gate(gate.clone()), 3);
    let handle = p.generation.start("NDA between Acme and Bob").await.unwrap();

    // Let the job reach the parked plan call.
    while p.model.plan_calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(p.generation.cancel(&handle.job_id).await);
    gate.notify_one();

    let events = collect(handle).await;
    assert_eq!(events.last(), Some(&OutputEvent::Cancelled));
    assert!(!events
        .iter()
        .any(|e| matches!(e, OutputEvent::Planned { .. } | OutputEvent::ContentChunk { .. })));
}

#[tokio::test]
async fn test_cancel_between_sections_stops_before_the_next_one() {
    let gate = Arc::new(Notify::new());
    let model = nda_model_with(
        "Definitions",
        vec![vec![SectionStep::chunk("Defined terms."), SectionStep::WaitFor(gate.clone())]],
    );
    let p = pipeline(model, 3);
    let mut handle = p.generation.start("NDA between Acme and Bob").await.unwrap();

    let head = read_until(&mut handle, |e| matches!(e, OutputEvent::ContentChunk { .. })).await;
    assert_eq!(
        head.last(),
        Some(&OutputEvent::ContentChunk {
            text: "Defined terms.".into()
        })
    );
    assert!(p.generation.cancel(&handle.job_id).await);
    gate.notify_one();

    let rest = collect(handle).await;
    assert_eq!(
        rest,
        vec![OutputEvent::SectionBoundary { index: 0 }, OutputEvent::Cancelled]
    );
    assert_eq!(p.model.section_calls("Confidentiality"), 0);
    assert_eq!(p.model.section_calls("Term"), 0);
}

#[tokio::test]
async fn test_nda_cancelled_mid_confidentiality() {
    let gate = Arc::new(Notify::new());
    let model = nda_model_with(
        "Confidentiality",
        vec![vec![
            SectionStep::chunk("Each party shall keep\n"),
            SectionStep::WaitFor(gate.clone()),
            SectionStep::chunk("the other's information secret."),
        ]],
    );
    let p = pipeline(model, 3);
    let mut handle = p.generation.start("NDA between Acme and Bob").await.unwrap();

    let mut events = read_until(&mut handle, |e| *e == OutputEvent::LineBreak).await;
    assert!(p.generation.cancel(&handle.job_id).await);
    gate.notify_one();
    events.extend(collect(handle).await);

    assert_eq!(
        section_events(&events, 0),
        vec![
            OutputEvent::ContentChunk {
                text: "\"Confidential Information\" means ".into()
            },
            OutputEvent::ContentChunk {
                text: "any non-public data.".into()
            },
        ]
    );
    assert!(events.contains(&OutputEvent::SectionBoundary { index: 0 }));
    assert_eq!(
        section_events(&events, 1),
        vec![
            OutputEvent::ContentChunk {
                text: "Each party shall keep".into()
            },
            OutputEvent::LineBreak,
        ]
    );
    assert!(!events.contains(&OutputEvent::SectionBoundary { index: 1 }));
    assert!(!events
        .iter()
        .any(|e| matches!(e, OutputEvent::SectionStarted { index: 2, .. })));
    assert_eq!(events.last(), Some(&OutputEvent::Cancelled));
    assert_eq!(p.model.section_calls("Term"), 0);
}

#[tokio::test]
async fn test_cancel_is_a_no_op_for_unknown_and_finished_jobs() {
    let gate = Arc::new(Notify::new());
    let p = pipeline(nda_model().with_plan_gate(gate.clone()), 3);
    assert!(!p.generation.cancel(&JobId::new()).await);

    let handle = p.generation.start("NDA between Acme and Bob").await.unwrap();
    let job_id = handle.job_id;
    assert!(p.generation.cancel(&job_id).await);
    // Still live, already signalled.
    assert!(p.generation.cancel(&job_id).await);
    assert!(p.registry.is_cancelled(&job_id).await);

    gate.notify_one();
    collect(handle).await;
    assert!(!p.generation.cancel(&job_id).await);
    assert!(!p.registry.is_cancelled(&job_id).await);
}

#[tokio::test]
async fn test_concurrent_jobs_are_independent() {
    let p = pipeline(nda_model(), 3);
    let first = p.generation.start("NDA between Acme and Bob").await.unwrap();
    let second = p.generation.start("NDA between Acme and Carol").await.unwrap();
    assert_ne!(first.job_id, second.job_id);
    assert_eq!(p.registry.live_jobs().await, 2);

    assert!(p.generation.cancel(&first.job_id).await);
    let (first_events, second_events) = tokio::join!(collect(first), collect(second));

    assert_eq!(first_events.last(), Some(&OutputEvent::Cancelled));
    assert!(matches!(
        second_events.last(),
        Some(OutputEvent::Completed { .. })
    ));
    assert_eq!(p.registry.live_jobs().await, 0);
}

#[tokio::test]
async fn test_dropped_caller_still_releases_the_token() {
    let gate = Arc::new(Notify::new());
    let p = pipeline(nda_model().with_plan_gate(gate.clone()), 3);
    let handle = p.generation.start("NDA between Acme and Bob").await.unwrap();
    assert_eq!(p.registry.live_jobs().await, 1);

    drop(handle);
    gate.notify_one();

    tokio::time::timeout(Duration::from_secs(5), async {
        while p.registry.live_jobs().await > 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("job should release its token once the caller is gone");
    assert_eq!(p.model.section_calls("Definitions"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_plan_backoff_is_prompt() {
    let model = ScriptedModel::new()
        .with_plan_outcome(Err(ApiError::ProviderTimeout("slow".into())))
        .with_plan("Mutual NDA", &["Definitions", "Confidentiality", "Term"]);
    let p = pipeline_with_retry(model, slow_retry());
    let handle = p.generation.start("NDA between Acme and Bob").await.unwrap();

    // The first plan call fails and the job parks in its backoff.
    while p.model.plan_calls() == 0 {
        tokio::task::yield_now().await;
    }
    let cancelled_at = Instant::now();
    assert!(p.generation.cancel(&handle.job_id).await);
    let events = collect(handle).await;

    assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    assert_eq!(events.last(), Some(&OutputEvent::Cancelled));
    assert!(!events
        .iter()
        .any(|e| matches!(e, OutputEvent::Planned { .. })));
    assert_eq!(p.model.plan_calls(), 1);
    assert_eq!(p.registry.live_jobs().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_section_backoff_is_prompt() {
    let model = nda_model_with(
        "Confidentiality",
        vec![
            vec![SectionStep::Fail(ApiError::ProviderRateLimit("429".into()))],
            vec![SectionStep::chunk("the other's information secret.")],
        ],
    );
    let p = pipeline_with_retry(model, slow_retry());
    let mut handle = p.generation.start("NDA between Acme and Bob").await.unwrap();

    let mut events = read_until(&mut handle, |e| {
        matches!(e, OutputEvent::SectionStarted { index: 1, .. })
    })
    .await;
    while p.model.section_calls("Confidentiality") == 0 {
        tokio::task::yield_now().await;
    }
    let cancelled_at = Instant::now();
    assert!(p.generation.cancel(&handle.job_id).await);
    events.extend(collect(handle).await);

    assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    assert_eq!(events.last(), Some(&OutputEvent::Cancelled));
    assert_eq!(p.model.section_calls("Confidentiality"), 1);
    assert_eq!(p.model.section_calls("Term"), 0);
    assert_eq!(
        streamed_text(&events),
        "\"Confidential Information\" means any non-public data."
    );
    assert!(section_events(&events, 1).is_empty());
}
