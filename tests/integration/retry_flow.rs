//! Integration tests for retrying transient provider failures

use super::test_utils::{
    collect, nda_model, nda_model_with, pipeline, section_events, streamed_text, without_identity,
};
use clausecraft::drafting::{ScriptedModel, SectionStep};
use clausecraft::error::ApiError;
use clausecraft::job::{OutputEvent, PlanResult};

fn document_content(events: &[OutputEvent]) -> String {
    match events.last() {
        Some(OutputEvent::Completed { document }) => document.content.clone(),
        other => panic!("expected Completed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_recovered_failures_do_not_change_the_output() {
    let clean = pipeline(nda_model(), 3);
    let clean_handle = clean.generation.start("NDA between Acme and Bob").await.unwrap();
    let clean_events = collect(clean_handle).await;

    // k = 2 failures with max_attempts = 3.
    let flaky = pipeline(
        nda_model_with(
            "Term",
            vec![
                vec![SectionStep::Fail(ApiError::ProviderTimeout("slow".into()))],
                vec![SectionStep::Fail(ApiError::ProviderRateLimit("429".into()))],
                vec![SectionStep::chunk("This agreement lasts two years.")],
            ],
        ),
        3,
    );
    let flaky_handle = flaky.generation.start("NDA between Acme and Bob").await.unwrap();
    let flaky_events = collect(flaky_handle).await;

    assert_eq!(flaky.model.section_calls("Term"), 3);
    assert_eq!(without_identity(&flaky_events), without_identity(&clean_events));
    assert_eq!(document_content(&flaky_events), document_content(&clean_events));
}

#[tokio::test]
async fn test_exhausted_retries_on_the_second_section_fail_the_job() {
    let p = pipeline(
        nda_model_with(
            "Confidentiality",
            vec![vec![SectionStep::Fail(ApiError::ProviderUnavailable("503".into()))]],
        ),
        3,
    );
    let events = collect(p.generation.start("NDA between Acme and Bob").await.unwrap()).await;

    assert_eq!(
        streamed_text(&section_events(&events, 0)),
        "\"Confidential Information\" means any non-public data."
    );
    assert!(events.contains(&OutputEvent::SectionBoundary { index: 0 }));
    assert!(section_events(&events, 1).is_empty());
    assert!(!events.contains(&OutputEvent::SectionBoundary { index: 1 }));
    assert!(!events
        .iter()
        .any(|e| matches!(e, OutputEvent::SectionStarted { index: 2, .. })));
    match events.last() {
        Some(OutputEvent::Failed { reason }) => {
            assert!(reason.contains("3 attempts"), "reason: {}", reason);
            assert!(reason.contains("503"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(p.model.section_calls("Confidentiality"), 3);
    assert_eq!(p.model.section_calls("Term"), 0);
}

#[tokio::test]
async fn test_non_transient_section_failure_is_not_retried() {
    let p = pipeline(
        nda_model_with(
            "Definitions",
            vec![vec![SectionStep::Fail(ApiError::PromptRejected("unsafe".into()))]],
        ),
        3,
    );
    let events = collect(p.generation.start("NDA between Acme and Bob").await.unwrap()).await;

    assert!(matches!(events.last(), Some(OutputEvent::Failed { .. })));
    assert_eq!(p.model.section_calls("Definitions"), 1);
}

#[tokio::test]
async fn test_mid_stream_retry_repeats_visible_text() {
    let p = pipeline(
        nda_model_with(
            "Term",
            vec![
                vec![
                    SectionStep::chunk("This agreement "),
                    SectionStep::Fail(ApiError::ProviderStreamInterrupted("reset".into())),
                ],
                vec![SectionStep::chunk("This agreement lasts two years.")],
            ],
        ),
        3,
    );
    let events = collect(p.generation.start("NDA between Acme and Bob").await.unwrap()).await;

    assert_eq!(
        streamed_text(&section_events(&events, 2)),
        "This agreement This agreement lasts two years."
    );
    assert!(document_content(&events)
        .ends_with("Term\n\nThis agreement This agreement lasts two years."));
}

#[tokio::test]
async fn test_plan_is_retried_on_transient_failure() {
    let model = ScriptedModel::new()
        .with_plan_outcome(Err(ApiError::ProviderTimeout("slow".into())))
        .with_plan_outcome(Ok(PlanResult::new("Mutual NDA", vec!["Term".into()])));
    let p = pipeline(model, 3);
    let events = collect(p.generation.start("NDA between Acme and Bob").await.unwrap()).await;

    assert_eq!(p.model.plan_calls(), 2);
    assert_eq!(document_content(&events), "Term\n\nTerm text.");
}

#[tokio::test]
async fn test_plan_retries_are_bounded() {
    let model = ScriptedModel::new()
        .with_plan_outcome(Err(ApiError::ProviderUnavailable("502".into())));
    let p = pipeline(model, 2);
    let events = collect(p.generation.start("NDA between Acme and Bob").await.unwrap()).await;

    assert_eq!(p.model.plan_calls(), 2);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], OutputEvent::Failed { .. }));
}
