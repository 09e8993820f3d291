//! Integration tests for editing finished contracts

use super::test_utils::{collect, nda_model, pipeline, streamed_text};
use clausecraft::cancellation::CancellationRegistry;
use clausecraft::drafting::{ModelCall, ScriptedModel, SectionStep};
use clausecraft::error::ApiError;
use clausecraft::generation::FALLBACK_SUGGESTIONS;
use clausecraft::job::{Document, JobKind, OutputEvent};
use std::sync::Arc;
use tokio::sync::Notify;

async fn generated_nda() -> Document {
    let p = pipeline(nda_model(), 3);
    let events = collect(p.generation.start("NDA between Acme and Bob").await.unwrap()).await;
    match events.last() {
        Some(OutputEvent::Completed { document }) => document.clone(),
        other => panic!("expected Completed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_edit_of_generated_contract_yields_a_new_document() {
    let source = generated_nda().await;
    let p = pipeline(
        ScriptedModel::new().with_rewrite(vec![
            SectionStep::chunk("Definitions\n\n"),
            SectionStep::chunk("Term\n\nThis agreement lasts three years."),
        ]),
        3,
    );
    let handle = p.edits.start(&source, "Make the term three years").await.unwrap();
    let job_id = handle.job_id;
    let events = collect(handle).await;

    assert_eq!(
        events[0],
        OutputEvent::JobStarted {
            job_id,
            kind: JobKind::Edit
        }
    );
    assert_eq!(
        streamed_text(&events),
        "Definitions\n\nTerm\n\nThis agreement lasts three years."
    );
    match events.last() {
        Some(OutputEvent::Completed { document }) => {
            assert_eq!(document.id, job_id);
            assert_ne!(document.id, source.id);
            assert_eq!(document.derived_from, Some(source.id));
            assert_eq!(document.title, "Mutual NDA");
            assert_eq!(
                document.content,
                "Definitions\n\nTerm\n\nThis agreement lasts three years."
            );
        }
        other => panic!("expected Completed, got {:?}", other),
    }
    assert_eq!(
        p.model.calls(),
        vec![ModelCall::Rewrite {
            instruction: "Make the term three years".to_string()
        }]
    );
}

#[tokio::test]
async fn test_edit_retries_transient_failures() {
    let source = Document::from_text(None, "Lease", "Rent is 100.");
    let p = pipeline(
        ScriptedModel::new()
            .with_rewrite(vec![SectionStep::Fail(ApiError::ProviderTimeout("slow".into()))])
            .with_rewrite(vec![SectionStep::chunk("Rent is 120.")]),
        3,
    );
    let events = collect(p.edits.start(&source, "Raise the rent").await.unwrap()).await;

    match events.last() {
        Some(OutputEvent::Completed { document }) => assert_eq!(document.content, "Rent is 120."),
        other => panic!("expected Completed, got {:?}", other),
    }
    assert_eq!(p.model.calls().len(), 2);
}

#[tokio::test]
async fn test_edit_can_be_cancelled_mid_rewrite() {
    let gate = Arc::new(Notify::new());
    let source = Document::from_text(None, "Lease", "Rent is 100.\nPaid monthly.");
    let p = pipeline(
        ScriptedModel::new().with_rewrite(vec![
            SectionStep::chunk("Rent is 120.\n"),
            SectionStep::WaitFor(gate.clone()),
            SectionStep::chunk("Paid monthly."),
        ]),
        3,
    );
    let mut handle = p.edits.start(&source, "Raise the rent").await.unwrap();

    let mut events = Vec::new();
    while let Some(event) = handle.next_event().await {
        let at_break = event == OutputEvent::LineBreak;
        events.push(event);
        if at_break {
            break;
        }
    }
    assert!(p.edits.cancel(&handle.job_id).await);
    gate.notify_one();
    events.extend(collect(handle).await);

    assert_eq!(streamed_text(&events), "Rent is 120.\n");
    assert_eq!(events.last(), Some(&OutputEvent::Cancelled));
    assert_eq!(p.registry.live_jobs().await, 0);
}

#[tokio::test]
async fn test_edit_rejects_empty_input() {
    let p = pipeline(ScriptedModel::new(), 3);
    let blank = Document::from_text(None, "Lease", "   ");
    assert!(matches!(
        p.edits.start(&blank, "Raise the rent").await,
        Err(ApiError::InvalidRequest(_))
    ));
    assert_eq!(p.registry.live_jobs().await, 0);
}

#[tokio::test]
async fn test_suggestions_use_model_output_or_fall_back() {
    let document = Document::from_text(None, "Lease", "Rent is 100.");

    let p = pipeline(
        ScriptedModel::new().with_suggestions(Ok(vec![
            "  Add a late fee  ".to_string(),
            "".to_string(),
            "Name the landlord".to_string(),
        ])),
        3,
    );
    assert_eq!(
        p.edits.suggest_edits(&document).await,
        vec!["Add a late fee", "Name the landlord"]
    );

    let p = pipeline(
        ScriptedModel::new().with_suggestions(Err(ApiError::ProviderAuthFailed("401".into()))),
        3,
    );
    assert_eq!(
        p.edits.suggest_edits(&document).await,
        FALLBACK_SUGGESTIONS.to_vec()
    );
}
