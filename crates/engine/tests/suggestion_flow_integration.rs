// End-to-end suggestion flow: stream → accumulate → anchor → annotate → resolve.

use futures_util::stream;
use redline_common::protocol::envelope::Envelope;
use redline_common::types::{AnnotationKind, AuthorMeta, Suggestion};
use redline_engine::client::PARAGRAPH_BREAK;
use redline_engine::document::spans::all_spans;
use redline_engine::document::ydoc::YrsDocument;
use redline_engine::document::{accepted_text, rejected_text, render_redline, DocumentModel};
use redline_engine::error::SuggestError;
use redline_engine::hover::{HoverConfig, HoverController};
use redline_engine::session::{SessionOutcome, SuggestionSession};
use redline_engine::stream::accumulator::MessageAccumulator;
use redline_engine::suggest::resolution::ResolutionExecutor;
use redline_engine::suggest::SuggestionApplier;

fn applier() -> SuggestionApplier {
    SuggestionApplier::for_author(AuthorMeta::agent("editor-bot"))
}

fn executor() -> ResolutionExecutor {
    ResolutionExecutor::new(AuthorMeta::agent("reviewer"))
}

fn suggestion(before: &str, target: &str, after: &str, replacement: &str) -> Suggestion {
    Suggestion {
        text_before: before.into(),
        text_to_replace: target.into(),
        text_after: after.into(),
        text_replacement: replacement.into(),
        reason: "clarity".into(),
    }
}

const TWO_SUGGESTIONS: &str = concat!(
    r#"{\"suggestions\":[{\"textBefore\":\"The \",\"textToReplace\":\"fast\","#,
    r#"\"textReplacement\":\"quick\"},"#,
    r#"{\"textToReplace\":\"missing\",\"textReplacement\":\"x\"}]}"#,
);

fn body(frames: &[String]) -> Vec<Result<Vec<u8>, String>> {
    frames.iter().map(|frame| Ok(frame.clone().into_bytes())).collect()
}

// ── Worked examples ────────────────────────────────────────────────

#[test]
fn example_replace_fast_with_quick() {
    let doc = YrsDocument::from_paragraphs(["The fast brown fox jumps"]);
    let applied =
        applier().apply(&doc, &suggestion("The ", "fast", " brown fox", "quick")).unwrap();

    assert_eq!(applied.match_count, 1);
    let runs = doc.text_runs();
    assert_eq!(accepted_text(&runs), "The quick brown fox jumps");
    assert_eq!(rejected_text(&runs), "The fast brown fox jumps");

    let spans = all_spans(&runs);
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].kind(), AnnotationKind::Delete);
    assert_eq!(spans[0].text, "fast");
    assert_eq!(spans[1].kind(), AnnotationKind::Insert);
    assert_eq!(spans[1].text, "quick");
    assert_eq!(spans[0].to(), spans[1].from(), "insert follows the deleted text directly");
    assert_eq!(spans[0].annotation.suggestion_id, spans[1].annotation.suggestion_id);
}

#[test]
fn example_empty_suggestions_payload_dispatches_nothing() {
    let doc = YrsDocument::from_paragraphs(["The fast brown fox jumps"]);
    let revision = doc.revision();
    let mut accumulator = MessageAccumulator::new();

    let first = Envelope::decode(
        r#"{"tool_call_chunks":[{"id":"t1","name":"suggest_diff","args":"{\"suggest"}]}"#,
    )
    .unwrap();
    let second = Envelope::decode(r#"{"tool_call_chunks":[{"args":"ions\":[]}"}]}"#).unwrap();
    accumulator.apply(&first);
    accumulator.apply(&second);

    let call = accumulator.tool_call("t1").unwrap();
    assert_eq!(call.data, r#"{"suggestions":[]}"#);
    let payload = call.parse_suggestions().unwrap();
    assert!(payload.suggestions.is_empty());

    let report = applier().apply_all(&doc, &payload.suggestions);
    assert!(report.applied.is_empty());
    assert_eq!(doc.revision(), revision);
}

#[test]
fn example_missing_anchor_leaves_document_identical() {
    let doc = YrsDocument::from_paragraphs(["The fast brown fox jumps"]);
    let before = doc.flattened_text();
    let revision = doc.revision();

    let err = applier().apply(&doc, &suggestion("A ", "slow", " turtle", "swift")).unwrap_err();
    assert!(matches!(err, SuggestError::AnchorNotFound { .. }));
    assert_eq!(doc.flattened_text(), before);
    assert_eq!(doc.revision(), revision);
}

// ── Anchor matching ────────────────────────────────────────────────

#[test]
fn ambiguous_anchor_mutates_first_occurrence() {
    let doc = YrsDocument::from_paragraphs(["go left, then go left again"]);
    let applied = applier().apply(&doc, &suggestion("go ", "left", "", "right")).unwrap();

    assert_eq!(applied.match_count, 2);
    assert_eq!(accepted_text(&doc.text_runs()), "go right, then go left again");
}

#[test]
fn anchor_may_span_paragraph_boundary() {
    let doc = YrsDocument::from_paragraphs(["First ends", "Second starts"]);
    applier().apply(&doc, &suggestion("ends", "Second", " starts", "Then")).unwrap();

    assert_eq!(render_redline(&doc.text_runs()), "First ends\n[-Second-]{+Then+} starts");
}

#[test]
fn anchor_quoting_the_request_paragraph_break_is_dropped() {
    let doc = YrsDocument::from_paragraphs(["First ends", "Second starts"]);
    let before = format!("ends{PARAGRAPH_BREAK}");

    let err = applier().apply(&doc, &suggestion(&before, "Second", "", "Then")).unwrap_err();
    assert!(matches!(err, SuggestError::AnchorNotFound { .. }));
    assert_eq!(doc.flattened_text(), "First endsSecond starts");
}

#[test]
fn later_suggestions_see_earlier_annotations() {
    let doc = YrsDocument::from_paragraphs(["The fast brown fox jumps"]);
    let report = applier().apply_all(
        &doc,
        &[
            suggestion("The ", "fast", " brown", "quick"),
            suggestion("brown ", "fox", "", "dog"),
            suggestion("", "cat", "", "lion"),
        ],
    );

    assert_eq!(report.applied.len(), 2);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].index, 2);
    assert_eq!(report.dropped[0].code, "ANCHOR_NOT_FOUND");
    assert_eq!(accepted_text(&doc.text_runs()), "The quick brown dog jumps");
}

#[test]
fn anchor_recomputed_after_local_edit() {
    let doc = YrsDocument::from_paragraphs(["The fast brown fox"]);
    doc.type_text(1, "Look: ", "alice").unwrap();

    applier().apply(&doc, &suggestion("The ", "fast", "", "quick")).unwrap();
    assert_eq!(render_redline(&doc.text_runs()), "Look: The [-fast-]{+quick+} brown fox");
}

// ── Resolution ─────────────────────────────────────────────────────

#[test]
fn accept_and_reject_change_length_as_expected() {
    for (accept, kind, shrink) in [
        (true, AnnotationKind::Delete, "fast".len()),
        (false, AnnotationKind::Delete, 0),
        (true, AnnotationKind::Insert, 0),
        (false, AnnotationKind::Insert, "quick".len()),
    ] {
        let doc = YrsDocument::from_paragraphs(["The fast brown fox jumps"]);
        applier().apply(&doc, &suggestion("The ", "fast", " brown", "quick")).unwrap();
        let before = doc.flattened_text().len();
        let span =
            all_spans(&doc.text_runs()).into_iter().find(|span| span.kind() == kind).unwrap();

        let mut hover = HoverController::new(HoverConfig::default());
        let resolved = if accept {
            executor().accept(&doc, &mut hover, &span).unwrap()
        } else {
            executor().reject(&doc, &mut hover, &span).unwrap()
        };

        assert_eq!(resolved.removed_len, shrink);
        assert_eq!(doc.flattened_text().len(), before - shrink, "accept={accept} kind={kind:?}");
        assert_eq!(all_spans(&doc.text_runs()).len(), 1);
    }
}

#[test]
fn accepting_both_halves_materializes_replacement() {
    let doc = YrsDocument::from_paragraphs(["The fast brown fox jumps"]);
    applier().apply(&doc, &suggestion("The ", "fast", " brown", "quick")).unwrap();
    let mut hover = HoverController::new(HoverConfig::default());

    for span in all_spans(&doc.text_runs()) {
        executor().accept(&doc, &mut hover, &span).unwrap();
    }
    assert_eq!(doc.flattened_text(), "The quick brown fox jumps");
    assert!(all_spans(&doc.text_runs()).is_empty());
}

#[test]
fn resolving_twice_reports_missing_span() {
    let doc = YrsDocument::from_paragraphs(["The fast brown fox jumps"]);
    applier().apply(&doc, &suggestion("The ", "fast", " brown", "quick")).unwrap();
    let mut hover = HoverController::new(HoverConfig::default());
    let span = all_spans(&doc.text_runs()).remove(0);

    executor().reject(&doc, &mut hover, &span).unwrap();
    let err = executor().reject(&doc, &mut hover, &span).unwrap_err();
    assert!(matches!(err, SuggestError::SpanNotFound(id) if id == span.id()));
}

#[test]
fn reject_all_restores_original_text() {
    let doc = YrsDocument::from_paragraphs(["The fast brown fox", "jumps high"]);
    applier().apply_all(
        &doc,
        &[suggestion("The ", "fast", "", "quick"), suggestion("", "high", "", "over")],
    );
    let mut hover = HoverController::new(HoverConfig::default());

    let resolved = executor().reject_all(&doc, &mut hover).unwrap();
    assert_eq!(resolved.len(), 4);
    assert_eq!(doc.block_texts(), vec!["The fast brown fox".to_string(), "jumps high".into()]);
}

// ── Streaming session ──────────────────────────────────────────────

#[tokio::test]
async fn streamed_session_applies_and_survives_bad_envelopes() {
    let doc = YrsDocument::from_paragraphs(["The fast brown fox jumps"]);
    let frames = vec![
        "data: {\"content\":\"Here you go.\"}\n\n".to_string(),
        "data: {not json}\n\n".to_string(),
        format!(
            "data: {{\"tool_call_chunks\":[{{\"id\":\"t1\",\"name\":\"suggest_diff\",\"args\":\"{TWO_SUGGESTIONS}\"}}]}}\n\n"
        ),
        "data: {\"tool_call_id\":\"t1\",\"content\":\"ok\"}\n\n".to_string(),
    ];

    let mut session =
        SuggestionSession::new(applier()).with_tool_names(vec!["suggest_diff".into()]);
    let outcome = session.run(stream::iter(body(&frames)), &doc).await;

    let SessionOutcome::Completed { message, report } = outcome else {
        panic!("expected completed session");
    };
    assert_eq!(message.text(), "Here you go.");
    assert!(message.tool_calls().all(|call| !call.is_open));
    assert_eq!(message.tool_calls().next().unwrap().result.as_deref(), Some("ok"));
    assert_eq!(report.applied.len(), 1);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(accepted_text(&doc.text_runs()), "The quick brown fox jumps");
}
