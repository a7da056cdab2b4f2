// Hover controller driven against a real document with grid geometry.
//
// Grid: 20px rows, 8px columns. "The fastquick brown fox" sits on row 0, so
// the delete span "fast" covers columns 4..8 and the insert "quick" 8..13.
// Row 0 leaves no room above, so the popup opens 40px below the span.

use std::time::{Duration, Instant};

use redline_common::types::{AnnotationKind, AuthorMeta, Suggestion};
use redline_engine::document::layout::GridLayout;
use redline_engine::document::ydoc::YrsDocument;
use redline_engine::document::{DocumentModel, ScreenCoords, ScreenPoint};
use redline_engine::hover::{HoverConfig, HoverController};
use redline_engine::suggest::resolution::{Decision, ResolutionExecutor};
use redline_engine::suggest::SuggestionApplier;

const HIDE: Duration = Duration::from_millis(200);

fn applier() -> SuggestionApplier {
    SuggestionApplier::for_author(AuthorMeta::agent("bot"))
}

fn fast_to_quick() -> Suggestion {
    Suggestion {
        text_before: "The ".into(),
        text_to_replace: "fast".into(),
        text_replacement: "quick".into(),
        ..Suggestion::default()
    }
}

fn annotated_doc() -> YrsDocument {
    let doc = YrsDocument::from_paragraphs(["The fast brown fox"])
        .with_layout(GridLayout::new(20.0, 8.0));
    applier().apply(&doc, &fast_to_quick()).unwrap();
    doc
}

fn column(col: u32) -> ScreenPoint {
    ScreenPoint::new(col as f32 * 8.0 + 1.0, 5.0)
}

// ── Showing ────────────────────────────────────────────────────────

#[test]
fn entering_span_shows_popup_at_leading_edge() {
    let doc = annotated_doc();
    let mut hover = HoverController::new(HoverConfig::default());

    hover.on_pointer_move(&doc, column(6), Instant::now());

    let state = hover.state(&doc);
    assert!(state.visible);
    assert_eq!(hover.popup_rect(&doc).map(|rect| rect.top), Some(40.0));
    assert_eq!(state.annotation_kind, Some(AnnotationKind::Delete));
    assert_eq!(state.screen_position, Some(ScreenCoords { top: 40.0, left: 32.0 }));
    assert_eq!(state.span_from, Some(5));
    assert_eq!(state.span_to, Some(9));
    assert!(state.pending_hide_token.is_none());
}

#[test]
fn span_lower_in_the_viewport_opens_popup_above() {
    let doc = YrsDocument::from_paragraphs(["Intro", "Middle", "The fast brown fox"])
        .with_layout(GridLayout::new(20.0, 8.0));
    applier().apply(&doc, &fast_to_quick()).unwrap();
    let mut hover = HoverController::new(HoverConfig::default());

    hover.on_pointer_move(&doc, ScreenPoint::new(6.0 * 8.0 + 1.0, 45.0), Instant::now());

    assert_eq!(hover.state(&doc).screen_position, Some(ScreenCoords { top: 0.0, left: 32.0 }));
}

#[test]
fn moving_to_adjacent_span_switches_immediately() {
    let doc = annotated_doc();
    let mut hover = HoverController::new(HoverConfig::default());
    let now = Instant::now();

    hover.on_pointer_move(&doc, column(5), now);
    let first = hover.shown_annotation();
    hover.on_pointer_move(&doc, column(9), now + Duration::from_millis(10));

    assert_ne!(hover.shown_annotation(), first);
    assert_eq!(hover.state(&doc).annotation_kind, Some(AnnotationKind::Insert));
    assert_eq!(hover.state(&doc).screen_position, Some(ScreenCoords { top: 40.0, left: 64.0 }));
}

// ── Debounced hide ─────────────────────────────────────────────────

#[test]
fn leaving_spans_hides_after_delay() {
    let doc = annotated_doc();
    let mut hover = HoverController::new(HoverConfig::default());
    let now = Instant::now();

    hover.on_pointer_move(&doc, column(5), now);
    hover.on_pointer_move(&doc, column(0), now);
    assert!(hover.state(&doc).pending_hide_token.is_some());
    assert_eq!(hover.next_deadline(), Some(now + HIDE));

    assert!(!hover.tick(now + HIDE - Duration::from_millis(1)));
    assert!(hover.is_visible(&doc));
    assert!(hover.tick(now + HIDE));
    assert!(!hover.is_visible(&doc));
}

#[test]
fn repeated_moves_off_span_do_not_extend_the_delay() {
    let doc = annotated_doc();
    let mut hover = HoverController::new(HoverConfig::default());
    let now = Instant::now();

    hover.on_pointer_move(&doc, column(5), now);
    hover.on_pointer_move(&doc, column(0), now);
    hover.on_pointer_move(&doc, column(1), now + Duration::from_millis(150));

    assert!(hover.tick(now + HIDE));
}

#[test]
fn returning_to_span_cancels_pending_hide() {
    let doc = annotated_doc();
    let mut hover = HoverController::new(HoverConfig::default());
    let now = Instant::now();

    hover.on_pointer_move(&doc, column(5), now);
    hover.on_pointer_move(&doc, column(0), now);
    hover.on_pointer_move(&doc, column(6), now + Duration::from_millis(50));

    assert!(hover.state(&doc).pending_hide_token.is_none());
    assert!(!hover.tick(now + Duration::from_secs(1)));
    assert!(hover.is_visible(&doc));
}

#[test]
fn pointer_over_popup_cancels_hide() {
    let doc = annotated_doc();
    let mut hover = HoverController::new(HoverConfig::default());
    let now = Instant::now();

    hover.on_pointer_move(&doc, column(5), now);
    hover.on_pointer_move(&doc, column(0), now);
    // Popup spans x 32..192, y 40..72.
    hover.on_pointer_move(&doc, ScreenPoint::new(40.0, 50.0), now + Duration::from_millis(100));

    assert!(!hover.tick(now + Duration::from_secs(1)));
    assert!(hover.is_visible(&doc));
}

#[test]
fn leaving_surface_into_popup_keeps_it_open() {
    let doc = annotated_doc();
    let mut hover = HoverController::new(HoverConfig::default());
    let now = Instant::now();

    hover.on_pointer_move(&doc, column(5), now);
    hover.on_pointer_leave(now, true);
    assert!(!hover.tick(now + HIDE));

    hover.on_pointer_leave(now, false);
    assert!(hover.tick(now + HIDE));
}

#[test]
fn configured_delay_is_honoured() {
    let doc = annotated_doc();
    let mut hover = HoverController::new(HoverConfig::with_hide_delay_millis(500));
    let now = Instant::now();

    hover.on_pointer_move(&doc, column(5), now);
    hover.on_pointer_leave(now, false);
    assert!(!hover.tick(now + HIDE));
    assert!(hover.tick(now + Duration::from_millis(500)));
}

// ── Document changes ───────────────────────────────────────────────

#[test]
fn document_change_hides_synchronously() {
    let doc = annotated_doc();
    let mut hover = HoverController::new(HoverConfig::default());
    let now = Instant::now();

    hover.on_pointer_move(&doc, column(5), now);
    hover.on_pointer_move(&doc, column(0), now);
    doc.type_text(1, "A", "alice").unwrap();
    hover.on_document_changed();

    let state = hover.state(&doc);
    assert!(!state.visible);
    assert!(state.pending_hide_token.is_none());
    assert!(hover.next_deadline().is_none());
}

#[test]
fn stale_revision_is_never_reported_visible() {
    let doc = annotated_doc();
    let mut hover = HoverController::new(HoverConfig::default());
    let now = Instant::now();

    hover.on_pointer_move(&doc, column(5), now);
    doc.type_text(1, "A", "alice").unwrap();

    // Host forgot to forward the change; the next pointer event catches it.
    hover.on_pointer_move(&doc, column(0), now);
    assert!(!hover.is_visible(&doc));
    assert!(hover.state(&doc).pending_hide_token.is_none());

    hover.on_pointer_move(&doc, column(6), now);
    assert!(hover.is_visible(&doc));
    assert!(!hover.sync_revision(&doc));
}

#[test]
fn applying_a_suggestion_hides_without_a_handler_call() {
    let doc = annotated_doc();
    let mut hover = HoverController::new(HoverConfig::default());
    hover.on_pointer_move(&doc, column(6), Instant::now());
    assert!(hover.is_visible(&doc));

    let second = Suggestion {
        text_before: "brown ".into(),
        text_to_replace: "fox".into(),
        text_replacement: "dog".into(),
        ..Suggestion::default()
    };
    applier().apply(&doc, &second).unwrap();

    let state = hover.state(&doc);
    assert!(!state.visible);
    assert!(state.span_from.is_none());
    assert!(state.screen_position.is_none());
    assert!(!hover.is_visible(&doc));
    assert!(hover.popup_rect(&doc).is_none());
}

#[test]
fn resolving_from_popup_hides_it() {
    let doc = annotated_doc();
    let mut hover = HoverController::new(HoverConfig::default());
    hover.on_pointer_move(&doc, column(9), Instant::now());

    let id = hover.shown_annotation().unwrap();
    let resolved = ResolutionExecutor::new(AuthorMeta::agent("reviewer"))
        .resolve(&doc, &mut hover, id, Decision::Accept)
        .unwrap();

    assert_eq!(resolved.kind, AnnotationKind::Insert);
    assert!(!hover.is_visible(&doc));
    assert!(!hover.sync_revision(&doc));
}
