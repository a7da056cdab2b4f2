// Accept / reject of annotated spans.
//
// A span handed in by the hover layer may be stale, so the executor always
// re-locates the annotation in the current runs by id before building the
// mutation. Both annotation kinds are stripped from every range, and text is
// deleted back to front so earlier positions stay valid.

use redline_common::crdt::origin::{OriginKind, OriginTag};
use redline_common::types::{AnnotationKind, AuthorMeta, DocumentRange};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::document::spans::{all_spans, span_by_id, SuggestionSpan};
use crate::document::{DocumentModel, Mutation};
use crate::error::SuggestError;
use crate::hover::HoverController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    /// Whether settling a span of `kind` removes its text.
    pub const fn deletes_text(self, kind: AnnotationKind) -> bool {
        matches!(
            (self, kind),
            (Self::Accept, AnnotationKind::Delete) | (Self::Reject, AnnotationKind::Insert)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSpan {
    pub annotation_id: Uuid,
    pub kind: AnnotationKind,
    pub decision: Decision,
    /// Bytes removed from the flattened text.
    pub removed_len: usize,
}

#[derive(Debug, Clone)]
pub struct ResolutionExecutor {
    author: AuthorMeta,
}

impl ResolutionExecutor {
    pub fn new(author: AuthorMeta) -> Self {
        Self { author }
    }

    pub fn accept<D>(
        &self,
        doc: &D,
        hover: &mut HoverController,
        span: &SuggestionSpan,
    ) -> Result<ResolvedSpan, SuggestError>
    where
        D: DocumentModel + ?Sized,
    {
        self.resolve(doc, hover, span.id(), Decision::Accept)
    }

    pub fn reject<D>(
        &self,
        doc: &D,
        hover: &mut HoverController,
        span: &SuggestionSpan,
    ) -> Result<ResolvedSpan, SuggestError>
    where
        D: DocumentModel + ?Sized,
    {
        self.resolve(doc, hover, span.id(), Decision::Reject)
    }

    /// Settle annotation `annotation_id` in one atomic mutation.
    pub fn resolve<D>(
        &self,
        doc: &D,
        hover: &mut HoverController,
        annotation_id: Uuid,
        decision: Decision,
    ) -> Result<ResolvedSpan, SuggestError>
    where
        D: DocumentModel + ?Sized,
    {
        hover.hide();

        let runs = doc.text_runs();
        let span =
            span_by_id(&runs, annotation_id).ok_or(SuggestError::SpanNotFound(annotation_id))?;

        let removed_len = if decision.deletes_text(span.kind()) { span.flat_len() } else { 0 };
        let mutation = settle(Mutation::new(self.origin()), &span.ranges, span.kind(), decision);
        doc.dispatch(mutation)?;

        info!(
            %annotation_id,
            kind = ?span.kind(),
            ?decision,
            removed_len,
            "resolved suggestion span"
        );
        Ok(ResolvedSpan { annotation_id, kind: span.kind(), decision, removed_len })
    }

    /// Settle every annotation in the document in one atomic mutation.
    pub fn resolve_all<D>(
        &self,
        doc: &D,
        hover: &mut HoverController,
        decision: Decision,
    ) -> Result<Vec<ResolvedSpan>, SuggestError>
    where
        D: DocumentModel + ?Sized,
    {
        hover.hide();

        let spans = all_spans(&doc.text_runs());
        if spans.is_empty() {
            return Ok(Vec::new());
        }

        let mut mark_ranges = Vec::new();
        let mut delete_ranges = Vec::new();
        let mut resolved = Vec::with_capacity(spans.len());
        for span in &spans {
            mark_ranges.extend(span.ranges.iter().copied());
            let removed_len = if decision.deletes_text(span.kind()) {
                delete_ranges.extend(span.ranges.iter().copied());
                span.flat_len()
            } else {
                0
            };
            resolved.push(ResolvedSpan {
                annotation_id: span.id(),
                kind: span.kind(),
                decision,
                removed_len,
            });
        }

        let mut mutation = Mutation::new(self.origin());
        for range in &mark_ranges {
            mutation = strip_marks(mutation, *range);
        }
        delete_ranges.sort_by_key(|range| range.from);
        for range in delete_ranges.iter().rev() {
            mutation = mutation.delete_range(range.from, range.to);
        }
        doc.dispatch(mutation)?;

        info!(spans = resolved.len(), ?decision, "resolved all suggestion spans");
        Ok(resolved)
    }

    pub fn accept_all<D>(
        &self,
        doc: &D,
        hover: &mut HoverController,
    ) -> Result<Vec<ResolvedSpan>, SuggestError>
    where
        D: DocumentModel + ?Sized,
    {
        self.resolve_all(doc, hover, Decision::Accept)
    }

    pub fn reject_all<D>(
        &self,
        doc: &D,
        hover: &mut HoverController,
    ) -> Result<Vec<ResolvedSpan>, SuggestError>
    where
        D: DocumentModel + ?Sized,
    {
        self.resolve_all(doc, hover, Decision::Reject)
    }

    fn origin(&self) -> OriginTag {
        let author_id = self.author.author_id.clone();
        OriginTag::new(OriginKind::Resolution, author_id, self.author.author_type)
    }
}

fn strip_marks(mutation: Mutation, range: DocumentRange) -> Mutation {
    AnnotationKind::ALL
        .iter()
        .fold(mutation, |mutation, kind| mutation.remove_mark(range.from, range.to, *kind))
}

fn settle(
    mutation: Mutation,
    ranges: &[DocumentRange],
    kind: AnnotationKind,
    decision: Decision,
) -> Mutation {
    let mut mutation =
        ranges.iter().fold(mutation, |mutation, range| strip_marks(mutation, *range));
    if decision.deletes_text(kind) {
        for range in ranges.iter().rev() {
            mutation = mutation.delete_range(range.from, range.to);
        }
    }
    mutation
}
