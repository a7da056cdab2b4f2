// Suggestion span lookup over text runs.
//
// A span is the maximal run-order contiguous stretch carrying one annotation
// instance. It may cross several runs and even a block boundary, so it is
// kept as a list of tree ranges rather than a single `from..to`.

use redline_common::types::{AnnotationKind, DocumentRange, SuggestionAnnotation};
use uuid::Uuid;

use super::TextRun;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionSpan {
    pub annotation: SuggestionAnnotation,
    /// Tree ranges in document order; adjacent runs are merged.
    pub ranges: Vec<DocumentRange>,
    /// Flattened text covered by the span.
    pub text: String,
}

impl SuggestionSpan {
    pub fn kind(&self) -> AnnotationKind {
        self.annotation.kind
    }

    pub fn id(&self) -> Uuid {
        self.annotation.id
    }

    /// Leading edge of the span.
    pub fn from(&self) -> u32 {
        self.ranges.first().map(|range| range.from).unwrap_or_default()
    }

    pub fn to(&self) -> u32 {
        self.ranges.last().map(|range| range.to).unwrap_or_default()
    }

    /// Length of the covered text in the flattened text.
    pub fn flat_len(&self) -> usize {
        self.text.len()
    }

    fn extend(&mut self, run: &TextRun) {
        match self.ranges.last_mut() {
            Some(last) if last.to == run.tree_start => last.to = run.tree_end(),
            _ => self.ranges.push(DocumentRange::new(run.tree_start, run.tree_end())),
        }
        self.text.push_str(&run.text);
    }

    fn start(annotation: &SuggestionAnnotation, run: &TextRun) -> Self {
        Self {
            annotation: annotation.clone(),
            ranges: vec![DocumentRange::new(run.tree_start, run.tree_end())],
            text: run.text.clone(),
        }
    }
}

/// Every span in the document, in document order.
pub fn all_spans(runs: &[TextRun]) -> Vec<SuggestionSpan> {
    let mut spans: Vec<SuggestionSpan> = Vec::new();
    let mut previous_id: Option<Uuid> = None;

    for run in runs {
        let Some(annotation) = run.annotation.as_ref() else {
            previous_id = None;
            continue;
        };

        match spans.last_mut() {
            Some(span) if previous_id == Some(annotation.id) => span.extend(run),
            _ => spans.push(SuggestionSpan::start(annotation, run)),
        }
        previous_id = Some(annotation.id);
    }

    spans
}

/// The span covering tree position `pos`, if any.
pub fn span_at(runs: &[TextRun], pos: u32) -> Option<SuggestionSpan> {
    all_spans(runs)
        .into_iter()
        .find(|span| span.ranges.iter().any(|range| range.contains(pos)))
}

/// Every stretch carrying annotation `id`, merged into one span.
///
/// Normally an annotation forms a single span; a local edit typed into the
/// middle of one splits it, and resolution must still settle both halves.
pub fn span_by_id(runs: &[TextRun], id: Uuid) -> Option<SuggestionSpan> {
    let mut matching = all_spans(runs).into_iter().filter(|span| span.id() == id);
    let mut merged = matching.next()?;
    for span in matching {
        merged.ranges.extend(span.ranges);
        merged.text.push_str(&span.text);
    }
    Some(merged)
}
