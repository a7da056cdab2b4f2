// Document model API consumed by the suggestion pipeline.
//
// The live document is owned by the host. This module only describes how it
// is read (flattened text runs, screen geometry) and mutated (origin-tagged,
// atomic batches of steps).

pub mod layout;
pub mod markdown;
pub mod spans;
pub mod ydoc;

use redline_common::crdt::origin::OriginTag;
use redline_common::types::{AnnotationKind, SuggestionAnnotation};

use crate::error::DocumentError;

/// Viewport coordinates of a document position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenCoords {
    pub top: f32,
    pub left: f32,
}

/// A pointer location in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One inline text run, in reading order.
///
/// A run never mixes annotations: adjacent text with a different annotation
/// (or none) is a separate run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    /// Index of the block (paragraph) holding this run.
    pub block: usize,
    /// Tree position of the run's first character.
    pub tree_start: u32,
    /// Offset of the run's first byte in the flattened text.
    pub flat_start: usize,
    pub text: String,
    pub annotation: Option<SuggestionAnnotation>,
}

impl TextRun {
    pub fn tree_end(&self) -> u32 {
        self.tree_start + self.text.len() as u32
    }

    pub fn flat_end(&self) -> usize {
        self.flat_start + self.text.len()
    }

    pub fn covers(&self, pos: u32) -> bool {
        pos >= self.tree_start && pos < self.tree_end()
    }
}

/// A single edit inside a [`Mutation`].
///
/// Positions refer to the document as left by the preceding steps.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationStep {
    MarkRange { from: u32, to: u32, annotation: SuggestionAnnotation },
    InsertText { at: u32, text: String, annotation: Option<SuggestionAnnotation> },
    RemoveMark { from: u32, to: u32, kind: AnnotationKind },
    DeleteRange { from: u32, to: u32 },
}

/// An atomic, origin-tagged batch of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    origin: OriginTag,
    steps: Vec<MutationStep>,
}

impl Mutation {
    pub fn new(origin: OriginTag) -> Self {
        Self { origin, steps: Vec::new() }
    }

    pub fn mark_range(mut self, from: u32, to: u32, annotation: SuggestionAnnotation) -> Self {
        self.steps.push(MutationStep::MarkRange { from, to, annotation });
        self
    }

    pub fn insert_text(
        mut self,
        at: u32,
        text: impl Into<String>,
        annotation: Option<SuggestionAnnotation>,
    ) -> Self {
        self.steps.push(MutationStep::InsertText { at, text: text.into(), annotation });
        self
    }

    pub fn remove_mark(mut self, from: u32, to: u32, kind: AnnotationKind) -> Self {
        self.steps.push(MutationStep::RemoveMark { from, to, kind });
        self
    }

    pub fn delete_range(mut self, from: u32, to: u32) -> Self {
        self.steps.push(MutationStep::DeleteRange { from, to });
        self
    }

    pub fn origin(&self) -> &OriginTag {
        &self.origin
    }

    pub fn steps(&self) -> &[MutationStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Read/mutate surface of the host's rich-text document.
///
/// Methods take `&self`: the host owns the document and may edit it between
/// any two calls, so callers must never cache positions across calls.
pub trait DocumentModel {
    /// Every inline text run, in reading order.
    fn text_runs(&self) -> Vec<TextRun>;

    /// Concatenation of every inline text run, in reading order.
    fn flattened_text(&self) -> String {
        self.text_runs().into_iter().map(|run| run.text).collect()
    }

    /// Apply all steps as one atomic transaction tagged with the mutation's origin.
    fn dispatch(&self, mutation: Mutation) -> Result<(), DocumentError>;

    fn coords_at_position(&self, pos: u32) -> Option<ScreenCoords>;

    fn position_at_coords(&self, point: ScreenPoint) -> Option<u32>;

    /// Monotonic counter bumped by every committed change, whatever its origin.
    fn revision(&self) -> u64;
}

/// Render runs with `[-deleted-]` and `{+inserted+}` markers, one line per block.
pub fn render_redline(runs: &[TextRun]) -> String {
    let mut out = String::new();
    let mut current_block = None;

    for run in runs {
        if current_block.is_some_and(|block| block != run.block) {
            out.push('\n');
        }
        current_block = Some(run.block);

        match run.annotation.as_ref().map(|annotation| annotation.kind) {
            Some(AnnotationKind::Delete) => {
                out.push_str("[-");
                out.push_str(&run.text);
                out.push_str("-]");
            }
            Some(AnnotationKind::Insert) => {
                out.push_str("{+");
                out.push_str(&run.text);
                out.push_str("+}");
            }
            None => out.push_str(&run.text),
        }
    }

    out
}

/// Flattened text as it would read with every pending suggestion accepted.
pub fn accepted_text(runs: &[TextRun]) -> String {
    settled_text(runs, AnnotationKind::Delete)
}

/// Flattened text as it would read with every pending suggestion rejected.
pub fn rejected_text(runs: &[TextRun]) -> String {
    settled_text(runs, AnnotationKind::Insert)
}

fn settled_text(runs: &[TextRun], dropped: AnnotationKind) -> String {
    runs.iter()
        .filter(|run| run.annotation.as_ref().map(|annotation| annotation.kind) != Some(dropped))
        .map(|run| run.text.as_str())
        .collect()
}
