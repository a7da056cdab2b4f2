// Rich-text document backed by a yrs XML fragment.
//
// The fragment holds one `paragraph` element per block, each with a single
// XmlText child. Tree positions count an opening token, the block's UTF-8
// text, then a closing token, so block `i` starts at
// `1 + sum(len(j) + 2 for j < i)`.
//
// Annotations are text formatting attributes; the attribute value is the
// JSON-encoded `SuggestionAnnotation`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use redline_common::crdt::origin::{AuthorType, OriginKind, OriginTag};
use redline_common::types::{AnnotationKind, SuggestionAnnotation};
use tracing::warn;
use yrs::types::text::YChange;
use yrs::types::Attrs;
use yrs::updates::decoder::Decode;
use yrs::{
    Any, Doc, Out, ReadTxn, StateVector, Subscription, Text, Transact, Update, XmlElementPrelim,
    XmlFragment, XmlFragmentRef, XmlOut, XmlTextPrelim, XmlTextRef,
};

use super::layout::{BlockSnapshot, GridLayout};
use super::markdown::markdown_blocks;
use super::{DocumentModel, Mutation, MutationStep, ScreenCoords, ScreenPoint, TextRun};
use crate::error::DocumentError;

const FRAGMENT_NAME: &str = "content";
const BLOCK_TAG: &str = "paragraph";

/// A non-programmatic change observed on the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganicEdit {
    /// Decoded origin, when the transaction carried a redline origin tag.
    pub origin: Option<OriginTag>,
    pub update_len: usize,
}

pub struct YrsDocument {
    doc: Doc,
    fragment: XmlFragmentRef,
    layout: GridLayout,
    revision: Arc<AtomicU64>,
    _revision_subscription: Option<Subscription>,
}

impl std::fmt::Debug for YrsDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YrsDocument")
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

struct Block {
    text: XmlTextRef,
    content_start: u32,
    len: u32,
}

enum PlannedOp {
    Format { block: usize, index: u32, len: u32, attrs: Attrs },
    Insert { block: usize, index: u32, text: String, attrs: Attrs },
    Remove { block: usize, index: u32, len: u32 },
}

impl YrsDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::from_doc(Doc::new())
    }

    /// Wrap an existing yrs document.
    pub fn from_doc(doc: Doc) -> Self {
        let fragment = doc.get_or_insert_xml_fragment(FRAGMENT_NAME);
        let revision = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&revision);
        let subscription = doc
            .observe_update_v1(move |_txn, _event| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .map_err(|error| warn!(?error, "failed to observe document updates"))
            .ok();

        Self {
            doc,
            fragment,
            layout: GridLayout::default(),
            revision,
            _revision_subscription: subscription,
        }
    }

    /// Build a document with one block per paragraph string.
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let document = Self::new();
        {
            let mut txn = document.doc.transact_mut();
            for (index, paragraph) in paragraphs.into_iter().enumerate() {
                let element =
                    document.fragment.insert(&mut txn, index as u32, XmlElementPrelim::empty(BLOCK_TAG));
                element.insert(&mut txn, 0, XmlTextPrelim::new(paragraph.as_ref()));
            }
        }
        document
    }

    /// Build a document from markdown text blocks.
    pub fn from_markdown(markdown: &str) -> Self {
        Self::from_paragraphs(markdown_blocks(markdown))
    }

    /// Load a document from a binary state (full snapshot).
    pub fn from_state(data: &[u8]) -> Result<Self, DocumentError> {
        let document = Self::new();
        document.apply_update(data)?;
        Ok(document)
    }

    pub fn with_layout(mut self, layout: GridLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Apply a binary update from a collaborator.
    pub fn apply_update(&self, data: &[u8]) -> Result<(), DocumentError> {
        let update =
            Update::decode_v1(data).map_err(|error| DocumentError::Update(error.to_string()))?;
        let origin = OriginTag::new(OriginKind::Remote, "", AuthorType::Human).to_bytes()?;
        let mut txn = self
            .doc
            .try_transact_mut_with(origin.as_slice())
            .map_err(|error| DocumentError::Busy(format!("{error:?}")))?;
        txn.apply_update(update).map_err(|error| DocumentError::Update(error.to_string()))?;
        Ok(())
    }

    /// Encode the full document state as a binary blob.
    pub fn encode_state(&self) -> Vec<u8> {
        self.doc.transact().encode_state_as_update_v1(&StateVector::default())
    }

    /// Insert plain (unannotated) text as the given human author.
    pub fn type_text(&self, at: u32, text: &str, author_id: &str) -> Result<(), DocumentError> {
        let origin = OriginTag::new(OriginKind::User, author_id, AuthorType::Human);
        self.dispatch(Mutation::new(origin).insert_text(at, text, None))
    }

    /// Delete a range as the given human author.
    pub fn delete_text(&self, from: u32, to: u32, author_id: &str) -> Result<(), DocumentError> {
        let origin = OriginTag::new(OriginKind::User, author_id, AuthorType::Human);
        self.dispatch(Mutation::new(origin).delete_range(from, to))
    }

    /// Text of each block, in order.
    pub fn block_texts(&self) -> Vec<String> {
        self.block_snapshots().into_iter().map(|block| block.text).collect()
    }

    pub fn block_snapshots(&self) -> Vec<BlockSnapshot> {
        let txn = self.doc.transact();
        self.blocks(&txn)
            .iter()
            .map(|block| BlockSnapshot {
                content_start: block.content_start,
                text: block_text(&txn, &block.text),
            })
            .collect()
    }

    /// Subscribe to changes that did not come from suggestion or resolution
    /// mutations, e.g. to drive a typed-trigger detector.
    pub fn observe_organic_edits<F>(&self, callback: F) -> Result<Subscription, DocumentError>
    where
        F: Fn(&OrganicEdit) + Send + Sync + 'static,
    {
        self.doc
            .observe_update_v1(move |txn, event| {
                let origin = txn.origin().map(|origin| origin.as_ref().to_vec());
                if origin.as_deref().is_some_and(OriginTag::is_programmatic_origin) {
                    return;
                }
                let edit = OrganicEdit {
                    origin: origin.and_then(|bytes| OriginTag::from_bytes(&bytes).ok()),
                    update_len: event.update.len(),
                };
                callback(&edit);
            })
            .map_err(|error| DocumentError::Busy(format!("{error:?}")))
    }

    /// Get the underlying Doc reference (for advanced operations).
    pub fn inner(&self) -> &Doc {
        &self.doc
    }

    fn blocks<T: ReadTxn>(&self, txn: &T) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut pos = 0u32;

        for index in 0..self.fragment.len(txn) {
            let Some(XmlOut::Element(element)) = self.fragment.get(txn, index) else {
                continue;
            };
            let Some(XmlOut::Text(text)) = element.get(txn, 0) else {
                continue;
            };
            let len = Text::len(&text, txn);
            blocks.push(Block { text, content_start: pos + 1, len });
            pos += len + 2;
        }

        blocks
    }

    fn runs_in<T: ReadTxn>(&self, txn: &T) -> Vec<TextRun> {
        let mut runs = Vec::new();
        let mut flat = 0usize;

        for (block_index, block) in self.blocks(txn).iter().enumerate() {
            let mut local = 0u32;
            for diff in block.text.diff(txn, YChange::identity) {
                let Out::Any(Any::String(chunk)) = &diff.insert else {
                    // Embeds occupy one position and carry no text.
                    local += 1;
                    continue;
                };
                if chunk.is_empty() {
                    continue;
                }
                let annotation = diff.attributes.as_deref().and_then(read_annotation);
                runs.push(TextRun {
                    block: block_index,
                    tree_start: block.content_start + local,
                    flat_start: flat,
                    text: chunk.to_string(),
                    annotation,
                });
                local += chunk.len() as u32;
                flat += chunk.len();
            }
        }

        runs
    }
}

impl Default for YrsDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentModel for YrsDocument {
    fn text_runs(&self) -> Vec<TextRun> {
        let txn = self.doc.transact();
        self.runs_in(&txn)
    }

    fn dispatch(&self, mutation: Mutation) -> Result<(), DocumentError> {
        if mutation.is_empty() {
            return Ok(());
        }
        let origin = mutation.origin().to_bytes()?;

        // Plan against block lengths first so a bad step rejects the whole
        // mutation before a write transaction is opened.
        let planned_lengths: Vec<u32> = {
            let txn = self.doc.transact();
            self.blocks(&txn).iter().map(|block| block.len).collect()
        };
        let mut lengths = planned_lengths.clone();
        let ops = plan_steps(&mut lengths, mutation.steps())?;

        let mut txn = self
            .doc
            .try_transact_mut_with(origin.as_slice())
            .map_err(|error| DocumentError::Busy(format!("{error:?}")))?;
        let blocks = self.blocks(&txn);
        if blocks.iter().map(|block| block.len).ne(planned_lengths.iter().copied()) {
            return Err(DocumentError::Busy("document changed while planning".into()));
        }

        for op in ops {
            match op {
                PlannedOp::Format { block, index, len, attrs } => {
                    blocks[block].text.format(&mut txn, index, len, attrs);
                }
                PlannedOp::Insert { block, index, text, attrs } => {
                    blocks[block].text.insert_with_attributes(&mut txn, index, &text, attrs);
                }
                PlannedOp::Remove { block, index, len } => {
                    blocks[block].text.remove_range(&mut txn, index, len);
                }
            }
        }

        Ok(())
    }

    fn coords_at_position(&self, pos: u32) -> Option<ScreenCoords> {
        self.layout.coords_at(&self.block_snapshots(), pos)
    }

    fn position_at_coords(&self, point: ScreenPoint) -> Option<u32> {
        self.layout.position_at(&self.block_snapshots(), point)
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}

fn block_text<T: ReadTxn>(txn: &T, text: &XmlTextRef) -> String {
    text.diff(txn, YChange::identity)
        .into_iter()
        .filter_map(|diff| match diff.insert {
            Out::Any(Any::String(chunk)) => Some(chunk.to_string()),
            _ => None,
        })
        .collect()
}

fn read_annotation(attrs: &Attrs) -> Option<SuggestionAnnotation> {
    AnnotationKind::ALL.iter().find_map(|kind| match attrs.get(kind.attribute_key()) {
        Some(Any::String(json)) => match serde_json::from_str::<SuggestionAnnotation>(json) {
            Ok(annotation) => Some(annotation),
            Err(error) => {
                warn!(%error, key = kind.attribute_key(), "ignoring malformed annotation attribute");
                None
            }
        },
        _ => None,
    })
}

fn annotation_attrs(annotation: &SuggestionAnnotation) -> Result<Attrs, DocumentError> {
    let json = serde_json::to_string(annotation)?;
    Ok(HashMap::from([
        (Arc::from(annotation.kind.attribute_key()), Any::String(json.into())),
        (Arc::from(annotation.kind.opposite().attribute_key()), Any::Null),
    ]))
}

fn cleared_attrs(kinds: &[AnnotationKind]) -> Attrs {
    kinds.iter().map(|kind| (Arc::from(kind.attribute_key()), Any::Null)).collect()
}

fn doc_size(lengths: &[u32]) -> u32 {
    lengths.iter().map(|len| len + 2).sum()
}

/// Per-block `(block, local index, len)` pieces of the tree range `from..to`.
fn range_segments(
    lengths: &[u32],
    from: u32,
    to: u32,
) -> Result<Vec<(usize, u32, u32)>, DocumentError> {
    let size = doc_size(lengths);
    if from > to {
        return Err(DocumentError::InvalidRange { from, to });
    }
    if to > size {
        return Err(DocumentError::PositionOutOfBounds { pos: to, size });
    }

    let mut segments = Vec::new();
    let mut start = 1u32;
    for (block, len) in lengths.iter().copied().enumerate() {
        let lo = from.max(start);
        let hi = to.min(start + len);
        if lo < hi {
            segments.push((block, lo - start, hi - lo));
        }
        start += len + 2;
    }
    Ok(segments)
}

/// Block and local index for an insertion at tree position `at`.
fn locate_insert(lengths: &[u32], at: u32) -> Result<(usize, u32), DocumentError> {
    let mut start = 1u32;
    for (block, len) in lengths.iter().copied().enumerate() {
        if at >= start && at <= start + len {
            return Ok((block, at - start));
        }
        start += len + 2;
    }
    Err(DocumentError::PositionOutOfBounds { pos: at, size: doc_size(lengths) })
}

fn plan_steps(
    lengths: &mut [u32],
    steps: &[MutationStep],
) -> Result<Vec<PlannedOp>, DocumentError> {
    let mut ops = Vec::new();

    for step in steps {
        match step {
            MutationStep::MarkRange { from, to, annotation } => {
                let attrs = annotation_attrs(annotation)?;
                for (block, index, len) in range_segments(lengths, *from, *to)? {
                    ops.push(PlannedOp::Format { block, index, len, attrs: attrs.clone() });
                }
            }
            MutationStep::RemoveMark { from, to, kind } => {
                let attrs = cleared_attrs(&[*kind]);
                for (block, index, len) in range_segments(lengths, *from, *to)? {
                    ops.push(PlannedOp::Format { block, index, len, attrs: attrs.clone() });
                }
            }
            MutationStep::InsertText { at, text, annotation } => {
                if text.is_empty() {
                    continue;
                }
                let (block, index) = locate_insert(lengths, *at)?;
                // Plain text must not inherit a neighbouring annotation.
                let attrs = match annotation {
                    Some(annotation) => annotation_attrs(annotation)?,
                    None => cleared_attrs(&AnnotationKind::ALL),
                };
                lengths[block] += text.len() as u32;
                ops.push(PlannedOp::Insert { block, index, text: text.clone(), attrs });
            }
            MutationStep::DeleteRange { from, to } => {
                for (block, index, len) in range_segments(lengths, *from, *to)? {
                    lengths[block] -= len;
                    ops.push(PlannedOp::Remove { block, index, len });
                }
            }
        }
    }

    Ok(ops)
}
