// Error taxonomy for the suggestion pipeline.
//
// Every per-item failure is isolated to that item; only `Transport` ends a
// streaming session.

use redline_common::crdt::origin::OriginTagCodecError;
use redline_common::protocol::envelope::EnvelopeError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SuggestError {
    /// A single malformed envelope; the stream continues.
    #[error("failed to decode stream envelope: {0}")]
    StreamDecode(#[from] EnvelopeError),

    /// The anchor text does not occur in the document.
    #[error("anchor not found in document: {anchor:?}")]
    AnchorNotFound { anchor: String },

    /// A flat offset could not be mapped onto a tree position.
    #[error("flat offset {offset} could not be mapped to a document position")]
    RangeMapping { offset: usize },

    /// Empty range with empty replacement; nothing to do.
    #[error("suggestion is an empty no-op")]
    EmptyNoOp,

    /// The annotation being resolved is no longer in the document.
    #[error("suggestion span {0} not found in document")]
    SpanNotFound(Uuid),

    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Non-2xx response or read failure on the AI transport.
    #[error("transport error: {message}")]
    Transport { status: Option<u16>, message: String },
}

impl SuggestError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { status: None, message: message.into() }
    }

    /// Stable machine-readable code, used in CLI and session reports.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::StreamDecode(_) => "STREAM_DECODE_ERROR",
            Self::AnchorNotFound { .. } => "ANCHOR_NOT_FOUND",
            Self::RangeMapping { .. } => "RANGE_MAPPING_ERROR",
            Self::EmptyNoOp => "EMPTY_NO_OP_SUGGESTION",
            Self::SpanNotFound(_) => "SPAN_NOT_FOUND",
            Self::Document(_) => "DOCUMENT_ERROR",
            Self::Transport { .. } => "TRANSPORT_ERROR",
        }
    }

    /// Whether this error ends a streaming session.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Failures raised by a document model while applying a mutation.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("position {pos} is outside the document (size {size})")]
    PositionOutOfBounds { pos: u32, size: u32 },
    #[error("range {from}..{to} is invalid")]
    InvalidRange { from: u32, to: u32 },
    #[error("failed to encode mutation origin: {0}")]
    Origin(#[from] OriginTagCodecError),
    #[error("failed to encode annotation: {0}")]
    Annotation(#[from] serde_json::Error),
    #[error("document is busy: {0}")]
    Busy(String),
    #[error("failed to apply document update: {0}")]
    Update(String),
}
