// Core domain types shared across all redline crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crdt::origin::AuthorType;

/// One chat message assembled from a streamed response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    /// Append-only while streaming; never reordered.
    pub segments: Vec<MessageSegment>,
}

impl Message {
    pub fn new(role: Role) -> Self {
        Self { id: Uuid::new_v4(), role, segments: Vec::new() }
    }

    /// Concatenated text of every text segment, in order.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                MessageSegment::Text(text) => Some(text.content.as_str()),
                MessageSegment::ToolCall(_) => None,
            })
            .collect()
    }

    pub fn tool_calls(&self) -> impl Iterator<Item = &ToolCallSegment> {
        self.segments.iter().filter_map(|segment| match segment {
            MessageSegment::ToolCall(call) => Some(call),
            MessageSegment::Text(_) => None,
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageSegment {
    Text(TextSegment),
    ToolCall(ToolCallSegment),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextSegment {
    pub content: String,
}

/// A tool invocation whose arguments arrive as growing raw JSON text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallSegment {
    pub id: String,
    pub name: String,
    /// Raw argument text; it is only valid JSON once the call has fully arrived.
    pub data: String,
    pub result: Option<String>,
    pub is_open: bool,
}

impl ToolCallSegment {
    pub fn new(id: impl Into<String>, name: impl Into<String>, data: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), data: data.into(), result: None, is_open: true }
    }

    /// Opportunistic parse of the buffered arguments.
    ///
    /// Returns `None` while the JSON is still partial or when it is not a
    /// suggestions payload at all.
    pub fn parse_suggestions(&self) -> Option<SuggestionsPayload> {
        if self.data.trim().is_empty() {
            return None;
        }
        serde_json::from_str(&self.data).ok()
    }
}

/// An edit identified by its surrounding context rather than by coordinates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Suggestion {
    pub text_to_replace: String,
    pub text_replacement: String,
    pub reason: String,
    pub text_before: String,
    pub text_after: String,
}

impl Suggestion {
    /// The full context string that must be located in the document.
    pub fn anchor(&self) -> String {
        let mut anchor = String::with_capacity(
            self.text_before.len() + self.text_to_replace.len() + self.text_after.len(),
        );
        anchor.push_str(&self.text_before);
        anchor.push_str(&self.text_to_replace);
        anchor.push_str(&self.text_after);
        anchor
    }
}

/// Tool-call arguments carrying a batch of suggestions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestionsPayload {
    pub suggestions: Vec<Suggestion>,
}

/// A resolved range in the document's tree-position space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DocumentRange {
    pub from: u32,
    pub to: u32,
}

impl DocumentRange {
    pub fn new(from: u32, to: u32) -> Self {
        Self { from, to }
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }

    pub fn contains(&self, pos: u32) -> bool {
        pos >= self.from && pos < self.to
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    Insert,
    Delete,
}

impl AnnotationKind {
    /// Formatting attribute name used to store this kind on text.
    pub const fn attribute_key(self) -> &'static str {
        match self {
            Self::Insert => "suggestion_insert",
            Self::Delete => "suggestion_delete",
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Self::Insert => Self::Delete,
            Self::Delete => Self::Insert,
        }
    }

    pub const ALL: [AnnotationKind; 2] = [AnnotationKind::Insert, AnnotationKind::Delete];
}

/// Who proposed an edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorMeta {
    pub author_id: String,
    pub author_type: AuthorType,
}

impl AuthorMeta {
    pub fn agent(author_id: impl Into<String>) -> Self {
        Self { author_id: author_id.into(), author_type: AuthorType::Agent }
    }
}

/// Review annotation attached to a span of document text.
///
/// A delete annotation flags existing text for removal without removing it;
/// an insert annotation flags newly proposed text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestionAnnotation {
    /// Identity of this annotation instance.
    pub id: Uuid,
    /// Shared by the insert/delete pair produced from one suggestion.
    pub suggestion_id: Uuid,
    pub kind: AnnotationKind,
    pub author: AuthorMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
