// Typed decode of streamed JSON envelopes.
//
// The transport interleaves several envelope shapes. Each payload is probed
// in a fixed priority order; anything that matches no shape is surfaced as
// `Envelope::Unrecognized` so the caller can log it. Array items that fail to
// decode are kept as `MalformedItem`s, never dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One argument delta for a streamed tool call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolCallChunk {
    /// Present on the first chunk of a call; absent on continuations.
    pub id: Option<String>,
    pub name: Option<String>,
    pub args: String,
    pub index: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ToolCallChunk {
    /// A chunk that introduces a call carries both its id and its name.
    pub fn starts_call(&self) -> bool {
        matches!((&self.id, &self.name), (Some(id), Some(name)) if !id.is_empty() && !name.is_empty())
    }
}

/// An array item that did not decode into its expected shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedItem {
    /// Position of the item in its array.
    pub index: usize,
    pub error: String,
}

/// One item of a content-array envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    Text { text: String },
    ToolUse { id: Option<String>, name: Option<String>, partial_json: Option<String> },
    /// An item whose `type` is not understood.
    Unsupported { kind: String },
    Malformed(MalformedItem),
}

#[derive(Debug, Deserialize)]
struct RawContentItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    partial_json: Option<String>,
}

impl From<RawContentItem> for ContentItem {
    fn from(raw: RawContentItem) -> Self {
        match raw.kind.as_str() {
            "text" => Self::Text { text: raw.text.unwrap_or_default() },
            "tool_use" => {
                Self::ToolUse { id: raw.id, name: raw.name, partial_json: raw.partial_json }
            }
            _ => Self::Unsupported { kind: raw.kind },
        }
    }
}

/// A decoded stream envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    ToolCallChunks { chunks: Vec<ToolCallChunk>, malformed: Vec<MalformedItem> },
    Content(Vec<ContentItem>),
    ToolResult { tool_call_id: String, content: String },
    Text(String),
    /// Valid JSON that matches no known shape.
    Unrecognized(Value),
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("envelope is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Envelope {
    pub fn tool_call_chunks(chunks: Vec<ToolCallChunk>) -> Self {
        Self::ToolCallChunks { chunks, malformed: Vec::new() }
    }

    /// Array items in this envelope that failed to decode.
    pub fn malformed_items(&self) -> Vec<&MalformedItem> {
        match self {
            Self::ToolCallChunks { malformed, .. } => malformed.iter().collect(),
            Self::Content(items) => items
                .iter()
                .filter_map(|item| match item {
                    ContentItem::Malformed(malformed) => Some(malformed),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Decode one frame payload.
    ///
    /// Shapes are tested in priority order: tool-call chunks, content array,
    /// tool result, plain string content.
    pub fn decode(payload: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(payload)?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        let map = match value {
            Value::Object(map) => map,
            other => return Self::Unrecognized(other),
        };

        if let Some(raw_chunks) = map.get("tool_call_chunks").and_then(Value::as_array) {
            let mut chunks = Vec::with_capacity(raw_chunks.len());
            let mut malformed = Vec::new();
            for (index, chunk) in raw_chunks.iter().enumerate() {
                match serde_json::from_value::<ToolCallChunk>(chunk.clone()) {
                    Ok(chunk) => chunks.push(chunk),
                    Err(error) => malformed.push(MalformedItem { index, error: error.to_string() }),
                }
            }
            return Self::ToolCallChunks { chunks, malformed };
        }

        if let Some(items) = map.get("content").and_then(Value::as_array) {
            let items = items
                .iter()
                .enumerate()
                .map(|(index, item)| match serde_json::from_value::<RawContentItem>(item.clone()) {
                    Ok(raw) => ContentItem::from(raw),
                    Err(error) => {
                        ContentItem::Malformed(MalformedItem { index, error: error.to_string() })
                    }
                })
                .collect();
            return Self::Content(items);
        }

        if let (Some(tool_call_id), Some(content)) =
            (map.get("tool_call_id").and_then(Value::as_str), map.get("content"))
        {
            let content = match content {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            return Self::ToolResult { tool_call_id: tool_call_id.to_string(), content };
        }

        if let Some(text) = map.get("content").and_then(Value::as_str) {
            return Self::Text(text.to_string());
        }

        Self::Unrecognized(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_tool_call_chunks() {
        let envelope = Envelope::decode(
            r#"{"tool_call_chunks":[{"id":"t1","name":"suggest_diff","args":"{\"sug","index":0,"type":"tool_call_chunk"}]}"#,
        )
        .expect("envelope should decode");

        let Envelope::ToolCallChunks { chunks, malformed } = envelope else {
            panic!("expected tool call chunks");
        };
        assert!(malformed.is_empty());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id.as_deref(), Some("t1"));
        assert_eq!(chunks[0].args, r#"{"sug"#);
        assert_eq!(chunks[0].kind.as_deref(), Some("tool_call_chunk"));
        assert!(chunks[0].starts_call());
    }

    #[test]
    fn continuation_chunk_does_not_start_a_call() {
        let chunk: ToolCallChunk =
            serde_json::from_value(json!({"args": "gestions\":[]}", "index": 0}))
                .expect("chunk should decode");
        assert!(!chunk.starts_call());
        let empty_id: ToolCallChunk =
            serde_json::from_value(json!({"id": "", "name": "", "args": ""}))
                .expect("chunk should decode");
        assert!(!empty_id.starts_call());
    }

    #[test]
    fn decodes_content_items() {
        let envelope = Envelope::from_value(json!({
            "content": [
                {"type": "text", "text": "Here are my edits"},
                {"type": "tool_use", "id": "t2", "name": "suggest_diff", "partial_json": ""},
                {"type": "image", "source": {}}
            ]
        }));

        assert_eq!(
            envelope,
            Envelope::Content(vec![
                ContentItem::Text { text: "Here are my edits".into() },
                ContentItem::ToolUse {
                    id: Some("t2".into()),
                    name: Some("suggest_diff".into()),
                    partial_json: Some(String::new()),
                },
                ContentItem::Unsupported { kind: "image".into() },
            ])
        );
    }

    #[test]
    fn decodes_tool_result_before_string_fallback() {
        let envelope = Envelope::from_value(json!({"tool_call_id": "t1", "content": "applied"}));
        assert_eq!(
            envelope,
            Envelope::ToolResult { tool_call_id: "t1".into(), content: "applied".into() }
        );
    }

    #[test]
    fn non_string_tool_result_is_reserialized() {
        let envelope = Envelope::from_value(json!({"tool_call_id": "t1", "content": {"ok": true}}));
        assert_eq!(
            envelope,
            Envelope::ToolResult { tool_call_id: "t1".into(), content: r#"{"ok":true}"#.into() }
        );
    }

    #[test]
    fn falls_back_to_plain_string_content() {
        assert_eq!(
            Envelope::from_value(json!({"content": "hello"})),
            Envelope::Text("hello".into())
        );
    }

    #[test]
    fn tool_call_chunks_win_over_content() {
        let envelope = Envelope::from_value(json!({
            "tool_call_chunks": [{"args": "x"}],
            "content": "ignored"
        }));
        assert!(matches!(envelope, Envelope::ToolCallChunks { .. }));
    }

    #[test]
    fn undecodable_chunks_are_kept_as_malformed() {
        let envelope = Envelope::from_value(json!({
            "tool_call_chunks": [{"id": "t1", "name": "suggest_diff", "args": 42}, {"args": "ok"}]
        }));

        let Envelope::ToolCallChunks { chunks, malformed } = &envelope else {
            panic!("expected tool call chunks");
        };
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].args, "ok");
        assert_eq!(malformed.len(), 1);
        assert_eq!(malformed[0].index, 0);
        assert!(malformed[0].error.contains("invalid type"));
        assert_eq!(envelope.malformed_items().len(), 1);
    }

    #[test]
    fn undecodable_content_items_keep_their_place() {
        let envelope = Envelope::from_value(json!({
            "content": [{"type": "text", "text": 7}, {"type": "text", "text": "fine"}]
        }));

        let Envelope::Content(items) = &envelope else {
            panic!("expected content items");
        };
        assert!(matches!(&items[0], ContentItem::Malformed(item) if item.index == 0));
        assert_eq!(items[1], ContentItem::Text { text: "fine".into() });
        assert_eq!(envelope.malformed_items().len(), 1);
        assert!(Envelope::from_value(json!({"content": "plain"})).malformed_items().is_empty());
    }

    #[test]
    fn unknown_shapes_are_unrecognized() {
        assert!(matches!(
            Envelope::from_value(json!({"usage": {"tokens": 3}})),
            Envelope::Unrecognized(_)
        ));
        assert!(matches!(Envelope::from_value(json!([1, 2])), Envelope::Unrecognized(_)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(Envelope::decode("{\"content\":"), Err(EnvelopeError::Json(_))));
    }
}
