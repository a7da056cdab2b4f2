// Folds decoded envelopes into the segments of one in-flight message.
//
// The segment operations are pure: each takes the current list and returns a
// new one, so a reader holding the previous list never sees a half-built
// segment. `MessageAccumulator` owns one message for the life of one stream.

use redline_common::protocol::envelope::{ContentItem, Envelope, ToolCallChunk};
use redline_common::types::{Message, MessageSegment, Role, TextSegment, ToolCallSegment};
use tracing::debug;

// ── Segment operations ─────────────────────────────────────────────

/// Extend the trailing text segment, or push a new one.
pub fn append_text(segments: &[MessageSegment], text: &str) -> Vec<MessageSegment> {
    let mut next = segments.to_vec();
    if text.is_empty() {
        return next;
    }
    match next.last_mut() {
        Some(MessageSegment::Text(last)) => last.content.push_str(text),
        _ => next.push(MessageSegment::Text(TextSegment { content: text.to_string() })),
    }
    next
}

/// Push a new open tool-call segment.
pub fn begin_tool_call(
    segments: &[MessageSegment],
    id: &str,
    name: &str,
    initial_args: &str,
) -> Vec<MessageSegment> {
    let mut next = segments.to_vec();
    next.push(MessageSegment::ToolCall(ToolCallSegment::new(id, name, initial_args)));
    next
}

/// Append an argument delta to the current tool call.
///
/// The target is `current_id` when it names an existing segment, else the
/// most recently pushed tool call. With no tool call at all the delta is
/// dropped.
pub fn continue_tool_call(
    segments: &[MessageSegment],
    current_id: Option<&str>,
    delta: &str,
) -> Vec<MessageSegment> {
    let mut next = segments.to_vec();
    let target = current_id
        .and_then(|id| position_of(&next, id))
        .or_else(|| last_tool_call(&next));

    match target.and_then(|index| next.get_mut(index)) {
        Some(MessageSegment::ToolCall(call)) => call.data.push_str(delta),
        _ => debug!(delta_len = delta.len(), "dropping tool-call delta with no open call"),
    }
    next
}

/// Set the result of the tool call with `tool_call_id` and close it.
pub fn attach_result(
    segments: &[MessageSegment],
    tool_call_id: &str,
    content: &str,
) -> Vec<MessageSegment> {
    let mut next = segments.to_vec();
    match position_of(&next, tool_call_id).and_then(|index| next.get_mut(index)) {
        Some(MessageSegment::ToolCall(call)) => {
            call.result = Some(content.to_string());
            call.is_open = false;
        }
        _ => debug!(tool_call_id, "dropping tool result for unknown call"),
    }
    next
}

fn position_of(segments: &[MessageSegment], id: &str) -> Option<usize> {
    segments
        .iter()
        .position(|segment| matches!(segment, MessageSegment::ToolCall(call) if call.id == id))
}

fn last_tool_call(segments: &[MessageSegment]) -> Option<usize> {
    segments.iter().rposition(|segment| matches!(segment, MessageSegment::ToolCall(_)))
}

// ── Accumulator ────────────────────────────────────────────────────

/// Owned accumulation state for one streamed assistant message.
#[derive(Debug, Clone)]
pub struct MessageAccumulator {
    message: Message,
    current_tool_call: Option<String>,
}

impl Default for MessageAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageAccumulator {
    pub fn new() -> Self {
        Self { message: Message::new(Role::Assistant), current_tool_call: None }
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Id of the tool call currently receiving continuation chunks.
    pub fn current_tool_call(&self) -> Option<&str> {
        self.current_tool_call.as_deref()
    }

    pub fn tool_call(&self, id: &str) -> Option<&ToolCallSegment> {
        self.message.tool_calls().find(|call| call.id == id)
    }

    /// Fold one envelope into the message.
    ///
    /// Returns the ids of tool calls that were created or whose `data` grew,
    /// in first-touched order.
    pub fn apply(&mut self, envelope: &Envelope) -> Vec<String> {
        let mut changed = Vec::new();

        match envelope {
            Envelope::ToolCallChunks { chunks, .. } => {
                for chunk in chunks {
                    let touched = self.apply_chunk(chunk);
                    push_unique(&mut changed, touched);
                }
            }
            Envelope::Content(items) => {
                for item in items {
                    match item {
                        ContentItem::Text { text } => self.append_text(text),
                        ContentItem::ToolUse { id, name, partial_json } => {
                            let chunk = ToolCallChunk {
                                id: id.clone(),
                                name: name.clone(),
                                args: partial_json.clone().unwrap_or_default(),
                                ..ToolCallChunk::default()
                            };
                            let touched = self.apply_chunk(&chunk);
                            push_unique(&mut changed, touched);
                        }
                        ContentItem::Unsupported { kind } => {
                            debug!(kind = kind.as_str(), "ignoring unsupported content item");
                        }
                        // Logged and counted by the stream decoder.
                        ContentItem::Malformed(_) => {}
                    }
                }
            }
            Envelope::ToolResult { tool_call_id, content } => {
                self.message.segments = attach_result(&self.message.segments, tool_call_id, content);
            }
            Envelope::Text(text) => self.append_text(text),
            Envelope::Unrecognized(_) => {}
        }

        changed
    }

    /// Freeze the message: every tool call is closed.
    pub fn finish(mut self) -> Message {
        for segment in &mut self.message.segments {
            if let MessageSegment::ToolCall(call) = segment {
                call.is_open = false;
            }
        }
        self.message
    }

    fn append_text(&mut self, text: &str) {
        self.message.segments = append_text(&self.message.segments, text);
    }

    fn apply_chunk(&mut self, chunk: &ToolCallChunk) -> Option<String> {
        let segments = &self.message.segments;

        match chunk.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) if position_of(segments, id).is_some() => {
                self.current_tool_call = Some(id.to_string());
                if chunk.args.is_empty() {
                    return None;
                }
                self.message.segments = continue_tool_call(segments, Some(id), &chunk.args);
                Some(id.to_string())
            }
            Some(id) => {
                let name = chunk.name.as_deref().unwrap_or_default();
                self.message.segments = begin_tool_call(segments, id, name, &chunk.args);
                self.current_tool_call = Some(id.to_string());
                Some(id.to_string())
            }
            None => {
                if chunk.args.is_empty() {
                    return None;
                }
                let target = self
                    .current_tool_call
                    .as_deref()
                    .and_then(|id| position_of(segments, id))
                    .or_else(|| last_tool_call(segments))
                    .and_then(|index| match &segments[index] {
                        MessageSegment::ToolCall(call) => Some(call.id.clone()),
                        MessageSegment::Text(_) => None,
                    });
                self.message.segments =
                    continue_tool_call(segments, target.as_deref(), &chunk.args);
                target
            }
        }
    }
}

fn push_unique(changed: &mut Vec<String>, touched: Option<String>) {
    if let Some(id) = touched {
        if !changed.contains(&id) {
            changed.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: Option<&str>, name: Option<&str>, args: &str) -> ToolCallChunk {
        ToolCallChunk {
            id: id.map(str::to_string),
            name: name.map(str::to_string),
            args: args.to_string(),
            ..ToolCallChunk::default()
        }
    }

    fn data_of(accumulator: &MessageAccumulator, id: &str) -> String {
        accumulator.tool_call(id).map(|call| call.data.clone()).unwrap_or_default()
    }

    // ── Pure operations ────────────────────────────────────────────

    #[test]
    fn append_text_extends_trailing_text_segment() {
        let segments = append_text(&[], "Hel");
        let segments = append_text(&segments, "lo");
        assert_eq!(segments, vec![MessageSegment::Text(TextSegment { content: "Hello".into() })]);
    }

    #[test]
    fn append_text_after_tool_call_starts_new_segment() {
        let segments = begin_tool_call(&append_text(&[], "a"), "t1", "suggest_diff", "");
        let segments = append_text(&segments, "b");
        assert_eq!(segments.len(), 3);
        assert!(matches!(&segments[2], MessageSegment::Text(text) if text.content == "b"));
    }

    #[test]
    fn operations_leave_input_untouched() {
        let original = begin_tool_call(&[], "t1", "suggest_diff", "{");
        let next = continue_tool_call(&original, Some("t1"), "}");
        assert!(matches!(&original[0], MessageSegment::ToolCall(call) if call.data == "{"));
        assert!(matches!(&next[0], MessageSegment::ToolCall(call) if call.data == "{}"));
    }

    #[test]
    fn continue_without_current_id_targets_latest_tool_call() {
        let segments = begin_tool_call(&[], "t1", "a", "1");
        let segments = begin_tool_call(&segments, "t2", "b", "2");
        let segments = continue_tool_call(&segments, None, "x");
        assert!(matches!(&segments[0], MessageSegment::ToolCall(call) if call.data == "1"));
        assert!(matches!(&segments[1], MessageSegment::ToolCall(call) if call.data == "2x"));
    }

    #[test]
    fn continue_with_no_tool_call_drops_delta() {
        let segments = append_text(&[], "hi");
        let next = continue_tool_call(&segments, Some("missing"), "x");
        assert_eq!(next, segments);
    }

    #[test]
    fn attach_result_sets_result_and_closes() {
        let segments = begin_tool_call(&[], "t1", "search", "{}");
        let segments = attach_result(&segments, "t1", "ok");
        let MessageSegment::ToolCall(call) = &segments[0] else {
            panic!("expected tool call segment");
        };
        assert_eq!(call.result.as_deref(), Some("ok"));
        assert!(!call.is_open);
        assert_eq!(attach_result(&segments, "nope", "x"), segments);
    }

    // ── MessageAccumulator ────────────────────────────────────────

    #[test]
    fn split_arguments_concatenate_in_arrival_order() {
        let mut accumulator = MessageAccumulator::new();
        let first = Envelope::tool_call_chunks(vec![chunk(
            Some("t1"),
            Some("suggest_diff"),
            "{\"suggest",
        )]);
        let second = Envelope::tool_call_chunks(vec![chunk(None, None, "ions\":[]}")]);

        assert_eq!(accumulator.apply(&first), vec!["t1".to_string()]);
        assert_eq!(accumulator.apply(&second), vec!["t1".to_string()]);

        let call = accumulator.tool_call("t1").expect("tool call should exist");
        assert_eq!(call.data, "{\"suggestions\":[]}");
        let payload = call.parse_suggestions().expect("payload should parse");
        assert!(payload.suggestions.is_empty());
    }

    #[test]
    fn explicit_id_reselects_an_earlier_call() {
        let mut accumulator = MessageAccumulator::new();
        accumulator.apply(&Envelope::tool_call_chunks(vec![
            chunk(Some("t1"), Some("a"), "A"),
            chunk(Some("t2"), Some("b"), "B"),
        ]));
        assert_eq!(accumulator.current_tool_call(), Some("t2"));

        accumulator.apply(&Envelope::tool_call_chunks(vec![chunk(Some("t1"), None, "1")]));
        accumulator.apply(&Envelope::tool_call_chunks(vec![chunk(None, None, "2")]));

        assert_eq!(accumulator.current_tool_call(), Some("t1"));
        assert_eq!(data_of(&accumulator, "t1"), "A12");
        assert_eq!(data_of(&accumulator, "t2"), "B");
    }

    #[test]
    fn continuation_before_any_call_is_dropped() {
        let mut accumulator = MessageAccumulator::new();
        let changed = accumulator.apply(&Envelope::tool_call_chunks(vec![chunk(None, None, "x")]));
        assert!(changed.is_empty());
        assert!(accumulator.message().segments.is_empty());
    }

    #[test]
    fn content_items_mix_text_and_tool_use() {
        let mut accumulator = MessageAccumulator::new();
        let changed = accumulator.apply(&Envelope::Content(vec![
            ContentItem::Text { text: "Looking".into() },
            ContentItem::ToolUse {
                id: Some("tu1".into()),
                name: Some("suggest_diff".into()),
                partial_json: None,
            },
            ContentItem::ToolUse { id: None, name: None, partial_json: Some("{\"a\"".into()) },
            ContentItem::Unsupported { kind: "image".into() },
        ]));

        assert_eq!(changed, vec!["tu1".to_string()]);
        assert_eq!(accumulator.message().text(), "Looking");
        assert_eq!(data_of(&accumulator, "tu1"), "{\"a\"");
    }

    #[test]
    fn text_and_results_fold_into_message() {
        let mut accumulator = MessageAccumulator::new();
        accumulator.apply(&Envelope::Text("Hi ".into()));
        accumulator.apply(&Envelope::tool_call_chunks(vec![chunk(Some("t1"), Some("s"), "{}")]));
        accumulator.apply(&Envelope::ToolResult { tool_call_id: "t1".into(), content: "done".into() });
        accumulator.apply(&Envelope::Text("there".into()));

        let message = accumulator.finish();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.text(), "Hi there");
        let call = message.tool_calls().next().expect("tool call should exist");
        assert_eq!(call.result.as_deref(), Some("done"));
    }

    #[test]
    fn finish_closes_every_tool_call() {
        let mut accumulator = MessageAccumulator::new();
        accumulator.apply(&Envelope::tool_call_chunks(vec![
            chunk(Some("t1"), Some("a"), "{"),
            chunk(Some("t2"), Some("b"), "{"),
        ]));
        let message = accumulator.finish();
        assert!(message.tool_calls().all(|call| !call.is_open));
    }
}
