// Event-stream framing for streamed AI responses.
//
// Frames are separated by a blank line. Network writes may split a frame, a
// delimiter, or even a multi-byte UTF-8 code point at any byte, so the
// carry-over buffer works on raw bytes and only decodes complete frames.

/// Sentinel payload some providers send after the final envelope.
pub const DONE_SENTINEL: &str = "[DONE]";

const DATA_PREFIX: &str = "data:";

/// Incremental splitter from raw chunks to frame payloads.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    carry: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk; returns the payloads of every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some((frame_end, delimiter_len)) = find_delimiter(&self.carry) {
            let frame: Vec<u8> = self.carry.drain(..frame_end + delimiter_len).collect();
            if let Some(payload) = extract_payload(&frame[..frame_end]) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing frame that was never terminated by a blank line.
    pub fn finish(self) -> Option<String> {
        if self.carry.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        extract_payload(&self.carry)
    }

    /// Bytes buffered but not yet part of a complete frame.
    pub fn pending_len(&self) -> usize {
        self.carry.len()
    }
}

/// Locate the first blank-line delimiter: `\n\n`, `\r\n\r\n`, or a mix.
fn find_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < buf.len() {
        if buf[i] == b'\n' {
            let rest = &buf[i + 1..];
            if rest.first() == Some(&b'\n') {
                return Some((i, 2));
            }
            if rest.starts_with(b"\r\n") {
                return Some((i, 3));
            }
        }
        i += 1;
    }
    None
}

/// Extract the data payload of one frame, or `None` when it carries no data.
fn extract_payload(frame: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(frame);
    let mut data_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(value) = line.strip_prefix(DATA_PREFIX) {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        }
        // `event:`, `id:`, `retry:` and `:` comment lines carry no payload.
    }

    if data_lines.is_empty() {
        return None;
    }

    let payload = data_lines.join("\n");
    if payload.trim() == DONE_SENTINEL {
        return None;
    }
    Some(payload)
}
