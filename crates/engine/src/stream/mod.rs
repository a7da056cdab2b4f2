// Async decoder from a raw response body to typed envelopes.
//
// Wraps a chunk stream (an HTTP body, a file replay, a test fixture),
// re-frames it with `FrameBuffer` and decodes each frame payload. A bad
// envelope is logged and skipped. A transport error ends the stream.

pub mod accumulator;

use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use redline_common::protocol::envelope::Envelope;
use redline_common::protocol::frame::FrameBuffer;
use tracing::{debug, warn};

use crate::error::SuggestError;

pub struct StreamDecoder<S> {
    stream: Pin<Box<S>>,
    frames: FrameBuffer,
    pending: VecDeque<Envelope>,
    exhausted: bool,
    skipped: usize,
}

impl<S, B, E> StreamDecoder<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: Box::pin(stream),
            frames: FrameBuffer::new(),
            pending: VecDeque::new(),
            exhausted: false,
            skipped: 0,
        }
    }

    /// Next decoded envelope, or `None` once the stream has ended.
    ///
    /// A transport error is yielded once; every later call returns `None`.
    pub async fn next_event(&mut self) -> Option<Result<Envelope, SuggestError>> {
        loop {
            if let Some(envelope) = self.pending.pop_front() {
                return Some(Ok(envelope));
            }
            if self.exhausted {
                return None;
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => {
                    let payloads = self.frames.push(chunk.as_ref());
                    self.enqueue(payloads);
                }
                Some(Err(error)) => {
                    self.exhausted = true;
                    warn!(%error, "stream read failed");
                    return Some(Err(SuggestError::transport(error.to_string())));
                }
                None => {
                    self.exhausted = true;
                    let trailing = std::mem::take(&mut self.frames).finish();
                    self.enqueue(trailing.into_iter().collect());
                }
            }
        }
    }

    /// Number of malformed or unrecognized envelopes, plus malformed items
    /// inside decoded envelopes, skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn enqueue(&mut self, payloads: Vec<String>) {
        for payload in payloads {
            match Envelope::decode(&payload) {
                Ok(Envelope::Unrecognized(value)) => {
                    self.skipped += 1;
                    debug!(%value, "ignoring unrecognized envelope");
                }
                Ok(envelope) => {
                    for item in envelope.malformed_items() {
                        self.skipped += 1;
                        warn!(index = item.index, error = %item.error, "skipping malformed item");
                    }
                    self.pending.push_back(envelope);
                }
                Err(error) => {
                    self.skipped += 1;
                    let error = SuggestError::from(error);
                    warn!(%error, payload_len = payload.len(), "skipping malformed envelope");
                }
            }
        }
    }
}
