// One streamed suggestion session: decode → accumulate → apply.
//
// A tool call is applied the first time its buffered arguments parse as a
// complete suggestions payload; later chunks for the same call are ignored.
// Cancellation stops reading and discards the partial message. Mutations
// already dispatched stay in the document. Every run starts clean: tool-call
// ids and the cancellation token belong to one run only.

use std::collections::HashSet;
use std::fmt::Display;

use futures_util::Stream;
use redline_common::types::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::document::DocumentModel;
use crate::error::SuggestError;
use crate::stream::accumulator::MessageAccumulator;
use crate::stream::StreamDecoder;
use crate::suggest::{ApplyReport, SuggestionApplier};

#[derive(Debug)]
pub enum SessionOutcome {
    /// The stream ended normally.
    Completed { message: Message, report: ApplyReport },
    /// The session was cancelled; the partial message is discarded.
    Cancelled { report: ApplyReport },
    /// The transport failed; already-applied suggestions stay in place.
    Failed { error: SuggestError, report: ApplyReport },
}

impl SessionOutcome {
    pub fn report(&self) -> &ApplyReport {
        match self {
            Self::Completed { report, .. }
            | Self::Cancelled { report }
            | Self::Failed { report, .. } => report,
        }
    }
}

pub struct SuggestionSession {
    applier: SuggestionApplier,
    /// Tool names whose calls carry suggestions; empty accepts any.
    tool_names: Vec<String>,
    cancel: CancellationToken,
}

impl SuggestionSession {
    pub fn new(applier: SuggestionApplier) -> Self {
        Self {
            applier,
            tool_names: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_tool_names(mut self, tool_names: Vec<String>) -> Self {
        self.tool_names = tool_names;
        self
    }

    /// Token that cancels the next run. Fetch it before calling `run`; each
    /// run takes the token and leaves a fresh one behind.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run<S, B, E, D>(&mut self, stream: S, doc: &D) -> SessionOutcome
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
        D: DocumentModel + ?Sized,
    {
        let cancel = std::mem::replace(&mut self.cancel, CancellationToken::new());
        let mut decoder = StreamDecoder::new(stream);
        let mut accumulator = MessageAccumulator::new();
        let mut applied_calls = HashSet::new();
        let mut report = ApplyReport::default();

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(applied = report.applied.len(), "suggestion session cancelled");
                    return SessionOutcome::Cancelled { report };
                }
                event = decoder.next_event() => event,
            };

            match event {
                None => break,
                Some(Ok(envelope)) => {
                    for call_id in accumulator.apply(&envelope) {
                        if applied_calls.contains(&call_id) {
                            continue;
                        }
                        if self.try_apply(doc, &accumulator, &call_id, &mut report) {
                            applied_calls.insert(call_id);
                        }
                    }
                }
                Some(Err(error)) => {
                    warn!(%error, applied = report.applied.len(), "suggestion session failed");
                    return SessionOutcome::Failed { error, report };
                }
            }
        }

        info!(
            applied = report.applied.len(),
            dropped = report.dropped.len(),
            skipped_envelopes = decoder.skipped(),
            "suggestion session completed"
        );
        SessionOutcome::Completed { message: accumulator.finish(), report }
    }

    /// Apply the call's payload if it is complete. Returns whether it was.
    fn try_apply<D>(
        &self,
        doc: &D,
        accumulator: &MessageAccumulator,
        call_id: &str,
        report: &mut ApplyReport,
    ) -> bool
    where
        D: DocumentModel + ?Sized,
    {
        let Some(call) = accumulator.tool_call(call_id) else {
            return false;
        };
        if !self.tool_names.is_empty() && !self.tool_names.iter().any(|name| name == &call.name) {
            return false;
        }
        let Some(payload) = call.parse_suggestions() else {
            return false;
        };

        debug!(call_id, suggestions = payload.suggestions.len(), "tool call payload complete");
        report.merge(self.applier.apply_all(doc, &payload.suggestions));
        true
    }
}
