// Shared result type for commands that run a suggestion session.

use std::path::PathBuf;

use redline_engine::document::ydoc::YrsDocument;
use redline_engine::document::{render_redline, DocumentModel};
use redline_engine::error::SuggestError;
use redline_engine::session::SessionOutcome;
use redline_engine::suggest::{AppliedSuggestion, DroppedSuggestion};
use serde::Serialize;

use crate::output::{self, OutputFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub status: SessionStatus,
    pub applied: Vec<AppliedSuggestion>,
    pub dropped: Vec<DroppedSuggestion>,
    pub ambiguous: usize,
    /// Assistant prose streamed alongside the tool calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
    pub redline: String,
}

impl SessionSummary {
    /// Summarize a finished session; a transport failure is handed back
    /// separately so the command can still report partial progress.
    pub fn from_outcome(
        outcome: SessionOutcome,
        doc: &YrsDocument,
    ) -> (Self, Option<SuggestError>) {
        let (status, report, reply, error) = match outcome {
            SessionOutcome::Completed { message, report } => {
                let text = message.text();
                let reply = (!text.trim().is_empty()).then(|| text.trim().to_string());
                (SessionStatus::Completed, report, reply, None)
            }
            SessionOutcome::Cancelled { report } => (SessionStatus::Cancelled, report, None, None),
            SessionOutcome::Failed { error, report } => {
                (SessionStatus::Failed, report, None, Some(error))
            }
        };

        let summary = Self {
            status,
            ambiguous: report.ambiguous_count(),
            applied: report.applied,
            dropped: report.dropped,
            reply,
            saved_to: None,
            redline: render_redline(&doc.text_runs()),
        };
        (summary, error)
    }
}

/// Surface on stderr what the summary alone does not make obvious.
pub fn print_warnings(format: OutputFormat, summary: &SessionSummary) {
    if summary.status == SessionStatus::Cancelled {
        output::print_warning(
            format,
            "SESSION_CANCELLED",
            "session cancelled; suggestions applied before the interrupt were kept",
        );
    }
    if summary.ambiguous > 0 {
        output::print_warning(
            format,
            "ANCHOR_AMBIGUOUS",
            &format!(
                "{} suggestion(s) matched more than once; the first occurrence was used",
                summary.ambiguous
            ),
        );
    }
}

pub fn format_human(summary: &SessionSummary) -> String {
    let mut lines = Vec::new();
    let status = match summary.status {
        SessionStatus::Completed => "Completed",
        SessionStatus::Cancelled => "Cancelled",
        SessionStatus::Failed => "Failed",
    };
    let mut headline = format!("{status}: {} applied", summary.applied.len());
    if summary.ambiguous > 0 {
        headline.push_str(&format!(" ({} ambiguous)", summary.ambiguous));
    }
    headline.push_str(&format!(", {} dropped", summary.dropped.len()));
    lines.push(headline);

    for dropped in &summary.dropped {
        lines.push(format!(
            "  #{} {}: {}",
            dropped.index, dropped.code, dropped.suggestion.text_to_replace
        ));
    }
    if let Some(reply) = &summary.reply {
        lines.push(format!("  Reply: {reply}"));
    }
    if let Some(path) = &summary.saved_to {
        lines.push(format!("  Saved to {}", path.display()));
    }

    lines.push(String::new());
    lines.push(summary.redline.clone());
    lines.join("\n")
}
