// `redline review`: list, accept, or reject pending suggestions in a saved state.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use redline_common::types::AnnotationKind;
use redline_engine::config::EngineConfig;
use redline_engine::document::spans::all_spans;
use redline_engine::document::ydoc::YrsDocument;
use redline_engine::document::{render_redline, DocumentModel};
use redline_engine::hover::HoverController;
use redline_engine::suggest::resolution::{Decision, ResolutionExecutor, ResolvedSpan};
use serde::Serialize;
use uuid::Uuid;

use crate::files;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ReviewArgs {
    /// Saved document state (from `replay --save` or `suggest --save`).
    state: PathBuf,

    /// Accept the annotation with this id (repeatable).
    #[arg(long, value_name = "ID")]
    accept: Vec<Uuid>,

    /// Reject the annotation with this id (repeatable).
    #[arg(long, value_name = "ID")]
    reject: Vec<Uuid>,

    /// Accept every pending suggestion.
    #[arg(long, conflicts_with_all = ["accept", "reject", "reject_all"])]
    accept_all: bool,

    /// Reject every pending suggestion.
    #[arg(long, conflicts_with_all = ["accept", "reject"])]
    reject_all: bool,

    /// Also write the resulting text as plain paragraphs.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Resolve in memory without writing the state back.
    #[arg(long)]
    dry_run: bool,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingSpan {
    pub id: Uuid,
    pub suggestion_id: Uuid,
    pub kind: AnnotationKind,
    pub author: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResult {
    pub resolved: Vec<ResolvedSpan>,
    pub pending: Vec<PendingSpan>,
    pub redline: String,
    pub saved: bool,
}

pub fn run(args: ReviewArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match review(&args, config_path) {
        Ok(result) => {
            output::print_output(format, &result, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

fn review(args: &ReviewArgs, config_path: Option<&Path>) -> anyhow::Result<ReviewResult> {
    let config = files::load_config(config_path)?;
    let doc = files::read_state(&args.state, &config)?;

    let resolved = resolve(&doc, &config, args)?;
    let saved = !resolved.is_empty() && !args.dry_run;
    if saved {
        files::write_state(&args.state, &doc)?;
    }
    if let Some(path) = &args.output {
        files::write_plain(path, &doc)?;
    }

    Ok(ReviewResult {
        resolved,
        pending: pending_spans(&doc),
        redline: render_redline(&doc.text_runs()),
        saved,
    })
}

fn resolve(
    doc: &YrsDocument,
    config: &EngineConfig,
    args: &ReviewArgs,
) -> anyhow::Result<Vec<ResolvedSpan>> {
    let executor = ResolutionExecutor::new(config.author.meta());
    let mut hover = HoverController::new(config.hover.to_config());

    if args.accept_all {
        return Ok(executor.accept_all(doc, &mut hover)?);
    }
    if args.reject_all {
        return Ok(executor.reject_all(doc, &mut hover)?);
    }

    let decisions = args
        .accept
        .iter()
        .map(|id| (*id, Decision::Accept))
        .chain(args.reject.iter().map(|id| (*id, Decision::Reject)));
    let mut resolved = Vec::new();
    for (id, decision) in decisions {
        let span = executor
            .resolve(doc, &mut hover, id, decision)
            .with_context(|| format!("failed to resolve suggestion `{id}`"))?;
        resolved.push(span);
    }
    Ok(resolved)
}

fn pending_spans(doc: &YrsDocument) -> Vec<PendingSpan> {
    all_spans(&doc.text_runs())
        .into_iter()
        .map(|span| PendingSpan {
            id: span.id(),
            suggestion_id: span.annotation.suggestion_id,
            kind: span.kind(),
            author: span.annotation.author.author_id.clone(),
            text: span.text.clone(),
            reason: span.annotation.reason.clone(),
        })
        .collect()
}

fn format_human(result: &ReviewResult) -> String {
    let mut lines = Vec::new();

    if !result.resolved.is_empty() {
        lines.push(format!("Resolved {} suggestion span(s)", result.resolved.len()));
        for span in &result.resolved {
            let verb = match span.decision {
                Decision::Accept => "accepted",
                Decision::Reject => "rejected",
            };
            lines.push(format!("  {verb} {} {}", kind_label(span.kind), span.annotation_id));
        }
    }

    if result.pending.is_empty() {
        lines.push("No pending suggestions.".into());
    } else {
        lines.push(format!("Pending ({})", result.pending.len()));
        for span in &result.pending {
            let mut line = format!("  {} {} {:?}", span.id, kind_label(span.kind), span.text);
            if let Some(reason) = &span.reason {
                line.push_str(&format!(" ({reason})"));
            }
            lines.push(line);
        }
    }

    lines.push(String::new());
    lines.push(result.redline.clone());
    lines.join("\n")
}

fn kind_label(kind: AnnotationKind) -> &'static str {
    match kind {
        AnnotationKind::Insert => "insert",
        AnnotationKind::Delete => "delete",
    }
}
