// `redline replay`: apply a recorded suggestion stream to a markdown file.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use futures_util::stream;
use redline_engine::session::SuggestionSession;

use super::summary::{self, SessionSummary};
use crate::files;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Markdown document to annotate.
    #[arg(long)]
    doc: PathBuf,

    /// Recorded event-stream body, exactly as the service sent it.
    #[arg(long)]
    stream: PathBuf,

    /// Feed the recording in chunks of this many bytes (0 = all at once).
    #[arg(long, default_value_t = 0)]
    chunk_size: usize,

    /// Save the annotated document state for `redline review`.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ReplayArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    match replay(&args, config_path) {
        Ok(result) => {
            summary::print_warnings(format, &result);
            output::print_output(format, &result, summary::format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_anyhow_error(format, &e);
            Err(e)
        }
    }
}

fn replay(args: &ReplayArgs, config_path: Option<&Path>) -> anyhow::Result<SessionSummary> {
    let config = files::load_config(config_path)?;
    let doc = files::read_markdown(&args.doc, &config)?;
    let body = std::fs::read(&args.stream)
        .with_context(|| format!("failed to read `{}`", args.stream.display()))?;

    let chunks = split_chunks(body, args.chunk_size);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let mut session =
        SuggestionSession::new(config.applier()).with_tool_names(config.ai.tool_names.clone());
    let outcome = runtime.block_on(
        session.run(stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)), &doc),
    );

    let (mut summary, error) = SessionSummary::from_outcome(outcome, &doc);
    if let Some(path) = &args.save {
        files::write_state(path, &doc)?;
        summary.saved_to = Some(path.clone());
    }
    match error {
        Some(error) => Err(anyhow::Error::new(error).context("replayed stream failed")),
        None => Ok(summary),
    }
}

fn split_chunks(body: Vec<u8>, chunk_size: usize) -> Vec<Vec<u8>> {
    if chunk_size == 0 || body.len() <= chunk_size {
        return vec![body];
    }
    body.chunks(chunk_size).map(<[u8]>::to_vec).collect()
}
