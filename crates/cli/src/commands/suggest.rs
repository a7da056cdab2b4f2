// `redline suggest`: ask the suggestion service to review a markdown file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use redline_engine::client::{AiClient, SuggestRequest};
use redline_engine::config::EngineConfig;
use redline_engine::session::SuggestionSession;
use tracing::info;

use super::summary::{self, SessionSummary};
use crate::files;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct SuggestArgs {
    /// Markdown document to review.
    #[arg(long)]
    doc: PathBuf,

    /// What the assistant should do with the document.
    #[arg(long)]
    prompt: String,

    /// Override `ai.endpoint`.
    #[arg(long)]
    endpoint: Option<String>,

    /// Override `ai.model`.
    #[arg(long)]
    model: Option<String>,

    /// Save the annotated document state for `redline review`.
    #[arg(long)]
    save: Option<PathBuf>,

    /// Force JSON output.
    #[arg(long)]
    json: bool,
}

pub fn run(args: SuggestArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
        .and_then(|rt| rt.block_on(suggest(&args, config_path)));

    match result {
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

async fn suggest(
    args: &SuggestArgs,
    config_path: Option<&Path>,
) -> anyhow::Result<SessionSummary> {
    let config = apply_overrides(files::load_config(config_path)?, args)?;
    let doc = files::read_markdown(&args.doc, &config)?;

    let client = AiClient::new(&config.ai)?;
    let request = SuggestRequest::new(&config.ai, &args.prompt, &doc.block_texts());
    let response = client.stream_suggestions(&request).await?;

    let mut session =
        SuggestionSession::new(config.applier()).with_tool_names(config.ai.tool_names.clone());
    let token = session.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted; cancelling suggestion session");
            token.cancel();
        }
    });
    let outcome = session.run(response.bytes_stream(), &doc).await;
    interrupt.abort();

    let (mut summary, error) = SessionSummary::from_outcome(outcome, &doc);
    if let Some(path) = &args.save {
        files::write_state(path, &doc)?;
        summary.saved_to = Some(path.clone());
    }
    match error {
        Some(error) => Err(anyhow::Error::new(error).context("suggestion stream failed")),
        None => Ok(summary),
    }
}

fn apply_overrides(mut config: EngineConfig, args: &SuggestArgs) -> anyhow::Result<EngineConfig> {
    if let Some(endpoint) = &args.endpoint {
        config.ai.endpoint = endpoint.clone();
    }
    if let Some(model) = &args.model {
        config.ai.model = Some(model.clone());
    }
    config.validate()?;
    Ok(config)
}
