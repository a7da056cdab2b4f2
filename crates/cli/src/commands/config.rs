// `redline config`: inspect or create the engine configuration file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use redline_engine::config::{global_config_path, EngineConfig};
use serde::Serialize;

use crate::files;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,

    /// Force JSON output.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigResult {
    pub path: Option<PathBuf>,
    pub written: bool,
    pub config: EngineConfig,
}

pub fn run(args: ConfigArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.json);
    let result = match &args.action {
        ConfigAction::Show => show(config_path),
        ConfigAction::Init { force } => init(config_path, *force),
    };

    match result {
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

fn show(config_path: Option<&Path>) -> anyhow::Result<ConfigResult> {
    let config = files::load_config(config_path)?;
    let path = config_path.map(Path::to_path_buf).or_else(global_config_path);
    Ok(ConfigResult { path, written: false, config })
}

fn init(config_path: Option<&Path>, force: bool) -> anyhow::Result<ConfigResult> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => global_config_path().context("could not determine home directory")?,
    };
    if path.exists() && !force {
        bail!("config `{}` already exists (pass --force to overwrite)", path.display());
    }

    let config = EngineConfig::default();
    config.save_to(&path)?;
    Ok(ConfigResult { path: Some(path), written: true, config })
}

fn format_human(result: &ConfigResult) -> String {
    let mut lines = Vec::new();
    match (&result.path, result.written) {
        (Some(path), true) => lines.push(format!("Wrote {}", path.display())),
        (Some(path), false) => lines.push(format!("# {}", path.display())),
        (None, _) => lines.push("# built-in defaults".into()),
    }
    match toml::to_string_pretty(&result.config) {
        Ok(text) => lines.push(text.trim_end().to_string()),
        Err(error) => lines.push(format!("(failed to render config: {error})")),
    }
    lines.join("\n")
}
