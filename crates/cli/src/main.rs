// redline CLI entry point.

use std::path::PathBuf;

use clap::Parser;

mod commands;
mod exit_code;
mod files;
mod output;

use exit_code::ExitCode;

#[derive(Parser)]
#[command(name = "redline", about = "Reviewable AI suggestions for markdown documents")]
struct Cli {
    /// Config file (defaults to ~/.redline/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match commands::run(cli.command, cli.config.as_deref()) {
        Ok(()) => ExitCode::Success.into(),
        // Commands have already reported the error in the selected format.
        Err(error) => ExitCode::from_error(&error).into(),
    }
}
