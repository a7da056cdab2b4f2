// CLI subcommand dispatch.

use std::path::Path;

use clap::Subcommand;

pub mod config;
pub mod replay;
pub mod review;
pub mod suggest;
pub mod summary;

#[derive(Subcommand)]
pub enum Command {
    /// Apply a recorded suggestion stream to a markdown file
    Replay(replay::ReplayArgs),
    /// Stream suggestions for a markdown file from the AI service
    Suggest(suggest::SuggestArgs),
    /// List, accept, or reject pending suggestions in a saved state
    Review(review::ReviewArgs),
    /// Show or create the configuration file
    Config(config::ConfigArgs),
}

pub fn run(cmd: Command, config_path: Option<&Path>) -> anyhow::Result<()> {
    match cmd {
        Command::Replay(args) => replay::run(args, config_path),
        Command::Suggest(args) => suggest::run(args, config_path),
        Command::Review(args) => review::run(args, config_path),
        Command::Config(args) => config::run(args, config_path),
    }
}
