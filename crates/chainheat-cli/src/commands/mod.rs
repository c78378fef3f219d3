//! Command dispatch.

mod cache;
mod heatmap;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Heatmap(args) => heatmap::run(args).await,
        Command::Cache(args) => cache::run(args),
    }
}
