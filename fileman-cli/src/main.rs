// SPDX-License-Identifier: GPL-3.0-only

//! fileman - file manager operations from the command line
//!
//! Every subcommand builds one operation through the console selected by
//! `--mode` and runs it on the blocking pool; Ctrl-C cancels it.

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod format;
mod logging;

use cli::Cli;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    logging::init(&config);

    tracing::debug!("fileman v{}", env!("CARGO_PKG_VERSION"));

    commands::run(cli, config).await
}
