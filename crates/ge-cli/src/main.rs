/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
use commands::{history::HistoryArgs, once::OnceArgs, run::RunArgs, setup::SetupArgs};

mod config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "ge")]
#[command(propagate_version = true)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Also append log output to this file
  #[arg(long, global = true, env = "GE_LOG_FILE")]
  log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Poll the prices API on a schedule until Ctrl-C
  Run(RunArgs),
  /// Run a single ingestion cycle and exit
  Once(OnceArgs),
  /// Create the item_prices schema
  Setup(SetupArgs),
  /// Show what has been stored so far
  History(HistoryArgs),
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
  };

  let file_layer = match log_file {
    Some(path) => {
      let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;
      Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
    }
    None => None,
  };

  tracing_subscriber::registry().with(filter).with(fmt::layer()).with(file_layer).init();
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  // Load environment variables
  dotenv().ok();

  // Parse CLI arguments
  let cli = Cli::parse();

  // Initialize logging
  init_logging(cli.verbose, cli.log_file.as_deref())?;

  // Execute command
  match cli.command {
    Commands::Run(args) => commands::run::execute(args).await,
    Commands::Once(args) => commands::once::execute(args).await,
    Commands::Setup(args) => commands::setup::execute(args).await,
    Commands::History(args) => commands::history::execute(args).await,
  }
}
