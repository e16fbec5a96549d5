mod cache;
mod commands;
mod config;
mod failure;
mod github;
mod logging;
mod pagination;
mod render;

use clap::Parser;
use color_eyre::Result;
use crossterm::style::Stylize;
use std::path::PathBuf;
use std::process::ExitCode;

use commands::{Command, Context, Outcome};
use pagination::{PageSettings, DEFAULT_PER_PAGE};

#[derive(Parser, Debug)]
#[command(name = "ghx")]
#[command(about = "A terminal client for the GitHub REST API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/ghx/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Page to start from
  #[arg(long, global = true, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
  page: u32,

  /// Items per page (at most 100)
  #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
  per_page: Option<u32>,

  /// Ask before loading each further page
  #[arg(short = 'P', long, global = true)]
  paginate: bool,

  /// Bypass the response cache
  #[arg(long, global = true)]
  no_cache: bool,

  /// Log at debug level
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

impl Args {
  fn page_settings(&self, config: &config::Config) -> PageSettings {
    let per_page = self
      .per_page
      .or(config.per_page)
      .unwrap_or(DEFAULT_PER_PAGE);
    PageSettings::new(self.page, per_page, self.paginate)
  }
}

#[tokio::main]
async fn main() -> ExitCode {
  if let Err(e) = color_eyre::install() {
    eprintln!("Failed to install error reporter: {}", e);
  }

  let args = Args::parse();

  // Logging is best-effort; a read-only home shouldn't block the command
  let _log_guard = match logging::init(args.verbose) {
    Ok(guard) => Some(guard),
    Err(e) => {
      eprintln!("{} {}", "warning:".yellow(), e);
      None
    }
  };

  match run(args).await {
    Ok(Outcome::Completed) => ExitCode::SUCCESS,
    Ok(Outcome::Failed(failure)) => {
      eprintln!("{} {}", "error:".red().bold(), failure);
      ExitCode::from(1)
    }
    Err(report) => {
      eprintln!("{:?}", report);
      ExitCode::from(2)
    }
  }
}

async fn run(args: Args) -> Result<Outcome> {
  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let settings = args.page_settings(&config);

  let ctx = Context::new(config, args.no_cache)?;
  commands::execute(&ctx, args.command, settings).await
}
