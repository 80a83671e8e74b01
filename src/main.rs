mod commands;
mod core;
mod release;
mod twincat;
mod utils;

use clap::{ArgAction, Parser};
use crate::core::config::ToolConfig;
use crate::core::error::{ReleaseError, ReleaseResult, print_error};
use crate::release::ReleaseRequest;
use std::path::PathBuf;

/// Version-tag a TwinCAT PLC project repository
///
/// Clones the repository, writes the version into the project and a
/// generated Global_Version.TcGVL, then commits, tags and pushes the tag.
#[derive(Parser)]
#[command(name = "tc-release")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Version to release, e.g. v1.2.3
  #[arg(value_name = "VERSION_NUMBER")]
  version_string: String,

  /// Repository to release, e.g. git@github.com:pcdshub/lcls-plc-example.git
  repo_url: String,

  /// Name of the .plcproj file to release when the repository has several
  #[arg(long, value_name = "NAME")]
  plcproj: Option<String>,

  /// Also clone and build the released tag in the IOC deploy area
  #[arg(long)]
  deploy: bool,

  /// Deploy under this directory instead of $EPICS_SITE_TOP/ioc/<category>
  #[arg(long, value_name = "DIR")]
  deploy_path: Option<PathBuf>,

  /// Commit and tag locally but do not push; keep the working directory
  #[arg(long)]
  dry_run: bool,

  /// More logging (-v debug, -vv trace)
  #[arg(short, long, action = ArgAction::Count)]
  verbose: u8,
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = Cli::parse();
  crate::core::logging::init(cli.verbose);

  if let Err(err) = run(cli) {
    handle_error(err);
  }
}

fn run(cli: Cli) -> ReleaseResult<()> {
  let cwd = std::env::current_dir().map_err(|e| ReleaseError::message(format!("Failed to get current directory: {}", e)))?;
  let config = ToolConfig::resolve(&cwd)?;
  tracing::debug!("Configuration: {:?}", config);

  let mut request = ReleaseRequest::new(&cli.version_string, cli.repo_url)?;
  request.selector = cli.plcproj;
  request.deploy = cli.deploy;
  request.deploy_path = cli.deploy_path;
  request.dry_run = cli.dry_run;

  commands::run_release(&request, &config, &cwd)
}

fn handle_error(err: ReleaseError) -> ! {
  print_error(&err);
  std::process::exit(1);
}
