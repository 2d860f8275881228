use std::io::Write;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;

mod build;
mod cli;
mod error;
mod fetch;
mod gitio;
mod hooks;
mod installer;
mod layout;
mod logger;
mod pipeline;
mod settings;
mod source;
mod util;

use crate::cli::{normalize, Cli};
use crate::error::RunError;
use crate::installer::ReleaseSource;
use crate::logger::Logger;

fn write_error<W: Write>(w: &mut W, msg: &str) {
  let _ = writeln!(w, "{}{}", "error: ".red(), msg);
}

fn write_usage_error<W: Write>(w: &mut W, msg: &str) {
  write_error(w, msg);
  let _ = writeln!(w, "\n{}", Cli::command().render_usage());
  let _ = writeln!(w, "\nFor more information, try '-h'.");
}

/// Misuse of the command line: message, usage block, exit 1.
fn usage_error(msg: &str) -> ExitCode {
  write_usage_error(&mut anstream::stderr(), msg);
  ExitCode::FAILURE
}

/// Any other failure before the run log exists: message only, exit 1.
fn fatal(msg: &str) -> ExitCode {
  write_error(&mut anstream::stderr(), msg);
  ExitCode::FAILURE
}

fn main() -> ExitCode {
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(e) => {
      let _ = e.print();
      return match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
      };
    }
  };

  if cli.gen_man {
    return match util::render_man_page::<Cli>() {
      Ok(page) => {
        print!("{}", page);
        ExitCode::SUCCESS
      }
      Err(e) => fatal(&format!("rendering man page: {:#}", e)),
    };
  }

  // Phase 1: normalize CLI; nothing on disk is touched before this succeeds
  let cfg = match normalize(cli) {
    Ok(cfg) => cfg,
    Err(e) => {
      return match e.downcast_ref::<RunError>() {
        Some(RunError::Usage(msg)) => usage_error(msg),
        _ => usage_error(&format!("{:#}", e)),
      };
    }
  };

  // Phase 2: open the run log
  let log = match Logger::create(cfg.layout().log_file()) {
    Ok(log) => log,
    Err(e) => return fatal(&format!("{:#}", e)),
  };

  // Phase 3: fetch, configure, install, build, clean up
  match pipeline::run(&cfg, &ReleaseSource::new(), &log) {
    Ok(_) => {
      log.info(format!("Done; log at {}", log.path().display()));
      ExitCode::SUCCESS
    }
    Err(e) => {
      log.error(format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
