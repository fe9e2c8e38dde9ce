//! aigate - AI service router
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use aigate::cli::Cli;
use aigate::core::logging::{self, LogFormat, LogLevel, LogSettings};
use aigate::render::render_error;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().and_then(LogLevel::from_arg);
    let format = cli.json_output.then_some(LogFormat::Json);
    logging::init(&LogSettings::resolve(level, format, cli.verbose));

    match aigate::cli::run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), "{e}");
            eprintln!("{}", render_error(&e, cli.effective_format(), cli.pretty));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
