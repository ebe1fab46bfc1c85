//! Tilegen CLI - slice a large image into a slippy-map tile pyramid.

mod args;
mod display;
mod error;

use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use tilegen::app::TileGenApp;
use tilegen::config::ConfigFile;
use tilegen::logging::init_logging;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use args::Args;
use error::{CliError, EXIT_FAILURE, EXIT_SUCCESS};

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_SUCCESS,
                _ => EXIT_FAILURE,
            };
            process::exit(code);
        }
    };

    match run(args) {
        Ok(code) => process::exit(code),
        Err(e) => e.exit(),
    }
}

/// Runs the generator and returns the exit code for the finished run.
fn run(args: Args) -> Result<i32, CliError> {
    let file = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };

    let _logging_guard =
        init_logging(&args.logging_config(&file)).map_err(CliError::LoggingInit)?;
    info!(version = tilegen::VERSION, "tilegen starting");

    let config = args.generator_config(&file);
    let app = TileGenApp::prepare(config)?;
    display::print_header(&app);

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            // Second Ctrl-C: give up on the tiles still in flight.
            process::exit(EXIT_FAILURE);
        }
        warn!("Interrupted, finishing tiles in progress");
        handler_token.cancel();
    })
    .map_err(|e| CliError::Signal(e.to_string()))?;

    let report = app.run_blocking(cancel, Some(display::progress_sink()))?;
    Ok(display::print_summary(&report))
}
