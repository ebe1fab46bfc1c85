//! CLI error handling with user-friendly messages.
//!
//! Centralizes how failures are printed and which exit code they map to.

use std::fmt;
use std::process;

use tilegen::app::AppError;
use tilegen::config::ConfigError;

/// Exit code for a successful run.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for fatal errors, cancelled runs and runs that lost every worker.
pub const EXIT_FAILURE: i32 = 1;

/// Exit code for runs that finished with failed tiles under the strict policy.
pub const EXIT_TILE_FAILURES: i32 = 2;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// The configuration file could not be used
    Config(ConfigError),
    /// The run could not start or could not be set up
    App(AppError),
    /// Failed to install the Ctrl-C handler
    Signal(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::App(AppError::Image(_)) = self {
            eprintln!();
            eprintln!("Check that --input points to a readable PNG, JPEG, WebP, AVIF or TIFF file.");
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "{}", e),
            CliError::App(e) => write!(f, "{}", e),
            CliError::Signal(msg) => write!(f, "Failed to install Ctrl-C handler: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::App(e) => Some(e),
            CliError::Signal(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}
