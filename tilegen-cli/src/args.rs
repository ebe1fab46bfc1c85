//! Command-line arguments and their precedence over the config file.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use tilegen::app::{FailurePolicy, GeneratorConfig, MAX_TILE_SIZE};
use tilegen::config::ConfigFile;
use tilegen::imaging::TileFormat;
use tilegen::logging::LoggingConfig;

/// Tile format selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum FormatArg {
    /// Lossless PNG with transparency
    Png,
    /// JPEG; transparent areas become black
    #[value(alias = "jpeg")]
    Jpg,
    /// Lossless WebP with transparency
    Webp,
    /// AVIF with transparency
    Avif,
}

impl From<FormatArg> for TileFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Png => TileFormat::Png,
            FormatArg::Jpg => TileFormat::Jpg,
            FormatArg::Webp => TileFormat::Webp,
            FormatArg::Avif => TileFormat::Avif,
        }
    }
}

/// Every option is optional so that unset flags fall through to the config
/// file, then to the built-in defaults.
#[derive(Debug, Parser)]
#[command(name = "tilegen")]
#[command(version, disable_version_flag = true)]
#[command(
    about = "A fast, multi-threaded tool to slice large images into map-style tiles at multiple zoom levels.",
    long_about = None
)]
pub struct Args {
    /// Display the version number
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// The tile size of each image [default: 256]
    #[arg(short = 't', long, value_name = "TILE_SIZE", value_parser = clap::value_parser!(u32).range(1..=MAX_TILE_SIZE as i64))]
    pub tile_size: Option<u32>,

    /// The tile format to use [default: png]
    #[arg(short = 'f', long, value_name = "TILE_FORMAT", value_enum, ignore_case = true)]
    pub tile_format: Option<FormatArg>,

    /// The maximum magnification factor [default: 1]
    #[arg(short = 'm', long, value_name = "MAXIMUM_MAGNIFICATION", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_mag: Option<u32>,

    /// The path to the input image [default: ./input.png]
    #[arg(short = 'i', long, value_name = "INPUT_PATH")]
    pub input: Option<PathBuf>,

    /// The output directory where the tiles will be saved [default: ./out/]
    #[arg(short = 'o', long, value_name = "OUTPUT_DIR")]
    pub output: Option<PathBuf>,

    /// Number of worker threads [default: available CPU cores]
    #[arg(short = 'j', long, value_name = "WORKERS", value_parser = clap::value_parser!(u32).range(1..))]
    pub workers: Option<u32>,

    /// Exit successfully even if some tiles failed
    #[arg(long)]
    pub allow_failures: bool,

    /// Read defaults from an INI configuration file
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long)]
    pub verbose: bool,
}

impl Args {
    /// Builds the run configuration: flags over config file over defaults.
    pub fn generator_config(&self, file: &ConfigFile) -> GeneratorConfig {
        let mut config = file.apply(GeneratorConfig::default());

        if let Some(size) = self.tile_size {
            config = config.with_tile_size(size);
        }
        if let Some(format) = self.tile_format {
            config = config.with_format(format.into());
        }
        if let Some(mag) = self.max_mag {
            config = config.with_max_magnification(mag);
        }
        if let Some(input) = &self.input {
            config = config.with_input(input);
        }
        if let Some(output) = &self.output {
            config = config.with_output(output);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers as usize);
        }
        if self.allow_failures {
            config = config.with_failure_policy(FailurePolicy::Tolerant);
        }
        config
    }

    /// Logging settings: `--log-file` wins over `[logging] file`.
    pub fn logging_config(&self, file: &ConfigFile) -> LoggingConfig {
        let mut logging = LoggingConfig::new().with_verbose(self.verbose);
        if let Some(path) = self.log_file.as_ref().or(file.log_file.as_ref()) {
            logging = logging.with_file(path);
        }
        logging
    }
}
