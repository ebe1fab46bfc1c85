//! INI configuration file.
//!
//! Every key is optional. Values found in the file override the built-in
//! defaults; command-line flags override the file.
//!
//! ```ini
//! [tiles]
//! size = 256
//! format = png
//! max_magnification = 1
//!
//! [paths]
//! input = ./input.png
//! output = ./out/
//!
//! [run]
//! workers = 8
//! allow_failures = false
//!
//! [logging]
//! file = ./tilegen.log
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::{Ini, Properties};
use thiserror::Error;

use crate::app::{FailurePolicy, GeneratorConfig, MAX_TILE_SIZE};
use crate::imaging::TileFormat;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or parse the file
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    /// A key holds a value of the wrong shape
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Values read from a configuration file. `None` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub tile_size: Option<u32>,
    pub tile_format: Option<TileFormat>,
    pub max_magnification: Option<u32>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub workers: Option<usize>,
    pub allow_failures: Option<bool>,
    pub log_file: Option<PathBuf>,
}

impl ConfigFile {
    /// Loads and validates the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Parses configuration from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<inline>"),
            source: ini::Error::Parse(e),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("tiles")) {
            config.tile_size = positive(section, "tiles", "size")?;
            if let Some(size) = config.tile_size.filter(|&size| size > MAX_TILE_SIZE) {
                return Err(invalid(
                    "tiles",
                    "size",
                    &size.to_string(),
                    format!("must be at most {}", MAX_TILE_SIZE),
                ));
            }
            config.max_magnification = positive(section, "tiles", "max_magnification")?;
            if let Some(v) = section.get("format") {
                config.tile_format =
                    Some(v.parse().map_err(|reason| invalid("tiles", "format", v, reason))?);
            }
        }

        if let Some(section) = ini.section(Some("paths")) {
            config.input = path_value(section, "input");
            config.output = path_value(section, "output");
        }

        if let Some(section) = ini.section(Some("run")) {
            config.workers = positive(section, "run", "workers")?;
            if let Some(v) = section.get("allow_failures") {
                config.allow_failures = Some(parse_bool(v).ok_or_else(|| {
                    invalid("run", "allow_failures", v, "must be true or false")
                })?);
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            config.log_file = path_value(section, "file");
        }

        Ok(config)
    }

    /// Overlays the values set in this file onto `config`.
    pub fn apply(&self, mut config: GeneratorConfig) -> GeneratorConfig {
        if let Some(size) = self.tile_size {
            config = config.with_tile_size(size);
        }
        if let Some(format) = self.tile_format {
            config = config.with_format(format);
        }
        if let Some(mag) = self.max_magnification {
            config = config.with_max_magnification(mag);
        }
        if let Some(input) = &self.input {
            config = config.with_input(input);
        }
        if let Some(output) = &self.output {
            config = config.with_output(output);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(allow) = self.allow_failures {
            config = config.with_failure_policy(FailurePolicy::from_allow_failures(allow));
        }
        config
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Reads an integer key that must be at least 1.
fn positive<T>(section: &Properties, name: &str, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + PartialOrd + From<u8>,
{
    let Some(v) = section.get(key) else {
        return Ok(None);
    };
    match v.trim().parse::<T>() {
        Ok(n) if n >= T::from(1) => Ok(Some(n)),
        _ => Err(invalid(name, key, v, "must be a positive integer")),
    }
}

/// Reads a path key; empty values count as unset.
fn path_value(section: &Properties, key: &str) -> Option<PathBuf> {
    section
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
