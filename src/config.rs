// Configuration
// Optional TOML file tuning primality rounds, the decoder window and logging

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::rsa::bigint::DEFAULT_PRIME_ROUNDS;
use crate::util::signed_file::{DEFAULT_TAIL_WINDOW, SIGNATURE_DELIMITER};

pub const CONFIG_FILE_NAME: &str = "rsa-sign.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Miller-Rabin rounds used to validate p and q
    #[serde(default = "default_miller_rabin_rounds")]
    pub miller_rabin_rounds: u32,
    /// Trailing bytes searched for the signature delimiter
    #[serde(default = "default_tail_window")]
    pub tail_window: usize,
    /// Default log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_miller_rabin_rounds() -> u32 {
    DEFAULT_PRIME_ROUNDS
}

fn default_tail_window() -> usize {
    DEFAULT_TAIL_WINDOW
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            miller_rabin_rounds: default_miller_rabin_rounds(),
            tail_window: default_tail_window(),
            log_level: default_log_level(),
        }
    }
}

/// Parse a log level name such as `info` or `DEBUG`
pub fn parse_log_level(level: &str) -> Result<tracing::Level> {
    level.trim().parse::<tracing::Level>().map_err(|_| {
        Error::Config(format!(
            "unknown log level {:?} (expected error, warn, info, debug or trace)",
            level
        ))
    })
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| Error::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| Error::from_io(e, path))?;
                Self::from_toml_str(&text)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.miller_rabin_rounds == 0 {
            return Err(Error::Config(
                "miller_rabin_rounds must be at least 1".to_string(),
            ));
        }
        if self.tail_window < SIGNATURE_DELIMITER.len() {
            return Err(Error::Config(format!(
                "tail_window must be at least {} bytes",
                SIGNATURE_DELIMITER.len()
            )));
        }
        parse_log_level(&self.log_level)?;
        Ok(())
    }
}
