use std::net::SocketAddr;

use anyhow::{Result, ensure};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::cli::{Cli, LogFormat};

/// Total cache capacity in bytes.
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 1_049_000;
/// Largest individually cacheable response in bytes.
pub const DEFAULT_MAX_OBJECT_SIZE: u64 = 102_400;

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

fn default_max_cache_size() -> u64 {
    DEFAULT_MAX_CACHE_SIZE
}

fn default_max_object_size() -> u64 {
    DEFAULT_MAX_OBJECT_SIZE
}

fn default_max_request_line() -> usize {
    8 * 1024
}

fn default_max_header_bytes() -> usize {
    32 * 1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub listen: SocketAddr,
    #[serde(default = "default_log_format")]
    pub log: LogFormat,
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: u64,
    #[serde(default = "default_max_object_size")]
    pub max_object_size: u64,
    #[serde(default = "default_max_request_line")]
    pub max_request_line: usize,
    #[serde(default = "default_max_header_bytes")]
    pub max_header_bytes: usize,
}

impl Settings {
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("listen", format!("0.0.0.0:{}", cli.port))
            .map_err(to_anyhow)?;

        if let Some(path) = cli.config_path() {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        builder = builder.add_source(Environment::with_prefix("WIRECACHE").try_parsing(true));

        let cfg = builder.build().map_err(to_anyhow)?;
        let mut settings: Settings = cfg.try_deserialize().map_err(to_anyhow)?;
        // The positional port always wins over file or environment values.
        settings.listen.set_port(cli.port);
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.max_cache_size > 0,
            "max_cache_size must be greater than 0 (got {})",
            self.max_cache_size
        );
        ensure!(
            self.max_object_size > 0,
            "max_object_size must be greater than 0 (got {})",
            self.max_object_size
        );
        ensure!(
            self.max_request_line > 0,
            "max_request_line must be greater than 0 (got {})",
            self.max_request_line
        );
        ensure!(
            self.max_header_bytes > 0,
            "max_header_bytes must be greater than 0 (got {})",
            self.max_header_bytes
        );
        Ok(())
    }
}

fn to_anyhow(err: ConfigError) -> anyhow::Error {
    anyhow::anyhow!(err)
}
