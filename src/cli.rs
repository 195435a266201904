use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Parser)]
#[command(name = "wirecache", about = "Caching forward HTTP proxy")]
pub struct Cli {
    /// Port to listen on for client connections.
    pub port: u16,

    /// Path to an optional TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}
