// CLI module for nim2claude
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;
use std::path::PathBuf;

/// nim2claude - Anthropic Messages API proxy for OpenAI-compatible endpoints
#[derive(Parser, Debug)]
#[command(name = "nim2claude", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (default: ~/.nim2claude/config.toml)
    #[arg(short, long, env = "NIM2CLAUDE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind, overrides server.host
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on, overrides server.port
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl Args {
    /// Apply CLI overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut crate::config::AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}
