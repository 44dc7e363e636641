use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;

fn default_max_file_size() -> u64 {
    // 10 MB in bytes
    10 * 1024 * 1024
}

fn default_analysis_row_limit() -> usize {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    #[serde(default = "default_analysis_row_limit")]
    pub analysis_row_limit: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Config {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Config {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            upload_dir: upload_dir.into(),
            analysis_row_limit: default_analysis_row_limit(),
            max_file_size: default_max_file_size(),
        }
    }

    pub fn from_env() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let mut config = Config::new(
            std::env::var("SHEETS_UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
        );

        if let Ok(addr) = std::env::var("SHEETS_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .with_context(|| format!("Invalid SHEETS_BIND_ADDR: {}", addr))?;
        }
        if let Ok(limit) = std::env::var("SHEETS_ANALYSIS_ROW_LIMIT") {
            config.analysis_row_limit = limit
                .parse()
                .with_context(|| format!("Invalid SHEETS_ANALYSIS_ROW_LIMIT: {}", limit))?;
        }
        if let Ok(size) = std::env::var("SHEETS_MAX_FILE_SIZE") {
            config.max_file_size = size
                .parse()
                .with_context(|| format!("Invalid SHEETS_MAX_FILE_SIZE: {}", size))?;
        }

        Ok(config)
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.upload_dir).with_context(|| {
        format!("Failed to create upload directory {}", config.upload_dir.display())
    })?;
    tracing::info!(
        "Configuration loaded: upload_dir={}, analysis_row_limit={}",
        config.upload_dir.display(),
        config.analysis_row_limit
    );
    Ok(config)
}
