use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::cli::OutputFormat;

#[derive(Debug, Clone)]
pub struct Config {
    pub output: OutputFormat,
    pub extra_extensions: Vec<String>,
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            output: match std::env::var("PGPLAN_OUTPUT") {
                Ok(value) => OutputFormat::parse(&value)
                    .ok_or_else(|| anyhow!("PGPLAN_OUTPUT must be json or yaml, got '{}'", value))?,
                Err(_) => OutputFormat::Json,
            },
            extra_extensions: std::env::var("PGPLAN_EXTRA_EXTENSIONS")
                .map(|value| split_list(&value))
                .unwrap_or_default(),
            log_file: std::env::var("PGPLAN_LOG_FILE")
                .ok()
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

/// Comma-separated list, blanks dropped
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("timescaledb, pg_hint_plan,,"), vec!["timescaledb", "pg_hint_plan"]);
        assert!(split_list("  ").is_empty());
    }
}
