use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// pgplan - Cloud SQL for PostgreSQL deployment planner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Resolve a request file and print the plan, outputs and scripts
    Resolve {
        /// Request file (.yaml, .yml or .json)
        file: PathBuf,

        /// Report format (default: PGPLAN_OUTPUT or json)
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,

        /// Print generated passwords instead of masking them
        #[arg(long)]
        show_secrets: bool,
    },

    /// Check a request file without printing the plan
    Validate {
        /// Request file (.yaml, .yml or .json)
        file: PathBuf,
    },

    /// Show the preset catalog
    Presets {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: PresetFormat,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetFormat {
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolve() {
        let args = Args::try_parse_from([
            "pgplan",
            "resolve",
            "request.yaml",
            "--output",
            "yaml",
            "--show-secrets",
        ])
        .unwrap();
        match args.mode {
            Mode::Resolve {
                file,
                output,
                show_secrets,
            } => {
                assert_eq!(file, PathBuf::from("request.yaml"));
                assert_eq!(output, Some(OutputFormat::Yaml));
                assert!(show_secrets);
            }
            other => panic!("unexpected mode: {:?}", other),
        }
    }

    #[test]
    fn test_parse_presets_default_format() {
        let args = Args::try_parse_from(["pgplan", "presets"]).unwrap();
        assert!(matches!(
            args.mode,
            Mode::Presets {
                output: PresetFormat::Table
            }
        ));
    }

    #[test]
    fn test_validate_requires_file() {
        assert!(Args::try_parse_from(["pgplan", "validate"]).is_err());
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("yml"), Some(OutputFormat::Yaml));
        assert_eq!(OutputFormat::parse("toml"), None);
    }
}
