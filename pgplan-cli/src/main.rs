use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod config;

use cli::{Args, Mode};
use config::Config;

/// Logs go to stderr so stdout stays a clean report, or to a file when
/// PGPLAN_LOG_FILE is set. The returned guard must outlive `main`'s work.
fn initialize_tracing(config: &Config) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,pgplan_cli=debug,pgplan_resolver=info".into());

    match &config.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(|dir| dir.to_path_buf())
                .unwrap_or_else(|| ".".into());
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("PGPLAN_LOG_FILE has no file name: {}", path.display()))?;
            std::fs::create_dir_all(&dir)?;

            let file_appender = tracing_appender::rolling::never(&dir, file_name);
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(file_writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            Ok(None)
        }
    }
}

fn main() -> Result<ExitCode> {
    let config = Config::load()?;
    let args = Args::parse();

    let _guard = initialize_tracing(&config)?;

    match args.mode {
        Mode::Resolve {
            file,
            output,
            show_secrets,
        } => {
            let format = output.unwrap_or(config.output);
            commands::resolve::run_resolve(&config, &file, format, show_secrets)?;
        }
        Mode::Validate { file } => {
            if !commands::resolve::run_validate(&config, &file)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Mode::Presets { output } => commands::presets::run_presets(output)?,
    }
    Ok(ExitCode::SUCCESS)
}
