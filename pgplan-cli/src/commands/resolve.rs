use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use pgplan_models::{DerivedOutputs, Request, ResolvedPlan};
use pgplan_resolver::{derive, render_extension_script, render_permission_scripts, Catalog, Resolver};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::config::Config;

#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub resolved_at: DateTime<Utc>,
    pub plan: ResolvedPlan,
    pub outputs: DerivedOutputs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripts: Option<Scripts>,
}

#[derive(Debug, Serialize)]
pub struct Scripts {
    /// User name -> grant script
    pub permissions: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub extensions: String,
}

/// Read a request, picking the parser from the file extension
pub fn load_request(path: &Path) -> Result<Request> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML request {}", path.display())),
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON request {}", path.display())),
        _ => bail!(
            "Unsupported request file {} (expected .yaml, .yml or .json)",
            path.display()
        ),
    }
}

fn resolver(config: &Config) -> Resolver {
    let catalog = Catalog::default().with_extensions(config.extra_extensions.iter().cloned());
    Resolver::with_catalog(catalog)
}

pub fn build_report(config: &Config, request: &Request, show_secrets: bool) -> Result<ResolveReport> {
    let plan = resolver(config)
        .resolve(request)
        .with_context(|| format!("Failed to resolve instance '{}'", request.instance_name))?;
    let outputs = derive(&plan);

    let scripts = if plan.generate_permission_script {
        Some(Scripts {
            permissions: render_permission_scripts(&plan).context("Failed to render permission scripts")?,
            extensions: render_extension_script(&plan).context("Failed to render extension script")?,
        })
    } else {
        None
    };

    tracing::info!(
        instance = %plan.instance_name,
        machine_type = %plan.sizing.machine_type,
        databases = plan.databases.len(),
        users = plan.users.len(),
        replicas = plan.read_replicas.len(),
        "Resolved deployment plan"
    );

    Ok(ResolveReport {
        resolved_at: Utc::now(),
        plan: if show_secrets { plan } else { plan.redacted() },
        outputs,
        scripts,
    })
}

pub fn run_resolve(config: &Config, path: &Path, format: OutputFormat, show_secrets: bool) -> Result<()> {
    tracing::info!(file = %path.display(), "Loading request");
    let request = load_request(path)?;
    tracing::debug!(
        instance = %request.instance_name,
        preset = request.preset.as_deref().unwrap_or("-"),
        "Request loaded"
    );

    if show_secrets {
        tracing::warn!("Generated passwords will be printed in clear text");
    }
    let report = build_report(config, &request, show_secrets)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
    }
    Ok(())
}

/// Prints `ok` or the failing code, field and value. Returns whether the
/// request resolved.
pub fn run_validate(config: &Config, path: &Path) -> Result<bool> {
    tracing::info!(file = %path.display(), "Validating request");
    let request = load_request(path)?;

    match resolver(config).resolve(&request) {
        Ok(plan) => {
            println!("ok: {}", plan.instance_name);
            Ok(true)
        }
        Err(err) => {
            tracing::warn!(code = err.error_code(), field = %err.field, "Request rejected");
            println!("error: {}", err.error_code());
            println!("  field: {}", err.field);
            println!("  value: {}", err.value);
            println!("  {}", err.kind);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> Config {
        Config {
            output: OutputFormat::Json,
            extra_extensions: vec!["timescaledb".to_string()],
            log_file: None,
        }
    }

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pgplan-cli-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_request_by_extension() {
        let yaml = write_temp(
            "request.yaml",
            "instance_name: orders-db\nproject_id: test-project\nregion: us-central1\n",
        );
        assert_eq!(load_request(&yaml).unwrap().instance_name, "orders-db");

        let json = write_temp(
            "request.json",
            r#"{"instance_name": "orders-db", "project_id": "test-project", "region": "us-central1"}"#,
        );
        assert_eq!(load_request(&json).unwrap().region, "us-central1");

        let toml = write_temp("request.toml", "instance_name = 'orders-db'");
        assert!(load_request(&toml).is_err());
    }

    #[test]
    fn test_report_redacts_passwords() {
        let mut request = Request::new("orders-db", "test-project", "us-central1");
        request.users.push("app_user", pgplan_models::UserSpec::with_role("readwrite"));
        request.generate_permission_script = true;

        let report = build_report(&config(), &request, false).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["plan"]["users"]["app_user"]["secret"]["password"], "********");
        assert!(json["scripts"]["permissions"]["app_user"].is_string());
        assert!(json.get("resolved_at").is_some());

        let report = build_report(&config(), &request, true).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        let password = json["plan"]["users"]["app_user"]["secret"]["password"].as_str().unwrap();
        assert_eq!(password.len(), 16);
    }

    #[test]
    fn test_extra_extensions_from_config() {
        let mut request = Request::new("orders-db", "test-project", "us-central1");
        request.postgresql_extensions = vec!["timescaledb".to_string()];
        assert!(build_report(&config(), &request, false).is_ok());

        let plain = Config {
            extra_extensions: Vec::new(),
            ..config()
        };
        let err = build_report(&plain, &request, false).unwrap_err();
        let plan_err = err.downcast_ref::<pgplan_resolver::PlanError>().unwrap();
        assert_eq!(plan_err.error_code(), "UNSUPPORTED_EXTENSION");
    }
}
