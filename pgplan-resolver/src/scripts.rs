//! SQL scripts an operator runs after the instance exists
//!
//! Templates are embedded at compile time and rendered with `tera`.

use pgplan_models::ResolvedPlan;
use std::collections::BTreeMap;
use tera::{Context as TeraContext, Tera};
use thiserror::Error;

const PERMISSIONS_TEMPLATE: &str = "permissions";
const EXTENSIONS_TEMPLATE: &str = "extensions";

/// Database extensions land in when the plan declares none
const FALLBACK_DATABASE: &str = "postgres";

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

fn templates() -> Result<Tera, ScriptError> {
    let mut tera = Tera::default();
    tera.add_raw_template(PERMISSIONS_TEMPLATE, include_str!("templates/permissions.sql"))?;
    tera.add_raw_template(EXTENSIONS_TEMPLATE, include_str!("templates/extensions.sql"))?;
    Ok(tera)
}

/// One grant script per user, keyed by user name
pub fn render_permission_scripts(
    plan: &ResolvedPlan,
) -> Result<BTreeMap<String, String>, ScriptError> {
    let tera = templates()?;
    let databases: Vec<&str> = plan.databases.keys().map(String::as_str).collect();

    let mut scripts = BTreeMap::new();
    for (name, user) in &plan.users {
        let mut ctx = TeraContext::new();
        ctx.insert("instance", &plan.instance_name);
        ctx.insert("user", name);
        ctx.insert("role", user.role.as_str());
        ctx.insert("databases", &databases);

        scripts.insert(name.clone(), tera.render(PERMISSIONS_TEMPLATE, &ctx)?);
    }
    Ok(scripts)
}

/// `CREATE EXTENSION` for every requested extension in every database.
/// Empty when no extensions are requested.
pub fn render_extension_script(plan: &ResolvedPlan) -> Result<String, ScriptError> {
    if plan.extensions.is_empty() {
        return Ok(String::new());
    }

    let mut databases: Vec<&str> = plan.databases.keys().map(String::as_str).collect();
    if databases.is_empty() {
        databases.push(FALLBACK_DATABASE);
    }

    let mut ctx = TeraContext::new();
    ctx.insert("instance", &plan.instance_name);
    ctx.insert("databases", &databases);
    ctx.insert("extensions", &plan.extensions);
    Ok(templates()?.render(EXTENSIONS_TEMPLATE, &ctx)?)
}
