//! pgplan Resolver - turns a deployment request into a validated Cloud SQL plan
//!
//! This crate merges presets with explicit overrides, validates every field,
//! derives engine tuning flags, decides how each user's password is obtained
//! and computes the outputs callers need to connect. It performs no I/O and
//! never logs.
//!
//! # Usage
//!
//! ```rust,no_run
//! use pgplan_models::Request;
//! use pgplan_resolver::{derive, resolve};
//!
//! # fn example() -> Result<(), pgplan_resolver::PlanError> {
//! let mut request = Request::new("orders-db", "my-project", "us-central1");
//! request.preset = Some("balanced".to_string());
//!
//! let plan = resolve(&request)?;
//! let outputs = derive(&plan);
//! println!("{}", outputs.cloud_sql_proxy_command);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod entities;
pub mod error;
pub mod flags;
pub mod outputs;
pub mod presets;
pub mod resolver;
pub mod scripts;
pub mod secrets;
pub mod validators;

pub use catalog::Catalog;
pub use error::{ErrorKind, PlanError};
pub use outputs::derive;
pub use presets::{Preset, PresetSizing, SizingBuilder};
pub use resolver::Resolver;
pub use scripts::{render_extension_script, render_permission_scripts, ScriptError};

use pgplan_models::{Request, ResolvedPlan};

/// Resolve `request` with the default catalog and the OS random source
pub fn resolve(request: &Request) -> Result<ResolvedPlan, PlanError> {
    Resolver::new().resolve(request)
}
