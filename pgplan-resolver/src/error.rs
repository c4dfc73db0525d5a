//! Resolution errors
//!
//! Every failure is a validation failure: nothing here is transient or
//! retryable. Each error names the offending field path
//! (e.g. `users.admin_user.role`) and the value that was rejected.

use std::fmt;
use thiserror::Error;

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnsupportedEngineVersion,
    UnknownRole,
    InvalidCidr,
    InvalidIdentifier,
    DuplicateIdentifier,
    DiskSizeTooSmall,
    AutoresizeLimitBelowDiskSize,
    MissingSizingField,
    UnsupportedExtension,
    PasswordTooShort,
    MultipleFailoverTargets,
    /// Value outside an enumerated set (edition, SSL mode, ...)
    UnsupportedValue,
    /// Number outside the provider-accepted range
    OutOfRange,
    InvalidMachineType,
    /// Two settings that cannot be combined
    ConflictingSettings,
}

impl ErrorKind {
    /// Stable code for programmatic handling
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedEngineVersion => "UNSUPPORTED_ENGINE_VERSION",
            Self::UnknownRole => "UNKNOWN_ROLE",
            Self::InvalidCidr => "INVALID_CIDR",
            Self::InvalidIdentifier => "INVALID_IDENTIFIER",
            Self::DuplicateIdentifier => "DUPLICATE_IDENTIFIER",
            Self::DiskSizeTooSmall => "DISK_SIZE_TOO_SMALL",
            Self::AutoresizeLimitBelowDiskSize => "AUTORESIZE_LIMIT_BELOW_DISK_SIZE",
            Self::MissingSizingField => "MISSING_SIZING_FIELD",
            Self::UnsupportedExtension => "UNSUPPORTED_EXTENSION",
            Self::PasswordTooShort => "PASSWORD_TOO_SHORT",
            Self::MultipleFailoverTargets => "MULTIPLE_FAILOVER_TARGETS",
            Self::UnsupportedValue => "UNSUPPORTED_VALUE",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::InvalidMachineType => "INVALID_MACHINE_TYPE",
            Self::ConflictingSettings => "CONFLICTING_SETTINGS",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::UnsupportedEngineVersion => "unsupported PostgreSQL version",
            Self::UnknownRole => "unknown role (expected admin, readwrite or readonly)",
            Self::InvalidCidr => "invalid CIDR",
            Self::InvalidIdentifier => "invalid identifier",
            Self::DuplicateIdentifier => "duplicate identifier",
            Self::DiskSizeTooSmall => "disk size below the 10 GB minimum",
            Self::AutoresizeLimitBelowDiskSize => "autoresize limit below disk size",
            Self::MissingSizingField => "sizing field required by the custom preset",
            Self::UnsupportedExtension => "unsupported extension",
            Self::PasswordTooShort => "password length below the minimum of 8",
            Self::MultipleFailoverTargets => "more than one failover target",
            Self::UnsupportedValue => "unsupported value",
            Self::OutOfRange => "value out of range",
            Self::InvalidMachineType => "invalid machine type",
            Self::ConflictingSettings => "conflicting settings",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {kind} ('{value}')")]
pub struct PlanError {
    pub kind: ErrorKind,
    /// Dotted path of the offending field
    pub field: String,
    /// The rejected value, rendered as text
    pub value: String,
}

impl PlanError {
    pub fn new(kind: ErrorKind, field: impl Into<String>, value: impl ToString) -> Self {
        Self {
            kind,
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Re-root the field path under `prefix`, e.g. `role` -> `users.app.role`
    pub fn at(mut self, prefix: &str) -> Self {
        self.field = if self.field.is_empty() {
            prefix.to_string()
        } else {
            format!("{}.{}", prefix, self.field)
        };
        self
    }

    pub const fn error_code(&self) -> &'static str {
        self.kind.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_field_and_value() {
        let err = PlanError::new(ErrorKind::UnknownRole, "role", "owner").at("users.admin_user");
        assert_eq!(err.field, "users.admin_user.role");
        assert_eq!(
            err.to_string(),
            "users.admin_user.role: unknown role (expected admin, readwrite or readonly) ('owner')"
        );
        assert_eq!(err.error_code(), "UNKNOWN_ROLE");
    }

    #[test]
    fn test_at_on_empty_field() {
        let err = PlanError::new(ErrorKind::DuplicateIdentifier, "", "office").at("authorized_networks.office");
        assert_eq!(err.field, "authorized_networks.office");
    }
}
