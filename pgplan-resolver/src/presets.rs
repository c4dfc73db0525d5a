//! Preset catalog and layered sizing
//!
//! Sizing is resolved in three layers, later layers winning field by field:
//! 1. [`SYSTEM_DEFAULT`]
//! 2. the named preset's base values
//! 3. explicit overrides from the request
//!
//! The `custom` preset has no base values and requires every table field to
//! be supplied explicitly.

use pgplan_models::{AvailabilityType, Edition, ResolvedSizing};
use serde::Serialize;

use crate::error::{ErrorKind, PlanError};
use crate::validators;

/// Base values a preset contributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PresetSizing {
    pub machine_type: &'static str,
    pub disk_size_gb: u32,
    pub edition: Edition,
    pub availability_type: AvailabilityType,
}

/// Sizing used when neither a preset nor an override supplies a field
pub const SYSTEM_DEFAULT: PresetSizing = PresetSizing {
    machine_type: "db-custom-2-7680",
    disk_size_gb: 20,
    edition: Edition::Enterprise,
    availability_type: AvailabilityType::Zonal,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Budget,
    Balanced,
    Performance,
    Custom,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Self::Budget, Self::Balanced, Self::Performance, Self::Custom];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "budget" => Some(Self::Budget),
            "balanced" => Some(Self::Balanced),
            "performance" => Some(Self::Performance),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Balanced => "balanced",
            Self::Performance => "performance",
            Self::Custom => "custom",
        }
    }

    /// Catalog row; `None` for `custom`
    pub fn base(&self) -> Option<PresetSizing> {
        match self {
            Self::Budget => Some(PresetSizing {
                machine_type: "db-custom-2-7680",
                disk_size_gb: 100,
                edition: Edition::Enterprise,
                availability_type: AvailabilityType::Zonal,
            }),
            Self::Balanced => Some(PresetSizing {
                machine_type: "db-custom-4-16384",
                disk_size_gb: 500,
                edition: Edition::Enterprise,
                availability_type: AvailabilityType::Regional,
            }),
            Self::Performance => Some(PresetSizing {
                machine_type: "db-custom-8-32768",
                disk_size_gb: 1000,
                edition: Edition::EnterprisePlus,
                availability_type: AvailabilityType::Regional,
            }),
            Self::Custom => None,
        }
    }
}

/// Lookup by name: `(base, found)`. `custom` is found but has no base.
pub fn lookup(name: &str) -> (Option<PresetSizing>, bool) {
    match Preset::from_name(name) {
        Some(preset) => (preset.base(), true),
        None => (None, false),
    }
}

/// Layered merge of preset base values and explicit overrides
#[derive(Debug, Clone, Default)]
pub struct SizingBuilder {
    preset: Option<Preset>,
    machine_type: Option<String>,
    disk_size_gb: Option<u32>,
    edition: Option<Edition>,
    availability_type: Option<AvailabilityType>,
}

impl SizingBuilder {
    pub fn new(preset: Option<Preset>) -> Self {
        Self {
            preset,
            ..Self::default()
        }
    }

    pub fn machine_type(mut self, machine_type: Option<String>) -> Self {
        self.machine_type = machine_type;
        self
    }

    pub fn disk_size_gb(mut self, disk_size_gb: Option<u32>) -> Self {
        self.disk_size_gb = disk_size_gb;
        self
    }

    pub fn edition(mut self, edition: Option<Edition>) -> Self {
        self.edition = edition;
        self
    }

    pub fn availability_type(mut self, availability_type: Option<AvailabilityType>) -> Self {
        self.availability_type = availability_type;
        self
    }

    /// Merge the layers and validate machine type and disk size
    pub fn build(self) -> Result<ResolvedSizing, PlanError> {
        let base = match self.preset {
            Some(Preset::Custom) => {
                self.require_explicit()?;
                SYSTEM_DEFAULT
            }
            Some(preset) => preset.base().unwrap_or(SYSTEM_DEFAULT),
            None => SYSTEM_DEFAULT,
        };

        let machine_type = self
            .machine_type
            .unwrap_or_else(|| base.machine_type.to_string());
        validators::machine_type("machine_type", &machine_type)?;

        let disk_size_gb = validators::disk_size(
            "disk_size_gb",
            self.disk_size_gb.unwrap_or(base.disk_size_gb),
        )?;

        Ok(ResolvedSizing {
            machine_type,
            disk_size_gb,
            edition: self.edition.unwrap_or(base.edition),
            availability_type: self.availability_type.unwrap_or(base.availability_type),
        })
    }

    fn require_explicit(&self) -> Result<(), PlanError> {
        let missing = if self.machine_type.is_none() {
            Some("machine_type")
        } else if self.disk_size_gb.is_none() {
            Some("disk_size_gb")
        } else if self.edition.is_none() {
            Some("edition")
        } else {
            None
        };
        match missing {
            Some(field) => Err(PlanError::new(
                ErrorKind::MissingSizingField,
                field,
                Preset::Custom.as_str(),
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_builds_its_catalog_row() {
        for preset in [Preset::Budget, Preset::Balanced, Preset::Performance] {
            let base = preset.base().unwrap();
            let sizing = SizingBuilder::new(Some(preset)).build().unwrap();
            assert_eq!(sizing.machine_type, base.machine_type);
            assert_eq!(sizing.disk_size_gb, base.disk_size_gb);
            assert_eq!(sizing.edition, base.edition);
            assert_eq!(sizing.availability_type, base.availability_type);
        }
    }

    #[test]
    fn test_override_wins_field_by_field() {
        let sizing = SizingBuilder::new(Some(Preset::Budget))
            .disk_size_gb(Some(5000))
            .build()
            .unwrap();
        assert_eq!(sizing.disk_size_gb, 5000);
        assert_eq!(sizing.machine_type, "db-custom-2-7680");
        assert_eq!(sizing.edition, Edition::Enterprise);
    }

    #[test]
    fn test_no_preset_uses_system_default() {
        let sizing = SizingBuilder::new(None).build().unwrap();
        assert_eq!(sizing.machine_type, SYSTEM_DEFAULT.machine_type);
        assert_eq!(sizing.disk_size_gb, SYSTEM_DEFAULT.disk_size_gb);
        assert_eq!(sizing.availability_type, AvailabilityType::Zonal);
    }

    #[test]
    fn test_custom_requires_every_field() {
        let err = SizingBuilder::new(Some(Preset::Custom))
            .machine_type(Some("db-custom-16-65536".to_string()))
            .edition(Some(Edition::EnterprisePlus))
            .build()
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingSizingField);
        assert_eq!(err.field, "disk_size_gb");
        assert_eq!(err.value, "custom");

        let sizing = SizingBuilder::new(Some(Preset::Custom))
            .machine_type(Some("db-custom-16-65536".to_string()))
            .disk_size_gb(Some(2000))
            .edition(Some(Edition::EnterprisePlus))
            .build()
            .unwrap();
        assert_eq!(sizing.machine_type, "db-custom-16-65536");
        assert_eq!(sizing.disk_size_gb, 2000);
        assert_eq!(sizing.availability_type, SYSTEM_DEFAULT.availability_type);
    }

    #[test]
    fn test_build_validates_disk_size() {
        let err = SizingBuilder::new(None).disk_size_gb(Some(5)).build().unwrap_err();
        assert_eq!(err.kind, ErrorKind::DiskSizeTooSmall);
        assert_eq!(err.field, "disk_size_gb");
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("budget"), (Preset::Budget.base(), true));
        assert_eq!(lookup("custom"), (None, true));
        assert_eq!(lookup("huge"), (None, false));
    }
}
