use anyhow::Result;
use pgplan_resolver::presets::SYSTEM_DEFAULT;
use pgplan_resolver::{Preset, PresetSizing};
use serde::Serialize;

use crate::cli::PresetFormat;

#[derive(Debug, Serialize)]
struct PresetRow {
    name: &'static str,
    /// `None` for presets that take every value from the request
    sizing: Option<PresetSizing>,
}

fn rows() -> Vec<PresetRow> {
    Preset::ALL
        .iter()
        .map(|preset| PresetRow {
            name: preset.as_str(),
            sizing: preset.base(),
        })
        .collect()
}

pub fn run_presets(output: PresetFormat) -> Result<()> {
    let rows = rows();

    match output {
        PresetFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        PresetFormat::Table => {
            println!(
                "{:<12} {:<20} {:<10} {:<16} {:<10}",
                "PRESET", "MACHINE TYPE", "DISK", "EDITION", "AVAILABILITY"
            );
            println!("{}", "-".repeat(72));

            for row in &rows {
                match &row.sizing {
                    Some(sizing) => println!(
                        "{:<12} {:<20} {:<10} {:<16} {:<10}",
                        row.name,
                        sizing.machine_type,
                        format!("{}GB", sizing.disk_size_gb),
                        sizing.edition.as_str(),
                        sizing.availability_type.as_str()
                    ),
                    None => println!(
                        "{:<12} {:<20} {:<10} {:<16} {:<10}",
                        row.name, "(required)", "(required)", "(required)", "-"
                    ),
                }
            }

            println!();
            println!(
                "Without a preset: {}, {}GB, {}, {}",
                SYSTEM_DEFAULT.machine_type,
                SYSTEM_DEFAULT.disk_size_gb,
                SYSTEM_DEFAULT.edition.as_str(),
                SYSTEM_DEFAULT.availability_type.as_str()
            );
        }
    }

    Ok(())
}
