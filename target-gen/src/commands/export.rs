use std::path::Path;

use anyhow::{Context, Result};
use gd32f30x_flash_target::{FlashProperties, Variant};
use serde::Serialize;

/// The YAML document written by `target-gen export`.
#[derive(Debug, Serialize)]
pub struct ExportedDevice {
    pub name: String,
    pub variant: String,
    pub dual_bank: bool,
    pub flash_properties: FlashProperties,
}

impl From<Variant> for ExportedDevice {
    fn from(variant: Variant) -> Self {
        let device = variant.device();
        ExportedDevice {
            name: device.name.to_owned(),
            variant: variant.to_string(),
            dual_bank: variant.dual_bank(),
            flash_properties: device.properties(),
        }
    }
}

pub fn cmd_export(variant: Variant, output: Option<&Path>) -> Result<()> {
    let yaml = serde_yaml::to_string(&ExportedDevice::from(variant))
        .context("Failed to serialize the device description")?;

    match output {
        Some(path) => {
            std::fs::write(path, yaml)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            tracing::info!("Exported {} to {}", variant, path.display());
        }
        None => print!("{yaml}"),
    }

    Ok(())
}
