use std::path::Path;

use anyhow::{anyhow, Context, Result};
use gd32f30x_flash_target::{DeviceType, FlashDevice, FlashProperties, Variant};

pub fn cmd_blob(variant: Variant, output: &Path) -> Result<()> {
    let data = variant
        .device()
        .to_bytes()
        .with_context(|| format!("Failed to encode the {variant} description"))?;

    std::fs::write(output, &data)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    println!(
        "Wrote {} bytes describing {} to {}",
        data.len(),
        variant.device().name.trim_end(),
        output.display()
    );

    Ok(())
}

pub fn cmd_decode(input: &Path, offset: u32) -> Result<()> {
    let data =
        std::fs::read(input).with_context(|| format!("Failed to read '{}'", input.display()))?;

    let data = data.get(offset as usize..).ok_or_else(|| {
        anyhow!(
            "Offset {offset:#x} lies beyond the end of '{}' ({} bytes)",
            input.display(),
            data.len()
        )
    })?;

    let device = FlashDevice::parse(data).context("Failed to decode the description")?;
    device
        .validate()
        .context("The decoded description has an inconsistent sector layout")?;

    if DeviceType::from_raw(device.device_type).is_none() {
        tracing::warn!("Unknown device type {}", device.device_type);
    }

    println!("name: {}", device.name);
    println!("driver_version: {:#06x}", device.driver_version);
    print!(
        "{}",
        serde_yaml::to_string(&FlashProperties::from(&device))
            .context("Failed to serialize the decoded description")?
    );

    match Variant::ALL
        .into_iter()
        .find(|variant| variant.device().name == device.name)
    {
        Some(variant) => println!("variant: {variant}"),
        None => println!("variant: unknown"),
    }

    Ok(())
}
