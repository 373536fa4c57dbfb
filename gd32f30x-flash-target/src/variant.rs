use crate::flash_device::{DeviceType, FlashDevice, FLASH_DRV_VERS};
use crate::memory::SectorDescription;
use core::fmt;
#[cfg(feature = "std")]
use core::str::FromStr;

const MAIN_FLASH_START: u32 = 0x0800_0000;

/// 512 KiB of 2 KiB pages.
pub const HIGH_DENSITY: FlashDevice = FlashDevice {
    driver_version: FLASH_DRV_VERS,
    name: "GD32F30x High-density FMC ",
    device_type: DeviceType::OnChip,
    start_address: MAIN_FLASH_START,
    size: 0x0008_0000,
    page_size: 1024,
    erased_value: 0xFF,
    program_timeout_ms: 100,
    erase_timeout_ms: 3000,
    sectors: &[SectorDescription {
        size: 0x0800,
        address: 0x0000_0000,
    }],
};

/// 3 MiB: 256 sectors of 2 KiB followed by 640 sectors of 4 KiB.
pub const EXTRA_DENSITY: FlashDevice = FlashDevice {
    driver_version: FLASH_DRV_VERS,
    name: "GD32F30x Extra-density FMC ",
    device_type: DeviceType::OnChip,
    start_address: MAIN_FLASH_START,
    size: 0x0030_0000,
    page_size: 1024,
    erased_value: 0xFF,
    program_timeout_ms: 100,
    erase_timeout_ms: 3000,
    sectors: &[
        SectorDescription {
            size: 0x0800,
            address: 0x0000_0000,
        },
        SectorDescription {
            size: 0x1000,
            address: 0x0008_0000,
        },
    ],
};

/// 1 MiB: 256 sectors of 2 KiB followed by 128 sectors of 4 KiB.
pub const CONNECTIVITY: FlashDevice = FlashDevice {
    driver_version: FLASH_DRV_VERS,
    name: "GD32F30x Connectivity line FMC ",
    device_type: DeviceType::OnChip,
    start_address: MAIN_FLASH_START,
    size: 0x0010_0000,
    page_size: 1024,
    erased_value: 0xFF,
    program_timeout_ms: 100,
    erase_timeout_ms: 3000,
    sectors: &[
        SectorDescription {
            size: 0x0800,
            address: 0x0000_0000,
        },
        SectorDescription {
            size: 0x1000,
            address: 0x0008_0000,
        },
    ],
};

/// The 16 byte option byte block.
pub const OPTION_BYTES: FlashDevice = FlashDevice {
    driver_version: FLASH_DRV_VERS,
    name: "GD32F30x FMC OB",
    device_type: DeviceType::OnChip,
    start_address: 0x1FFF_F800,
    size: 0x0000_0010,
    page_size: 16,
    erased_value: 0xFF,
    program_timeout_ms: 3000,
    erase_timeout_ms: 3000,
    sectors: &[SectorDescription {
        size: 0x0010,
        address: 0x0000_0000,
    }],
};

/// The flash device a build of the agent drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Single bank main flash, up to 512 KiB.
    HighDensity,
    /// Dual bank main flash, 3 MiB.
    ExtraDensity,
    /// Dual bank main flash, 1 MiB.
    Connectivity,
    /// The option byte block.
    OptionBytes,
}

impl Variant {
    /// All variants, main flash first.
    pub const ALL: [Variant; 4] = [
        Variant::HighDensity,
        Variant::ExtraDensity,
        Variant::Connectivity,
        Variant::OptionBytes,
    ];

    /// The variant selected by the crate features.
    pub const fn from_build() -> Self {
        if cfg!(feature = "option-bytes") {
            Variant::OptionBytes
        } else if cfg!(feature = "cl") {
            Variant::Connectivity
        } else if cfg!(feature = "xd") {
            Variant::ExtraDensity
        } else {
            Variant::HighDensity
        }
    }

    /// The static device description of this variant.
    pub const fn device(self) -> &'static FlashDevice {
        match self {
            Variant::HighDensity => &HIGH_DENSITY,
            Variant::ExtraDensity => &EXTRA_DENSITY,
            Variant::Connectivity => &CONNECTIVITY,
            Variant::OptionBytes => &OPTION_BYTES,
        }
    }

    /// Whether the main flash is split over two FMC register banks.
    pub const fn dual_bank(self) -> bool {
        matches!(self, Variant::ExtraDensity | Variant::Connectivity)
    }

    /// Whether this variant programs the option bytes instead of main flash.
    pub const fn is_option_bytes(self) -> bool {
        matches!(self, Variant::OptionBytes)
    }

    /// The short name used for feature flags and on the command line.
    pub const fn short_name(self) -> &'static str {
        match self {
            Variant::HighDensity => "hd",
            Variant::ExtraDensity => "xd",
            Variant::Connectivity => "cl",
            Variant::OptionBytes => "option-bytes",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// The string did not name a known variant.
#[cfg(feature = "std")]
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("Unknown device variant '{0}', expected one of hd, xd, cl or option-bytes.")]
pub struct ParseVariantError(pub String);

#[cfg(feature = "std")]
impl FromStr for Variant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hd" | "high-density" => Ok(Variant::HighDensity),
            "xd" | "extra-density" => Ok(Variant::ExtraDensity),
            "cl" | "connectivity" => Ok(Variant::Connectivity),
            "ob" | "option-bytes" => Ok(Variant::OptionBytes),
            _ => Err(ParseVariantError(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(Variant::HighDensity; "high density")]
    #[test_case(Variant::ExtraDensity; "extra density")]
    #[test_case(Variant::Connectivity; "connectivity line")]
    #[test_case(Variant::OptionBytes; "option bytes")]
    fn regions_cover_the_whole_device(variant: Variant) {
        let device = variant.device();

        assert_eq!(device.validate(), Ok(()));

        let mut expected_offset = 0;
        for region in device.regions() {
            assert_eq!(region.offset, expected_offset);
            assert!(region.sector_count > 0);
            expected_offset += region.size();
        }
        assert_eq!(expected_offset, device.size);
    }

    #[test_case(Variant::HighDensity, 256)]
    #[test_case(Variant::ExtraDensity, 256 + 640)]
    #[test_case(Variant::Connectivity, 256 + 128)]
    #[test_case(Variant::OptionBytes, 1)]
    fn sector_counts(variant: Variant, expected: u32) {
        assert_eq!(variant.device().sector_count(), expected);
    }

    #[test]
    fn only_xd_and_cl_have_two_banks() {
        let dual: Vec<_> = Variant::ALL
            .into_iter()
            .filter(|variant| variant.dual_bank())
            .collect();

        assert_eq!(dual, vec![Variant::ExtraDensity, Variant::Connectivity]);
    }

    #[test]
    fn device_names_keep_their_trailing_space() {
        for variant in [
            Variant::HighDensity,
            Variant::ExtraDensity,
            Variant::Connectivity,
        ] {
            assert!(variant.device().name.ends_with("FMC "), "{variant}");
        }
        assert_eq!(OPTION_BYTES.name, "GD32F30x FMC OB");
    }

    #[cfg(feature = "std")]
    #[test]
    fn names_round_trip() {
        for variant in Variant::ALL {
            assert_eq!(variant.to_string().parse::<Variant>(), Ok(variant));
        }
        assert_eq!("OB".parse::<Variant>(), Ok(Variant::OptionBytes));
        assert!("f103".parse::<Variant>().is_err());
    }

    #[test]
    fn default_build_is_high_density() {
        if !cfg!(any(feature = "xd", feature = "cl", feature = "option-bytes")) {
            assert_eq!(Variant::from_build(), Variant::HighDensity);
        }
    }
}
