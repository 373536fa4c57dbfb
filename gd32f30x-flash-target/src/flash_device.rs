use crate::memory::SectorDescription;
#[cfg(feature = "std")]
use crate::serialize::hex_u_int;
#[cfg(feature = "std")]
use crate::FlashProperties;
use core::ops::Range;
#[cfg(feature = "std")]
use serde::Serialize;

/// Version of the flash driver interface the descriptions conform to.
pub const FLASH_DRV_VERS: u16 = 0x0101;

/// Marks the end of the sector list in the binary layout.
pub const SECTOR_END: u32 = 0xFFFF_FFFF;

/// The kind of memory a flash algorithm programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(Serialize), serde(rename_all = "kebab-case"))]
#[repr(u16)]
pub enum DeviceType {
    /// Unknown device type.
    Unknown = 0,
    /// Flash that is part of the microcontroller.
    OnChip = 1,
    /// External flash with an 8-bit bus.
    Ext8Bit = 2,
    /// External flash with a 16-bit bus.
    Ext16Bit = 3,
    /// External flash with a 32-bit bus.
    Ext32Bit = 4,
    /// External flash behind SPI.
    ExtSpi = 5,
}

impl DeviceType {
    /// Maps the raw `devType` field, returning `None` for unknown codes.
    pub fn from_raw(value: u16) -> Option<Self> {
        Some(match value {
            0 => Self::Unknown,
            1 => Self::OnChip,
            2 => Self::Ext8Bit,
            3 => Self::Ext16Bit,
            4 => Self::Ext32Bit,
            5 => Self::ExtSpi,
            _ => return None,
        })
    }
}

/// Static description of a flash device, compiled into the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Serialize))]
pub struct FlashDevice {
    /// Interface version, always [`FLASH_DRV_VERS`].
    pub driver_version: u16,
    /// Human readable device name, at most 127 bytes.
    pub name: &'static str,
    /// Kind of memory.
    pub device_type: DeviceType,
    /// First address of the device.
    #[cfg_attr(feature = "std", serde(serialize_with = "hex_u_int::serialize"))]
    pub start_address: u32,
    /// Size of the device in bytes.
    #[cfg_attr(feature = "std", serde(serialize_with = "hex_u_int::serialize"))]
    pub size: u32,
    /// Program granularity advertised to the host.
    pub page_size: u32,
    /// Value of an erased byte.
    #[cfg_attr(feature = "std", serde(serialize_with = "hex_u_int::serialize"))]
    pub erased_value: u8,
    /// Advisory timeout for a page program, in milliseconds.
    pub program_timeout_ms: u32,
    /// Advisory timeout for a sector erase, in milliseconds.
    pub erase_timeout_ms: u32,
    /// Erase regions in ascending order, relative to `start_address`.
    pub sectors: &'static [SectorDescription],
}

/// A zone of uniformly sized erase sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EraseRegion {
    /// Offset of the region from the device start.
    pub offset: u32,
    /// Size of every sector in the region.
    pub sector_size: u32,
    /// Number of sectors in the region.
    pub sector_count: u32,
}

impl EraseRegion {
    /// Size of the region in bytes.
    pub fn size(&self) -> u32 {
        self.sector_size * self.sector_count
    }

    /// Offset range of the region, relative to the device start.
    pub fn offset_range(&self) -> Range<u32> {
        self.offset..self.offset + self.size()
    }
}

/// A broken erase region layout or device description blob.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("The device does not describe any erase sectors.")]
    EmptySectorList,
    #[error("The first erase region starts at offset {offset:#x} instead of 0.")]
    FirstRegionNotAtStart { offset: u32 },
    #[error("The erase region at offset {offset:#x} has a sector size of 0.")]
    ZeroSectorSize { offset: u32 },
    #[error("The erase region at offset {offset:#x} does not start after the previous one.")]
    RegionsOutOfOrder { offset: u32 },
    #[error("The erase region at offset {offset:#x} lies outside of the {size:#x} byte device.")]
    RegionOutOfBounds { offset: u32, size: u32 },
    #[error("The erase region at offset {offset:#x} spans {span:#x} bytes, which is not a multiple of its {sector_size:#x} byte sectors.")]
    RegionNotMultiple {
        offset: u32,
        span: u32,
        sector_size: u32,
    },
    #[error("The device description is truncated: got {length} bytes, need at least {required}.")]
    Truncated { length: usize, required: usize },
    #[cfg(feature = "std")]
    #[error("Failed to encode or decode the device description: {0}")]
    Encoding(String),
}

#[cfg(feature = "std")]
impl From<scroll::Error> for DescriptorError {
    fn from(error: scroll::Error) -> Self {
        Self::Encoding(error.to_string())
    }
}

impl FlashDevice {
    /// The address range covered by the device.
    pub fn address_range(&self) -> Range<u32> {
        self.start_address..self.start_address + self.size
    }

    /// Returns whether `address` lies in the device.
    pub fn contains(&self, address: u32) -> bool {
        self.address_range().contains(&address)
    }

    /// Iterates over the erase regions.
    ///
    /// Each region extends up to the start of the next one, the last one up to
    /// the end of the device. Use [`FlashDevice::validate`] to check that these
    /// spans are whole numbers of sectors.
    pub fn regions(&self) -> impl Iterator<Item = EraseRegion> + '_ {
        self.sectors.iter().enumerate().map(move |(index, sector)| {
            let end = self
                .sectors
                .get(index + 1)
                .map_or(self.size, |next| next.address);
            let span = end.saturating_sub(sector.address);
            EraseRegion {
                offset: sector.address,
                sector_size: sector.size,
                sector_count: span.checked_div(sector.size).unwrap_or(0),
            }
        })
    }

    /// Total number of erase sectors.
    pub fn sector_count(&self) -> u32 {
        self.regions().map(|region| region.sector_count).sum()
    }

    /// Checks that the erase regions are contiguous, ascending and cover the
    /// whole device.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        validate_regions(self.size, self.sectors)
    }

    /// The owned, serializable view of this device.
    #[cfg(feature = "std")]
    pub fn properties(&self) -> FlashProperties {
        FlashProperties::from(self)
    }
}

/// Checks a sector list against a device of `size` bytes.
pub(crate) fn validate_regions(
    size: u32,
    sectors: &[SectorDescription],
) -> Result<(), DescriptorError> {
    let first = sectors.first().ok_or(DescriptorError::EmptySectorList)?;
    if first.address != 0 {
        return Err(DescriptorError::FirstRegionNotAtStart {
            offset: first.address,
        });
    }

    for (index, sector) in sectors.iter().enumerate() {
        if sector.size == 0 {
            return Err(DescriptorError::ZeroSectorSize {
                offset: sector.address,
            });
        }
        if sector.address >= size {
            return Err(DescriptorError::RegionOutOfBounds {
                offset: sector.address,
                size,
            });
        }

        let end = match sectors.get(index + 1) {
            Some(next) if next.address <= sector.address => {
                return Err(DescriptorError::RegionsOutOfOrder {
                    offset: next.address,
                })
            }
            Some(next) => next.address,
            None => size,
        };

        let span = end - sector.address;
        if span % sector.size != 0 {
            return Err(DescriptorError::RegionNotMultiple {
                offset: sector.address,
                span,
                sector_size: sector.size,
            });
        }
    }

    Ok(())
}
