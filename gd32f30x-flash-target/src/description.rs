//! The fixed binary layout of a flash device description.
//!
//! Hosts locate the description through the `FlashDevice` symbol of the agent
//! and read it as a 160 byte little endian header followed by
//! `{size, address}` pairs, terminated by [`SECTOR_END`].

use crate::flash_device::{FlashDevice, SECTOR_END};
#[cfg(feature = "std")]
use crate::{flash_device::validate_regions, memory::SectorDescription, DescriptorError};
#[cfg(feature = "std")]
use scroll::{Pread, Pwrite, LE};

/// Size of the header preceding the sector list.
pub const HEADER_SIZE: usize = 160;
/// Size of one sector list entry.
pub const SECTOR_INFO_SIZE: usize = 8;
/// Capacity of the sector list in the static layout.
pub const MAX_SECTORS: usize = 512;

const NAME_LENGTH: usize = 128;

#[cfg(feature = "std")]
mod offsets {
    pub(super) const NAME: usize = 2;
    pub(super) const DEVICE_TYPE: usize = 130;
    pub(super) const START_ADDRESS: usize = 132;
    pub(super) const SIZE: usize = 136;
    pub(super) const PAGE_SIZE: usize = 140;
    pub(super) const RESERVED: usize = 144;
    pub(super) const ERASED_VALUE: usize = 148;
    pub(super) const PROGRAM_TIMEOUT: usize = 152;
    pub(super) const ERASE_TIMEOUT: usize = 156;
}

/// One entry of the sector list.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FlashSector {
    /// Size of the sectors in this group.
    pub size: u32,
    /// Offset of the group from the device start.
    pub address: u32,
}

impl FlashSector {
    /// The sentinel entry terminating the list.
    pub const END: FlashSector = FlashSector {
        size: SECTOR_END,
        address: SECTOR_END,
    };
}

/// The description exactly as the host reads it from target memory.
#[repr(C)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashDeviceDescription {
    /// Driver version.
    pub vers: u16,
    /// NUL terminated device name.
    pub dev_name: [u8; NAME_LENGTH],
    /// Device type.
    pub dev_type: u16,
    /// Device start address.
    pub dev_addr: u32,
    /// Device size in bytes.
    pub device_size: u32,
    /// Programming page size.
    pub page_size: u32,
    /// Must be 0.
    pub _reserved: u32,
    /// Content of erased memory.
    pub empty: u8,
    /// Program page timeout in milliseconds.
    pub program_time_out: u32,
    /// Erase sector timeout in milliseconds.
    pub erase_time_out: u32,
    /// Sector list, terminated by [`FlashSector::END`].
    pub flash_sectors: [FlashSector; MAX_SECTORS],
}

const _: () = assert!(
    core::mem::size_of::<FlashDeviceDescription>() == HEADER_SIZE + MAX_SECTORS * SECTOR_INFO_SIZE
);

impl FlashDeviceDescription {
    /// Lays out `device` for placement in the `DeviceData` section.
    ///
    /// Names longer than 127 bytes are truncated so the field stays NUL
    /// terminated. Sector groups beyond the list capacity are dropped.
    pub const fn from_device(device: &FlashDevice) -> Self {
        let mut dev_name = [0u8; NAME_LENGTH];
        let name = device.name.as_bytes();
        let mut i = 0;
        while i < name.len() && i < NAME_LENGTH - 1 {
            dev_name[i] = name[i];
            i += 1;
        }

        let mut flash_sectors = [FlashSector::END; MAX_SECTORS];
        let mut i = 0;
        while i < device.sectors.len() && i < MAX_SECTORS - 1 {
            flash_sectors[i] = FlashSector {
                size: device.sectors[i].size,
                address: device.sectors[i].address,
            };
            i += 1;
        }

        FlashDeviceDescription {
            vers: device.driver_version,
            dev_name,
            dev_type: device.device_type as u16,
            dev_addr: device.start_address,
            device_size: device.size,
            page_size: device.page_size,
            _reserved: 0,
            empty: device.erased_value,
            program_time_out: device.program_timeout_ms,
            erase_time_out: device.erase_timeout_ms,
            flash_sectors,
        }
    }
}

#[cfg(feature = "std")]
impl FlashDevice {
    /// Encodes the header, the sector list and the terminating sentinel.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DescriptorError> {
        let mut data = vec![0u8; HEADER_SIZE + SECTOR_INFO_SIZE * (self.sectors.len() + 1)];

        data.pwrite_with(self.driver_version, 0, LE)?;
        let name = self.name.as_bytes();
        let name_length = name.len().min(NAME_LENGTH - 1);
        data[offsets::NAME..offsets::NAME + name_length].copy_from_slice(&name[..name_length]);
        data.pwrite_with(self.device_type as u16, offsets::DEVICE_TYPE, LE)?;
        data.pwrite_with(self.start_address, offsets::START_ADDRESS, LE)?;
        data.pwrite_with(self.size, offsets::SIZE, LE)?;
        data.pwrite_with(self.page_size, offsets::PAGE_SIZE, LE)?;
        data.pwrite_with(0u32, offsets::RESERVED, LE)?;
        data.pwrite_with(self.erased_value, offsets::ERASED_VALUE, LE)?;
        data.pwrite_with(self.program_timeout_ms, offsets::PROGRAM_TIMEOUT, LE)?;
        data.pwrite_with(self.erase_timeout_ms, offsets::ERASE_TIMEOUT, LE)?;

        let mut offset = HEADER_SIZE;
        for sector in self.sectors.iter().chain(std::iter::once(&SectorDescription {
            size: SECTOR_END,
            address: SECTOR_END,
        })) {
            data.pwrite_with(sector.size, offset, LE)?;
            data.pwrite_with(sector.address, offset + 4, LE)?;
            offset += SECTOR_INFO_SIZE;
        }

        Ok(data)
    }

    /// Decodes a description blob, for example one read out of an agent binary.
    pub fn parse(data: &[u8]) -> Result<ParsedFlashDevice, DescriptorError> {
        ParsedFlashDevice::parse(data)
    }
}

/// A description decoded from its binary layout.
#[cfg(feature = "std")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFlashDevice {
    /// Driver version.
    pub driver_version: u16,
    /// Device name, up to the first NUL.
    pub name: String,
    /// Raw device type code.
    pub device_type: u16,
    /// Device start address.
    pub start_address: u32,
    /// Device size in bytes.
    pub size: u32,
    /// Programming page size.
    pub page_size: u32,
    /// Content of erased memory.
    pub erased_value: u8,
    /// Program page timeout in milliseconds.
    pub program_timeout_ms: u32,
    /// Erase sector timeout in milliseconds.
    pub erase_timeout_ms: u32,
    /// Sector groups before the sentinel.
    pub sectors: Vec<SectorDescription>,
}

#[cfg(feature = "std")]
impl ParsedFlashDevice {
    /// Decodes `data`. The sector list ends at the sentinel or at the end of
    /// `data`, whichever comes first.
    pub fn parse(data: &[u8]) -> Result<Self, DescriptorError> {
        if data.len() < HEADER_SIZE {
            return Err(DescriptorError::Truncated {
                length: data.len(),
                required: HEADER_SIZE,
            });
        }

        let raw_name = &data[offsets::NAME..offsets::NAME + NAME_LENGTH];
        let name_length = raw_name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(NAME_LENGTH);

        let mut sectors = vec![];
        let mut offset = HEADER_SIZE;
        while offset + SECTOR_INFO_SIZE <= data.len() {
            let size: u32 = data.pread_with(offset, LE)?;
            let address: u32 = data.pread_with(offset + 4, LE)?;
            if size == SECTOR_END || address == SECTOR_END {
                break;
            }
            sectors.push(SectorDescription { size, address });
            offset += SECTOR_INFO_SIZE;
        }

        Ok(Self {
            driver_version: data.pread_with(0, LE)?,
            name: String::from_utf8_lossy(&raw_name[..name_length]).into_owned(),
            device_type: data.pread_with(offsets::DEVICE_TYPE, LE)?,
            start_address: data.pread_with(offsets::START_ADDRESS, LE)?,
            size: data.pread_with(offsets::SIZE, LE)?,
            page_size: data.pread_with(offsets::PAGE_SIZE, LE)?,
            erased_value: data.pread_with(offsets::ERASED_VALUE, LE)?,
            program_timeout_ms: data.pread_with(offsets::PROGRAM_TIMEOUT, LE)?,
            erase_timeout_ms: data.pread_with(offsets::ERASE_TIMEOUT, LE)?,
            sectors,
        })
    }

    /// Checks the erase regions the same way as [`FlashDevice::validate`].
    pub fn validate(&self) -> Result<(), DescriptorError> {
        validate_regions(self.size, &self.sectors)
    }
}
