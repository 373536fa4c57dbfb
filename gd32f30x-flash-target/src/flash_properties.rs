use crate::description::ParsedFlashDevice;
use crate::flash_device::FlashDevice;
use crate::memory::{PageInfo, SectorDescription, SectorInfo};
use crate::serialize::{hex_range, hex_u_int};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Properties of flash memory, which
/// are used when programming Flash memory.
///
/// This is the owned form of a [`FlashDevice`] that host tooling exports
/// to YAML or JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FlashProperties {
    /// The range of the device flash.
    #[serde(with = "hex_range")]
    pub address_range: Range<u32>,
    /// The page size of the device flash.
    #[serde(with = "hex_u_int")]
    pub page_size: u32,
    /// The value of a byte in flash that was just erased.
    #[serde(with = "hex_u_int")]
    pub erased_byte_value: u8,
    /// The approximative time it takes to program a page.
    pub program_page_timeout: u32,
    /// The approximative time it takes to erase a sector.
    pub erase_sector_timeout: u32,
    /// The available sectors of the device flash.
    #[serde(default)]
    pub sectors: Vec<SectorDescription>,
}

impl Default for FlashProperties {
    fn default() -> Self {
        FlashProperties {
            address_range: 0..0,
            page_size: 0,
            erased_byte_value: 0,
            program_page_timeout: 0,
            erase_sector_timeout: 0,
            sectors: vec![],
        }
    }
}

impl From<&FlashDevice> for FlashProperties {
    fn from(device: &FlashDevice) -> Self {
        FlashProperties {
            address_range: device.address_range(),
            page_size: device.page_size,
            erased_byte_value: device.erased_value,
            program_page_timeout: device.program_timeout_ms,
            erase_sector_timeout: device.erase_timeout_ms,
            sectors: device.sectors.to_vec(),
        }
    }
}

impl From<&ParsedFlashDevice> for FlashProperties {
    fn from(device: &ParsedFlashDevice) -> Self {
        FlashProperties {
            address_range: device.start_address..device.start_address + device.size,
            page_size: device.page_size,
            erased_byte_value: device.erased_value,
            program_page_timeout: device.program_timeout_ms,
            erase_sector_timeout: device.erase_timeout_ms,
            sectors: device.sectors.clone(),
        }
    }
}

impl FlashProperties {
    /// Try to retrieve the information about the flash sector
    /// which contains `address`.
    ///
    /// If the `address` is not part of the flash, None will
    /// be returned.
    pub fn sector_info(&self, address: u32) -> Option<SectorInfo> {
        if !self.address_range.contains(&address) {
            return None;
        }

        let offset_address = address - self.address_range.start;

        let containing_sector = self
            .sectors
            .iter()
            .rfind(|s| s.address <= offset_address)?;

        let sector_index = (offset_address - containing_sector.address) / containing_sector.size;

        let sector_address = self.address_range.start
            + containing_sector.address
            + sector_index * containing_sector.size;

        Some(SectorInfo {
            base_address: sector_address,
            size: containing_sector.size,
        })
    }

    /// Returns the necessary information about the page which `address` resides in
    /// if the address is inside the flash region.
    pub fn page_info(&self, address: u32) -> Option<PageInfo> {
        if !self.address_range.contains(&address) || self.page_size == 0 {
            return None;
        }

        Some(PageInfo {
            base_address: address - (address % self.page_size),
            size: self.page_size,
        })
    }

    /// Iterate over all the sectors of the flash.
    pub fn iter_sectors(&self) -> impl Iterator<Item = SectorInfo> + '_ {
        let mut addr = self.address_range.start;
        let mut desc_idx = 0;
        std::iter::from_fn(move || {
            if addr >= self.address_range.end {
                return None;
            }

            // Advance desc_idx if needed
            if let Some(next_desc) = self.sectors.get(desc_idx + 1) {
                if self.address_range.start + next_desc.address <= addr {
                    desc_idx += 1;
                }
            }

            let size = self.sectors.get(desc_idx)?.size;
            if size == 0 {
                return None;
            }

            let sector = SectorInfo {
                base_address: addr,
                size,
            };
            addr += size;

            Some(sector)
        })
    }

    /// Returns true if the entire contents of the argument array equal the erased byte value.
    pub fn is_erased(&self, data: &[u8]) -> bool {
        data.iter().all(|b| *b == self.erased_byte_value)
    }
}
