#[cfg(feature = "std")]
use crate::serialize::hex_u_int;
use core::ops::Range;
#[cfg(feature = "std")]
use serde::{Deserialize, Serialize};

/// Holds information about a specific, individual flash
/// sector.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SectorInfo {
    /// Base address of the flash sector
    pub base_address: u32,
    /// Size of the flash sector
    pub size: u32,
}

impl SectorInfo {
    /// Returns the address range of the sector.
    pub fn address_range(&self) -> Range<u32> {
        self.base_address..self.base_address + self.size
    }
}

/// Information about a group of flash sectors.
///
/// The SectorDescription means that, starting at the
/// flash address `address`, all following sectors will
/// have a size of `size`. This is valid until either the
/// end of the flash, or until another `SectorDescription`
/// changes the sector size.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(Serialize, Deserialize))]
pub struct SectorDescription {
    /// Size of each individual flash sector
    #[cfg_attr(feature = "std", serde(with = "hex_u_int"))]
    pub size: u32,
    /// Start address of the group of flash sectors, relative
    /// to the start address of the flash.
    #[cfg_attr(feature = "std", serde(with = "hex_u_int"))]
    pub address: u32,
}

/// Holds information about a page in flash.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Base address of the page in flash.
    pub base_address: u32,
    /// Size of the page
    pub size: u32,
}

impl PageInfo {
    /// Returns the address range of the page.
    pub fn address_range(&self) -> Range<u32> {
        self.base_address..self.base_address + self.size
    }
}
