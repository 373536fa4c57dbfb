//! Flash device descriptions for the GD32F30x FMC flash agent
//!
//! A programming host needs to know the geometry of the flash it is about to
//! touch before it calls into the agent: where the flash starts, how large it
//! is, how large a program page is and how the erase sectors are laid out.
//! This crate contains those descriptions for every supported GD32F30x
//! variant, in three forms:
//!
//! - [`FlashDevice`], the static record compiled into the agent,
//! - [`FlashDeviceDescription`], its fixed `#[repr(C)]` binary layout as
//!   expected by CMSIS-style hosts, together with an encoder and decoder,
//! - [`FlashProperties`], an owned, serializable view used by host tooling.
//!
//! Only the first form is needed on the target. Disable the default `std`
//! feature there, the crate is `no_std` without it.
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]

mod description;
mod flash_device;
#[cfg(feature = "std")]
mod flash_properties;
mod memory;
#[cfg(feature = "std")]
pub(crate) mod serialize;
mod variant;

#[cfg(feature = "std")]
pub use description::ParsedFlashDevice;
pub use description::{
    FlashDeviceDescription, FlashSector, HEADER_SIZE, MAX_SECTORS, SECTOR_INFO_SIZE,
};
pub use flash_device::{
    DescriptorError, DeviceType, EraseRegion, FlashDevice, FLASH_DRV_VERS, SECTOR_END,
};
#[cfg(feature = "std")]
pub use flash_properties::FlashProperties;
pub use memory::{PageInfo, SectorDescription, SectorInfo};
#[cfg(feature = "std")]
pub use variant::ParseVariantError;
pub use variant::{Variant, CONNECTIVITY, EXTRA_DENSITY, HIGH_DENSITY, OPTION_BYTES};
