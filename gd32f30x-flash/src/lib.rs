//! # gd32f30x-flash
//!
//! A flash programming agent for the flash memory controller (FMC) of the
//! GigaDevice GD32F30x family, following the CMSIS flash algorithm contract.
//!
//! The agent is written against [`MemoryInterface`]. On the chip it runs on
//! [`VolatileMemory`], on the host it runs on `FakeFmc`, which simulates
//! the controller for tests and dry runs.
//!
//! The crate is `no_std` unless the default `std` feature is enabled. The
//! `gd32f30x-flash-algo` binary builds it that way and exports the CMSIS
//! entry points around a [`FlashAgent`].
//!
//! ```
//! use gd32f30x_flash::{FakeFmc, FlashAgent, Variant};
//!
//! let mut agent = FlashAgent::new(FakeFmc::new(Variant::HighDensity), Variant::HighDensity);
//!
//! assert_eq!(agent.init(0x0800_0000, 8_000_000, 2), 0);
//! assert_eq!(agent.erase_sector(0x0800_0000), 0);
//! assert_eq!(agent.program_page(0x0800_0000, 4, &[0xDE, 0xAD, 0xBE, 0xEF]), 0);
//! assert_eq!(agent.uninit(2), 0);
//!
//! assert_eq!(
//!     agent.memory().read_flash(0x0800_0000, 4),
//!     Some(&[0xDE, 0xAD, 0xBE, 0xEF][..])
//! );
//! ```
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]

mod agent;
mod error;
#[cfg(any(test, feature = "std"))]
mod fake_fmc;
mod logging;
pub mod memory;
pub mod registers;
mod session;
pub mod watchdog;

pub use agent::FlashAgent;
pub use error::{status_of, FlashError, STATUS_FAILED, STATUS_OK};
#[cfg(any(test, feature = "std"))]
pub use fake_fmc::{Access, AccessKind, FakeFmc};
pub use memory::{MemoryError, MemoryInterface, VolatileMemory, WriteRefusedError};
pub use registers::Bank;
pub use session::{ControllerSession, Function};

#[cfg(feature = "std")]
pub use gd32f30x_flash_target::FlashProperties;
pub use gd32f30x_flash_target::{FlashDevice, FlashDeviceDescription, Variant};
