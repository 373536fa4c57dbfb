//! The lifecycle operations of the flash agent.
//!
//! A [`ControllerSession`] is created by [`ControllerSession::initialize`],
//! which unlocks the controller, and consumed by
//! [`ControllerSession::deinitialize`], which locks it again. Every operation
//! in between blocks until the FMC reports that it is no longer busy.

mod main_flash;
mod option_bytes;

use crate::error::FlashError;
use crate::logging::{debug, trace, warn};
use crate::memory::{MemoryError, MemoryInterface};
use crate::registers::{Bank, BankRegister, MemoryMappedRegister, Stat, Ws, BANK_SIZE};
use crate::watchdog;
use gd32f30x_flash_target::Variant;

/// The operation the host is preparing for, as passed to `Init` and `UnInit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Erase chip or sectors.
    Erase = 1,
    /// Program pages.
    Program = 2,
    /// Verify the flash contents.
    Verify = 3,
}

impl Function {
    /// Decodes the raw function code, `None` for unknown codes.
    pub fn from_raw(code: u32) -> Option<Self> {
        match code {
            1 => Some(Function::Erase),
            2 => Some(Function::Program),
            3 => Some(Function::Verify),
            _ => None,
        }
    }
}

/// What a busy wait does while the controller is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BusyPolicy {
    /// Reload the watchdog once per poll that saw BUSY.
    ReloadWatchdog,
    /// Spin without touching the watchdog.
    Spin,
}

/// Polls `STAT.BUSY` of `bank` until it clears.
///
/// There is no timeout, a controller that never finishes hangs the agent
/// until the host gives up.
pub(crate) fn wait_while_busy(
    memory: &mut dyn MemoryInterface,
    bank: Bank,
    policy: BusyPolicy,
) -> Result<(), MemoryError> {
    let mut polls = 0u32;
    while Stat::load(memory, bank)?.busy() {
        polls = polls.saturating_add(1);
        if policy == BusyPolicy::ReloadWatchdog {
            watchdog::reload(memory)?;
        }
    }
    trace!("{bank:?} busy for {polls} polls");
    Ok(())
}

/// Fails if `STAT` of `bank` reports a program or protection error.
///
/// Both flags are cleared by writing them back before the error is returned.
/// A program error takes precedence over a protection error.
pub(crate) fn take_errors(
    memory: &mut dyn MemoryInterface,
    bank: Bank,
    address: u32,
) -> Result<(), FlashError> {
    let mut stat = Stat::load(memory, bank)?;
    if !stat.has_error() {
        return Ok(());
    }

    let error = if stat.pgerr() {
        FlashError::ProgramError { address }
    } else {
        FlashError::WriteProtection { address }
    };
    warn!("{bank:?} reported {stat:?} at {address:#010x}");

    stat.set_pgerr(true);
    stat.set_wperr(true);
    stat.store(memory, bank)?;

    Err(error)
}

/// An unlocked flash controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSession {
    variant: Variant,
    base_address: u32,
}

impl ControllerSession {
    /// Unlocks the controller for `variant`.
    ///
    /// `address` is the device base address the host works with, it decides
    /// where bank 1 begins. `clock` and `function` are only logged.
    pub fn initialize(
        memory: &mut dyn MemoryInterface,
        variant: Variant,
        address: u32,
        clock: u32,
        function: u32,
    ) -> Result<Self, FlashError> {
        debug!(
            "Initializing {variant} at {address:#010x}, clock {clock} Hz, function {:?}",
            Function::from_raw(function)
        );

        Ws::from(0).store(memory)?;

        let session = ControllerSession {
            variant,
            base_address: address & !(BANK_SIZE - 1),
        };

        if variant.is_option_bytes() {
            option_bytes::unlock(memory)?;
        } else {
            main_flash::unlock(memory, variant.dual_bank())?;
        }

        watchdog::configure_if_running(memory)?;

        Ok(session)
    }

    /// Locks the controller again.
    pub fn deinitialize(
        self,
        memory: &mut dyn MemoryInterface,
        function: u32,
    ) -> Result<(), FlashError> {
        debug!(
            "De-initializing {}, function {:?}",
            self.variant,
            Function::from_raw(function)
        );

        if self.variant.is_option_bytes() {
            option_bytes::lock(memory)?;
        } else {
            main_flash::lock(memory, self.variant.dual_bank())?;
        }
        Ok(())
    }

    /// The variant this session drives.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// The host base address rounded down to a bank boundary.
    pub fn base_address(&self) -> u32 {
        self.base_address
    }

    /// Hardware program granularity in bytes.
    pub fn program_unit(&self) -> usize {
        if self.variant.is_option_bytes() {
            2
        } else {
            4
        }
    }

    /// The register bank responsible for an operation starting at `address`.
    pub fn bank_for(&self, address: u32) -> Bank {
        if self.variant.dual_bank() && address >= self.base_address.wrapping_add(BANK_SIZE) {
            Bank::Bank1
        } else {
            Bank::Bank0
        }
    }

    /// Erases the whole device.
    ///
    /// On the option byte variant the read protection key is programmed
    /// again afterwards, so the device stays readable.
    pub fn erase_chip(&self, memory: &mut dyn MemoryInterface) -> Result<(), FlashError> {
        debug!("Erasing {}", self.variant);

        if self.variant.is_option_bytes() {
            option_bytes::erase_chip(memory)
        } else {
            main_flash::erase_chip(memory, self.variant.dual_bank())
        }
    }

    /// Erases the sector containing `address`.
    pub fn erase_sector(
        &self,
        memory: &mut dyn MemoryInterface,
        address: u32,
    ) -> Result<(), FlashError> {
        debug!("Erasing sector at {address:#010x}");

        if self.variant.is_option_bytes() {
            option_bytes::erase(memory)
        } else {
            main_flash::erase_page(memory, self.bank_for(address), address)
        }
    }

    /// Reports whether the range is blank.
    ///
    /// The option bytes are never reported blank, so the host always erases
    /// them before programming. Main flash has no blank check routine.
    pub fn blank_check(
        &self,
        _memory: &mut dyn MemoryInterface,
        address: u32,
        size: u32,
        pattern: u8,
    ) -> Result<(), FlashError> {
        debug!("Blank check of {size} bytes at {address:#010x} for {pattern:#04x}");

        if self.variant.is_option_bytes() {
            Err(FlashError::NotBlank)
        } else {
            Err(FlashError::RoutineNotSupported("blank_check"))
        }
    }

    /// Programs `size` bytes of `data` starting at `address`.
    ///
    /// `size` is rounded up to a whole number of
    /// [`program_unit`](Self::program_unit)s. Bytes past the end of `data`
    /// are programmed with the erased value. The first failing unit aborts
    /// the operation, units before it stay programmed.
    pub fn program_page(
        &self,
        memory: &mut dyn MemoryInterface,
        address: u32,
        size: u32,
        data: &[u8],
    ) -> Result<(), FlashError> {
        let length = (size as usize).div_ceil(self.program_unit()) * self.program_unit();
        debug!("Programming {length} bytes at {address:#010x}");

        if self.variant.is_option_bytes() {
            option_bytes::program(memory, address, units(data, length))
        } else {
            main_flash::program(memory, self.bank_for(address), address, units(data, length))
        }
    }
}

/// Splits the first `length` bytes of `data` into units of `N` bytes.
///
/// Bytes past the end of `data` are the erased value `0xFF`, as is the tail
/// of a trailing partial unit.
pub(crate) fn units<const N: usize>(
    data: &[u8],
    length: usize,
) -> impl Iterator<Item = [u8; N]> + '_ {
    (0..length.div_ceil(N)).map(move |index| {
        let mut unit = [0xFF; N];
        let start = (index * N).min(data.len());
        let end = ((index + 1) * N).min(length).min(data.len());
        unit[..end - start].copy_from_slice(&data[start..end]);
        unit
    })
}
