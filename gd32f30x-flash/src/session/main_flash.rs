//! Main flash erase and program.

use super::{take_errors, wait_while_busy, BusyPolicy};
use crate::error::FlashError;
use crate::memory::{MemoryError, MemoryInterface};
use crate::registers::{Addr, Bank, BankRegister, Ctl, Key, UNLOCK_KEY0, UNLOCK_KEY1};

fn banks(dual_bank: bool) -> &'static [Bank] {
    if dual_bank {
        &[Bank::Bank0, Bank::Bank1]
    } else {
        &[Bank::Bank0]
    }
}

pub(super) fn unlock(memory: &mut dyn MemoryInterface, dual_bank: bool) -> Result<(), MemoryError> {
    for &bank in banks(dual_bank) {
        Key::new(UNLOCK_KEY0).store(memory, bank)?;
        Key::new(UNLOCK_KEY1).store(memory, bank)?;
    }
    Ok(())
}

pub(super) fn lock(memory: &mut dyn MemoryInterface, dual_bank: bool) -> Result<(), MemoryError> {
    for &bank in banks(dual_bank) {
        Ctl::modify(memory, bank, |ctl| ctl.set_lk(true))?;
    }
    Ok(())
}

/// Mass erases every bank. Error flags are not inspected.
pub(super) fn erase_chip(memory: &mut dyn MemoryInterface, dual_bank: bool) -> Result<(), FlashError> {
    for &bank in banks(dual_bank) {
        Ctl::modify(memory, bank, |ctl| ctl.set_mer(true))?;
        Ctl::modify(memory, bank, |ctl| ctl.set_start(true))?;
        wait_while_busy(memory, bank, BusyPolicy::ReloadWatchdog)?;
        Ctl::modify(memory, bank, |ctl| ctl.set_mer(false))?;
    }
    Ok(())
}

/// Erases the page at `address` through `bank`. Error flags are not inspected.
pub(super) fn erase_page(
    memory: &mut dyn MemoryInterface,
    bank: Bank,
    address: u32,
) -> Result<(), FlashError> {
    Ctl::modify(memory, bank, |ctl| ctl.set_per(true))?;

    let mut addr = Addr::from(0);
    addr.set_addr(address);
    addr.store(memory, bank)?;

    Ctl::modify(memory, bank, |ctl| ctl.set_start(true))?;
    wait_while_busy(memory, bank, BusyPolicy::ReloadWatchdog)?;
    Ctl::modify(memory, bank, |ctl| ctl.set_per(false))?;
    Ok(())
}

/// Programs `words` one by one through `bank`.
///
/// The whole range goes through the bank chosen for its start address.
pub(super) fn program(
    memory: &mut dyn MemoryInterface,
    bank: Bank,
    address: u32,
    words: impl Iterator<Item = [u8; 4]>,
) -> Result<(), FlashError> {
    let mut address = address;
    for word in words {
        Ctl::modify(memory, bank, |ctl| ctl.set_pg(true))?;
        memory.write_word_32(address.into(), u32::from_le_bytes(word))?;
        // The word program loop does not service the watchdog. A single word
        // finishes well within the watchdog period.
        wait_while_busy(memory, bank, BusyPolicy::Spin)?;
        Ctl::modify(memory, bank, |ctl| ctl.set_pg(false))?;
        take_errors(memory, bank, address)?;

        address = address.wrapping_add(4);
    }
    Ok(())
}
