//! Option byte erase and program. All option byte commands go through bank 0.

use super::{take_errors, wait_while_busy, BusyPolicy};
use crate::error::FlashError;
use crate::memory::{MemoryError, MemoryInterface};
use crate::registers::{
    Bank, BankRegister, Ctl, Key, MemoryMappedRegister, ObKey, OPTION_BYTES_ADDRESS, RDPT_KEY,
    UNLOCK_KEY0, UNLOCK_KEY1,
};

const BANK: Bank = Bank::Bank0;

pub(super) fn unlock(memory: &mut dyn MemoryInterface) -> Result<(), MemoryError> {
    Key::new(UNLOCK_KEY0).store(memory, BANK)?;
    Key::new(UNLOCK_KEY1).store(memory, BANK)?;
    ObKey::new(UNLOCK_KEY0).store(memory)?;
    ObKey::new(UNLOCK_KEY1).store(memory)?;
    Ok(())
}

pub(super) fn lock(memory: &mut dyn MemoryInterface) -> Result<(), MemoryError> {
    Ctl::modify(memory, BANK, |ctl| ctl.set_lk(true))?;
    Ctl::modify(memory, BANK, |ctl| ctl.set_obwen(false))?;
    Ok(())
}

/// Erases the option byte block. Error flags are not inspected.
pub(super) fn erase(memory: &mut dyn MemoryInterface) -> Result<(), FlashError> {
    Ctl::modify(memory, BANK, |ctl| ctl.set_ober(true))?;
    Ctl::modify(memory, BANK, |ctl| ctl.set_start(true))?;
    wait_while_busy(memory, BANK, BusyPolicy::ReloadWatchdog)?;
    Ctl::modify(memory, BANK, |ctl| ctl.set_ober(false))?;
    Ok(())
}

/// Programs one half-word and checks the result.
fn program_half_word(
    memory: &mut dyn MemoryInterface,
    address: u32,
    value: u16,
) -> Result<(), FlashError> {
    Ctl::modify(memory, BANK, |ctl| ctl.set_obpg(true))?;
    memory.write_word_16(address.into(), value)?;
    wait_while_busy(memory, BANK, BusyPolicy::ReloadWatchdog)?;
    Ctl::modify(memory, BANK, |ctl| ctl.set_obpg(false))?;
    take_errors(memory, BANK, address)
}

/// Erases the option bytes and restores the read protection key.
///
/// An erased security byte would enable read protection on the next reset.
pub(super) fn erase_chip(memory: &mut dyn MemoryInterface) -> Result<(), FlashError> {
    erase(memory)?;
    program_half_word(memory, OPTION_BYTES_ADDRESS, RDPT_KEY)
}

pub(super) fn program(
    memory: &mut dyn MemoryInterface,
    address: u32,
    half_words: impl Iterator<Item = [u8; 2]>,
) -> Result<(), FlashError> {
    let mut address = address;
    for half_word in half_words {
        program_half_word(memory, address, u16::from_le_bytes(half_word))?;
        address = address.wrapping_add(2);
    }
    Ok(())
}
