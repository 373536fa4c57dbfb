//! A simulated flash memory controller.
//!
//! [`FakeFmc`] serves the FMC and FWDGT register blocks, main flash and the
//! option bytes from host memory. It is used by the tests of this crate and
//! by `target-gen` for dry runs of the agent.

use crate::logging::trace;
use crate::memory::{
    valid_access, MemoryError, MemoryInterface, UnmappedAddressError, WriteRefusedError,
};
use crate::registers::{
    Bank, Ctl, Stat, BANK_SIZE, FMC, FWDGT, FWDGT_CMD_RELOAD, FWDGT_CMD_WRITE_ACCESS,
    OPTION_BYTES_ADDRESS, UNLOCK_KEY0, UNLOCK_KEY1,
};
use gd32f30x_flash_target::{Variant, HIGH_DENSITY};
use std::ops::Range;

const MAIN_FLASH_START: u32 = 0x0800_0000;
const OPTION_BYTES_SIZE: usize = 16;
const SMALL_PAGE: u32 = 0x800;
const LARGE_PAGE: u32 = 0x1000;

const STAT_ERROR_FLAGS: u32 = (1 << 2) | (1 << 4) | (1 << 5);
const CTL_RESET: u32 = 1 << 7;
const OBSTAT_SOFTWARE_WATCHDOG: u32 = 0x3FC;
const OBSTAT_HARDWARE_WATCHDOG: u32 = 0x3F8;

/// Whether an access read or wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// A load.
    Read,
    /// A store.
    Write,
}

/// One access recorded by [`FakeFmc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    /// Load or store.
    pub kind: AccessKind,
    /// The accessed address.
    pub address: u64,
    /// The value read or written.
    pub value: u32,
    /// Access width in bits.
    pub width: u8,
}

#[derive(Debug, Clone, Copy)]
enum Region {
    Fmc(u64),
    Fwdgt(u64),
    MainFlash(usize),
    OptionBytes(usize),
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Done,
    ProgramError,
    ProtectionError,
}

#[derive(Debug, Clone, Default)]
struct BankState {
    ctl: u32,
    stat: u32,
    addr: u32,
    key_accepted: bool,
    busy_remaining: u32,
}

/// Simulated GD32F30x flash controller, for tests or dry runs.
#[derive(Debug, Clone)]
pub struct FakeFmc {
    variant: Variant,
    main_flash: Vec<u8>,
    option_bytes: [u8; OPTION_BYTES_SIZE],
    banks: [BankState; 2],
    ws: u32,
    ob_key_accepted: bool,
    hardware_watchdog: bool,
    watchdog_write_access: bool,
    watchdog_prescaler: u32,
    watchdog_reload_value: u32,
    watchdog_reloads: usize,
    busy_polls: u32,
    write_protected: Vec<Range<u32>>,
    failing_program: Option<usize>,
    programs: usize,
    trace: Vec<Access>,
}

impl FakeFmc {
    /// A controller after reset: flash erased, both banks locked, the
    /// watchdog in software mode and BUSY never asserted.
    ///
    /// The option byte variant is backed by a high density main flash.
    pub fn new(variant: Variant) -> Self {
        let main_size = if variant.is_option_bytes() {
            HIGH_DENSITY.size
        } else {
            variant.device().size
        };

        let mut option_bytes = [0xFF; OPTION_BYTES_SIZE];
        option_bytes[..2].copy_from_slice(&0x5AA5u16.to_le_bytes());

        let bank = BankState {
            ctl: CTL_RESET,
            ..Default::default()
        };

        FakeFmc {
            variant,
            main_flash: vec![0xFF; main_size as usize],
            option_bytes,
            banks: [bank.clone(), bank],
            ws: 0,
            ob_key_accepted: false,
            hardware_watchdog: false,
            watchdog_write_access: false,
            watchdog_prescaler: 0,
            watchdog_reload_value: 0xFFF,
            watchdog_reloads: 0,
            busy_polls: 0,
            write_protected: vec![],
            failing_program: None,
            programs: 0,
            trace: vec![],
        }
    }

    /// Keep BUSY set for `polls` reads of STAT after each command.
    pub fn with_busy_polls(mut self, polls: u32) -> Self {
        self.busy_polls = polls;
        self
    }

    /// Select the hardware watchdog mode in the user option byte.
    pub fn with_hardware_watchdog(mut self, enabled: bool) -> Self {
        self.hardware_watchdog = enabled;
        self
    }

    /// Fail the `nth` program command (counting from 1) with a program error.
    pub fn with_program_failure(mut self, nth: usize) -> Self {
        self.failing_program = Some(nth);
        self
    }

    /// Reject erase and program commands touching `range`.
    pub fn with_write_protection(mut self, range: Range<u32>) -> Self {
        self.write_protected.push(range);
        self
    }

    /// The simulated variant.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// All accesses since creation or the last [`clear_trace`](Self::clear_trace).
    pub fn trace(&self) -> &[Access] {
        &self.trace
    }

    /// Forgets the recorded accesses.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    /// Whether any recorded access targeted `address`.
    pub fn touched(&self, address: u64) -> bool {
        self.trace.iter().any(|access| access.address == address)
    }

    /// The values written to `address`, oldest first.
    pub fn writes_to(&self, address: u64) -> Vec<u32> {
        self.trace
            .iter()
            .filter(|access| access.kind == AccessKind::Write && access.address == address)
            .map(|access| access.value)
            .collect()
    }

    /// Number of watchdog reload commands.
    pub fn watchdog_reloads(&self) -> usize {
        self.watchdog_reloads
    }

    /// The watchdog prescaler and reload value.
    pub fn watchdog_period(&self) -> (u32, u32) {
        (self.watchdog_prescaler, self.watchdog_reload_value)
    }

    /// Number of program commands the controller accepted.
    pub fn program_count(&self) -> usize {
        self.programs
    }

    /// The control register of `bank`.
    pub fn control(&self, bank: Bank) -> Ctl {
        Ctl::from(self.banks[bank.index()].ctl)
    }

    /// The status register of `bank`, without BUSY.
    pub fn status(&self, bank: Bank) -> Stat {
        Stat::from(self.banks[bank.index()].stat)
    }

    /// Whether `bank` is locked.
    pub fn is_locked(&self, bank: Bank) -> bool {
        self.control(bank).lk()
    }

    /// Main flash contents.
    pub fn flash(&self) -> &[u8] {
        &self.main_flash
    }

    /// `length` bytes of main flash at `address`, if the range exists.
    pub fn read_flash(&self, address: u32, length: usize) -> Option<&[u8]> {
        let offset = address.checked_sub(MAIN_FLASH_START)? as usize;
        self.main_flash.get(offset..offset.checked_add(length)?)
    }

    /// Overwrites main flash at `address` without going through the controller.
    pub fn load_flash(&mut self, address: u32, data: &[u8]) -> Option<()> {
        let offset = address.checked_sub(MAIN_FLASH_START)? as usize;
        self.main_flash
            .get_mut(offset..offset.checked_add(data.len())?)?
            .copy_from_slice(data);
        Some(())
    }

    /// Option byte contents.
    pub fn option_bytes(&self) -> &[u8; OPTION_BYTES_SIZE] {
        &self.option_bytes
    }

    fn record(&mut self, kind: AccessKind, address: u64, value: u32, width: u8) {
        trace!("{kind:?} {address:#010x} = {value:#010x} ({width} bit)");
        self.trace.push(Access {
            kind,
            address,
            value,
            width,
        });
    }

    fn region(&self, address: u64) -> Option<Region> {
        let main_start = u64::from(MAIN_FLASH_START);
        let main_end = main_start + self.main_flash.len() as u64;
        let option_start = u64::from(OPTION_BYTES_ADDRESS);

        match address {
            a if (FMC..FMC + 0x400).contains(&a) => Some(Region::Fmc(a - FMC)),
            a if (FWDGT..FWDGT + 0x400).contains(&a) => Some(Region::Fwdgt(a - FWDGT)),
            a if (main_start..main_end).contains(&a) => {
                Some(Region::MainFlash((a - main_start) as usize))
            }
            a if (option_start..option_start + OPTION_BYTES_SIZE as u64).contains(&a) => {
                Some(Region::OptionBytes((a - option_start) as usize))
            }
            _ => None,
        }
    }

    /// Splits an FMC offset into the bank and the bank 0 offset of the register.
    fn bank_register(&self, offset: u64) -> Option<(Bank, u64)> {
        match offset {
            0x04 | 0x0C | 0x10 | 0x14 => Some((Bank::Bank0, offset)),
            0x44 | 0x4C | 0x50 | 0x54 if self.dual_bank() => Some((Bank::Bank1, offset - 0x40)),
            _ => None,
        }
    }

    fn dual_bank(&self) -> bool {
        self.main_flash.len() > BANK_SIZE as usize
    }

    fn read_fmc(&mut self, offset: u64) -> Option<u32> {
        match offset {
            0x00 => return Some(self.ws),
            0x08 => return Some(0),
            0x1C => {
                return Some(if self.hardware_watchdog {
                    OBSTAT_HARDWARE_WATCHDOG
                } else {
                    OBSTAT_SOFTWARE_WATCHDOG
                })
            }
            _ => {}
        }

        let (bank, register) = self.bank_register(offset)?;
        let state = &mut self.banks[bank.index()];
        match register {
            0x04 => Some(0),
            0x0C => {
                let mut stat = state.stat;
                if state.busy_remaining > 0 {
                    state.busy_remaining -= 1;
                    stat |= 1;
                }
                Some(stat)
            }
            0x10 => Some(state.ctl),
            0x14 => Some(state.addr),
            _ => None,
        }
    }

    fn write_fmc(&mut self, offset: u64, value: u32) -> Option<()> {
        match offset {
            0x00 => {
                self.ws = value & 0x7;
                return Some(());
            }
            0x08 => {
                self.ob_key_accepted = self.accept_key(self.ob_key_accepted, value, |fmc| {
                    if !fmc.is_locked(Bank::Bank0) {
                        let mut ctl = fmc.control(Bank::Bank0);
                        ctl.set_obwen(true);
                        fmc.banks[0].ctl = ctl.into();
                    }
                });
                return Some(());
            }
            0x1C => return Some(()),
            _ => {}
        }

        let (bank, register) = self.bank_register(offset)?;
        match register {
            0x04 => {
                let accepted = self.banks[bank.index()].key_accepted;
                self.banks[bank.index()].key_accepted =
                    self.accept_key(accepted, value, |fmc| {
                        let mut ctl = fmc.control(bank);
                        ctl.set_lk(false);
                        fmc.banks[bank.index()].ctl = ctl.into();
                    });
            }
            0x0C => self.banks[bank.index()].stat &= !(value & STAT_ERROR_FLAGS),
            0x10 => self.write_ctl(bank, value),
            0x14 => self.banks[bank.index()].addr = value,
            _ => return None,
        }
        Some(())
    }

    /// Advances a two word key sequence, returning whether the first word
    /// has been seen.
    fn accept_key(&mut self, first_seen: bool, value: u32, unlock: impl FnOnce(&mut Self)) -> bool {
        match value {
            UNLOCK_KEY0 => true,
            UNLOCK_KEY1 if first_seen => {
                unlock(self);
                false
            }
            _ => false,
        }
    }

    fn write_ctl(&mut self, bank: Bank, value: u32) {
        let old = self.control(bank);
        let requested = Ctl::from(value);

        if old.lk() {
            // A locked register only lets the option byte enable drop.
            let mut ctl = old;
            if !requested.obwen() {
                ctl.set_obwen(false);
            }
            self.banks[bank.index()].ctl = ctl.into();
            return;
        }

        let mut ctl = requested;
        ctl.set_obwen(old.obwen() && requested.obwen());
        if bank == Bank::Bank1 {
            ctl.set_obpg(false);
            ctl.set_ober(false);
            ctl.set_obwen(false);
        }

        let start = ctl.start() && !old.start();
        ctl.set_start(false);
        self.banks[bank.index()].ctl = ctl.into();

        if start {
            let outcome = self.erase(bank, ctl);
            self.complete(bank, outcome);
        }
    }

    fn bank_range(&self, bank: Bank) -> Range<usize> {
        let split = (BANK_SIZE as usize).min(self.main_flash.len());
        match bank {
            Bank::Bank0 => 0..split,
            Bank::Bank1 => split..self.main_flash.len(),
        }
    }

    fn is_protected(&self, range: Range<u32>) -> bool {
        self.write_protected
            .iter()
            .any(|protected| protected.start < range.end && range.start < protected.end)
    }

    fn erase(&mut self, bank: Bank, ctl: Ctl) -> Outcome {
        let range = if ctl.mer() {
            self.bank_range(bank)
        } else if ctl.per() {
            let address = self.banks[bank.index()].addr;
            let Some(offset) = address.checked_sub(MAIN_FLASH_START) else {
                return Outcome::Done;
            };
            let page = if offset < BANK_SIZE { SMALL_PAGE } else { LARGE_PAGE };
            let start = (offset & !(page - 1)) as usize;
            let range = start..start + page as usize;
            let bank_range = self.bank_range(bank);
            if range.start < bank_range.start || range.end > bank_range.end {
                trace!("Page erase at {address:#010x} outside of {bank:?}");
                return Outcome::Done;
            }
            range
        } else if ctl.ober() {
            if !ctl.obwen() {
                return Outcome::ProtectionError;
            }
            self.option_bytes = [0xFF; OPTION_BYTES_SIZE];
            return Outcome::Done;
        } else {
            return Outcome::Done;
        };

        let absolute = MAIN_FLASH_START + range.start as u32..MAIN_FLASH_START + range.end as u32;
        if self.is_protected(absolute) {
            return Outcome::ProtectionError;
        }
        self.main_flash[range].fill(0xFF);
        Outcome::Done
    }

    fn next_program_fails(&mut self) -> bool {
        self.programs += 1;
        self.failing_program == Some(self.programs)
    }

    fn program_word(&mut self, offset: usize, value: u32) -> Result<(), MemoryError> {
        let bank = if offset < BANK_SIZE as usize {
            Bank::Bank0
        } else {
            Bank::Bank1
        };
        let ctl = self.control(bank);
        if !ctl.pg() || ctl.lk() {
            trace!("Word write to flash offset {offset:#x} without PG on {bank:?}");
            return Err(WriteRefusedError {
                address: u64::from(MAIN_FLASH_START) + offset as u64,
                width: 32,
            }
            .into());
        }

        let Some(cells) = self.main_flash.get(offset..offset + 4) else {
            return Err(UnmappedAddressError {
                address: u64::from(MAIN_FLASH_START) + offset as u64,
                width: 32,
            }
            .into());
        };
        let old = u32::from_le_bytes([cells[0], cells[1], cells[2], cells[3]]);

        let address = MAIN_FLASH_START + offset as u32;
        let outcome = if self.next_program_fails() || old & value != value {
            Outcome::ProgramError
        } else if self.is_protected(address..address + 4) {
            Outcome::ProtectionError
        } else {
            self.main_flash[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            Outcome::Done
        };
        self.complete(bank, outcome);
        Ok(())
    }

    fn program_option_half_word(&mut self, offset: usize, value: u16) -> Result<(), MemoryError> {
        let ctl = self.control(Bank::Bank0);
        if !ctl.obpg() || ctl.lk() {
            trace!("Option byte write at offset {offset:#x} without OBPG");
            return Err(WriteRefusedError {
                address: u64::from(OPTION_BYTES_ADDRESS) + offset as u64,
                width: 16,
            }
            .into());
        }

        let old = u16::from_le_bytes([self.option_bytes[offset], self.option_bytes[offset + 1]]);
        let outcome = if self.next_program_fails() || old & value != value {
            Outcome::ProgramError
        } else if !ctl.obwen() {
            Outcome::ProtectionError
        } else {
            self.option_bytes[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
            Outcome::Done
        };
        self.complete(Bank::Bank0, outcome);
        Ok(())
    }

    fn complete(&mut self, bank: Bank, outcome: Outcome) {
        let state = &mut self.banks[bank.index()];
        let mut stat = Stat::from(state.stat);
        match outcome {
            Outcome::Done => stat.set_endf(true),
            Outcome::ProgramError => stat.set_pgerr(true),
            Outcome::ProtectionError => stat.set_wperr(true),
        }
        trace!("{bank:?} command finished: {outcome:?}");
        state.stat = stat.into();
        state.busy_remaining = self.busy_polls;
    }

    fn write_fwdgt(&mut self, offset: u64, value: u32) -> Option<()> {
        match offset {
            0x00 => match value as u16 {
                FWDGT_CMD_WRITE_ACCESS => self.watchdog_write_access = true,
                FWDGT_CMD_RELOAD => {
                    self.watchdog_reloads += 1;
                    self.watchdog_write_access = false;
                }
                _ => self.watchdog_write_access = false,
            },
            0x04 if self.watchdog_write_access => self.watchdog_prescaler = value & 0x7,
            0x08 if self.watchdog_write_access => self.watchdog_reload_value = value & 0xFFF,
            0x04 | 0x08 => {}
            _ => return None,
        }
        Some(())
    }

    fn read_fwdgt(&self, offset: u64) -> Option<u32> {
        match offset {
            0x00 => Some(0),
            0x04 => Some(self.watchdog_prescaler),
            0x08 => Some(self.watchdog_reload_value),
            _ => None,
        }
    }

    fn unmapped(address: u64, width: u8) -> MemoryError {
        UnmappedAddressError { address, width }.into()
    }
}

impl MemoryInterface for FakeFmc {
    fn read_word_32(&mut self, address: u64) -> Result<u32, MemoryError> {
        valid_access(address, 4)?;

        let value = match self.region(address) {
            Some(Region::Fmc(offset)) => self.read_fmc(offset),
            Some(Region::Fwdgt(offset)) => self.read_fwdgt(offset),
            Some(Region::MainFlash(offset)) => self
                .main_flash
                .get(offset..offset + 4)
                .map(|cells| u32::from_le_bytes([cells[0], cells[1], cells[2], cells[3]])),
            Some(Region::OptionBytes(offset)) => self
                .option_bytes
                .get(offset..offset + 4)
                .map(|cells| u32::from_le_bytes([cells[0], cells[1], cells[2], cells[3]])),
            None => None,
        }
        .ok_or_else(|| Self::unmapped(address, 32))?;

        self.record(AccessKind::Read, address, value, 32);
        Ok(value)
    }

    fn read_word_16(&mut self, address: u64) -> Result<u16, MemoryError> {
        valid_access(address, 2)?;

        let value = match self.region(address) {
            Some(Region::MainFlash(offset)) => self.main_flash.get(offset..offset + 2),
            Some(Region::OptionBytes(offset)) => self.option_bytes.get(offset..offset + 2),
            _ => None,
        }
        .map(|cells| u16::from_le_bytes([cells[0], cells[1]]))
        .ok_or_else(|| Self::unmapped(address, 16))?;

        self.record(AccessKind::Read, address, value.into(), 16);
        Ok(value)
    }

    fn write_word_32(&mut self, address: u64, data: u32) -> Result<(), MemoryError> {
        valid_access(address, 4)?;
        self.record(AccessKind::Write, address, data, 32);

        let handled = match self.region(address) {
            Some(Region::Fmc(offset)) => self.write_fmc(offset, data),
            Some(Region::Fwdgt(offset)) => self.write_fwdgt(offset, data),
            Some(Region::MainFlash(offset)) => return self.program_word(offset, data),
            _ => None,
        };
        handled.ok_or_else(|| Self::unmapped(address, 32))
    }

    fn write_word_16(&mut self, address: u64, data: u16) -> Result<(), MemoryError> {
        valid_access(address, 2)?;
        self.record(AccessKind::Write, address, data.into(), 16);

        match self.region(address) {
            Some(Region::OptionBytes(offset)) => self.program_option_half_word(offset, data),
            _ => Err(Self::unmapped(address, 16)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{BankRegister, Key};
    use pretty_assertions::assert_eq;

    fn unlock(fmc: &mut FakeFmc, bank: Bank) {
        Key::new(UNLOCK_KEY0).store(fmc, bank).unwrap();
        Key::new(UNLOCK_KEY1).store(fmc, bank).unwrap();
    }

    #[test]
    fn banks_start_locked() {
        let fmc = FakeFmc::new(Variant::ExtraDensity);

        assert!(fmc.is_locked(Bank::Bank0));
        assert!(fmc.is_locked(Bank::Bank1));
    }

    #[test]
    fn key_sequence_unlocks_one_bank() {
        let mut fmc = FakeFmc::new(Variant::ExtraDensity);

        unlock(&mut fmc, Bank::Bank1);

        assert!(fmc.is_locked(Bank::Bank0));
        assert!(!fmc.is_locked(Bank::Bank1));
    }

    #[test]
    fn wrong_key_order_keeps_the_lock() {
        let mut fmc = FakeFmc::new(Variant::HighDensity);

        Key::new(UNLOCK_KEY1).store(&mut fmc, Bank::Bank0).unwrap();
        Key::new(UNLOCK_KEY0).store(&mut fmc, Bank::Bank0).unwrap();

        assert!(fmc.is_locked(Bank::Bank0));
    }

    #[test]
    fn locked_control_register_ignores_commands() {
        let mut fmc = FakeFmc::new(Variant::HighDensity);

        fmc.write_word_32(Ctl::address(Bank::Bank0), 0x44).unwrap();

        assert_eq!(u32::from(fmc.control(Bank::Bank0)), CTL_RESET);
        assert_eq!(fmc.flash()[0], 0xFF);
    }

    #[test]
    fn single_bank_has_no_bank_one_registers() {
        let mut fmc = FakeFmc::new(Variant::HighDensity);

        assert!(matches!(
            fmc.read_word_32(Stat::address(Bank::Bank1)),
            Err(MemoryError::Unmapped(_))
        ));
    }

    #[test]
    fn busy_is_reported_for_the_configured_polls() {
        let mut fmc = FakeFmc::new(Variant::HighDensity).with_busy_polls(2);
        unlock(&mut fmc, Bank::Bank0);

        Ctl::modify(&mut fmc, Bank::Bank0, |ctl| ctl.set_mer(true)).unwrap();
        Ctl::modify(&mut fmc, Bank::Bank0, |ctl| ctl.set_start(true)).unwrap();

        let polls: Vec<bool> = (0..3)
            .map(|_| Stat::load(&mut fmc, Bank::Bank0).unwrap().busy())
            .collect();
        assert_eq!(polls, vec![true, true, false]);
        assert!(fmc.status(Bank::Bank0).endf());
    }

    #[test]
    fn programming_can_only_clear_bits() {
        let mut fmc = FakeFmc::new(Variant::HighDensity);
        unlock(&mut fmc, Bank::Bank0);
        Ctl::modify(&mut fmc, Bank::Bank0, |ctl| ctl.set_pg(true)).unwrap();

        fmc.write_word_32(0x0800_0000, 0x1234_5678).unwrap();
        assert!(!fmc.status(Bank::Bank0).pgerr());

        fmc.write_word_32(0x0800_0000, 0xFFFF_FFFF).unwrap();
        assert!(fmc.status(Bank::Bank0).pgerr());
        assert_eq!(fmc.read_flash(0x0800_0000, 4), Some(&[0x78, 0x56, 0x34, 0x12][..]));
    }

    #[test]
    fn flash_write_outside_a_program_command_is_refused() {
        let mut fmc = FakeFmc::new(Variant::ExtraDensity);
        unlock(&mut fmc, Bank::Bank0);
        unlock(&mut fmc, Bank::Bank1);
        Ctl::modify(&mut fmc, Bank::Bank0, |ctl| ctl.set_pg(true)).unwrap();

        // PG is set on bank 0 only, bank 1 owns this word.
        assert_eq!(
            fmc.write_word_32(0x0808_0000, 0),
            Err(MemoryError::WriteRefused(WriteRefusedError {
                address: 0x0808_0000,
                width: 32,
            }))
        );
        assert_eq!(fmc.read_flash(0x0808_0000, 4), Some(&[0xFF; 4][..]));
        assert_eq!(fmc.program_count(), 0);

        assert!(matches!(
            fmc.write_word_16(0x1FFF_F800, 0),
            Err(MemoryError::WriteRefused(_))
        ));
    }

    #[test]
    fn status_flags_are_write_one_to_clear() {
        let mut fmc = FakeFmc::new(Variant::HighDensity).with_program_failure(1);
        unlock(&mut fmc, Bank::Bank0);
        Ctl::modify(&mut fmc, Bank::Bank0, |ctl| ctl.set_pg(true)).unwrap();
        fmc.write_word_32(0x0800_0000, 0).unwrap();
        assert!(fmc.status(Bank::Bank0).pgerr());

        fmc.write_word_32(Stat::address(Bank::Bank0), 0).unwrap();
        assert!(fmc.status(Bank::Bank0).pgerr());

        fmc.write_word_32(Stat::address(Bank::Bank0), 1 << 2).unwrap();
        assert!(!fmc.status(Bank::Bank0).pgerr());
    }

    #[test]
    fn protected_page_is_not_erased() {
        let mut fmc =
            FakeFmc::new(Variant::HighDensity).with_write_protection(0x0800_0800..0x0800_1000);
        fmc.load_flash(0x0800_0800, &[0; 4]).unwrap();
        unlock(&mut fmc, Bank::Bank0);

        Ctl::modify(&mut fmc, Bank::Bank0, |ctl| ctl.set_per(true)).unwrap();
        fmc.write_word_32(0x4002_2014, 0x0800_0900).unwrap();
        Ctl::modify(&mut fmc, Bank::Bank0, |ctl| ctl.set_start(true)).unwrap();

        assert!(fmc.status(Bank::Bank0).wperr());
        assert_eq!(fmc.read_flash(0x0800_0800, 4), Some(&[0u8; 4][..]));
    }

    #[test]
    fn watchdog_registers_need_write_access() {
        let mut fmc = FakeFmc::new(Variant::HighDensity);

        fmc.write_word_32(0x4000_3004, 6).unwrap();
        assert_eq!(fmc.watchdog_period(), (0, 0xFFF));

        fmc.write_word_32(0x4000_3000, 0x5555).unwrap();
        fmc.write_word_32(0x4000_3004, 6).unwrap();
        fmc.write_word_32(0x4000_3008, 4095).unwrap();
        fmc.write_word_32(0x4000_3000, 0xAAAA).unwrap();

        assert_eq!(fmc.watchdog_period(), (6, 4095));
        assert_eq!(fmc.watchdog_reloads(), 1);
    }

    #[test]
    fn accesses_are_traced() {
        let mut fmc = FakeFmc::new(Variant::HighDensity);

        fmc.write_word_32(0x4002_2000, 0).unwrap();
        fmc.read_word_32(0x0800_0000).unwrap();

        assert_eq!(
            fmc.trace(),
            &[
                Access {
                    kind: AccessKind::Write,
                    address: 0x4002_2000,
                    value: 0,
                    width: 32,
                },
                Access {
                    kind: AccessKind::Read,
                    address: 0x0800_0000,
                    value: 0xFFFF_FFFF,
                    width: 32,
                },
            ]
        );
        assert_eq!(fmc.writes_to(0x4002_2000), vec![0]);
    }

    #[test]
    fn misaligned_and_unmapped_accesses_fail() {
        let mut fmc = FakeFmc::new(Variant::HighDensity);

        assert!(matches!(
            fmc.read_word_32(0x0800_0002),
            Err(MemoryError::NotAligned(_))
        ));
        assert!(matches!(
            fmc.read_word_32(0x2000_0000),
            Err(MemoryError::Unmapped(_))
        ));
        assert!(fmc.trace().is_empty());
    }
}
