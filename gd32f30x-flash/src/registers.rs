//! Typed access to the FMC and FWDGT registers.
//!
//! Register layouts follow the GD32F30x user manual, chapters "Flash memory
//! controller (FMC)" and "Free watchdog timer (FWDGT)". Registers that exist
//! once implement [`MemoryMappedRegister`]; registers that exist once per
//! flash bank implement [`BankRegister`].

use crate::memory::{MemoryError, MemoryInterface};
use core::fmt::Debug;

/// Base address of the flash memory controller.
pub const FMC: u64 = 0x4002_2000;
/// Base address of the free watchdog timer.
pub const FWDGT: u64 = 0x4000_3000;

/// First word of the unlock sequence.
pub const UNLOCK_KEY0: u32 = 0x4567_0123;
/// Second word of the unlock sequence.
pub const UNLOCK_KEY1: u32 = 0xCDEF_89AB;
/// Option byte half-word that leaves the device without read protection.
pub const RDPT_KEY: u16 = 0x5AA5;

/// Size of the flash covered by one register bank.
pub const BANK_SIZE: u32 = 0x0008_0000;
/// Address of the option byte block.
pub const OPTION_BYTES_ADDRESS: u32 = 0x1FFF_F800;

/// Unlocks FWDGT_PSC and FWDGT_RLD for writing.
pub const FWDGT_CMD_WRITE_ACCESS: u16 = 0x5555;
/// Reloads the watchdog counter.
pub const FWDGT_CMD_RELOAD: u16 = 0xAAAA;
/// Prescaler selection for a divider of 256.
pub const FWDGT_PSC_DIV256: u8 = 0x06;
/// Largest reload value.
pub const FWDGT_RLD_MAX: u16 = 4095;

/// One of the two FMC register banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bank {
    /// Controls the first 512 KiB of main flash and the option bytes.
    Bank0 = 0,
    /// Controls main flash beyond 512 KiB on dual bank devices.
    Bank1 = 1,
}

impl Bank {
    /// Both banks in order.
    pub const ALL: [Bank; 2] = [Bank::Bank0, Bank::Bank1];

    /// Index into per-bank tables.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// A memory mapped register that exists exactly once.
pub trait MemoryMappedRegister: Clone + From<u32> + Into<u32> + Sized + Debug {
    /// The register's address in the target memory.
    const ADDRESS: u64;
    /// The register's name.
    const NAME: &'static str;

    /// Reads the register.
    fn load(memory: &mut dyn MemoryInterface) -> Result<Self, MemoryError> {
        memory.read_word_32(Self::ADDRESS).map(Self::from)
    }

    /// Writes the register.
    fn store(self, memory: &mut dyn MemoryInterface) -> Result<(), MemoryError> {
        memory.write_word_32(Self::ADDRESS, self.into())
    }
}

/// A memory mapped register that exists once per flash bank.
pub trait BankRegister: Clone + From<u32> + Into<u32> + Sized + Debug {
    /// Offsets from [`FMC`] for bank 0 and bank 1.
    const OFFSETS: [u64; 2];
    /// The register's name, without the bank number.
    const NAME: &'static str;

    /// The address of the instance belonging to `bank`.
    fn address(bank: Bank) -> u64 {
        FMC + Self::OFFSETS[bank.index()]
    }

    /// Reads the register of `bank`.
    fn load(memory: &mut dyn MemoryInterface, bank: Bank) -> Result<Self, MemoryError> {
        memory.read_word_32(Self::address(bank)).map(Self::from)
    }

    /// Writes the register of `bank`.
    fn store(self, memory: &mut dyn MemoryInterface, bank: Bank) -> Result<(), MemoryError> {
        memory.write_word_32(Self::address(bank), self.into())
    }

    /// Read-modify-write of the register of `bank`.
    fn modify(
        memory: &mut dyn MemoryInterface,
        bank: Bank,
        f: impl FnOnce(&mut Self),
    ) -> Result<(), MemoryError> {
        let mut value = Self::load(memory, bank)?;
        f(&mut value);
        value.store(memory, bank)
    }
}

macro_rules! conversions {
    ($name:ident) => {
        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u32 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

/// Defines a bitfield register at a fixed address.
macro_rules! memory_mapped_bitfield_register {
    (
        $(#[$outer:meta])*
        pub struct $name:ident(u32);
        $address:expr, $reg_name:expr,
        $($fields:tt)*
    ) => {
        bitfield::bitfield! {
            $(#[$outer])*
            #[derive(Copy, Clone, PartialEq, Eq)]
            pub struct $name(u32);
            impl Debug;
            $($fields)*
        }

        conversions!($name);

        impl MemoryMappedRegister for $name {
            const ADDRESS: u64 = $address;
            const NAME: &'static str = $reg_name;
        }
    };
}

/// Defines a bitfield register that is duplicated for each bank.
macro_rules! bank_bitfield_register {
    (
        $(#[$outer:meta])*
        pub struct $name:ident(u32);
        [$offset0:expr, $offset1:expr], $reg_name:expr,
        $($fields:tt)*
    ) => {
        bitfield::bitfield! {
            $(#[$outer])*
            #[derive(Copy, Clone, PartialEq, Eq)]
            pub struct $name(u32);
            impl Debug;
            $($fields)*
        }

        conversions!($name);

        impl BankRegister for $name {
            const OFFSETS: [u64; 2] = [$offset0, $offset1];
            const NAME: &'static str = $reg_name;
        }
    };
}

memory_mapped_bitfield_register! {
    /// FMC_WS, wait state configuration.
    pub struct Ws(u32);
    FMC + 0x00, "FMC_WS",
    pub u8, wscnt, set_wscnt: 2, 0;
}

memory_mapped_bitfield_register! {
    /// FMC_OBKEY, option byte unlock key.
    pub struct ObKey(u32);
    FMC + 0x08, "FMC_OBKEY",
    pub u32, _, set_key: 31, 0;
}

memory_mapped_bitfield_register! {
    /// FMC_OBSTAT, option byte status.
    pub struct ObStat(u32);
    FMC + 0x1C, "FMC_OBSTAT",
    /// Option byte read error.
    pub oberr, _: 0;
    /// Security protection is active.
    pub spc, _: 1;
    /// `nWDG_HW` user option: set when the watchdog is started by software,
    /// clear when hardware started it at reset.
    pub nwdg_hw, _: 2;
    /// All user option bits.
    pub u8, user, _: 9, 2;
}

bank_bitfield_register! {
    /// FMC_KEYx, unlock key.
    pub struct Key(u32);
    [0x04, 0x44], "FMC_KEY",
    pub u32, _, set_key: 31, 0;
}

bank_bitfield_register! {
    /// FMC_STATx, operation status. Flags are cleared by writing 1.
    pub struct Stat(u32);
    [0x0C, 0x4C], "FMC_STAT",
    /// An operation is in progress.
    pub busy, _: 0;
    /// A program targeted a location that was not erased.
    pub pgerr, set_pgerr: 2;
    /// An erase or program targeted a protected page.
    pub wperr, set_wperr: 4;
    /// End of operation.
    pub endf, set_endf: 5;
}

bank_bitfield_register! {
    /// FMC_CTLx, operation control. The option byte bits only exist in bank 0.
    pub struct Ctl(u32);
    [0x10, 0x50], "FMC_CTL",
    /// Main flash program.
    pub pg, set_pg: 0;
    /// Main flash page erase.
    pub per, set_per: 1;
    /// Main flash mass erase.
    pub mer, set_mer: 2;
    /// Option byte program.
    pub obpg, set_obpg: 4;
    /// Option byte erase.
    pub ober, set_ober: 5;
    /// Start the selected erase.
    pub start, set_start: 6;
    /// Lock, set by software and cleared by the unlock sequence.
    pub lk, set_lk: 7;
    /// Option byte erase and program enable, set by the option byte unlock sequence.
    pub obwen, set_obwen: 9;
    /// Error interrupt enable.
    pub errie, set_errie: 10;
    /// End of operation interrupt enable.
    pub endie, set_endie: 12;
}

bank_bitfield_register! {
    /// FMC_ADDRx, page erase address.
    pub struct Addr(u32);
    [0x14, 0x54], "FMC_ADDR",
    pub u32, addr, set_addr: 31, 0;
}

memory_mapped_bitfield_register! {
    /// FWDGT_CTL, command register.
    pub struct FwdgtCtl(u32);
    FWDGT + 0x00, "FWDGT_CTL",
    pub u16, _, set_cmd: 15, 0;
}

memory_mapped_bitfield_register! {
    /// FWDGT_PSC, prescaler.
    pub struct FwdgtPsc(u32);
    FWDGT + 0x04, "FWDGT_PSC",
    pub u8, psc, set_psc: 2, 0;
}

memory_mapped_bitfield_register! {
    /// FWDGT_RLD, reload value.
    pub struct FwdgtRld(u32);
    FWDGT + 0x08, "FWDGT_RLD",
    pub u16, rld, set_rld: 11, 0;
}

impl FwdgtCtl {
    /// A command word ready to be stored.
    pub fn command(command: u16) -> Self {
        let mut ctl = FwdgtCtl(0);
        ctl.set_cmd(command);
        ctl
    }
}

impl Key {
    /// A key word ready to be stored.
    pub fn new(key: u32) -> Self {
        let mut register = Key(0);
        register.set_key(key);
        register
    }
}

impl ObKey {
    /// A key word ready to be stored.
    pub fn new(key: u32) -> Self {
        let mut register = ObKey(0);
        register.set_key(key);
        register
    }
}

impl Stat {
    /// Returns whether the program or write protection error flag is set.
    pub fn has_error(&self) -> bool {
        self.pgerr() || self.wperr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn control_bits_match_the_manual() {
        let mut ctl = Ctl(0);
        ctl.set_pg(true);
        assert_eq!(u32::from(ctl), 1 << 0);

        let mut ctl = Ctl(0);
        ctl.set_per(true);
        ctl.set_mer(true);
        assert_eq!(u32::from(ctl), (1 << 1) | (1 << 2));

        let mut ctl = Ctl(0);
        ctl.set_obpg(true);
        ctl.set_ober(true);
        ctl.set_start(true);
        ctl.set_lk(true);
        ctl.set_obwen(true);
        assert_eq!(u32::from(ctl), 0x2F0);

        let mut ctl = Ctl(0);
        ctl.set_errie(true);
        ctl.set_endie(true);
        assert_eq!(u32::from(ctl), 0x1400);
    }

    #[test]
    fn status_flags_match_the_manual() {
        let stat = Stat::from(0x35);

        assert!(stat.busy());
        assert!(stat.pgerr());
        assert!(stat.wperr());
        assert!(stat.endf());
        assert!(!Stat::from(0x21).has_error());
        assert!(Stat::from(0x10).has_error());
    }

    #[test_case(Bank::Bank0, 0x4002_2004, 0x4002_200C, 0x4002_2010, 0x4002_2014)]
    #[test_case(Bank::Bank1, 0x4002_2044, 0x4002_204C, 0x4002_2050, 0x4002_2054)]
    fn bank_register_addresses(bank: Bank, key: u64, stat: u64, ctl: u64, addr: u64) {
        assert_eq!(Key::address(bank), key);
        assert_eq!(Stat::address(bank), stat);
        assert_eq!(Ctl::address(bank), ctl);
        assert_eq!(Addr::address(bank), addr);
    }

    #[test]
    fn single_register_addresses() {
        assert_eq!(Ws::ADDRESS, 0x4002_2000);
        assert_eq!(ObKey::ADDRESS, 0x4002_2008);
        assert_eq!(ObStat::ADDRESS, 0x4002_201C);
        assert_eq!(FwdgtCtl::ADDRESS, 0x4000_3000);
        assert_eq!(FwdgtPsc::ADDRESS, 0x4000_3004);
        assert_eq!(FwdgtRld::ADDRESS, 0x4000_3008);
    }

    #[test]
    fn watchdog_mode_is_user_bit_zero() {
        assert!(!ObStat::from(0x3FB).nwdg_hw());
        assert!(ObStat::from(0x004).nwdg_hw());
        assert_eq!(ObStat::from(0x3FC).user(), 0xFF);
    }
}
