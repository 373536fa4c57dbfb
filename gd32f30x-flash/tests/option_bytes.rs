#![cfg(feature = "std")]

use gd32f30x_flash::{AccessKind, Bank, FakeFmc, FlashAgent, Variant};
use pretty_assertions::assert_eq;
use test_case::test_case;

const OPTION_BYTES: u32 = 0x1FFF_F800;

fn initialized(fmc: FakeFmc) -> FlashAgent<FakeFmc> {
    let mut agent = FlashAgent::new(fmc, Variant::OptionBytes);
    assert_eq!(agent.init(OPTION_BYTES, 0, 1), 0);
    agent
}

#[test_case(0, 0, 0)]
#[test_case(OPTION_BYTES, 16, 0xFF)]
#[test_case(OPTION_BYTES + 2, 2, 0x00)]
fn blank_check_always_reports_not_blank(address: u32, size: u32, pattern: u8) {
    let mut agent = initialized(FakeFmc::new(Variant::OptionBytes));
    agent.memory_mut().clear_trace();

    assert_eq!(agent.blank_check(address, size, pattern), 1);
    assert!(agent.memory().trace().is_empty());
}

#[test]
fn blank_check_on_main_flash_is_refused() {
    let mut agent = FlashAgent::new(FakeFmc::new(Variant::HighDensity), Variant::HighDensity);
    agent.init(0x0800_0000, 0, 3);

    assert_eq!(agent.blank_check(0x0800_0000, 1024, 0xFF), 1);
}

#[test]
fn erase_chip_restores_the_read_protection_key() {
    let mut agent = initialized(FakeFmc::new(Variant::OptionBytes));
    assert_eq!(agent.erase_sector(OPTION_BYTES), 0);
    assert_eq!(agent.program_page(OPTION_BYTES + 4, 2, &[0x00, 0x00]), 0);
    agent.memory_mut().clear_trace();

    assert_eq!(agent.erase_chip(), 0);

    let fmc = agent.memory();
    let mut expected = [0xFF; 16];
    expected[..2].copy_from_slice(&[0xA5, 0x5A]);
    assert_eq!(fmc.option_bytes(), &expected);

    let half_word_writes: Vec<_> = fmc
        .trace()
        .iter()
        .filter(|access| access.kind == AccessKind::Write && access.width == 16)
        .map(|access| (access.address, access.value))
        .collect();
    assert_eq!(half_word_writes, vec![(u64::from(OPTION_BYTES), 0x5AA5)]);
}

#[test]
fn erase_sector_only_erases() {
    let mut agent = initialized(FakeFmc::new(Variant::OptionBytes));

    assert_eq!(agent.erase_sector(OPTION_BYTES), 0);

    let fmc = agent.memory();
    assert_eq!(fmc.option_bytes(), &[0xFF; 16]);
    assert!(!fmc.touched(u64::from(OPTION_BYTES)));
}

#[test]
fn failed_key_program_is_reported_and_cleared() {
    let mut agent = initialized(FakeFmc::new(Variant::OptionBytes).with_program_failure(1));

    assert_eq!(agent.erase_chip(), 1);

    let fmc = agent.memory();
    assert!(!fmc.status(Bank::Bank0).has_error());
    assert_eq!(fmc.option_bytes(), &[0xFF; 16]);
}

#[test]
fn erase_without_write_enable_leaves_the_option_bytes() {
    let mut agent = initialized(FakeFmc::new(Variant::OptionBytes));
    assert_eq!(agent.uninit(1), 0);
    assert_eq!(agent.init(OPTION_BYTES, 0, 1), 0);
    let before = *agent.memory().option_bytes();

    // Drop the write enable behind the agent's back.
    let fmc = agent.memory_mut();
    let mut ctl = fmc.control(Bank::Bank0);
    ctl.set_obwen(false);
    gd32f30x_flash::MemoryInterface::write_word_32(fmc, 0x4002_2010, ctl.into()).unwrap();

    assert_eq!(agent.erase_sector(OPTION_BYTES), 0);
    assert_eq!(agent.memory().option_bytes(), &before);
    assert!(agent.memory().status(Bank::Bank0).wperr());
}
