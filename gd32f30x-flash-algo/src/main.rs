//! CMSIS flash algorithm image for the GD32F30x FMC.
//!
//! The host loads this image into target RAM, reads `FlashDevice` from the
//! `DeviceData` section and calls the functions below one at a time. The
//! variant is picked with the `hd`, `xd`, `cl` or `option-bytes` feature.
#![no_std]
#![no_main]
#![allow(non_snake_case, non_upper_case_globals)]

use core::ptr::addr_of_mut;
use gd32f30x_flash::{FlashAgent, FlashDeviceDescription, Variant, VolatileMemory};

/// Description of the flash this build programs.
#[no_mangle]
#[used]
#[link_section = "DeviceData"]
pub static FlashDevice: FlashDeviceDescription =
    FlashDeviceDescription::from_device(Variant::from_build().device());

/// Start of the data segment, some hosts look for this symbol.
#[no_mangle]
#[used]
#[link_section = "PrgData"]
pub static PRGDATA_Start: usize = 0;

static mut AGENT: Option<FlashAgent<VolatileMemory>> = None;

fn agent() -> &'static mut FlashAgent<VolatileMemory> {
    // SAFETY: the host runs one entry point at a time on a single core, so no
    // other reference to `AGENT` is alive.
    let agent = unsafe { &mut *addr_of_mut!(AGENT) };
    agent.get_or_insert_with(|| {
        // SAFETY: this image only runs on the GD32F30x itself.
        FlashAgent::new(unsafe { VolatileMemory::new() }, Variant::from_build())
    })
}

/// Initialize the flash controller for `fnc` (1 erase, 2 program, 3 verify).
#[no_mangle]
#[link_section = ".entry"]
pub extern "C" fn Init(adr: u32, clk: u32, fnc: u32) -> i32 {
    agent().init(adr, clk, fnc)
}

/// Lock the flash controller again.
#[no_mangle]
#[link_section = ".entry"]
pub extern "C" fn UnInit(fnc: u32) -> i32 {
    agent().uninit(fnc)
}

/// Erase the complete device.
#[no_mangle]
#[link_section = ".entry"]
pub extern "C" fn EraseChip() -> i32 {
    agent().erase_chip()
}

/// Erase the sector at `adr`.
#[no_mangle]
#[link_section = ".entry"]
pub extern "C" fn EraseSector(adr: u32) -> i32 {
    agent().erase_sector(adr)
}

/// Always reports the option bytes as not blank.
#[cfg(feature = "option-bytes")]
#[no_mangle]
#[link_section = ".entry"]
pub extern "C" fn BlankCheck(adr: u32, sz: u32, pat: u8) -> i32 {
    agent().blank_check(adr, sz, pat)
}

/// Program `sz` bytes from `buf` to `adr`.
///
/// # Safety
///
/// `buf` must be valid for reads of `sz` bytes rounded up to the program unit.
#[no_mangle]
#[link_section = ".entry"]
pub unsafe extern "C" fn ProgramPage(adr: u32, sz: u32, buf: *const u8) -> i32 {
    // SAFETY: forwarded from the caller.
    unsafe { agent().program_page_raw(adr, sz, buf) }
}

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    // SAFETY: the undefined instruction faults, the host sees a failed call.
    unsafe { core::arch::asm!("udf #0", options(noreturn)) }
}
