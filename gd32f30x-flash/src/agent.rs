//! The host facing side of the agent.
//!
//! [`FlashAgent`] speaks the CMSIS flash algorithm contract: every call
//! returns `0` on success and `1` on failure.

use crate::error::{status_of, FlashError};
use crate::logging::{debug, error};
use crate::memory::MemoryInterface;
use crate::session::ControllerSession;
use gd32f30x_flash_target::Variant;

/// Dispatches host calls to a [`ControllerSession`].
#[derive(Debug)]
pub struct FlashAgent<M> {
    memory: M,
    variant: Variant,
    session: Option<ControllerSession>,
}

impl<M: MemoryInterface> FlashAgent<M> {
    /// Creates an agent for `variant` that accesses the controller through `memory`.
    pub fn new(memory: M, variant: Variant) -> Self {
        FlashAgent {
            memory,
            variant,
            session: None,
        }
    }

    /// The variant this agent drives.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// The running session, if `init` succeeded and `uninit` was not called since.
    pub fn session(&self) -> Option<&ControllerSession> {
        self.session.as_ref()
    }

    /// The memory backend.
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// The memory backend, mutably.
    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// Consumes the agent and returns the memory backend.
    pub fn into_inner(self) -> M {
        self.memory
    }

    /// `Init`: unlocks the controller. A running session is replaced.
    pub fn init(&mut self, address: u32, clock: u32, function: u32) -> i32 {
        match ControllerSession::initialize(&mut self.memory, self.variant, address, clock, function)
        {
            Ok(session) => {
                self.session = Some(session);
                status_of(Ok(()))
            }
            Err(error) => {
                self.session = None;
                Self::report("Init", error)
            }
        }
    }

    /// `UnInit`: locks the controller and ends the session.
    pub fn uninit(&mut self, function: u32) -> i32 {
        let result = match self.session.take() {
            Some(session) => session.deinitialize(&mut self.memory, function),
            None => Err(FlashError::NotInitialized),
        };
        Self::status("UnInit", result)
    }

    /// `EraseChip`
    pub fn erase_chip(&mut self) -> i32 {
        let result = match &self.session {
            Some(session) => session.erase_chip(&mut self.memory),
            None => Err(FlashError::NotInitialized),
        };
        Self::status("EraseChip", result)
    }

    /// `EraseSector`
    pub fn erase_sector(&mut self, address: u32) -> i32 {
        let result = match &self.session {
            Some(session) => session.erase_sector(&mut self.memory, address),
            None => Err(FlashError::NotInitialized),
        };
        Self::status("EraseSector", result)
    }

    /// `BlankCheck`
    pub fn blank_check(&mut self, address: u32, size: u32, pattern: u8) -> i32 {
        let result = match &self.session {
            Some(session) => session.blank_check(&mut self.memory, address, size, pattern),
            None => Err(FlashError::NotInitialized),
        };
        Self::status("BlankCheck", result)
    }

    /// `ProgramPage`: programs `size` bytes of `buffer` at `address`.
    ///
    /// `size` is rounded up to the hardware program unit. The rounding bytes
    /// are taken from `buffer` when it is long enough. Everything past the
    /// end of `buffer` is programmed with the erased value.
    pub fn program_page(&mut self, address: u32, size: u32, buffer: &[u8]) -> i32 {
        let result = match &self.session {
            Some(session) => session.program_page(&mut self.memory, address, size, buffer),
            None => Err(FlashError::NotInitialized),
        };
        Self::status("ProgramPage", result)
    }

    /// `ProgramPage` with the buffer as the host passes it, a bare pointer.
    ///
    /// Exactly `size` bytes rounded up to the program unit are read from
    /// `buffer`. A null `buffer` fails without touching the controller.
    ///
    /// # Safety
    ///
    /// A non-null `buffer` must be valid for reads of `size` bytes rounded up
    /// to the program unit of the running session.
    pub unsafe fn program_page_raw(&mut self, address: u32, size: u32, buffer: *const u8) -> i32 {
        if buffer.is_null() {
            return Self::report("ProgramPage", FlashError::NullBuffer);
        }
        let Some(unit) = self.session.as_ref().map(ControllerSession::program_unit) else {
            return Self::report("ProgramPage", FlashError::NotInitialized);
        };

        let length = (size as usize).div_ceil(unit) * unit;
        // SAFETY: the caller guarantees `buffer` covers the rounded size.
        let buffer = unsafe { core::slice::from_raw_parts(buffer, length) };
        self.program_page(address, size, buffer)
    }

    fn status(routine: &'static str, result: Result<(), FlashError>) -> i32 {
        match result {
            Ok(()) => status_of(Ok(())),
            Err(error) => Self::report(routine, error),
        }
    }

    fn report(routine: &'static str, error: FlashError) -> i32 {
        match error {
            FlashError::NotBlank => debug!("{routine}: {error}"),
            _ => error!("{routine} failed: {error}"),
        }
        error.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FakeFmc;
    use pretty_assertions::assert_eq;

    #[test]
    fn calls_without_a_session_fail() {
        let mut agent = FlashAgent::new(FakeFmc::new(Variant::HighDensity), Variant::HighDensity);

        assert_eq!(agent.erase_chip(), 1);
        assert_eq!(agent.erase_sector(0x0800_0000), 1);
        assert_eq!(agent.program_page(0x0800_0000, 4, &[0; 4]), 1);
        assert_eq!(agent.blank_check(0x0800_0000, 4, 0xFF), 1);
        assert_eq!(agent.uninit(1), 1);
        assert!(agent.memory().trace().is_empty());
    }

    #[test]
    fn uninit_ends_the_session() {
        let mut agent = FlashAgent::new(FakeFmc::new(Variant::HighDensity), Variant::HighDensity);

        assert_eq!(agent.init(0x0800_0000, 8_000_000, 2), 0);
        assert!(agent.session().is_some());
        assert_eq!(agent.uninit(2), 0);
        assert!(agent.session().is_none());
        assert_eq!(agent.erase_chip(), 1);
    }

    #[test]
    fn init_replaces_a_running_session() {
        let mut agent = FlashAgent::new(FakeFmc::new(Variant::ExtraDensity), Variant::ExtraDensity);

        assert_eq!(agent.init(0x0800_0000, 0, 1), 0);
        assert_eq!(agent.init(0x0808_0000, 0, 2), 0);

        assert_eq!(agent.session().map(|s| s.base_address()), Some(0x0808_0000));
    }

    #[test]
    fn size_beyond_the_buffer_programs_the_erased_value() {
        let mut fmc = FakeFmc::new(Variant::HighDensity);
        fmc.load_flash(0x0800_0004, &[0; 4]).unwrap();
        let mut agent = FlashAgent::new(fmc, Variant::HighDensity);
        agent.init(0x0800_0000, 0, 2);

        // The second word is 0xFFFF_FFFF over programmed cells.
        assert_eq!(agent.program_page(0x0800_0000, 8, &[1, 2, 3, 4]), 1);

        let fmc = agent.memory();
        assert_eq!(fmc.program_count(), 2);
        assert_eq!(fmc.writes_to(0x0800_0004), vec![0xFFFF_FFFF]);
        assert_eq!(fmc.read_flash(0x0800_0000, 4), Some(&[1, 2, 3, 4][..]));
    }

    #[test]
    fn raw_null_buffer_fails_without_access() {
        let mut agent = FlashAgent::new(FakeFmc::new(Variant::HighDensity), Variant::HighDensity);
        agent.init(0x0800_0000, 0, 2);
        agent.memory_mut().clear_trace();

        // SAFETY: a null buffer is rejected before it is read.
        let status = unsafe { agent.program_page_raw(0x0800_0000, 4, core::ptr::null()) };

        assert_eq!(status, 1);
        assert!(agent.memory().trace().is_empty());
    }

    #[test]
    fn raw_buffer_without_a_session_is_not_read() {
        let mut agent = FlashAgent::new(FakeFmc::new(Variant::HighDensity), Variant::HighDensity);
        let data = [0u8; 4];

        // SAFETY: `data` covers one word.
        let status = unsafe { agent.program_page_raw(0x0800_0000, 4, data.as_ptr()) };

        assert_eq!(status, 1);
        assert!(agent.memory().trace().is_empty());
    }

    #[test]
    fn raw_size_is_rounded_to_the_word() {
        let mut agent = FlashAgent::new(FakeFmc::new(Variant::HighDensity), Variant::HighDensity);
        agent.init(0x0800_0000, 0, 2);
        let data = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];

        // SAFETY: `data` covers the 4 bytes a 3 byte write rounds up to.
        let status = unsafe { agent.program_page_raw(0x0800_0000, 3, data.as_ptr()) };

        assert_eq!(status, 0);
        let fmc = agent.memory();
        assert_eq!(fmc.writes_to(0x0800_0000), vec![0x4433_2211]);
        assert_eq!(fmc.read_flash(0x0800_0004, 4), Some(&[0xFF; 4][..]));
        assert_eq!(fmc.program_count(), 1);
    }

    #[test]
    fn raw_size_is_rounded_to_the_half_word_on_option_bytes() {
        let mut agent = FlashAgent::new(FakeFmc::new(Variant::OptionBytes), Variant::OptionBytes);
        agent.init(0x1FFF_F800, 0, 2);
        assert_eq!(agent.erase_sector(0x1FFF_F800), 0);
        let data = [0xA5, 0x5A, 0x00, 0xFF];

        // SAFETY: `data` covers the 4 bytes a 3 byte write rounds up to.
        let status = unsafe { agent.program_page_raw(0x1FFF_F800, 3, data.as_ptr()) };

        assert_eq!(status, 0);
        assert_eq!(&agent.memory().option_bytes()[..6], &[0xA5, 0x5A, 0x00, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn short_buffers_are_padded() {
        let mut agent = FlashAgent::new(FakeFmc::new(Variant::HighDensity), Variant::HighDensity);
        agent.init(0x0800_0000, 0, 2);

        assert_eq!(agent.program_page(0x0800_0000, 6, &[1, 2, 3, 4, 5, 6]), 0);

        assert_eq!(
            agent.memory().read_flash(0x0800_0000, 8),
            Some(&[1, 2, 3, 4, 5, 6, 0xFF, 0xFF][..])
        );
    }
}
