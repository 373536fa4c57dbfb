//! Word access to the target memory map.
//!
//! Everything the agent does goes through [`MemoryInterface`]. On the chip
//! the accesses are volatile loads and stores, on the host they are served
//! by [`FakeFmc`](crate::FakeFmc).

/// Memory access to address {address:#010x} was not aligned to {alignment} bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub struct MemoryNotAlignedError {
    /// The address of the register.
    pub address: u64,
    /// The required alignment in bytes (address increments).
    pub alignment: usize,
}

/// Nothing responds to a {width}-bit access at address {address:#010x}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub struct UnmappedAddressError {
    /// The address of the access.
    pub address: u64,
    /// Access width in bits.
    pub width: u8,
}

/// The {width}-bit write to flash at {address:#010x} was refused, the controller is not in program mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, docsplay::Display)]
pub struct WriteRefusedError {
    /// The address of the write.
    pub address: u64,
    /// Access width in bits.
    pub width: u8,
}

/// A failed memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// The access was not naturally aligned.
    #[error(transparent)]
    NotAligned(#[from] MemoryNotAlignedError),
    /// The address is not backed by anything.
    #[error(transparent)]
    Unmapped(#[from] UnmappedAddressError),
    /// A flash write outside of a program command.
    #[error(transparent)]
    WriteRefused(#[from] WriteRefusedError),
}

/// Word and half-word access to the target memory map.
pub trait MemoryInterface {
    /// Read a 32bit word at `address`.
    ///
    /// The address where the read should be performed at has to be a multiple of 4.
    /// Returns [`MemoryError::NotAligned`] if this does not hold true.
    fn read_word_32(&mut self, address: u64) -> Result<u32, MemoryError>;

    /// Read a 16bit word at `address`.
    ///
    /// The address where the read should be performed at has to be a multiple of 2.
    /// Returns [`MemoryError::NotAligned`] if this does not hold true.
    fn read_word_16(&mut self, address: u64) -> Result<u16, MemoryError>;

    /// Write a 32bit word at `address`.
    ///
    /// The address where the write should be performed at has to be a multiple of 4.
    /// Returns [`MemoryError::NotAligned`] if this does not hold true.
    fn write_word_32(&mut self, address: u64, data: u32) -> Result<(), MemoryError>;

    /// Write a 16bit word at `address`.
    ///
    /// The address where the write should be performed at has to be a multiple of 2.
    /// Returns [`MemoryError::NotAligned`] if this does not hold true.
    fn write_word_16(&mut self, address: u64, data: u16) -> Result<(), MemoryError>;
}

impl<T> MemoryInterface for &mut T
where
    T: MemoryInterface + ?Sized,
{
    fn read_word_32(&mut self, address: u64) -> Result<u32, MemoryError> {
        (*self).read_word_32(address)
    }

    fn read_word_16(&mut self, address: u64) -> Result<u16, MemoryError> {
        (*self).read_word_16(address)
    }

    fn write_word_32(&mut self, address: u64, data: u32) -> Result<(), MemoryError> {
        (*self).write_word_32(address, data)
    }

    fn write_word_16(&mut self, address: u64, data: u16) -> Result<(), MemoryError> {
        (*self).write_word_16(address, data)
    }
}

/// Check that `address` is a multiple of `alignment`.
pub fn valid_access(address: u64, alignment: usize) -> Result<(), MemoryNotAlignedError> {
    if address % alignment as u64 != 0 {
        return Err(MemoryNotAlignedError { address, alignment });
    }
    Ok(())
}

/// Volatile access to the memory map of the core the agent runs on.
#[derive(Debug)]
pub struct VolatileMemory {
    _private: (),
}

impl VolatileMemory {
    /// Creates the accessor.
    ///
    /// # Safety
    ///
    /// Every address handed to the returned value is dereferenced as is. This
    /// is only sound when running on a GD32F30x, where the FMC and FWDGT
    /// register blocks and the flash are mapped at their documented addresses.
    pub const unsafe fn new() -> Self {
        VolatileMemory { _private: () }
    }

    fn pointer<T>(address: u64) -> Result<*mut T, MemoryError> {
        valid_access(address, core::mem::align_of::<T>())?;
        let address = usize::try_from(address)
            .map_err(|_| UnmappedAddressError {
                address,
                width: (core::mem::size_of::<T>() * 8) as u8,
            })?;
        Ok(address as *mut T)
    }
}

impl MemoryInterface for VolatileMemory {
    fn read_word_32(&mut self, address: u64) -> Result<u32, MemoryError> {
        let pointer = Self::pointer::<u32>(address)?;
        // SAFETY: `new` requires that the documented memory map is present.
        Ok(unsafe { pointer.read_volatile() })
    }

    fn read_word_16(&mut self, address: u64) -> Result<u16, MemoryError> {
        let pointer = Self::pointer::<u16>(address)?;
        // SAFETY: see `read_word_32`.
        Ok(unsafe { pointer.read_volatile() })
    }

    fn write_word_32(&mut self, address: u64, data: u32) -> Result<(), MemoryError> {
        let pointer = Self::pointer::<u32>(address)?;
        // SAFETY: see `read_word_32`.
        unsafe { pointer.write_volatile(data) };
        Ok(())
    }

    fn write_word_16(&mut self, address: u64, data: u16) -> Result<(), MemoryError> {
        let pointer = Self::pointer::<u16>(address)?;
        // SAFETY: see `read_word_32`.
        unsafe { pointer.write_volatile(data) };
        Ok(())
    }
}
