#![allow(missing_docs)]

use crate::memory::MemoryError;
use thiserror::Error;

/// Status returned to the host when an operation succeeded.
pub const STATUS_OK: i32 = 0;
/// Status returned to the host when an operation failed.
pub const STATUS_FAILED: i32 = 1;

/// Describes any error that happened during a flash operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlashError {
    #[error("Programming {address:#010X} failed, the location was not erased.")]
    ProgramError { address: u32 },

    #[error("Programming {address:#010X} failed, the page is write protected.")]
    WriteProtection { address: u32 },

    // The option byte blank check never inspects memory.
    #[error("The option bytes are reported as not blank, erase them first.")]
    NotBlank,

    #[error("The '{0}' routine is not supported by this flash device.")]
    RoutineNotSupported(&'static str),

    #[error("The flash agent was not initialized.")]
    NotInitialized,

    #[error("The host passed a null data buffer.")]
    NullBuffer,

    #[error("Something during memory interaction went wrong")]
    Memory(#[from] MemoryError),
}

impl FlashError {
    /// The status code the host sees for this error.
    pub fn status(&self) -> i32 {
        STATUS_FAILED
    }
}

/// Collapses the result of an operation into a host status code.
pub fn status_of(result: Result<(), FlashError>) -> i32 {
    match result {
        Ok(()) => STATUS_OK,
        Err(error) => error.status(),
    }
}
