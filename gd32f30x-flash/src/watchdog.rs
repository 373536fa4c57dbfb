//! Free watchdog servicing.
//!
//! When the `nWDG_HW` user option is clear the FWDGT starts at reset and
//! cannot be stopped. Long erases would outlast its default period, so the
//! agent stretches the period to the maximum and reloads it while waiting.

use crate::logging::debug;
use crate::memory::{MemoryError, MemoryInterface};
use crate::registers::{
    FwdgtCtl, FwdgtPsc, FwdgtRld, MemoryMappedRegister, ObStat, FWDGT_CMD_RELOAD,
    FWDGT_CMD_WRITE_ACCESS, FWDGT_PSC_DIV256, FWDGT_RLD_MAX,
};

/// Configures the longest watchdog period if hardware started the watchdog.
///
/// Returns whether the watchdog was configured.
pub fn configure_if_running(memory: &mut dyn MemoryInterface) -> Result<bool, MemoryError> {
    let obstat = ObStat::load(memory)?;
    if obstat.nwdg_hw() {
        debug!("Watchdog is in software mode, leaving it alone");
        return Ok(false);
    }

    FwdgtCtl::command(FWDGT_CMD_WRITE_ACCESS).store(memory)?;

    let mut psc = FwdgtPsc::from(0);
    psc.set_psc(FWDGT_PSC_DIV256);
    psc.store(memory)?;

    let mut rld = FwdgtRld::from(0);
    rld.set_rld(FWDGT_RLD_MAX);
    rld.store(memory)?;

    debug!("Hardware watchdog running, period set to the maximum");
    Ok(true)
}

/// Reloads the watchdog counter.
pub fn reload(memory: &mut dyn MemoryInterface) -> Result<(), MemoryError> {
    FwdgtCtl::command(FWDGT_CMD_RELOAD).store(memory)
}
