//! Logging that compiles away on the target.
//!
//! With the `std` feature every macro forwards to its `tracing` namesake.
//! Without it the arguments are still type checked but nothing is formatted,
//! so the agent binary links neither `tracing` nor an allocator.

macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        tracing::trace!($($arg)*);
        #[cfg(not(feature = "std"))]
        let _ = format_args!($($arg)*);
    }};
}

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        tracing::debug!($($arg)*);
        #[cfg(not(feature = "std"))]
        let _ = format_args!($($arg)*);
    }};
}

macro_rules! warn_ {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        tracing::warn!($($arg)*);
        #[cfg(not(feature = "std"))]
        let _ = format_args!($($arg)*);
    }};
}

macro_rules! error {
    ($($arg:tt)*) => {{
        #[cfg(feature = "std")]
        tracing::error!($($arg)*);
        #[cfg(not(feature = "std"))]
        let _ = format_args!($($arg)*);
    }};
}

pub(crate) use {debug, error, trace, warn_ as warn};
