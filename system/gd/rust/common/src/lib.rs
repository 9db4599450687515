//! Bluetooth common library

/// Provides runtime configured-at-startup flags
pub mod init_flags;

/// Inits logging for the host
pub mod logging;

pub use logging::init_logging;
