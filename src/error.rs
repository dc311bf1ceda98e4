//! Unified error types for the Reclina firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level control loop's error handling uniform.  The taxonomy matters:
//! usage errors indicate a sequencing defect upstream and are always
//! returned to the caller; persistence errors split into a hard "file is
//! missing" failure and locally-recovered "content is malformed" cases that
//! never reach this type at all.

use core::fmt;
use std::io;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// A component was used out of lifecycle order.
    Usage(UsageError),
    /// A configuration value failed range validation.
    Validation(&'static str),
    /// A file could not be loaded or stored.
    Persistence(PersistenceError),
    /// A GPIO line could not be acquired or released.
    Resource(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(e) => write!(f, "usage: {e}"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
            Self::Persistence(e) => write!(f, "persistence: {e}"),
            Self::Resource(msg) => write!(f, "resource: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Usage errors
// ---------------------------------------------------------------------------

/// Operating a component outside its initialized window.  Never absorbed:
/// the caller has a sequencing bug and must hear about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageError {
    /// The component has not been initialized (or was uninitialized).
    NotInitialized,
    /// The component is already initialized.
    AlreadyInitialized,
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "not initialized"),
            Self::AlreadyInitialized => write!(f, "already initialized"),
        }
    }
}

impl From<UsageError> for Error {
    fn from(e: UsageError) -> Self {
        Self::Usage(e)
    }
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

/// File-level failures.  Malformed *content* is not represented here — it is
/// recovered at the parse site (default value, log line) and never
/// propagates.
#[derive(Debug)]
pub enum PersistenceError {
    /// The file does not exist.
    NotFound(PathBuf),
    /// Reading or writing failed.
    Io(io::Error),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "file not found: {}", path.display()),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl From<PersistenceError> for Error {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// True when the error is the hard "file missing" persistence case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Persistence(PersistenceError::NotFound(_)))
    }
}
