//! Error types for FileVault
//!
//! Provides a unified error type for all operations.
//!
//! In-band server errors (file not found, no files, generic) are *not*
//! represented here: they arrive as a [`StatusCode`](crate::protocol::StatusCode)
//! and are returned to the caller as ordinary values.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using VaultError
pub type Result<T> = std::result::Result<T, VaultError>;

/// Unified error type for FileVault operations
#[derive(Debug, Error)]
pub enum VaultError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    /// Local file missing, unreadable or unwritable
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// Input that cannot be put on the wire (oversize or non-ASCII name)
    #[error("Protocol encode error: {0}")]
    ProtocolEncode(String),

    /// Malformed or truncated header from the peer
    #[error("Protocol decode error: {0}")]
    ProtocolDecode(String),

    // -------------------------------------------------------------------------
    // Transfer Errors
    // -------------------------------------------------------------------------
    /// Connection or file ended before the declared byte count was satisfied
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// A received file does not have the size the peer announced
    #[error("Consistency error: {} is {actual} bytes, expected {expected}", .path.display())]
    Consistency {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VaultError {
    /// Wrap a connection-side I/O failure as a transfer error
    pub(crate) fn transfer(context: &str, err: std::io::Error) -> Self {
        VaultError::Transfer(format!("{}: {}", context, err))
    }
}
