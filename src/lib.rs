//! # FileVault
//!
//! Client and reference server for a compact binary file-backup protocol:
//! - Fixed-layout little-endian request and response headers
//! - File payloads streamed in bounded chunks with exact byte counts
//! - Typed status codes for every server outcome
//! - One request per connection, strictly sequential
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Caller (CLI / scripted run)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ &mut TcpStream
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Operation Driver                           │
//! │        backup · restore · delete · generate list            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ Wire Codec  │          │  Payload    │
//!   │  (headers)  │          │  Streamer   │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use filevault::{network, Client, ClientId, Config};
//!
//! # fn main() -> filevault::Result<()> {
//! let config = Config::builder().server_addr("127.0.0.1:5468").build();
//! let client = Client::new(ClientId::random(), &config)?;
//!
//! let mut conn = network::connect(&config)?;
//! let status = client.backup_file(Path::new("notes.txt"), &mut conn)?;
//! println!("backup: {}", status);
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod transfer;
pub mod client;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{VaultError, Result};
pub use config::Config;
pub use client::{Client, ClientId, FileList, Restore};
pub use protocol::{OpCode, StatusCode, PROTOCOL_VERSION};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of FileVault
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
