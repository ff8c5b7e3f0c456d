//! Transfer Module
//!
//! Moves an exact byte count between a stream connection and a local file.
//!
//! ## Responsibilities
//! - Bounded chunks (`chunk_size` bytes at most per read/write)
//! - Exactly the announced number of bytes, never more, never less
//! - Short sources are fatal: a zero-byte read before the total is reached
//!   fails the transfer
//! - File handles live only for the duration of one call

mod streamer;

pub use streamer::Streamer;

/// Bytes per chunk unless configured otherwise
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
