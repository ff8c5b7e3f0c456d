//! Client Module
//!
//! The operation driver: backup, restore, delete and list, each running one
//! request/response exchange over a caller-supplied connection.
//!
//! ## Exchange
//! ```text
//! build request ─► send header (+ payload) ─► decode response header
//!                                                  │
//!                                    status carries payload?
//!                                                  │
//!                                   read size ─► receive payload ─► status
//! ```
//!
//! The caller owns the connection: it connects, passes `&mut` in, and
//! closes it afterwards. Nothing here retries or reconnects.

mod id;
mod driver;

pub use id::ClientId;
pub use driver::{verify_payload_size, Client, FileList, Restore};
