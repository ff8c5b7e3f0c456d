//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//! All integers are unsigned little-endian; names are ASCII.
//!
//! ### Request Format
//! ```text
//! ┌───────────────┬─────────┬────────┬──────────────┬──────────┬─────────────────┐
//! │ ClientId (4)  │ Ver (1) │ Op (1) │ NameLen (2)? │ Name?    │ PayloadSize (4)?│
//! └───────────────┴─────────┴────────┴──────────────┴──────────┴─────────────────┘
//! ```
//! The name is present for every op except `GenerateFilesList`; the payload
//! size (followed by the file bytes) only for `BackupFile`.
//!
//! ### Operations
//! - 100: BACKUP_FILE
//! - 200: RESTORE_FILE
//! - 201: DELETE_FILE
//! - 202: GENERATE_FILES_LIST
//!
//! ### Response Format
//! ```text
//! ┌─────────┬────────────┬──────────────┬──────────┐   ┌─────────────────┬──────────┐
//! │ Ver (1) │ Status (2) │ NameLen (2)? │ Name?    │ + │ PayloadSize (4)?│ Payload? │
//! └─────────┴────────────┴──────────────┴──────────┘   └─────────────────┴──────────┘
//! ```
//! The name is present iff the status is 210, 211 or 1001. Restore and list
//! success responses are followed by a payload; the caller knows to read it
//! from the decoded status.
//!
//! ### Status Codes
//! - 208: SUCCESS_DELETE_FILE
//! - 209: SUCCESS_BACKUP_FILE
//! - 210: SUCCESS_RESTORE_FILE
//! - 211: SUCCESS_GENERATE_FILE_LIST
//! - 1001: ERROR_FILE_DOESNT_EXIST
//! - 1002: ERROR_USER_HAS_NO_FILES
//! - 1003: ERROR_GENERIC

mod op;
mod status;
mod codec;

pub use op::{OpCode, Request};
pub use status::StatusCode;
pub use codec::{
    decode_request_header, decode_response_header, decode_u32_le, encode_request,
    encode_request_header, encode_response_header, encode_u32_le, RequestHeader,
    ResponseHeader, CLIENT_ID_SIZE, MAX_NAME_LEN, NAME_LEN_SIZE, OP_SIZE, PAYLOAD_SIZE_FIELD,
    REQUEST_PREFIX_SIZE, RESPONSE_PREFIX_SIZE, STATUS_SIZE, VERSION_SIZE,
};

/// Wire format revision this crate speaks
pub const PROTOCOL_VERSION: u8 = 1;

/// Whether `name` is a bare file name that is safe to join onto a directory
///
/// Rejects empty names, `.` and `..`, and anything containing a path
/// separator.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
