//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//! Encoders are pure; decoders pull exactly the bytes they need from a
//! reader and never look past the end of the header.
//!
//! ## Field Widths
//! ```text
//! ClientId=4  Version=1  OpCode=1  NameLength=2  StatusCode=2  PayloadLength=4
//! ```

use std::io::Read;

use bytes::{Buf, BufMut};

use crate::error::{Result, VaultError};
use super::{OpCode, Request, StatusCode};

pub const CLIENT_ID_SIZE: usize = 4;
pub const VERSION_SIZE: usize = 1;
pub const OP_SIZE: usize = 1;
pub const NAME_LEN_SIZE: usize = 2;
pub const STATUS_SIZE: usize = 2;
pub const PAYLOAD_SIZE_FIELD: usize = 4;

/// Fixed request prefix: client id + version + op
pub const REQUEST_PREFIX_SIZE: usize = CLIENT_ID_SIZE + VERSION_SIZE + OP_SIZE;

/// Fixed response prefix: version + status
pub const RESPONSE_PREFIX_SIZE: usize = VERSION_SIZE + STATUS_SIZE;

/// Longest name a 2-byte length field can announce
pub const MAX_NAME_LEN: usize = u16::MAX as usize;

/// A decoded request header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub client_id: u32,
    pub version: u8,
    pub op: OpCode,
    /// Empty for `GenerateFilesList`
    pub name: String,
}

impl RequestHeader {
    pub fn name_len(&self) -> u16 {
        self.name.len() as u16
    }
}

/// A response header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    pub version: u8,
    pub status: StatusCode,
    /// Empty unless `status.carries_name()`
    pub name: String,
}

impl ResponseHeader {
    /// Create a header without a name
    pub fn new(version: u8, status: StatusCode) -> Self {
        Self {
            version,
            status,
            name: String::new(),
        }
    }

    /// Create a header carrying a name
    pub fn with_name(version: u8, status: StatusCode, name: impl Into<String>) -> Self {
        Self {
            version,
            status,
            name: name.into(),
        }
    }

    pub fn name_len(&self) -> u16 {
        self.name.len() as u16
    }
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request header
///
/// Format: client_id (4) + version (1) + op (1) [+ name_len (2) + name]
///
/// The name fields are emitted only when `file_name` is non-empty.
pub fn encode_request_header(
    client_id: u32,
    version: u8,
    op: OpCode,
    file_name: Option<&str>,
) -> Result<Vec<u8>> {
    let name = file_name.unwrap_or_default();
    check_name(name)?;

    let mut message = Vec::with_capacity(REQUEST_PREFIX_SIZE + NAME_LEN_SIZE + name.len());
    message.put_u32_le(client_id);
    message.put_u8(version);
    message.put_u8(op as u8);
    if !name.is_empty() {
        put_name(&mut message, name);
    }

    Ok(message)
}

/// Encode a complete request, including the payload size field for backups
pub fn encode_request(client_id: u32, version: u8, request: &Request) -> Result<Vec<u8>> {
    let op = request.op_code();

    if let Some(name) = request.file_name() {
        if name.is_empty() {
            return Err(VaultError::ProtocolEncode(format!(
                "{:?} request: empty file name",
                op
            )));
        }
    }

    let mut message = encode_request_header(client_id, version, op, request.file_name())?;
    if let Request::Backup { size, .. } = request {
        message.put_u32_le(*size);
    }

    Ok(message)
}

/// Read a request header from a stream
///
/// Reads the name fields only for ops that carry a name. Any payload size
/// field is left in the stream.
pub fn decode_request_header<R: Read>(reader: &mut R) -> Result<RequestHeader> {
    let mut prefix = [0u8; REQUEST_PREFIX_SIZE];
    read_field(reader, &mut prefix, "request prefix")?;

    let mut buf = &prefix[..];
    let client_id = buf.get_u32_le();
    let version = buf.get_u8();
    let op = OpCode::try_from(buf.get_u8())?;

    let name = if op.carries_name() {
        read_name(reader)?
    } else {
        String::new()
    };

    Ok(RequestHeader {
        client_id,
        version,
        op,
        name,
    })
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response header
///
/// Format: version (1) + status (2) [+ name_len (2) + name]
///
/// The name fields are emitted iff the status carries a name.
pub fn encode_response_header(header: &ResponseHeader) -> Result<Vec<u8>> {
    let mut message = Vec::with_capacity(RESPONSE_PREFIX_SIZE + NAME_LEN_SIZE + header.name.len());
    message.put_u8(header.version);
    message.put_u16_le(header.status.code());

    if header.status.carries_name() {
        check_name(&header.name)?;
        put_name(&mut message, &header.name);
    }

    Ok(message)
}

/// Read a response header from a stream
///
/// Consumes exactly 3 bytes, plus the name fields when the decoded status
/// is SUCCESS_RESTORE_FILE, SUCCESS_GENERATE_FILE_LIST or
/// ERROR_FILE_DOESNT_EXIST.
pub fn decode_response_header<R: Read>(reader: &mut R) -> Result<ResponseHeader> {
    let mut prefix = [0u8; RESPONSE_PREFIX_SIZE];
    read_field(reader, &mut prefix, "response prefix")?;

    let mut buf = &prefix[..];
    let version = buf.get_u8();
    let status = StatusCode::try_from(buf.get_u16_le())?;

    let name = if status.carries_name() {
        read_name(reader)?
    } else {
        String::new()
    };

    Ok(ResponseHeader {
        version,
        status,
        name,
    })
}

// =============================================================================
// Payload Size Field
// =============================================================================

pub fn encode_u32_le(value: u32) -> [u8; PAYLOAD_SIZE_FIELD] {
    value.to_le_bytes()
}

/// Read a 4-byte little-endian unsigned integer from a stream
pub fn decode_u32_le<R: Read>(reader: &mut R) -> Result<u32> {
    let mut field = [0u8; PAYLOAD_SIZE_FIELD];
    read_field(reader, &mut field, "payload size")?;
    Ok((&field[..]).get_u32_le())
}

// =============================================================================
// Helpers
// =============================================================================

/// Validate that a name fits the wire
fn check_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(VaultError::ProtocolEncode(format!(
            "Name too long: {} bytes (max {})",
            name.len(),
            MAX_NAME_LEN
        )));
    }
    if !name.is_ascii() {
        return Err(VaultError::ProtocolEncode(format!(
            "Name is not ASCII: {:?}",
            name
        )));
    }
    Ok(())
}

fn put_name(message: &mut Vec<u8>, name: &str) {
    message.put_u16_le(name.len() as u16);
    message.put_slice(name.as_bytes());
}

/// Read a length-prefixed ASCII name
fn read_name<R: Read>(reader: &mut R) -> Result<String> {
    let mut len_field = [0u8; NAME_LEN_SIZE];
    read_field(reader, &mut len_field, "name length")?;
    let name_len = (&len_field[..]).get_u16_le() as usize;

    let mut name = vec![0u8; name_len];
    read_field(reader, &mut name, "name")?;

    if !name.is_ascii() {
        return Err(VaultError::ProtocolDecode(
            "Name contains non-ASCII bytes".to_string(),
        ));
    }

    // ASCII is valid UTF-8
    String::from_utf8(name).map_err(|e| VaultError::ProtocolDecode(e.to_string()))
}

/// Fill `buf` completely or report a truncated header
fn read_field<R: Read>(reader: &mut R, buf: &mut [u8], field: &str) -> Result<()> {
    let len = buf.len();
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            VaultError::ProtocolDecode(format!(
                "Truncated {}: stream closed before {} bytes arrived",
                field, len
            ))
        } else {
            VaultError::Io(e)
        }
    })
}
