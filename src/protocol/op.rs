//! Operation definitions
//!
//! Represents requests a client can make.

use crate::error::VaultError;

/// Operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    BackupFile = 100,
    RestoreFile = 200,
    DeleteFile = 201,
    GenerateFilesList = 202,
}

impl OpCode {
    /// Whether requests with this op carry a file name
    pub fn carries_name(self) -> bool {
        !matches!(self, OpCode::GenerateFilesList)
    }
}

impl TryFrom<u8> for OpCode {
    type Error = VaultError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            100 => Ok(OpCode::BackupFile),
            200 => Ok(OpCode::RestoreFile),
            201 => Ok(OpCode::DeleteFile),
            202 => Ok(OpCode::GenerateFilesList),
            _ => Err(VaultError::ProtocolDecode(format!(
                "Unknown op code: {}",
                value
            ))),
        }
    }
}

/// A request to send to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Store a file; `size` bytes of payload follow the header
    Backup { name: String, size: u32 },

    /// Fetch a stored file
    Restore { name: String },

    /// Remove a stored file
    Delete { name: String },

    /// Ask for the list of stored files
    ListFiles,
}

impl Request {
    /// Get the op code
    pub fn op_code(&self) -> OpCode {
        match self {
            Request::Backup { .. } => OpCode::BackupFile,
            Request::Restore { .. } => OpCode::RestoreFile,
            Request::Delete { .. } => OpCode::DeleteFile,
            Request::ListFiles => OpCode::GenerateFilesList,
        }
    }

    /// Get the target file name, if the request has one
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Request::Backup { name, .. }
            | Request::Restore { name }
            | Request::Delete { name } => Some(name),
            Request::ListFiles => None,
        }
    }
}
