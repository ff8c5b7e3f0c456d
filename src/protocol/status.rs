//! Status definitions
//!
//! Represents outcomes reported by the server.

use std::fmt;

use crate::error::VaultError;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    SuccessDeleteFile = 208,
    SuccessBackupFile = 209,
    SuccessRestoreFile = 210,
    SuccessGenerateFileList = 211,
    ErrorFileDoesntExist = 1001,
    ErrorUserHasNoFiles = 1002,
    ErrorGeneric = 1003,
}

impl StatusCode {
    /// Numeric wire value
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Whether the response header carries a name for this status
    pub fn carries_name(self) -> bool {
        matches!(
            self,
            StatusCode::SuccessRestoreFile
                | StatusCode::SuccessGenerateFileList
                | StatusCode::ErrorFileDoesntExist
        )
    }

    /// Whether a payload (size field + bytes) follows the response header
    pub fn carries_payload(self) -> bool {
        matches!(
            self,
            StatusCode::SuccessRestoreFile | StatusCode::SuccessGenerateFileList
        )
    }

    pub fn is_success(self) -> bool {
        self.code() < 1000
    }

    /// Upper-case protocol name
    pub fn name(self) -> &'static str {
        match self {
            StatusCode::SuccessDeleteFile => "SUCCESS_DELETE_FILE",
            StatusCode::SuccessBackupFile => "SUCCESS_BACKUP_FILE",
            StatusCode::SuccessRestoreFile => "SUCCESS_RESTORE_FILE",
            StatusCode::SuccessGenerateFileList => "SUCCESS_GENERATE_FILE_LIST",
            StatusCode::ErrorFileDoesntExist => "ERROR_FILE_DOESNT_EXIST",
            StatusCode::ErrorUserHasNoFiles => "ERROR_USER_HAS_NO_FILES",
            StatusCode::ErrorGeneric => "ERROR_GENERIC",
        }
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = VaultError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            208 => Ok(StatusCode::SuccessDeleteFile),
            209 => Ok(StatusCode::SuccessBackupFile),
            210 => Ok(StatusCode::SuccessRestoreFile),
            211 => Ok(StatusCode::SuccessGenerateFileList),
            1001 => Ok(StatusCode::ErrorFileDoesntExist),
            1002 => Ok(StatusCode::ErrorUserHasNoFiles),
            1003 => Ok(StatusCode::ErrorGeneric),
            _ => Err(VaultError::ProtocolDecode(format!(
                "Unknown response status: {}",
                value
            ))),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
