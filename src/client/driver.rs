//! Operation Driver
//!
//! Composes the codec and the streamer into the four client operations.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Result, VaultError};
use crate::protocol::{
    decode_response_header, decode_u32_le, encode_request, is_plain_name, Request,
    ResponseHeader, StatusCode, PROTOCOL_VERSION,
};
use crate::transfer::Streamer;
use super::ClientId;

/// Outcome of a restore request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restore {
    pub status: StatusCode,

    /// Where the restored bytes were written (SUCCESS_RESTORE_FILE only).
    /// Differs from the requested path when that path already existed.
    pub path: Option<PathBuf>,
}

/// Outcome of a file list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileList {
    pub status: StatusCode,

    /// List file name chosen by the server (SUCCESS_GENERATE_FILE_LIST only)
    pub name: Option<String>,

    /// Local path of the downloaded list (SUCCESS_GENERATE_FILE_LIST only)
    pub path: Option<PathBuf>,
}

impl FileList {
    /// Read the downloaded list, one file name per entry
    ///
    /// Empty when the request did not succeed.
    pub fn entries(&self) -> Result<Vec<String>> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        let contents = fs::read_to_string(path)?;
        Ok(contents
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// Runs protocol operations on behalf of one client id
#[derive(Debug, Clone)]
pub struct Client {
    client_id: ClientId,
    version: u8,
    streamer: Streamer,
    download_dir: PathBuf,
    conflict_name: String,
}

impl Client {
    /// Create a client from config
    pub fn new(client_id: ClientId, config: &Config) -> Result<Self> {
        if !is_plain_name(&config.conflict_name) {
            return Err(VaultError::Config(format!(
                "conflict name must be a bare file name, got {:?}",
                config.conflict_name
            )));
        }

        Ok(Self {
            client_id,
            version: PROTOCOL_VERSION,
            streamer: Streamer::new(config.chunk_size)?,
            download_dir: config.download_dir.clone(),
            conflict_name: config.conflict_name.clone(),
        })
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Upload the file at `path`
    ///
    /// Returns the server status verbatim.
    pub fn backup_file<S: Read + Write>(&self, path: &Path, conn: &mut S) -> Result<StatusCode> {
        let name = wire_name(path)?;
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(VaultError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            )));
        }

        let size = u32::try_from(metadata.len()).map_err(|_| {
            VaultError::ProtocolEncode(format!(
                "{} is {} bytes, larger than a 4-byte size field allows",
                path.display(),
                metadata.len()
            ))
        })?;

        tracing::debug!("Backing up {} ({} bytes) as {:?}", path.display(), size, name);

        self.send_request(conn, &Request::Backup { name, size })?;
        self.streamer.send_file(conn, path, u64::from(size))?;

        let header = self.read_header(conn)?;
        Ok(header.status)
    }

    /// Download the file named like `path`
    ///
    /// If `path` already exists locally the bytes go to the conflict file
    /// next to it instead, and the original is left untouched.
    pub fn restore_file<S: Read + Write>(&self, path: &Path, conn: &mut S) -> Result<Restore> {
        let name = wire_name(path)?;
        tracing::debug!("Restoring {:?} into {}", name, path.display());

        self.send_request(conn, &Request::Restore { name })?;
        let header = self.read_header(conn)?;

        if !header.status.carries_payload() {
            return Ok(Restore {
                status: header.status,
                path: None,
            });
        }
        expect_payload_status(header.status, StatusCode::SuccessRestoreFile)?;

        let target = if path.exists() {
            let redirected = self.conflict_path(path);
            tracing::info!(
                "{} already exists, restoring into {}",
                path.display(),
                redirected.display()
            );
            redirected
        } else {
            path.to_path_buf()
        };

        let size = decode_u32_le(conn)?;
        self.streamer.receive_file(conn, &target, u64::from(size))?;

        Ok(Restore {
            status: header.status,
            path: Some(target),
        })
    }

    /// Ask the server to remove the file named like `path`
    pub fn delete_file<S: Read + Write>(&self, path: &Path, conn: &mut S) -> Result<StatusCode> {
        let name = wire_name(path)?;
        tracing::debug!("Deleting {:?}", name);

        self.send_request(conn, &Request::Delete { name })?;
        let header = self.read_header(conn)?;
        Ok(header.status)
    }

    /// Download the list of this client's files
    ///
    /// The server names the list; it is stored under that name in the
    /// download directory and its size is checked against the announced one.
    pub fn generate_files_list<S: Read + Write>(&self, conn: &mut S) -> Result<FileList> {
        tracing::debug!("Requesting file list");

        self.send_request(conn, &Request::ListFiles)?;
        let header = self.read_header(conn)?;

        if !header.status.carries_payload() {
            return Ok(FileList {
                status: header.status,
                name: None,
                path: None,
            });
        }
        expect_payload_status(header.status, StatusCode::SuccessGenerateFileList)?;

        if !is_plain_name(&header.name) {
            return Err(VaultError::ProtocolDecode(format!(
                "Server sent an unusable list file name: {:?}",
                header.name
            )));
        }

        let path = self.download_dir.join(&header.name);
        let size = u64::from(decode_u32_le(conn)?);
        self.streamer.receive_file(conn, &path, size)?;
        verify_payload_size(&path, size)?;

        Ok(FileList {
            status: header.status,
            name: Some(header.name),
            path: Some(path),
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Encode and write a request header (one write)
    fn send_request<S: Write>(&self, conn: &mut S, request: &Request) -> Result<()> {
        let bytes = encode_request(self.client_id.get(), self.version, request)?;
        conn.write_all(&bytes)
            .map_err(|e| VaultError::transfer("failed to send request", e))?;
        conn.flush()
            .map_err(|e| VaultError::transfer("failed to send request", e))?;
        tracing::trace!("Sent {:?} request ({} bytes)", request.op_code(), bytes.len());
        Ok(())
    }

    fn read_header<S: Read>(&self, conn: &mut S) -> Result<ResponseHeader> {
        let header = decode_response_header(conn)?;
        if header.version != self.version {
            tracing::warn!(
                "Server speaks protocol version {}, client speaks {}",
                header.version,
                self.version
            );
        }
        tracing::debug!("Server responded {}", header.status);
        Ok(header)
    }

    /// Conflict file next to `path`, never `path` itself
    fn conflict_path(&self, path: &Path) -> PathBuf {
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let candidate = dir.join(&self.conflict_name);
        if candidate == path {
            dir.join(format!("{}~", self.conflict_name))
        } else {
            candidate
        }
    }
}

/// Check that the file at `path` is exactly `expected` bytes long
pub fn verify_payload_size(path: &Path, expected: u64) -> Result<()> {
    let actual = fs::metadata(path)?.len();
    if actual != expected {
        return Err(VaultError::Consistency {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Reject a payload-carrying status that answers a different request
fn expect_payload_status(status: StatusCode, expected: StatusCode) -> Result<()> {
    if status != expected {
        return Err(VaultError::ProtocolDecode(format!(
            "Server answered with {}, expected {}",
            status, expected
        )));
    }
    Ok(())
}

/// The name a local path is known by on the server
fn wire_name(path: &Path) -> Result<String> {
    let name = path.file_name().ok_or_else(|| {
        VaultError::ProtocolEncode(format!("{} has no file name", path.display()))
    })?;
    name.to_str().map(str::to_string).ok_or_else(|| {
        VaultError::ProtocolEncode(format!("{} is not ASCII", path.display()))
    })
}
