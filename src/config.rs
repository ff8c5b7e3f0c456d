//! Configuration for FileVault
//!
//! Centralized configuration with sensible defaults, plus readers for the
//! `server.info` and `backup.info` input files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, VaultError};
use crate::transfer::DEFAULT_CHUNK_SIZE;

/// Main configuration shared by the client and the reference server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Client Configuration
    // -------------------------------------------------------------------------
    /// Server address the client connects to (host:port)
    pub server_addr: String,

    /// Directory the file list is downloaded into
    pub download_dir: PathBuf,

    /// File name used instead of overwriting an existing file on restore.
    /// Resolved next to the requested path.
    pub conflict_name: String,

    // -------------------------------------------------------------------------
    // Server Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Root directory for stored files
    /// Internal structure:
    ///   {root_dir}/
    ///     └── {client_id}/
    ///           ├── {file}...
    ///           └── __file_list.txt
    pub root_dir: PathBuf,

    /// Name of the generated file list
    pub list_file_name: String,

    // -------------------------------------------------------------------------
    // Transfer Configuration
    // -------------------------------------------------------------------------
    /// Bytes moved per chunk when streaming payloads
    pub chunk_size: usize,

    /// Connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:5468".to_string(),
            download_dir: PathBuf::from("."),
            conflict_name: "tmp".to_string(),
            listen_addr: "0.0.0.0:5468".to_string(),
            root_dir: PathBuf::from("./backupsvr"),
            list_file_name: "__file_list.txt".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            connect_timeout_ms: 5000,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server address the client connects to
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server_addr = addr.into();
        self
    }

    /// Set the directory the file list is downloaded into
    pub fn download_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.download_dir = path.into();
        self
    }

    /// Set the restore conflict file name
    pub fn conflict_name(mut self, name: impl Into<String>) -> Self {
        self.config.conflict_name = name.into();
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the server storage root
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.root_dir = path.into();
        self
    }

    /// Set the generated file list name
    pub fn list_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.list_file_name = name.into();
        self
    }

    /// Set the streaming chunk size (in bytes)
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// Input Files
// =============================================================================

/// Read the server address from a `server.info` file
///
/// The first line must be `host:port`.
pub fn read_server_info(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path)?;
    let line = contents
        .lines()
        .next()
        .map(str::trim)
        .unwrap_or_default();

    let (host, port) = line.rsplit_once(':').ok_or_else(|| {
        VaultError::Config(format!(
            "{}: expected host:port, got {:?}",
            path.display(),
            line
        ))
    })?;

    if host.is_empty() {
        return Err(VaultError::Config(format!(
            "{}: missing host in {:?}",
            path.display(),
            line
        )));
    }
    port.parse::<u16>().map_err(|e| {
        VaultError::Config(format!("{}: invalid port {:?}: {}", path.display(), port, e))
    })?;

    Ok(line.to_string())
}

/// Read the list of files to back up from a `backup.info` file
///
/// Blank lines are skipped.
pub fn read_backup_list(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
