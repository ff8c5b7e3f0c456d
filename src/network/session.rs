//! Session Handler
//!
//! Serves the single request carried by one client connection.

use std::fs;
use std::io::{self, BufReader, BufWriter, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, VaultError};
use crate::network::UserLocks;
use crate::protocol::{
    decode_request_header, decode_u32_le, encode_response_header, encode_u32_le,
    is_plain_name, OpCode, RequestHeader, ResponseHeader, StatusCode, PROTOCOL_VERSION,
};
use crate::transfer::Streamer;

/// Directory under the storage root holding uploads still in flight.
/// Client ids are numeric, so it never collides with a user directory.
const STAGING_DIR: &str = ".incoming";

/// Server-wide state shared by all sessions
#[derive(Debug)]
pub(crate) struct Shared {
    pub root_dir: PathBuf,
    pub list_file_name: String,
    pub streamer: Streamer,
    pub locks: UserLocks,
}

/// A response header plus the file (and its size) to stream after it
struct Reply {
    header: ResponseHeader,
    payload: Option<(PathBuf, u32)>,
}

impl Reply {
    fn status(status: StatusCode) -> Self {
        Self {
            header: ResponseHeader::new(PROTOCOL_VERSION, status),
            payload: None,
        }
    }

    fn named(status: StatusCode, name: &str) -> Self {
        Self {
            header: ResponseHeader::with_name(PROTOCOL_VERSION, status, name),
            payload: None,
        }
    }

    fn with_payload(status: StatusCode, name: &str, path: PathBuf, size: u32) -> Self {
        Self {
            header: ResponseHeader::with_name(PROTOCOL_VERSION, status, name),
            payload: Some((path, size)),
        }
    }
}

/// Handles a single client connection
pub struct Session {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    shared: Arc<Shared>,

    /// Peer address for logging
    peer_addr: String,
}

impl Session {
    pub(crate) fn new(stream: TcpStream, shared: Arc<Shared>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            shared,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = none)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Serve the request on this connection (blocking until answered)
    pub fn handle(mut self) -> Result<()> {
        let request = match decode_request_header(&mut self.reader) {
            Ok(request) => request,
            Err(VaultError::ProtocolDecode(msg)) => {
                tracing::warn!("Bad request from {}: {}", self.peer_addr, msg);
                let _ = self.send_reply(Reply::status(StatusCode::ErrorGeneric));
                return Err(VaultError::ProtocolDecode(msg));
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(
            "Request from {}: client={} op={:?} name={:?}",
            self.peer_addr,
            request.client_id,
            request.op,
            request.name
        );

        let shared = Arc::clone(&self.shared);
        let _guard = shared.locks.lock(request.client_id);

        let user_dir = shared.root_dir.join(request.client_id.to_string());
        let reply = match request.op {
            OpCode::BackupFile => match self.receive_backup(&request, &user_dir)? {
                Some(reply) => reply,
                None => return Ok(()),
            },
            OpCode::RestoreFile => self.restore(&request, &user_dir)?,
            OpCode::DeleteFile => self.delete(&request, &user_dir)?,
            OpCode::GenerateFilesList => self.generate_list(&user_dir)?,
        };

        tracing::debug!("Responding {} to {}", reply.header.status, self.peer_addr);
        self.send_reply(reply)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Store the uploaded payload
    ///
    /// The bytes land in a staging file that is renamed into the user
    /// directory only once the whole payload has arrived, so a stored name
    /// never refers to a partial upload. Returns `None` when the upload broke
    /// off and the peer is gone.
    fn receive_backup(
        &mut self,
        request: &RequestHeader,
        user_dir: &Path,
    ) -> Result<Option<Reply>> {
        let size = u64::from(decode_u32_le(&mut self.reader)?);
        let streamer = self.shared.streamer;

        if !is_plain_name(&request.name) {
            tracing::warn!("Rejecting backup of {:?} from {}", request.name, self.peer_addr);
            streamer.receive(&mut self.reader, &mut io::sink(), size)?;
            return Ok(Some(Reply::status(StatusCode::ErrorGeneric)));
        }

        let staging_dir = self.shared.root_dir.join(STAGING_DIR);
        fs::create_dir_all(&staging_dir)?;
        fs::create_dir_all(user_dir)?;
        let staged = staging_dir.join(format!("{}.{}", request.client_id, request.name));
        let path = user_dir.join(&request.name);

        match streamer.receive_file(&mut self.reader, &staged, size) {
            Ok(()) => {}
            Err(e @ VaultError::Transfer(_)) => {
                tracing::warn!("Backup from {} incomplete: {}", self.peer_addr, e);
                let _ = self.send_reply(Reply::status(StatusCode::ErrorGeneric));
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!("Cannot store {}: {}", path.display(), e);
                return Ok(Some(Reply::status(StatusCode::ErrorGeneric)));
            }
        }

        match fs::rename(&staged, &path) {
            Ok(()) => Ok(Some(Reply::status(StatusCode::SuccessBackupFile))),
            Err(e) => {
                tracing::warn!("Cannot store {}: {}", path.display(), e);
                let _ = fs::remove_file(&staged);
                Ok(Some(Reply::status(StatusCode::ErrorGeneric)))
            }
        }
    }

    fn restore(&self, request: &RequestHeader, user_dir: &Path) -> Result<Reply> {
        if !is_plain_name(&request.name) {
            return Ok(Reply::status(StatusCode::ErrorGeneric));
        }
        if self.stored_files(user_dir)?.is_empty() {
            return Ok(Reply::status(StatusCode::ErrorUserHasNoFiles));
        }

        let path = user_dir.join(&request.name);
        if !path.is_file() {
            return Ok(Reply::named(StatusCode::ErrorFileDoesntExist, &request.name));
        }

        match u32::try_from(fs::metadata(&path)?.len()) {
            Ok(size) => Ok(Reply::with_payload(
                StatusCode::SuccessRestoreFile,
                &request.name,
                path,
                size,
            )),
            Err(_) => {
                tracing::warn!("{} is too large to restore", path.display());
                Ok(Reply::status(StatusCode::ErrorGeneric))
            }
        }
    }

    fn delete(&self, request: &RequestHeader, user_dir: &Path) -> Result<Reply> {
        if !is_plain_name(&request.name) {
            return Ok(Reply::status(StatusCode::ErrorGeneric));
        }
        if self.stored_files(user_dir)?.is_empty() {
            return Ok(Reply::status(StatusCode::ErrorUserHasNoFiles));
        }

        let path = user_dir.join(&request.name);
        if !path.is_file() {
            return Ok(Reply::named(StatusCode::ErrorFileDoesntExist, &request.name));
        }

        match fs::remove_file(&path) {
            Ok(()) => Ok(Reply::status(StatusCode::SuccessDeleteFile)),
            Err(e) => {
                tracing::warn!("Cannot delete {}: {}", path.display(), e);
                Ok(Reply::status(StatusCode::ErrorGeneric))
            }
        }
    }

    /// Write the list file and answer with it as payload
    fn generate_list(&self, user_dir: &Path) -> Result<Reply> {
        let files = self.stored_files(user_dir)?;
        if files.is_empty() {
            return Ok(Reply::status(StatusCode::ErrorUserHasNoFiles));
        }

        let mut contents = String::new();
        for name in &files {
            contents.push_str(name);
            contents.push('\n');
        }

        let name = &self.shared.list_file_name;
        let path = user_dir.join(name);
        if let Err(e) = fs::write(&path, &contents) {
            tracing::warn!("Cannot write {}: {}", path.display(), e);
            return Ok(Reply::status(StatusCode::ErrorGeneric));
        }

        match u32::try_from(contents.len()) {
            Ok(size) => Ok(Reply::with_payload(
                StatusCode::SuccessGenerateFileList,
                name,
                path,
                size,
            )),
            Err(_) => Ok(Reply::status(StatusCode::ErrorGeneric)),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Sorted names of the regular files stored for a user, excluding the
    /// generated list
    fn stored_files(&self, user_dir: &Path) -> Result<Vec<String>> {
        let entries = match fs::read_dir(user_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if name != self.shared.list_file_name {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Send a response header, then its payload when it has one
    fn send_reply(&mut self, reply: Reply) -> Result<()> {
        let header = encode_response_header(&reply.header)?;
        self.writer.write_all(&header)?;

        if reply.header.status.carries_payload() {
            let Some((path, size)) = reply.payload else {
                return Err(VaultError::ProtocolEncode(format!(
                    "{} must be followed by a payload",
                    reply.header.status
                )));
            };
            self.writer.write_all(&encode_u32_le(size))?;
            self.shared
                .streamer
                .send_file(&mut self.writer, &path, u64::from(size))?;
        }

        self.writer.flush()?;
        Ok(())
    }
}
