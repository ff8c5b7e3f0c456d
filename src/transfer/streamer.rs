//! Payload Streamer
//!
//! Chunked, exact-count copy loops between a connection and a file.

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use crate::error::{Result, VaultError};
use super::DEFAULT_CHUNK_SIZE;

/// Streams payloads in chunks of at most `chunk_size` bytes
#[derive(Debug, Clone, Copy)]
pub struct Streamer {
    chunk_size: usize,
}

impl Default for Streamer {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Streamer {
    /// Create a streamer with the given chunk size (must be at least 1)
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(VaultError::Config(
                "chunk size must be at least 1 byte".to_string(),
            ));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    // =========================================================================
    // File Transfers
    // =========================================================================

    /// Send exactly `size` bytes of the file at `path` to the connection
    pub fn send_file<W: Write>(&self, conn: &mut W, path: &Path, size: u64) -> Result<()> {
        let mut file = File::open(path)?;
        self.send(&mut file, conn, size)?;
        tracing::debug!("Sent {} bytes from {}", size, path.display());
        Ok(())
    }

    /// Receive exactly `size` bytes from the connection into `path`
    ///
    /// Any existing content is truncated. If the transfer fails the partial
    /// file is removed.
    pub fn receive_file<R: Read>(&self, conn: &mut R, path: &Path, size: u64) -> Result<()> {
        let mut file = File::create(path)?;

        if let Err(e) = self.receive(conn, &mut file, size) {
            drop(file);
            if let Err(remove_err) = fs::remove_file(path) {
                tracing::warn!(
                    "Failed to remove partial file {}: {}",
                    path.display(),
                    remove_err
                );
            }
            return Err(e);
        }

        tracing::debug!("Received {} bytes into {}", size, path.display());
        Ok(())
    }

    // =========================================================================
    // Stream Transfers
    // =========================================================================

    /// Copy exactly `size` bytes from `source` to `conn`
    ///
    /// Every chunk but the last is exactly `chunk_size` bytes and goes out
    /// with a single `write_all`.
    pub fn send<R: Read, W: Write>(&self, source: &mut R, conn: &mut W, size: u64) -> Result<u64> {
        let mut buf = vec![0u8; self.buffer_len(size)];
        let mut remaining = size;

        while remaining > 0 {
            let want = self.next_chunk(remaining);
            fill_chunk(source, &mut buf[..want], size - remaining, size)?;

            conn.write_all(&buf[..want])
                .map_err(|e| VaultError::transfer("connection write failed", e))?;

            remaining -= want as u64;
            tracing::trace!("Sent chunk of {} bytes, {} remaining", want, remaining);
        }

        conn.flush()
            .map_err(|e| VaultError::transfer("connection flush failed", e))?;
        Ok(size)
    }

    /// Copy exactly `size` bytes from `conn` to `sink`
    ///
    /// Short reads are retried until the total is reached; end-of-stream
    /// before that fails the transfer.
    pub fn receive<R: Read, W: Write>(&self, conn: &mut R, sink: &mut W, size: u64) -> Result<u64> {
        let mut buf = vec![0u8; self.buffer_len(size)];
        let mut remaining = size;

        while remaining > 0 {
            let want = self.next_chunk(remaining);
            let n = match conn.read(&mut buf[..want]) {
                Ok(0) => {
                    return Err(VaultError::Transfer(format!(
                        "connection closed after {} of {} bytes",
                        size - remaining,
                        size
                    )))
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(VaultError::transfer("connection read failed", e)),
            };

            sink.write_all(&buf[..n])
                .map_err(|e| VaultError::transfer("file write failed", e))?;

            remaining -= n as u64;
            tracing::trace!("Received {} bytes, {} remaining", n, remaining);
        }

        sink.flush()
            .map_err(|e| VaultError::transfer("file flush failed", e))?;
        Ok(size)
    }

    fn next_chunk(&self, remaining: u64) -> usize {
        remaining.min(self.chunk_size as u64) as usize
    }

    fn buffer_len(&self, size: u64) -> usize {
        self.next_chunk(size)
    }
}

/// Fill `chunk` from `source`, failing if the source runs dry
fn fill_chunk<R: Read>(source: &mut R, chunk: &mut [u8], sent: u64, size: u64) -> Result<()> {
    let mut filled = 0;
    while filled < chunk.len() {
        match source.read(&mut chunk[filled..]) {
            Ok(0) => {
                return Err(VaultError::Transfer(format!(
                    "source ended after {} of {} bytes",
                    sent + filled as u64,
                    size
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(VaultError::Io(e)),
        }
    }
    Ok(())
}
