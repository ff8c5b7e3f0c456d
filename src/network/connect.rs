//! Client connections

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, VaultError};

/// Connect to `config.server_addr` and apply the configured timeouts
///
/// Every resolved address is tried in turn; the last failure is returned.
pub fn connect(config: &Config) -> Result<TcpStream> {
    let addrs = config.server_addr.to_socket_addrs().map_err(|e| {
        VaultError::Config(format!("cannot resolve {}: {}", config.server_addr, e))
    })?;

    let mut last_err = None;
    for addr in addrs {
        let attempt = if config.connect_timeout_ms > 0 {
            TcpStream::connect_timeout(&addr, Duration::from_millis(config.connect_timeout_ms))
        } else {
            TcpStream::connect(addr)
        };

        match attempt {
            Ok(stream) => {
                configure(&stream, config)?;
                tracing::debug!("Connected to {}", addr);
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }

    match last_err {
        Some(e) => Err(VaultError::Io(e)),
        None => Err(VaultError::Config(format!(
            "{} did not resolve to any address",
            config.server_addr
        ))),
    }
}

/// Disable Nagle and set read/write timeouts (0 = none)
pub(crate) fn configure(stream: &TcpStream, config: &Config) -> Result<()> {
    stream.set_nodelay(true)?;
    if config.read_timeout_ms > 0 {
        stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms)))?;
    }
    if config.write_timeout_ms > 0 {
        stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms)))?;
    }
    Ok(())
}
