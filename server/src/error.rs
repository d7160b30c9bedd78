//! Errors that abort server startup.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Failure while setting up the listening endpoint.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("socket() failed for {addr}: {source}")]
    Socket { addr: SocketAddr, source: io::Error },

    #[error("setsockopt(SO_REUSEADDR) failed for {addr}: {source}")]
    ReuseAddr { addr: SocketAddr, source: io::Error },

    #[error("bind() failed for {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("listen() failed for {addr}: {source}")]
    Listen { addr: SocketAddr, source: io::Error },
}

impl ServerError {
    pub fn addr(&self) -> SocketAddr {
        match self {
            Self::Socket { addr, .. }
            | Self::ReuseAddr { addr, .. }
            | Self::Bind { addr, .. }
            | Self::Listen { addr, .. } => *addr,
        }
    }
}
