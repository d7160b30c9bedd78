//! # Sequence Server Library
//!
//! This library provides a TCP server that lets every connected client define
//! up to three arithmetic progressions and then streams their current values
//! back to that client at a fixed period until it disconnects or the server
//! stops.
//!
//! ## Core Responsibilities
//!
//! ### Session Management
//! Handles the complete lifecycle of client connections including:
//! - Non-blocking acceptance with a bounded poll interval
//! - One worker task per connection, registered at accept time
//! - Teardown that closes the socket and forgets the client's settings
//! - Deregistration through a reaper task, since a worker cannot await itself
//!
//! ### Protocol State Machine
//! Each connection starts in configure mode (`seq<N> <start> <step>`) and
//! switches to export mode on `export seq`. Export mode streams from a private
//! snapshot of the client's settings, so later updates only show up in a new
//! export session.
//!
//! ### Cooperative Shutdown
//! A shared running flag is checked at every bounded wait: the accept poll,
//! the receive poll and every export sleep slice. `stop()` clears the flag,
//! joins the accept loop, joins every registered worker and only then closes
//! the listening socket.
//!
//! ## Module Organization
//!
//! ### Acceptor Module (`acceptor`)
//! Endpoint setup (`SO_REUSEADDR`, bind, listen) and the accept loop.
//!
//! ### Client Manager Module (`client_manager`)
//! Client identities and the registry of live worker handles.
//!
//! ### Network Module (`network`)
//! The [`Server`] controller: start, stop, status.
//!
//! ### Session Module (`session`)
//! The per-connection worker and its state machine.
//!
//! ### Store Module (`store`)
//! The lock-protected map from client to its progression set.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(8080);
//!     server.start().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!
//!     server.stop().await;
//!     Ok(())
//! }
//! ```

mod acceptor;
pub mod client_manager;
pub mod config;
pub mod error;
pub mod network;
pub mod session;
pub mod store;

pub use client_manager::ClientId;
pub use config::ServerConfig;
pub use error::ServerError;
pub use network::{Server, ServerStatus};
pub use session::SessionState;
