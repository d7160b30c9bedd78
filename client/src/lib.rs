//! # Sequence Client Library
//!
//! A thin client for the sequence server's text protocol. It configures
//! subsequences, requests an export and parses the streamed lines back into
//! numbers. Used by the command line client and by the end-to-end tests.
//!
//! The server never acknowledges commands, so [`SequenceClient`] pauses
//! briefly after each one to keep separate commands in separate receives.

pub mod network;

pub use network::{ClientError, SequenceClient};
