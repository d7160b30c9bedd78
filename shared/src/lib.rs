//! Types shared by the sequence server and its clients: the counter data
//! model, the text wire protocol and the protocol constants.

pub mod protocol;
pub mod sequence;

pub use protocol::{parse_command, parse_commands, Command, ProtocolError, EXPORT_COMMAND};
pub use sequence::{Counter, ProgressionSet};

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Bounded wait used by the accept loop and the session receive loop
/// between checks of the server running flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Period between two exported lines.
pub const EXPORT_PERIOD: Duration = Duration::from_millis(100);

/// Number of slices the export period is cut into while sleeping.
pub const EXPORT_SLICES: u32 = 10;

/// Largest number of bytes taken from a connection in a single receive.
pub const RECV_BUFFER_SIZE: usize = 128;

pub const LISTEN_BACKLOG: u32 = 10;

pub const MIN_SLOT: u8 = 1;
pub const MAX_SLOT: u8 = 3;
