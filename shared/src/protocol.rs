//! Text protocol spoken between clients and the sequence server.
//!
//! Two commands exist:
//! - `seq<N> <start> <step>` configures slot `N` (1..=3)
//! - `export seq` switches the connection into streaming mode
//!
//! The server never answers a command; anything that does not parse is
//! dropped and reported through [`ProtocolError`] for logging only.

use crate::{MAX_SLOT, MIN_SLOT};
use thiserror::Error;

pub const EXPORT_COMMAND: &str = "export seq";

/// Prefix of the configure command, followed directly by the slot number.
pub const CONFIGURE_PREFIX: &str = "seq";

/// Shortest possible configure command, `seqN a b`.
const MIN_CONFIGURE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Configure { slot: u8, start: u32, step: u32 },
    Export,
}

impl Command {
    /// Wire form of the command, without line terminator.
    pub fn to_line(&self) -> String {
        match self {
            Command::Configure { slot, start, step } => {
                format!("{}{} {} {}", CONFIGURE_PREFIX, slot, start, step)
            }
            Command::Export => EXPORT_COMMAND.to_string(),
        }
    }
}

/// Reason a received command was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("input is not valid UTF-8")]
    NotUtf8,

    #[error("empty command")]
    Empty,

    #[error("command too short: {0:?}")]
    TooShort(String),

    #[error("expected 3 space separated fields, got {0}")]
    FieldCount(usize),

    #[error("invalid 'seq' opcode ({0})")]
    UnknownCommand(String),

    #[error("slot {0} out of range 1..=3")]
    InvalidSlot(u32),

    #[error("invalid {field} value {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Parses a single command. A trailing CR and/or LF (and anything after
/// the first one) is ignored.
pub fn parse_command(line: &str) -> Result<Command, ProtocolError> {
    let line = strip_line_ending(line);

    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }

    if line == EXPORT_COMMAND {
        return Ok(Command::Export);
    }

    if line.len() < MIN_CONFIGURE_LEN {
        return Err(ProtocolError::TooShort(line.to_string()));
    }

    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() != 3 {
        return Err(ProtocolError::FieldCount(fields.len()));
    }

    let slot_field = fields[0]
        .strip_prefix(CONFIGURE_PREFIX)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| ProtocolError::UnknownCommand(fields[0].to_string()))?;

    let slot = parse_decimal("slot", slot_field)?;
    if slot < u32::from(MIN_SLOT) || slot > u32::from(MAX_SLOT) {
        return Err(ProtocolError::InvalidSlot(slot));
    }

    let start = parse_decimal("start", fields[1])?;
    let step = parse_decimal("step", fields[2])?;

    Ok(Command::Configure {
        slot: slot as u8,
        start,
        step,
    })
}

/// Splits one receive buffer into commands, one per line, in arrival order.
/// Blank lines are skipped.
pub fn parse_commands(buf: &[u8]) -> Vec<Result<Command, ProtocolError>> {
    let text = match std::str::from_utf8(buf) {
        Ok(text) => text,
        Err(_) => return vec![Err(ProtocolError::NotUtf8)],
    };

    text.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(parse_command)
        .collect()
}

fn strip_line_ending(line: &str) -> &str {
    match line.find(|c: char| c == '\r' || c == '\n') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn parse_decimal(field: &'static str, value: &str) -> Result<u32, ProtocolError> {
    let invalid = || ProtocolError::InvalidNumber {
        field,
        value: value.to_string(),
    };

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    value.parse::<u32>().map_err(|_| invalid())
}
