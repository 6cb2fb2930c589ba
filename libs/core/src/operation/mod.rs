//! The closed set of operations a session server understands.
//!
//! Session commands (Auth, Logout) have a fixed wire shape per protocol.
//! Every other request is a generic operation: its command name plus the
//! body fields as a parameter bag.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::record::Record;

mod clock;
mod echo;
mod history;
mod session;
mod status;
mod sum;

pub use self::clock::{TimestampRequest, TimestampResponse};
pub use self::echo::{EchoRequest, EchoResponse};
pub use self::history::{HistoryEntry, HistoryRequest, HistoryResponse, HistoryStats, MAX_HISTORY_LIMIT};
pub use self::session::{AuthRequest, AuthResponse, LogoutRequest, LogoutResponse};
pub use self::status::{
    DatabaseStatistics, OperationCounts, SessionDetails, StatusMetrics, StatusRequest, StatusResponse,
};
pub use self::sum::{SumRequest, SumResponse, MAX_SUM_NUMBERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Auth,
    Logout,
    Echo,
    Sum,
    Timestamp,
    Status,
    History,
}

impl Command {
    pub const ALL: [Command; 7] = [
        Self::Auth,
        Self::Logout,
        Self::Echo,
        Self::Sum,
        Self::Timestamp,
        Self::Status,
        Self::History,
    ];

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Auth => "AUTH",
            Self::Logout => "LOGOUT",
            Self::Echo => "echo",
            Self::Sum => "soma",
            Self::Timestamp => "timestamp",
            Self::Status => "status",
            Self::History => "historico",
        }
    }

    pub const fn is_session(self) -> bool {
        matches!(self, Self::Auth | Self::Logout)
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.wire_name() == name)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_wire_name(s).ok_or_else(|| Error::custom(format!("unknown command `{s}`")))
    }
}

/// How a request is dispatched on protocols with per-command message shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind<'a> {
    Auth { student_id: &'a str },
    Logout,
    Operation { name: &'static str },
}

pub trait OperationRequest: Record + fmt::Debug + Send + Sync {
    const COMMAND: Command;

    fn kind(&self) -> RequestKind<'_> {
        match Self::COMMAND {
            Command::Logout => RequestKind::Logout,
            command => RequestKind::Operation {
                name: command.wire_name(),
            },
        }
    }

    fn command_name(&self) -> &'static str {
        Self::COMMAND.wire_name()
    }

    fn is_operation(&self) -> bool {
        !Self::COMMAND.is_session()
    }

    /// Caller-side contract checks, run before anything is encoded.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

pub trait OperationResponse: Record + Default + fmt::Debug + Send + Sync {
    /// Diagnostic tag; only the binary protocol puts it on the wire.
    const COMMAND: Command;
}
