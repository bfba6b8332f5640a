//! Command definitions
//!
//! Represents commands from clients.

use std::fmt;

/// Command keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Read,
    Write,
    Delete,
    Ping,
    Quit,
    Shutdown,
}

impl CommandType {
    /// Keyword as it appears on the wire
    pub fn keyword(self) -> &'static str {
        match self {
            CommandType::Read => "READ",
            CommandType::Write => "WRITE",
            CommandType::Delete => "DELETE",
            CommandType::Ping => "PING",
            CommandType::Quit => "QUIT",
            CommandType::Shutdown => "SHUTDOWN",
        }
    }

    /// Exact, case-sensitive keyword match
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "READ" => Some(CommandType::Read),
            "WRITE" => Some(CommandType::Write),
            "DELETE" => Some(CommandType::Delete),
            "PING" => Some(CommandType::Ping),
            "QUIT" => Some(CommandType::Quit),
            "SHUTDOWN" => Some(CommandType::Shutdown),
            _ => None,
        }
    }

    /// Number of arguments following the keyword
    pub fn arity(self) -> usize {
        match self {
            CommandType::Read | CommandType::Delete => 1,
            CommandType::Write => 2,
            CommandType::Ping | CommandType::Quit | CommandType::Shutdown => 0,
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Read { key: String },

    /// Bind a key to a value
    Write { key: String, value: String },

    /// Delete a key
    Delete { key: String },

    /// Health check
    Ping,

    /// Close this session
    Quit,

    /// Ask the server to stop
    Shutdown,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Read { .. } => CommandType::Read,
            Command::Write { .. } => CommandType::Write,
            Command::Delete { .. } => CommandType::Delete,
            Command::Ping => CommandType::Ping,
            Command::Quit => CommandType::Quit,
            Command::Shutdown => CommandType::Shutdown,
        }
    }

    /// Whether the command changes the tree and so needs the key's lock
    pub fn is_mutation(&self) -> bool {
        matches!(self, Command::Write { .. } | Command::Delete { .. })
    }

    /// The key the command addresses, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Command::Read { key } | Command::Write { key, .. } | Command::Delete { key } => {
                Some(key)
            }
            Command::Ping | Command::Quit | Command::Shutdown => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = self.command_type().keyword();
        match self {
            Command::Read { key } | Command::Delete { key } => write!(f, "{} {}", keyword, key),
            Command::Write { key, value } => write!(f, "{} {} {}", keyword, key, value),
            Command::Ping | Command::Quit | Command::Shutdown => f.write_str(keyword),
        }
    }
}
