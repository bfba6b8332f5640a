//! Protocol codec
//!
//! Line framing plus encoding and decoding of commands and responses.
//!
//! ## Framing
//! ```text
//! ┌──────────────────────────────┬────┐
//! │   UTF-8 text, no newline     │ \n │
//! └──────────────────────────────┴────┘
//! ```
//! Lines longer than the configured limit are answered once with
//! `BadRequest` and skipped up to their terminating newline.

use std::io::{BufRead, Write};

use bytes::BytesMut;
use thiserror::Error;

use crate::error::{Result, TimberError};
use super::{Command, CommandType, Response};

/// Why a request line could not become a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty request")]
    Empty,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("{command} takes {expected} argument(s), got {got}")]
    WrongArity {
        command: CommandType,
        expected: usize,
        got: usize,
    },

    #[error("request exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("request is not valid UTF-8")]
    InvalidUtf8,
}

impl ParseError {
    /// Failure token reported to the client
    pub fn response(&self) -> Response {
        match self {
            ParseError::UnknownCommand(_) => Response::UnknownCommand,
            ParseError::Empty
            | ParseError::WrongArity { .. }
            | ParseError::LineTooLong { .. }
            | ParseError::InvalidUtf8 => Response::BadRequest,
        }
    }
}

// =============================================================================
// Framing
// =============================================================================

/// Splits a byte stream into request lines
#[derive(Debug)]
pub struct LineCodec {
    max_line_len: usize,

    /// Inside an oversized line that has already been reported
    discarding: bool,
}

impl LineCodec {
    pub fn new(max_line_len: usize) -> Self {
        Self {
            max_line_len,
            discarding: false,
        }
    }

    /// Take the next complete line off the front of `buf`
    ///
    /// Returns `None` when more bytes are needed.
    pub fn decode(
        &mut self,
        buf: &mut BytesMut,
    ) -> Option<std::result::Result<String, ParseError>> {
        loop {
            let Some(pos) = buf.iter().position(|&b| b == b'\n') else {
                // Room for a `\r` that is stripped once the newline arrives
                if buf.len() > self.max_line_len.saturating_add(1) {
                    buf.clear();
                    if !self.discarding {
                        self.discarding = true;
                        return Some(Err(ParseError::LineTooLong {
                            limit: self.max_line_len,
                        }));
                    }
                }
                return None;
            };

            let frame = buf.split_to(pos + 1);
            if self.discarding {
                self.discarding = false;
                continue;
            }

            let mut line = &frame[..pos];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            if line.len() > self.max_line_len {
                return Some(Err(ParseError::LineTooLong {
                    limit: self.max_line_len,
                }));
            }

            return Some(
                std::str::from_utf8(line)
                    .map(str::to_string)
                    .map_err(|_| ParseError::InvalidUtf8),
            );
        }
    }
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Parse a request line (without its newline) into a command
pub fn parse_command(line: &str) -> std::result::Result<Command, ParseError> {
    let mut fields = line.split_ascii_whitespace();
    let keyword = fields.next().ok_or(ParseError::Empty)?;
    let command = CommandType::from_keyword(keyword)
        .ok_or_else(|| ParseError::UnknownCommand(keyword.to_string()))?;

    let args: Vec<&str> = fields.collect();
    if args.len() != command.arity() {
        return Err(ParseError::WrongArity {
            command,
            expected: command.arity(),
            got: args.len(),
        });
    }

    Ok(match command {
        CommandType::Read => Command::Read { key: args[0].to_string() },
        CommandType::Write => Command::Write {
            key: args[0].to_string(),
            value: args[1].to_string(),
        },
        CommandType::Delete => Command::Delete { key: args[0].to_string() },
        CommandType::Ping => Command::Ping,
        CommandType::Quit => Command::Quit,
        CommandType::Shutdown => Command::Shutdown,
    })
}

/// Encode a command as a request line (with newline)
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut line = command.to_string().into_bytes();
    line.push(b'\n');
    line
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response as a line (with newline)
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut line = response.to_string().into_bytes();
    line.push(b'\n');
    line
}

/// Decode a response line (without its newline)
///
/// Any line that is not a status token is a value. A stored value that
/// happens to equal a token cannot be told apart from that token.
pub fn decode_response(line: &str) -> Response {
    let line = line.trim_end_matches(['\n', '\r']);
    match line {
        "Inserted" => Response::Inserted,
        "PONG" => Response::Pong,
        "Bye" => Response::Bye,
        "ShuttingDown" => Response::ShuttingDown,
        "NotFound" => Response::NotFound,
        "KeyLocked" => Response::KeyLocked,
        "UnknownCommand" => Response::UnknownCommand,
        "UnknownClient" => Response::UnknownClient,
        "BadRequest" => Response::BadRequest,
        "StorageError" => Response::StorageError,
        other => match other.strip_prefix("Updated ") {
            Some(previous) => Response::Updated(previous.to_string()),
            None => Response::Value(other.to_string()),
        },
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read one response line from a stream
///
/// Blocks until a full line arrives. End of stream is a network error.
pub fn read_response<R: BufRead>(reader: &mut R) -> Result<Response> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Err(TimberError::Network("connection closed by server".to_string()));
    }
    if !line.ends_with('\n') {
        return Err(TimberError::Protocol(format!(
            "response truncated after {} bytes",
            line.len()
        )));
    }
    Ok(decode_response(&line))
}
