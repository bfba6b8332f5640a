//! Protocol Module
//!
//! Defines the line protocol for client-server communication.
//!
//! ## Request Format
//! ```text
//! <COMMAND> [<key> [<value>]]\n
//! ```
//! Keywords are case-sensitive; keys and values are taken verbatim and may
//! not contain whitespace. A trailing `\r` is ignored.
//!
//! ### Commands
//! - `READ key`         - value, or `NotFound`
//! - `WRITE key value`  - `Inserted` or `Updated <previous>`
//! - `DELETE key`       - removed value, or `NotFound`
//! - `PING`             - `PONG`
//! - `QUIT`             - `Bye`, then the server closes the connection
//! - `SHUTDOWN`         - `ShuttingDown` (when enabled on the server)
//!
//! ## Response Format
//! One line per request, in request order:
//! ```text
//! <value> | Inserted | Updated <previous> | PONG | Bye | ShuttingDown
//! NotFound | KeyLocked | UnknownCommand | UnknownClient | BadRequest | StorageError
//! ```

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::Response;
pub use codec::{
    decode_response, encode_command, encode_response, parse_command, read_response,
    write_command, LineCodec, ParseError,
};
