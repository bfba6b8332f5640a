//! Blocking client
//!
//! Opens a session against a running server and exchanges one request line
//! for one response line. Used by the CLI, the load harness and tests.

use std::io::{BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Result, TimberError};
use crate::protocol::{read_response, write_command, Command, Response};

/// A connected client session
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Configure how long to wait for a response
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send a command and wait for its response
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Send a raw request line and wait for its response
    pub fn send_line(&mut self, line: &str) -> Result<Response> {
        if line.contains('\n') {
            return Err(TimberError::Protocol("request line contains a newline".to_string()));
        }
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        read_response(&mut self.reader)
    }

    pub fn read(&mut self, key: &str) -> Result<Response> {
        self.send(&Command::Read { key: key.to_string() })
    }

    pub fn write(&mut self, key: &str, value: &str) -> Result<Response> {
        self.send(&Command::Write {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    pub fn delete(&mut self, key: &str) -> Result<Response> {
        self.send(&Command::Delete { key: key.to_string() })
    }

    pub fn ping(&mut self) -> Result<Response> {
        self.send(&Command::Ping)
    }
}
