//! Connection Handler
//!
//! Owns one non-blocking client socket, its buffers and its session.

use std::io::{self, Read, Write};
use std::net::SocketAddr;

use bytes::{Buf, BytesMut};
use mio::net::TcpStream;
use mio::{Interest, Registry, Token};

use crate::protocol::{encode_response, LineCodec};
use crate::session::{Session, SessionContext, SessionState};

/// Bytes pulled from the socket per read call
const READ_CHUNK: usize = 4096;

/// Output backlog at which the connection stops taking requests
const MAX_PENDING_OUTPUT: usize = 64 * 1024;

/// What the multiplexer should do with a connection after servicing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Keep it registered
    Open,
    /// Peer hung up, or the session ended and its output is written
    Closed,
}

/// A client socket driven by the readiness loop
pub struct Connection {
    stream: TcpStream,
    token: Token,
    peer_addr: SocketAddr,
    session: Session,
    codec: LineCodec,

    /// Received bytes not yet forming a complete line
    inbox: BytesMut,

    /// Encoded responses not yet accepted by the socket
    outbox: BytesMut,

    /// Whether WRITABLE interest is currently registered
    wants_write: bool,

    /// Socket may hold unread bytes (cleared on `WouldBlock`)
    readable: bool,

    /// Peer closed its side
    peer_closed: bool,
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        token: Token,
        peer_addr: SocketAddr,
        session: Session,
        max_line_len: usize,
    ) -> Self {
        Self {
            stream,
            token,
            peer_addr,
            session,
            codec: LineCodec::new(max_line_len),
            inbox: BytesMut::with_capacity(READ_CHUNK),
            outbox: BytesMut::new(),
            wants_write: false,
            readable: false,
            peer_closed: false,
        }
    }

    /// Register for read readiness
    pub fn register(&mut self, registry: &Registry) -> io::Result<()> {
        registry.register(&mut self.stream, self.token, Interest::READABLE)
    }

    pub fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        registry.deregister(&mut self.stream)
    }

    /// Socket has data (or hung up): read, answer and flush
    pub fn on_readable(
        &mut self,
        ctx: &mut SessionContext<'_>,
        registry: &Registry,
    ) -> io::Result<ConnectionStatus> {
        self.readable = true;
        self.pump(ctx, registry)
    }

    /// Socket accepts output again: flush, then resume any paused reading
    pub fn on_writable(
        &mut self,
        ctx: &mut SessionContext<'_>,
        registry: &Registry,
    ) -> io::Result<ConnectionStatus> {
        self.pump(ctx, registry)
    }

    /// Requests are handled strictly in arrival order. Reading pauses while
    /// `MAX_PENDING_OUTPUT` bytes wait for a client that is not reading.
    fn pump(
        &mut self,
        ctx: &mut SessionContext<'_>,
        registry: &Registry,
    ) -> io::Result<ConnectionStatus> {
        loop {
            let backed_up = self.answer_buffered(ctx);

            if let Err(e) = self.flush_outbox() {
                if !self.peer_closed {
                    return Err(e);
                }
                tracing::debug!(
                    "{}: {} went away with {} bytes unsent: {}",
                    self.session.id(),
                    self.peer_addr,
                    self.outbox.len(),
                    e
                );
                return Ok(ConnectionStatus::Closed);
            }

            if self.outbox.len() >= MAX_PENDING_OUTPUT {
                break;
            }
            if backed_up {
                continue;
            }
            if self.session.state() == SessionState::Closed || self.peer_closed || !self.readable {
                break;
            }
            self.read_chunk()?;
        }

        // A half-closed peer may still be reading
        if self.outbox.is_empty()
            && (self.peer_closed || self.session.state() == SessionState::Closed)
        {
            return Ok(ConnectionStatus::Closed);
        }

        let wants_write = !self.outbox.is_empty();
        if wants_write != self.wants_write {
            let interest = if wants_write {
                Interest::READABLE | Interest::WRITABLE
            } else {
                Interest::READABLE
            };
            registry.reregister(&mut self.stream, self.token, interest)?;
            self.wants_write = wants_write;
        }
        Ok(ConnectionStatus::Open)
    }

    /// Answer complete buffered lines. Returns `true` when it stopped because
    /// the outbox is full.
    fn answer_buffered(&mut self, ctx: &mut SessionContext<'_>) -> bool {
        while self.session.state() != SessionState::Closed {
            if self.outbox.len() >= MAX_PENDING_OUTPUT {
                return true;
            }
            let Some(frame) = self.codec.decode(&mut self.inbox) else {
                return false;
            };
            let response = match frame {
                Ok(line) => self.session.handle_line(&line, ctx),
                Err(e) => {
                    tracing::debug!(
                        "{}: bad frame from {}: {}",
                        self.session.id(),
                        self.peer_addr,
                        e
                    );
                    e.response()
                }
            };
            self.outbox.extend_from_slice(&encode_response(&response));
        }
        false
    }

    fn read_chunk(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        match self.stream.read(&mut chunk) {
            Ok(0) => self.peer_closed = true,
            Ok(n) => self.inbox.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => self.readable = false,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn flush_outbox(&mut self) -> io::Result<()> {
        while !self.outbox.is_empty() {
            match self.stream.write(&self.outbox) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => self.outbox.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Last-chance write of pending output before the server exits
    pub fn flush_remaining(&mut self) {
        if let Err(e) = self.flush_outbox() {
            tracing::debug!(
                "{}: final flush to {} failed: {}",
                self.session.id(),
                self.peer_addr,
                e
            );
        }
    }

    /// Tear down the session: abort anything in flight and free its locks
    pub fn close_session(&mut self, ctx: &mut SessionContext<'_>) {
        self.session.close(ctx);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}
