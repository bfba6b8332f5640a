//! TCP Server
//!
//! Single-threaded readiness loop that owns the engine, the lock table and
//! every client connection.

use std::collections::HashMap;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token, Waker};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, TimberError};
use crate::locks::LockTable;
use crate::session::{Session, SessionContext, SessionId};
use super::connection::{Connection, ConnectionStatus};

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_CLIENT_TOKEN: usize = 2;

/// Stops a running server from any thread
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Set the shutdown flag and wake the poll loop
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        if let Err(e) = self.waker.wake() {
            tracing::error!("Failed to wake server for shutdown: {}", e);
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// TCP server for TimberKV
pub struct Server {
    config: Config,
    poll: Poll,

    /// `None` once shutdown has begun
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    waker: Arc<Waker>,
    shutdown: Arc<AtomicBool>,

    engine: Engine,
    locks: LockTable,
    connections: HashMap<Token, Connection>,

    next_token: usize,
    next_session: u64,
}

impl Server {
    /// Bind the listening socket and take ownership of the engine
    pub fn bind(config: Config, engine: Engine) -> Result<Self> {
        let addr = config
            .listen_addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                TimberError::Config(format!(
                    "listen address '{}' resolved to nothing",
                    config.listen_addr
                ))
            })?;

        let poll = Poll::new()?;
        let mut listener = TcpListener::bind(addr)?;
        poll.registry().register(&mut listener, LISTENER, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);
        let local_addr = listener.local_addr()?;

        tracing::info!("Listening on {}", local_addr);

        Ok(Self {
            config,
            poll,
            listener: Some(listener),
            local_addr,
            waker,
            shutdown: Arc::new(AtomicBool::new(false)),
            engine,
            locks: LockTable::new(),
            connections: HashMap::new(),
            next_token: FIRST_CLIENT_TOKEN,
            next_session: 0,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            waker: Arc::clone(&self.waker),
        }
    }

    /// Serve until shutdown is requested and every session is done, then
    /// close all connections and the engine
    pub fn run(mut self) -> Result<()> {
        let mut events = Events::with_capacity(self.config.events_capacity);
        let served = self.event_loop(&mut events);
        let closed = self.finish();
        served.and(closed)
    }

    fn event_loop(&mut self, events: &mut Events) -> Result<()> {
        while self.is_running() {
            if let Err(e) = self.poll.poll(events, None) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept_incoming(),
                    WAKER => {}
                    token => {
                        let readable =
                            event.is_readable() || event.is_read_closed() || event.is_error();
                        self.service(token, readable, event.is_writable());
                    }
                }
            }

            if self.shutdown.load(Ordering::SeqCst) && self.listener.is_some() {
                self.begin_shutdown();
            }
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        !(self.shutdown.load(Ordering::SeqCst)
            && self.connections.values().all(|c| c.session().is_done()))
    }

    fn accept_incoming(&mut self) {
        let Some(listener) = self.listener.as_ref() else {
            return;
        };

        loop {
            let (stream, peer_addr) = match listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    return;
                }
            };

            if self.connections.len() >= self.config.max_connections {
                tracing::warn!(
                    "Refusing {}: {} connections already open",
                    peer_addr,
                    self.connections.len()
                );
                continue;
            }
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!("Could not disable Nagle for {}: {}", peer_addr, e);
            }

            let token = Token(self.next_token);
            self.next_token += 1;
            let session_id = SessionId(self.next_session);
            self.next_session += 1;

            let mut connection = Connection::new(
                stream,
                token,
                peer_addr,
                Session::new(session_id),
                self.config.max_line_len,
            );
            if let Err(e) = connection.register(self.poll.registry()) {
                tracing::warn!("Could not register {}: {}", peer_addr, e);
                continue;
            }

            tracing::info!("Accepted connection from {} as {}", peer_addr, session_id);
            self.connections.insert(token, connection);
        }
    }

    fn service(&mut self, token: Token, readable: bool, writable: bool) {
        let Some(connection) = self.connections.get_mut(&token) else {
            tracing::debug!("Event for unknown token {:?}", token);
            return;
        };

        let registry = self.poll.registry();
        let mut ctx = SessionContext {
            engine: &mut self.engine,
            locks: &mut self.locks,
            shutdown: &self.shutdown,
            allow_remote_shutdown: self.config.allow_remote_shutdown,
        };
        let status = if readable {
            connection.on_readable(&mut ctx, registry)
        } else if writable {
            connection.on_writable(&mut ctx, registry)
        } else {
            Ok(ConnectionStatus::Open)
        };

        match status {
            Ok(ConnectionStatus::Open) => {}
            Ok(ConnectionStatus::Closed) => {
                tracing::trace!("Client {} closed", connection.peer_addr());
                self.drop_connection(token);
            }
            Err(e) => {
                tracing::error!(
                    "Unexpected drop of connection {}: {}",
                    connection.peer_addr(),
                    e
                );
                self.drop_connection(token);
            }
        }
    }

    /// Close the session (releasing locks, discarding staged work) and forget
    /// the socket
    fn drop_connection(&mut self, token: Token) {
        let Some(mut connection) = self.connections.remove(&token) else {
            return;
        };

        let session_id = connection.session().id();
        if !connection.session().is_done() {
            tracing::warn!("{} disconnected mid-transaction; aborting it", session_id);
        }

        let mut ctx = SessionContext {
            engine: &mut self.engine,
            locks: &mut self.locks,
            shutdown: &self.shutdown,
            allow_remote_shutdown: self.config.allow_remote_shutdown,
        };
        connection.close_session(&mut ctx);

        if let Err(e) = connection.deregister(self.poll.registry()) {
            tracing::debug!("Deregister of {} failed: {}", session_id, e);
        }
        tracing::debug!("{} from {} closed", session_id, connection.peer_addr());
    }

    fn begin_shutdown(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            if let Err(e) = self.poll.registry().deregister(&mut listener) {
                tracing::debug!("Deregister of listener failed: {}", e);
            }
        }
        let busy = self
            .connections
            .values()
            .filter(|c| !c.session().is_done())
            .count();
        tracing::info!(
            "Shutdown requested: no longer accepting connections ({} open, {} mid-transaction)",
            self.connections.len(),
            busy
        );
    }

    fn finish(&mut self) -> Result<()> {
        let tokens: Vec<Token> = self.connections.keys().copied().collect();
        for token in tokens {
            if let Some(connection) = self.connections.get_mut(&token) {
                connection.flush_remaining();
            }
            self.drop_connection(token);
        }
        self.engine.close()
    }
}
