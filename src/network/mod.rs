//! Network Module
//!
//! TCP server and client connection handling.
//!
//! ## Architecture
//! - One thread, one `mio::Poll`
//! - Listener, shutdown waker and every client socket registered on it
//! - Each readable client is drained and answered before the next event
//! - Commands routed through that client's Session

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, ConnectionStatus};
