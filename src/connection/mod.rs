//! Connection Management
//!
//! The accept loop hands every socket to [`handle_client`], which runs a
//! read-decode-execute-reply loop on its own task:
//!
//! ```text
//! TcpListener ──accept──▶ spawn ──▶ Connection
//!                                     │  read bytes
//!                                     │  decode frames (pipelining-safe)
//!                                     │  CommandHandler::execute
//!                                     ▼  write replies
//! ```
//!
//! Shared [`ConnectionStats`] counters track accepted/active connections
//! and traffic volume.

pub mod handler;

pub use handler::{handle_client, Connection, ConnectionError, ConnectionStats};
