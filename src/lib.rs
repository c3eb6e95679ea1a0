//! # ArborKV - A Tree-Indexed In-Memory Key-Value Cache
//!
//! ArborKV is an in-memory cache reachable over a small framed TCP
//! protocol. Keys map to one of three value kinds - a scalar string, an
//! ordered list of strings, or a string-to-string map - each with an
//! independent, optional time-to-live.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           ArborKV                              │
//! │                                                                │
//! │  ┌────────────┐   ┌────────────┐   ┌────────────────┐          │
//! │  │ TCP server │──▶│ Connection │──▶│ CommandHandler │          │
//! │  └────────────┘   └────────────┘   └───────┬────────┘          │
//! │        │                                   │                   │
//! │  ┌─────┴──────┐                            ▼                   │
//! │  │ Frame codec│              ┌──────────────────────────────┐  │
//! │  └────────────┘              │          ValueStore          │  │
//! │                              │  ┌──────────┐ ┌───────────┐  │  │
//! │                              │  │ ordered  │ │expiration │  │  │
//! │                              │  │  index   │ │  mirror   │  │  │
//! │                              │  │ (rb-tree)│ │           │  │  │
//! │                              │  └──────────┘ └───────────┘  │  │
//! │                              └──────────────▲───────────────┘  │
//! │                                             │                  │
//! │                              ┌──────────────┴───────────────┐  │
//! │                              │      ExpirationSweeper       │  │
//! │                              │    (background tokio task)   │  │
//! │                              └──────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Highlights
//!
//! ### Ordered Primary Index
//!
//! The store's primary index is a red-black tree rather than a hash
//! table, so the keyspace is always sorted: point operations stay
//! O(log n) and prefix scans become cheap range walks.
//!
//! ### Typed Values
//!
//! A key's kind is fixed by its first write. Reads against the wrong
//! kind report the key as absent; writes against the wrong kind are
//! dropped without touching the existing value. There is no coercion
//! and no silent overwrite across kinds.
//!
//! ### Lazy + Active Expiry
//!
//! A key with a lapsed TTL is logically absent the instant its deadline
//! passes - every read checks the deadline itself. Physical reclamation
//! happens in the background: the sweeper scans the expiration mirror on
//! a fixed interval and deletes lapsed entries from both indices.
//!
//! ## Quick Start
//!
//! ```ignore
//! use arborkv::commands::CommandHandler;
//! use arborkv::connection::{handle_client, ConnectionStats};
//! use arborkv::storage::{ExpirationSweeper, StoreConfig, ValueStore};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(ValueStore::new(StoreConfig::default()));
//!     let _sweeper = ExpirationSweeper::start(Arc::clone(&store));
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:8001").await.unwrap();
//!     loop {
//!         let (stream, peer) = listener.accept().await.unwrap();
//!         let handler = CommandHandler::new(Arc::clone(&store));
//!         tokio::spawn(handle_client(stream, peer, handler, Arc::clone(&stats)));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: the ordered index, typed values, store, and sweeper
//! - [`protocol`]: frame grammar and the incremental decoder
//! - [`commands`]: verb dispatch and TTL parsing
//! - [`connection`]: per-client tasks and connection statistics

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use connection::{handle_client, ConnectionStats};
pub use protocol::{Frame, FrameError};
pub use storage::{ExpirationSweeper, StoreConfig, StoreError, ValueStore};

/// The default port the server listens on.
pub const DEFAULT_PORT: u16 = 8001;

/// The default host the server binds to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of ArborKV.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
