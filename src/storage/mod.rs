//! Storage Core
//!
//! The heart of ArborKV: an ordered primary index, a typed value layer on
//! top of it, and the expiration machinery that reclaims lapsed entries.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                      ValueStore                       │
//! │            RwLock ─ one unit, two indices             │
//! │  ┌──────────────────────┐  ┌───────────────────────┐  │
//! │  │     OrderedIndex     │  │  expiration mirror    │  │
//! │  │  red-black tree      │  │  key -> deadline      │  │
//! │  │  key -> Value        │  │                       │  │
//! │  └──────────────────────┘  └───────────────────────┘  │
//! └───────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ purge_expired()
//!              ┌─────────────┴─────────────┐
//!              │    ExpirationSweeper      │
//!              │  (background tokio task)  │
//!              └───────────────────────────┘
//! ```
//!
//! Expiration is lazy plus active: reads judge deadlines themselves and
//! report lapsed entries as expired immediately, while the sweeper
//! physically reclaims them on a fixed interval.

pub mod index;
pub mod store;
pub mod sweeper;
pub mod value;

pub use index::OrderedIndex;
pub use store::{StoreConfig, StoreError, StoreResult, StoreStats, ValueStore};
pub use sweeper::ExpirationSweeper;
pub use value::{Kind, Value, NEVER_EXPIRES};
