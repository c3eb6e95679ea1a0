//! Command Layer
//!
//! Sits between the wire protocol and the store:
//!
//! ```text
//! Frame (parsed command)
//!        │
//!        ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  verb dispatch, arg checks, TTL parsing
//! └────────┬────────┘
//!          ▼
//!     ValueStore
//! ```
//!
//! Store failures come back as tagged error frames; everything else is a
//! data-bearing reply.

pub mod handler;

pub use handler::{parse_ttl, CommandHandler};
