//! Wire Protocol
//!
//! The framed byte protocol spoken between clients and the server: a
//! small, binary-safe grammar of prefix-marked frames ([`frame`]) and an
//! incremental decoder that copes with the stream nature of TCP
//! ([`decode`]).
//!
//! Commands arrive as arrays of bulk strings; replies use whichever frame
//! shape fits. The transport is deliberately a thin collaborator - the
//! store neither knows nor cares what carried an operation to it.

pub mod decode;
pub mod frame;

pub use decode::{decode, FrameError, MAX_ARRAY_LEN, MAX_BULK_LEN};
pub use frame::Frame;
