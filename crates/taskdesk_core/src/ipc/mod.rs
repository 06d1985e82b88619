//! Request/response bridge to the host process.
//!
//! # Responsibility
//! - Wrap the single host call primitive behind the [`Transport`] seam.
//! - Unwrap `{result, error}` envelopes into `Ok`/`Err`.
//! - Hand out results as shared immutable [`Frozen`] values.
//!
//! # Invariants
//! - One round-trip per call; no retry at this layer.
//! - A non-null envelope `error` never yields partial data.

mod bridge;
mod error;

pub use bridge::{freeze, Frozen, IpcBridge, Transport, TransportFuture};
pub use error::{IpcError, IpcResult};
