//! In-process host used by tests and the smoke binary.
//!
//! # Responsibility
//! - Answer the entity command set over the [`crate::ipc::Transport`] seam.
//! - Queue the model events a real host would push after each mutation.
//!
//! # See also
//! - `crates/taskdesk_cli/src/main.rs` for a scripted session.

mod memory;

pub use memory::{HostCall, MemoryHost};
