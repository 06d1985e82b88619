//! Entity records exchanged with the host.
//!
//! # Responsibility
//! - Define the read models and create/update payloads per entity type.
//! - Define the mutation acknowledgement contract.
//!
//! # Invariants
//! - Entities are immutable once fetched; updates replace them wholesale.
//! - Update payloads only transmit fields that are present.

mod mutation;
mod project;
mod task;

pub use mutation::MutationAck;
pub use project::{Project, ProjectForCreate, ProjectForUpdate};
pub use task::{Task, TaskForCreate, TaskForUpdate};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Entity types known to the host, also used as model event labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Task,
}

impl EntityKind {
    /// Stable command suffix / event label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Task => "task",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "project" => Some(Self::Project),
            "task" => Some(Self::Task),
            _ => None,
        }
    }
}

/// Binds a read model to its payload shapes and host command suffix.
pub trait Entity: DeserializeOwned {
    const KIND: EntityKind;
    type ForCreate: Serialize;
    type ForUpdate: Serialize;

    fn id(&self) -> &str;
}
