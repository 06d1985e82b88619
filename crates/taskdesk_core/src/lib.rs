//! Front-end core for TaskDesk.
//! Views, entity clients, event bus and router over a host request bridge.

pub mod app;
pub mod client;
pub mod config;
pub mod context;
pub mod dom;
pub mod event;
pub mod host;
pub mod ipc;
pub mod logging;
pub mod model;
pub mod router;
pub mod scheduler;
pub mod view;

pub use app::App;
pub use client::{prune_empty, EntityClient, ListFilter, ProjectClient, TaskClient};
pub use config::{AppConfig, ConfigError};
pub use context::AppContext;
pub use dom::{Document, DomHandle, NodeId};
pub use event::{
    Bus, DomainEvent, EventError, HandlerResult, HubEvent, HubEventBridge, ModelAction,
    ModelEvent, Subscription, Topic,
};
pub use host::{HostCall, MemoryHost};
pub use ipc::{Frozen, IpcBridge, IpcError, IpcResult, Transport, TransportFuture};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::{
    Entity, EntityKind, MutationAck, Project, ProjectForCreate, ProjectForUpdate, Task,
    TaskForCreate, TaskForUpdate,
};
pub use router::{Route, RoutePatch, Router};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use view::{Component, UiEvent, UiEventKind};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
