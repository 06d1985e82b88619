//! Explicit application context handed to every component.
//!
//! # Responsibility
//! - Bundle the process-wide collaborators: bus, router, entity clients,
//!   document, scheduler, overlays and configuration.
//!
//! # Invariants
//! - One context per [`crate::app::App`]; clones share the same collaborators.

use crate::client::{ProjectClient, TaskClient};
use crate::config::AppConfig;
use crate::dom::{Document, DomHandle};
use crate::event::Bus;
use crate::ipc::{IpcBridge, Transport};
use crate::router::Router;
use crate::scheduler::SchedulerHandle;
use crate::view::Overlays;
use std::rc::Rc;

#[derive(Clone)]
pub struct AppContext {
    inner: Rc<Inner>,
}

struct Inner {
    config: AppConfig,
    bus: Bus,
    router: Router,
    projects: ProjectClient,
    tasks: TaskClient,
    doc: DomHandle,
    scheduler: SchedulerHandle,
    overlays: Overlays,
}

impl AppContext {
    pub fn new(config: AppConfig, transport: Rc<dyn Transport>, scheduler: SchedulerHandle) -> Self {
        let bus = Bus::new();
        let router = Router::new(bus.clone());
        let bridge = IpcBridge::new(transport);

        Self {
            inner: Rc::new(Inner {
                config,
                bus,
                router,
                projects: ProjectClient::new(bridge.clone()),
                tasks: TaskClient::new(bridge),
                doc: Document::shared(),
                scheduler,
                overlays: Overlays::new(),
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    pub fn projects(&self) -> &ProjectClient {
        &self.inner.projects
    }

    pub fn tasks(&self) -> &TaskClient {
        &self.inner.tasks
    }

    pub fn doc(&self) -> &DomHandle {
        &self.inner.doc
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.inner.scheduler
    }

    pub fn overlays(&self) -> &Overlays {
        &self.inner.overlays
    }
}
