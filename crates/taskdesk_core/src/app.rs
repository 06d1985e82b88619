//! Application entry points.
//!
//! # Responsibility
//! - Wire context, event bridge and the root view (`App::init`).
//! - Route UI events to overlays first, then to the view tree.
//! - Drive the scheduler on behalf of the embedder.
//! - Tear everything down (`App::shutdown`).

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::dom::NodeId;
use crate::event::{HubEvent, HubEventBridge};
use crate::host::MemoryHost;
use crate::ipc::Transport;
use crate::scheduler::Scheduler;
use crate::view::{AppView, Component, Overlays, UiEvent};
use log::info;
use std::rc::Rc;
use std::time::Duration;

pub struct App {
    scheduler: Scheduler,
    context: AppContext,
    events: HubEventBridge,
    view: Rc<AppView>,
}

impl App {
    /// Mounts the application shell into the document body.
    ///
    /// Initial loads are spawned, not run; drive the scheduler to see them.
    pub fn init(config: AppConfig, transport: Rc<dyn Transport>) -> Self {
        let scheduler = Scheduler::new();
        let context = AppContext::new(config, transport, scheduler.handle());
        let events = HubEventBridge::new(context.bus().clone());
        let body = context.doc().borrow().body();
        let view = AppView::mount(&context, body);

        info!(
            "event=app_init module=app status=ok subscriptions={}",
            context.bus().subscriber_count()
        );
        Self {
            scheduler,
            context,
            events,
            view,
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub fn view(&self) -> &Rc<AppView> {
        &self.view
    }

    pub fn event_bridge(&self) -> &HubEventBridge {
        &self.events
    }

    /// Publishes one host-pushed event; returns how many handlers ran.
    pub fn deliver_host_event(&self, event: HubEvent) -> usize {
        self.events.deliver(event)
    }

    /// Offers `event` to overlays, then to the view tree; a pointer-up
    /// outside an overlay that was open beforehand closes it last.
    pub fn dispatch_ui(&self, event: &UiEvent) -> bool {
        let overlays = self.context.overlays();
        if overlays.dispatch(event) {
            return true;
        }
        let open = overlays.snapshot();
        let handled = self.view.dispatch_ui(event);
        Overlays::dismiss_outside(&open, self.context.doc(), event);
        handled
    }

    pub fn pointer_down(&self, target: NodeId) -> bool {
        self.dispatch_ui(&UiEvent::pointer_down(target))
    }

    pub fn pointer_up(&self, target: NodeId) -> bool {
        self.dispatch_ui(&UiEvent::pointer_up(target))
    }

    pub fn key_down(&self, target: NodeId, key: &str) -> bool {
        self.dispatch_ui(&UiEvent::key_down(target, key))
    }

    /// Sets the `value` of `input` and commits it with a change event.
    pub fn enter_text(&self, input: NodeId, text: &str) -> bool {
        self.context
            .doc()
            .borrow_mut()
            .set_attr(input, "value", text);
        self.dispatch_ui(&UiEvent::change(input))
    }

    /// Sets the `checked` state of `check` and commits it with a change event.
    pub fn set_checked(&self, check: NodeId, checked: bool) -> bool {
        {
            let mut doc = self.context.doc().borrow_mut();
            if checked {
                doc.set_attr(check, "checked", "");
            } else {
                doc.remove_attr(check, "checked");
            }
        }
        self.dispatch_ui(&UiEvent::change(check))
    }

    pub fn run_until_stalled(&mut self) {
        self.scheduler.run_until_stalled();
    }

    /// Advances virtual time; returns how many deferred callbacks ran.
    pub fn advance(&mut self, delta: Duration) -> usize {
        self.scheduler.advance(delta)
    }

    /// Runs requests and forwards `host` events until both are quiet.
    ///
    /// Returns how many host events were delivered.
    pub fn settle(&mut self, host: &MemoryHost) -> usize {
        let mut delivered = 0;
        loop {
            self.run_until_stalled();
            let sent = host.flush_events(&self.events);
            if sent == 0 {
                return delivered;
            }
            delivered += sent;
        }
    }

    /// Debug markup of the whole document.
    pub fn render(&self) -> String {
        let doc = self.context.doc().borrow();
        doc.render(doc.body())
    }

    /// Unmounts every component and releases every subscription.
    pub fn shutdown(mut self) {
        self.context.overlays().close_all();
        self.view.unmount();
        self.context.bus().clear();
        // Pending completions observe the unmounted views and discard.
        self.scheduler.run_until_stalled();
        info!(
            "event=app_shutdown module=app status=ok pending_timers={}",
            self.scheduler.pending_timers()
        );
    }
}
