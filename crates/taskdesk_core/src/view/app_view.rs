use super::{
    listen, Component, Latest, Lifecycle, NavView, ProjectView, Selector, UiEvent, UiEventKind,
    UiHandlerTable,
};
use crate::context::AppContext;
use crate::dom::NodeId;
use crate::event::{DomainEvent, HandlerResult, Topic};
use crate::ipc::IpcResult;
use crate::model::Project;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub const APP_TITLE: &str = "Awesome App";
pub const WELCOME_TEXT: &str = "Welcome select project";

static TITLE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_ ](.+)").expect("valid title separator regex"));

/// Splits a title at its first `-`, `_` or space into a plain and a
/// highlighted part. Titles without a separator keep an empty second part.
pub fn split_title(title: &str) -> (String, String) {
    match TITLE_SEPARATOR.captures(title) {
        Some(captures) => {
            let start = captures.get(0).map_or(title.len(), |whole| whole.start());
            let rest = captures.get(1).map_or("", |rest| rest.as_str());
            (title[..start].to_string(), rest.to_string())
        }
        None => (title.to_string(), String::new()),
    }
}

/// Application shell: header, project navigation and the routed main area.
pub struct AppView {
    this: Weak<Self>,
    ctx: AppContext,
    lifecycle: Lifecycle,
    root: NodeId,
    main: NodeId,
    nav: Rc<NavView>,
    project: RefCell<Option<Rc<ProjectView>>>,
    route_request: Latest,
    handlers: UiHandlerTable<Self>,
}

impl AppView {
    pub fn mount(ctx: &AppContext, parent: NodeId) -> Rc<Self> {
        let root = {
            let mut doc = ctx.doc().borrow_mut();
            let root = doc.create_element("app-v");
            let header = doc.create_element("header");
            let menu = doc.create_element("d-ico");
            doc.add_class(menu, "menu");
            doc.add_class(menu, "action");
            doc.set_attr(menu, "name", "ico-menu");
            let heading = doc.create_element("h1");
            let (plain, prime) = split_title(APP_TITLE);
            let plain = doc.create_text_element("span", &plain);
            let prime = doc.create_text_element("span", &prime);
            doc.add_class(prime, "prime");

            doc.append_child(heading, plain);
            doc.append_child(heading, prime);
            doc.append_child(header, menu);
            doc.append_child(header, heading);
            doc.append_child(root, header);
            doc.append_child(parent, root);
            root
        };
        let nav = NavView::mount(ctx, root);
        let main = {
            let mut doc = ctx.doc().borrow_mut();
            let main = doc.create_element("main");
            doc.append_child(root, main);
            main
        };

        let view = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            ctx: ctx.clone(),
            lifecycle: Lifecycle::default(),
            root,
            main,
            nav,
            project: RefCell::new(None),
            route_request: Latest::default(),
            handlers: UiHandlerTable::new().on(
                UiEventKind::PointerUp,
                Selector::TagWithClass("d-ico", "menu"),
                Self::on_menu,
            ),
        });
        view.lifecycle
            .hold(listen(ctx, &Rc::downgrade(&view), Topic::route_change()));
        view.lifecycle.mark_mounted();
        view.on_route_change();
        view
    }

    pub fn nav(&self) -> &Rc<NavView> {
        &self.nav
    }

    /// The mounted project view, if a project is routed.
    pub fn project_view(&self) -> Option<Rc<ProjectView>> {
        self.project.borrow().clone()
    }

    pub fn main(&self) -> NodeId {
        self.main
    }

    pub fn menu_button(&self) -> Option<NodeId> {
        let doc = self.ctx.doc().borrow();
        doc.first(self.root, "d-ico", Some("menu"))
    }

    fn on_route_change(&self) {
        let tag = self.route_request.next();
        let Some(project_id) = self.ctx.router().get_current().project_id else {
            self.clear_project();
            self.ctx.doc().borrow_mut().set_text(self.main, WELCOME_TEXT);
            return;
        };

        let client = self.ctx.projects().clone();
        let this = self.this.clone();
        self.ctx.scheduler().spawn(async move {
            let result = client.get(&project_id).await;
            if let Some(view) = this.upgrade() {
                view.show_project(tag, result);
            }
        });
    }

    fn show_project(&self, tag: u64, result: IpcResult<Project>) {
        if !self.is_mounted() || !self.route_request.is_current(tag) {
            debug!("event=view_discard module=view status=skipped component=app_view op=get");
            return;
        }
        let project = match result {
            Ok(project) => project,
            Err(err) => {
                warn!("event=view_load module=view status=error component=app_view error={err}");
                return;
            }
        };

        self.clear_project();
        self.ctx.doc().borrow_mut().replace_children(self.main, Vec::new());
        let view = ProjectView::mount(&self.ctx, self.main, project);
        *self.project.borrow_mut() = Some(view);
    }

    fn clear_project(&self) {
        let previous = self.project.borrow_mut().take();
        if let Some(previous) = previous {
            previous.unmount();
        }
    }

    fn on_menu(&self, _: &UiEvent, _: NodeId) {
        let minimized = self.ctx.doc().borrow_mut().toggle_class(self.root, "min-nav");
        debug!("event=nav_toggle module=view status=ok minimized={minimized}");
    }
}

impl Component for AppView {
    fn root(&self) -> NodeId {
        self.root
    }

    fn handle_event(&self, event: &DomainEvent) -> HandlerResult {
        if matches!(event, DomainEvent::RouteChange) {
            self.on_route_change();
        }
        Ok(())
    }

    fn dispatch_ui(&self, event: &UiEvent) -> bool {
        if !self.is_mounted() {
            return false;
        }
        if self
            .handlers
            .dispatch(self, self.ctx.doc(), self.root, event)
        {
            return true;
        }
        if self.nav.dispatch_ui(event) {
            return true;
        }
        self.project_view()
            .is_some_and(|project| project.dispatch_ui(event))
    }

    fn unmount(&self) {
        if !self.lifecycle.release() {
            return;
        }
        self.nav.unmount();
        self.clear_project();
        self.ctx.doc().borrow_mut().remove(self.root);
    }

    fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }
}

#[cfg(test)]
mod tests {
    use super::split_title;

    #[test]
    fn split_title_separates_at_first_separator() {
        assert_eq!(
            split_title("Awesome App"),
            ("Awesome".to_string(), "App".to_string())
        );
        assert_eq!(
            split_title("task-desk pro"),
            ("task".to_string(), "desk pro".to_string())
        );
        assert_eq!(split_title("Solo"), ("Solo".to_string(), String::new()));
    }
}
