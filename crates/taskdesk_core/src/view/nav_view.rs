use super::{
    listen, Component, Latest, Lifecycle, Selector, UiEvent, UiEventKind, UiHandlerTable,
};
use crate::context::AppContext;
use crate::dom::NodeId;
use crate::event::{DomainEvent, HandlerResult, ModelAction, Topic};
use crate::ipc::IpcResult;
use crate::model::{EntityKind, Project, ProjectForCreate};
use crate::router::RoutePatch;
use log::{debug, warn};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

/// Project navigation: one `a[data-id]` link per project.
///
/// # Invariants
/// - The link of the routed project carries the `sel` class.
/// - The first successful load routes to the first project.
/// - Updates arriving while the list is loading are replayed once it renders.
/// - Deleted links fade out (`anim-delete`) before removal.
pub struct NavView {
    this: Weak<Self>,
    ctx: AppContext,
    lifecycle: Lifecycle,
    root: NodeId,
    header: NodeId,
    section: NodeId,
    input: RefCell<Option<Rc<ProjectNewInput>>>,
    deleted: RefCell<HashSet<String>>,
    list_request: Latest,
    loading: Cell<bool>,
    pending_updates: RefCell<HashSet<String>>,
    project_requests: RefCell<HashMap<String, u64>>,
    awaiting_first_load: Cell<bool>,
    handlers: UiHandlerTable<Self>,
}

impl NavView {
    pub fn mount(ctx: &AppContext, parent: NodeId) -> Rc<Self> {
        let (root, header, section) = {
            let mut doc = ctx.doc().borrow_mut();
            let root = doc.create_element("nav-v");
            let header = doc.create_element("header");
            let label = doc.create_text_element("label", "Projects");
            let add = doc.create_element("d-ico");
            doc.add_class(add, "action");
            doc.add_class(add, "show-add-project");
            doc.set_attr(add, "name", "ico-add");
            let section = doc.create_element("section");

            doc.append_child(header, label);
            doc.append_child(header, add);
            doc.append_child(root, header);
            doc.append_child(root, section);
            doc.append_child(parent, root);
            (root, header, section)
        };

        let nav = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            ctx: ctx.clone(),
            lifecycle: Lifecycle::default(),
            root,
            header,
            section,
            input: RefCell::new(None),
            deleted: RefCell::new(HashSet::new()),
            list_request: Latest::default(),
            loading: Cell::new(false),
            pending_updates: RefCell::new(HashSet::new()),
            project_requests: RefCell::new(HashMap::new()),
            awaiting_first_load: Cell::new(true),
            handlers: UiHandlerTable::new()
                .on(
                    UiEventKind::PointerDown,
                    Selector::TagWithClass("d-ico", "show-add-project"),
                    Self::on_show_add_project,
                )
                .on(
                    UiEventKind::PointerDown,
                    Selector::TagWithAttr("a", "data-id"),
                    Self::on_select_link,
                )
                .on(
                    UiEventKind::Change,
                    Selector::Tag("project-new-ipt"),
                    Self::on_new_project,
                ),
        });

        let weak = Rc::downgrade(&nav);
        for action in [ModelAction::Create, ModelAction::Update, ModelAction::Delete] {
            nav.lifecycle
                .hold(listen(ctx, &weak, Topic::model(action, EntityKind::Project)));
        }
        nav.lifecycle.hold(listen(ctx, &weak, Topic::route_change()));
        nav.lifecycle.mark_mounted();
        nav.refresh();
        nav
    }

    /// Project ids of the rendered links, in display order.
    pub fn link_ids(&self) -> Vec<String> {
        let doc = self.ctx.doc().borrow();
        doc.children(self.section)
            .iter()
            .filter_map(|link| doc.attr(*link, "data-id").map(str::to_string))
            .collect()
    }

    pub fn link_node(&self, project_id: &str) -> Option<NodeId> {
        self.ctx
            .doc()
            .borrow()
            .find_by_attr(self.section, "a", "data-id", project_id)
            .first()
            .copied()
    }

    pub fn add_button(&self) -> Option<NodeId> {
        let doc = self.ctx.doc().borrow();
        doc.first(self.header, "d-ico", Some("show-add-project"))
    }

    /// The open new-project input, if any.
    pub fn new_project_input(&self) -> Option<Rc<ProjectNewInput>> {
        self.input
            .borrow()
            .as_ref()
            .filter(|input| input.is_mounted())
            .cloned()
    }

    fn refresh(&self) {
        let tag = self.list_request.next();
        self.loading.set(true);
        let client = self.ctx.projects().clone();
        let this = self.this.clone();
        self.ctx.scheduler().spawn(async move {
            let result = client.list().await;
            if let Some(nav) = this.upgrade() {
                nav.apply_projects(tag, result);
            }
        });
    }

    fn apply_projects(&self, tag: u64, result: IpcResult<Vec<Project>>) {
        if !self.is_mounted() || !self.list_request.is_current(tag) {
            debug!("event=view_discard module=view status=skipped component=nav_view op=list");
            return;
        }
        self.loading.set(false);
        let pending = std::mem::take(&mut *self.pending_updates.borrow_mut());
        match result {
            Ok(projects) => self.render_links(projects),
            Err(err) => warn!("event=view_load module=view status=error component=nav_view error={err}"),
        }
        for id in pending {
            self.on_project_update(&id);
        }
    }

    fn render_links(&self, projects: Vec<Project>) {
        let projects = {
            let mut deleted = self.deleted.borrow_mut();
            let (late, projects): (Vec<Project>, Vec<Project>) = projects
                .into_iter()
                .partition(|project| deleted.contains(&project.id));
            deleted.retain(|id| late.iter().any(|project| &project.id == id));
            projects
        };
        {
            let mut doc = self.ctx.doc().borrow_mut();
            let links = projects
                .iter()
                .map(|project| {
                    let link = doc.create_text_element("a", &project.name);
                    doc.set_attr(link, "data-id", &project.id);
                    link
                })
                .collect::<Vec<_>>();
            doc.replace_children(self.section, links);
        }
        debug!(
            "event=view_render module=view status=ok component=nav_view links={}",
            projects.len()
        );
        self.update_selection();

        if self.awaiting_first_load.replace(false) {
            if let Some(first) = projects.first() {
                self.ctx
                    .router()
                    .update_state(RoutePatch::new().project_id(first.id.clone()));
            }
        }
    }

    fn update_selection(&self) {
        let selected = self.ctx.router().get_current().project_id;
        let mut doc = self.ctx.doc().borrow_mut();
        let links = doc.children(self.section).to_vec();
        for link in links {
            let is_selected = selected.is_some() && doc.attr(link, "data-id") == selected.as_deref();
            if is_selected {
                doc.add_class(link, "sel");
            } else {
                doc.remove_class(link, "sel");
            }
        }
    }

    fn on_project_create(&self, id: &str) {
        self.refresh();
        self.ctx
            .router()
            .update_state(RoutePatch::new().project_id(id));
    }

    fn on_project_update(&self, id: &str) {
        if self.deleted.borrow().contains(id) {
            return;
        }
        if self.loading.get() {
            self.pending_updates.borrow_mut().insert(id.to_string());
            return;
        }
        if self.link_node(id).is_none() {
            return;
        }
        let tag = {
            let mut requests = self.project_requests.borrow_mut();
            let tag = requests.get(id).copied().unwrap_or(0) + 1;
            requests.insert(id.to_string(), tag);
            tag
        };
        let client = self.ctx.projects().clone();
        let this = self.this.clone();
        let id = id.to_string();
        self.ctx.scheduler().spawn(async move {
            let result = client.get(&id).await;
            if let Some(nav) = this.upgrade() {
                nav.apply_project(&id, tag, result);
            }
        });
    }

    fn apply_project(&self, id: &str, tag: u64, result: IpcResult<Project>) {
        let is_current = self.project_requests.borrow().get(id) == Some(&tag);
        if !self.is_mounted() || !is_current || self.deleted.borrow().contains(id) {
            debug!("event=view_discard module=view status=skipped component=nav_view op=get");
            return;
        }
        match result {
            Ok(project) => {
                let mut doc = self.ctx.doc().borrow_mut();
                for link in doc.find_by_attr(self.section, "a", "data-id", id) {
                    doc.set_text(link, &project.name);
                }
            }
            Err(err) => warn!("event=view_load module=view status=error component=nav_view id={id} error={err}"),
        }
    }

    fn on_project_delete(&self, id: &str) {
        self.deleted.borrow_mut().insert(id.to_string());
        self.pending_updates.borrow_mut().remove(id);
        let links = {
            let mut doc = self.ctx.doc().borrow_mut();
            let links = doc
                .find_by_attr(self.section, "a", "data-id", id)
                .into_iter()
                .filter(|link| !doc.has_class(*link, "anim-delete"))
                .collect::<Vec<_>>();
            for link in &links {
                doc.add_class(*link, "anim-delete");
            }
            links
        };
        for link in links {
            let doc = self.ctx.doc().clone();
            self.ctx
                .scheduler()
                .defer(self.ctx.config().delete_transition, move || {
                    doc.borrow_mut().remove(link);
                });
        }
        let routed = self.ctx.router().get_current().project_id;
        if routed.as_deref() == Some(id) {
            self.ctx
                .router()
                .update_state(RoutePatch::new().clear_project_id());
        }
    }

    fn on_show_add_project(&self, _: &UiEvent, _: NodeId) {
        let existing = self.input.borrow_mut().take();
        if let Some(input) = existing.filter(|input| input.is_mounted()) {
            input.unmount();
            return;
        }
        let input = ProjectNewInput::mount(&self.ctx, self.header);
        input.focus();
        *self.input.borrow_mut() = Some(input);
    }

    fn on_select_link(&self, _: &UiEvent, link: NodeId) {
        let project_id = self
            .ctx
            .doc()
            .borrow()
            .attr(link, "data-id")
            .map(str::to_string);
        if let Some(project_id) = project_id {
            self.ctx
                .router()
                .update_state(RoutePatch::new().project_id(project_id));
        }
    }

    fn on_new_project(&self, _: &UiEvent, _: NodeId) {
        let Some(input) = self.new_project_input() else {
            return;
        };
        let name = input.value();
        if name.is_empty() {
            input.unmount();
            return;
        }

        let client = self.ctx.projects().clone();
        self.ctx.scheduler().spawn(async move {
            match client.create(&ProjectForCreate { name }).await {
                Ok(ack) => debug!("event=project_create module=view status=ok id={}", ack.id),
                Err(err) => warn!("event=project_create module=view status=error error={err}"),
            }
        });
        input.clear();
    }
}

impl Component for NavView {
    fn root(&self) -> NodeId {
        self.root
    }

    fn handle_event(&self, event: &DomainEvent) -> HandlerResult {
        match event {
            DomainEvent::RouteChange => self.update_selection(),
            DomainEvent::Model(model) if model.entity == EntityKind::Project => {
                match model.action {
                    ModelAction::Create => self.on_project_create(model.id()),
                    ModelAction::Update => self.on_project_update(model.id()),
                    ModelAction::Delete => self.on_project_delete(model.id()),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn dispatch_ui(&self, event: &UiEvent) -> bool {
        if !self.is_mounted() {
            return false;
        }
        if let Some(input) = self.new_project_input() {
            if input.dispatch_ui(event) {
                return true;
            }
        }
        self.handlers
            .dispatch(self, self.ctx.doc(), self.root, event)
    }

    fn unmount(&self) {
        if !self.lifecycle.release() {
            return;
        }
        if let Some(input) = self.input.borrow_mut().take() {
            input.unmount();
        }
        self.ctx.doc().borrow_mut().remove(self.root);
    }

    fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }
}

/// Inline input for a new project name.
pub struct ProjectNewInput {
    ctx: AppContext,
    lifecycle: Lifecycle,
    root: NodeId,
    input: NodeId,
    handlers: UiHandlerTable<Self>,
}

impl ProjectNewInput {
    pub fn mount(ctx: &AppContext, parent: NodeId) -> Rc<Self> {
        let (root, input) = {
            let mut doc = ctx.doc().borrow_mut();
            let root = doc.create_element("project-new-ipt");
            let input = doc.create_element("d-input");
            doc.set_attr(input, "placeholder", "Project name (press Enter)");
            doc.append_child(root, input);
            doc.append_child(parent, root);
            (root, input)
        };

        let component = Rc::new(Self {
            ctx: ctx.clone(),
            lifecycle: Lifecycle::default(),
            root,
            input,
            handlers: UiHandlerTable::new().on(UiEventKind::KeyDown, Selector::Any, Self::on_key),
        });
        component.lifecycle.mark_mounted();
        component
    }

    pub fn input(&self) -> NodeId {
        self.input
    }

    /// Trimmed current value.
    pub fn value(&self) -> String {
        self.ctx
            .doc()
            .borrow()
            .attr(self.input, "value")
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    pub fn clear(&self) {
        self.ctx.doc().borrow_mut().set_attr(self.input, "value", "");
    }

    /// Focuses the input on a later scheduler turn, once it is attached.
    pub fn focus(&self) {
        let doc = self.ctx.doc().clone();
        let input = self.input;
        self.ctx
            .scheduler()
            .defer(self.ctx.config().focus_delay, move || doc.borrow_mut().focus(input));
    }

    fn on_key(&self, event: &UiEvent, _: NodeId) {
        if event.key.as_deref() == Some("Escape") {
            self.unmount();
        }
    }
}

impl Component for ProjectNewInput {
    fn root(&self) -> NodeId {
        self.root
    }

    fn handle_event(&self, _: &DomainEvent) -> HandlerResult {
        Ok(())
    }

    fn dispatch_ui(&self, event: &UiEvent) -> bool {
        self.is_mounted()
            && self
                .handlers
                .dispatch(self, self.ctx.doc(), self.root, event)
    }

    fn unmount(&self) {
        if self.lifecycle.release() {
            self.ctx.doc().borrow_mut().remove(self.root);
        }
    }

    fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }
}
