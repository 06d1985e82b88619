use super::{
    listen, Component, Latest, Lifecycle, Selector, TasksDataTable, UiEvent, UiEventKind,
    UiHandlerTable,
};
use crate::client::ListFilter;
use crate::context::AppContext;
use crate::dom::NodeId;
use crate::event::{DomainEvent, HandlerResult, ModelAction, Topic};
use crate::ipc::IpcResult;
use crate::model::{EntityKind, Project, TaskForCreate};
use log::{debug, warn};
use serde_json::json;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Detail view of one project: title, task inputs and the task grid.
pub struct ProjectView {
    this: Weak<Self>,
    ctx: AppContext,
    lifecycle: Lifecycle,
    root: NodeId,
    title: NodeId,
    new_task: NodeId,
    search: NodeId,
    content: NodeId,
    project: RefCell<Project>,
    table: RefCell<Option<Rc<TasksDataTable>>>,
    project_request: Latest,
    handlers: UiHandlerTable<Self>,
}

impl ProjectView {
    pub fn mount(ctx: &AppContext, parent: NodeId, project: Project) -> Rc<Self> {
        let (root, title, new_task, search, content) = {
            let mut doc = ctx.doc().borrow_mut();
            let root = doc.create_element("project-v");
            let header = doc.create_element("header");
            let title = doc.create_element("h1");
            let new_task = doc.create_element("d-input");
            doc.add_class(new_task, "new-task");
            doc.set_attr(new_task, "placeholder", "Enter new task (press enter)");
            let search = doc.create_element("d-input");
            doc.add_class(search, "search-task");
            doc.set_attr(search, "placeholder", "Search your task");
            let content = doc.create_element("section");

            doc.append_child(header, title);
            doc.append_child(header, new_task);
            for child in [header, search, content] {
                doc.append_child(root, child);
            }
            doc.append_child(parent, root);
            (root, title, new_task, search, content)
        };

        let view = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            ctx: ctx.clone(),
            lifecycle: Lifecycle::default(),
            root,
            title,
            new_task,
            search,
            content,
            project: RefCell::new(project),
            table: RefCell::new(None),
            project_request: Latest::default(),
            handlers: UiHandlerTable::new()
                .on(
                    UiEventKind::Change,
                    Selector::TagWithClass("d-input", "new-task"),
                    Self::on_new_task,
                )
                .on(
                    UiEventKind::Change,
                    Selector::TagWithClass("d-input", "search-task"),
                    Self::on_search,
                ),
        });

        view.lifecycle.hold(listen(
            ctx,
            &Rc::downgrade(&view),
            Topic::model(ModelAction::Update, EntityKind::Project),
        ));
        view.lifecycle.mark_mounted();
        view.render_title();
        view.mount_table(ListFilter::new());
        view
    }

    pub fn project(&self) -> Project {
        self.project.borrow().clone()
    }

    pub fn table(&self) -> Option<Rc<TasksDataTable>> {
        self.table.borrow().clone()
    }

    pub fn new_task_input(&self) -> NodeId {
        self.new_task
    }

    pub fn search_input(&self) -> NodeId {
        self.search
    }

    fn render_title(&self) {
        let name = self.project.borrow().name.clone();
        self.ctx.doc().borrow_mut().set_text(self.title, &name);
    }

    /// Replaces the task grid with one using `filter`.
    fn mount_table(&self, filter: ListFilter) {
        if let Some(previous) = self.table.borrow_mut().take() {
            previous.unmount();
        }
        let project_id = self.project.borrow().id.clone();
        let this = self.this.clone();
        let table = TasksDataTable::mount(&self.ctx, self.content, &project_id, filter, move || {
            if let Some(view) = this.upgrade() {
                view.focus_new_task();
            }
        });
        *self.table.borrow_mut() = Some(table);
    }

    fn focus_new_task(&self) {
        if self.is_mounted() {
            self.ctx.doc().borrow_mut().focus(self.new_task);
        }
    }

    fn input_value(&self, input: NodeId) -> String {
        self.ctx
            .doc()
            .borrow()
            .attr(input, "value")
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    fn on_new_task(&self, _: &UiEvent, input: NodeId) {
        let title = self.input_value(input);
        if title.is_empty() {
            return;
        }

        let data = TaskForCreate::new(self.project.borrow().id.clone(), title);
        let client = self.ctx.tasks().clone();
        self.ctx.scheduler().spawn(async move {
            match client.create(&data).await {
                Ok(ack) => debug!("event=task_create module=view status=ok id={}", ack.id),
                Err(err) => warn!("event=task_create module=view status=error error={err}"),
            }
        });
        self.ctx.doc().borrow_mut().set_attr(input, "value", "");
    }

    fn on_search(&self, _: &UiEvent, input: NodeId) {
        let search = self.input_value(input);
        let mut filter = ListFilter::new();
        if !search.is_empty() {
            filter.insert("title".to_string(), json!({ "$contains": search }));
        }
        self.mount_table(filter);
    }

    fn on_project_update(&self, id: &str) {
        if self.project.borrow().id != id {
            return;
        }
        let tag = self.project_request.next();
        let client = self.ctx.projects().clone();
        let this = self.this.clone();
        let id = id.to_string();
        self.ctx.scheduler().spawn(async move {
            let result = client.get(&id).await;
            if let Some(view) = this.upgrade() {
                view.apply_project(tag, result);
            }
        });
    }

    fn apply_project(&self, tag: u64, result: IpcResult<Project>) {
        if !self.is_mounted() || !self.project_request.is_current(tag) {
            debug!("event=view_discard module=view status=skipped component=project_view op=get");
            return;
        }
        match result {
            Ok(project) => {
                *self.project.borrow_mut() = project;
                self.render_title();
            }
            Err(err) => warn!("event=view_load module=view status=error component=project_view error={err}"),
        }
    }
}

impl Component for ProjectView {
    fn root(&self) -> NodeId {
        self.root
    }

    fn handle_event(&self, event: &DomainEvent) -> HandlerResult {
        if let DomainEvent::Model(model) = event {
            if model.entity == EntityKind::Project && model.action == ModelAction::Update {
                self.on_project_update(model.id());
            }
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
        let table = self.table();
        table.is_some_and(|table| table.dispatch_ui(event))
    }

    fn unmount(&self) {
        if !self.lifecycle.release() {
            return;
        }
        if let Some(table) = self.table.borrow_mut().take() {
            table.unmount();
        }
        self.ctx.doc().borrow_mut().remove(self.root);
    }

    fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }
}
