use super::{
    listen, Component, Latest, Lifecycle, MenuComponent, Selector, UiEvent, UiEventKind,
    UiHandlerTable,
};
use crate::client::ListFilter;
use crate::context::AppContext;
use crate::dom::{Document, NodeId};
use crate::event::{DomainEvent, HandlerResult, ModelAction, Topic};
use crate::ipc::IpcResult;
use crate::model::{EntityKind, Task, TaskForUpdate};
use log::{debug, warn};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

/// Class of the per-row action menu; at most one is open at a time.
pub const TASK_MENU_CLASS: &str = "task-row-more-menu";

const HEADER_CELLS: [(&str, Option<&str>); 4] = [
    ("Title", None),
    ("Info", None),
    ("Done", Some("done")),
    ("", Some("more")),
];

/// One `task-row` element keyed by `data-id`.
#[derive(Debug)]
pub struct TaskRow {
    root: NodeId,
    title: NodeId,
    info: NodeId,
    check: NodeId,
    task: Task,
}

impl TaskRow {
    pub fn create(doc: &mut Document, task: Task) -> Self {
        let root = doc.create_element("task-row");
        let title = doc.create_element("span");
        doc.add_class(title, "title");
        let info = doc.create_element("span");
        doc.add_class(info, "info");
        let check = doc.create_element("d-check");
        doc.add_class(check, "done");
        let more = doc.create_element("d-ico");
        doc.add_class(more, "show-more");
        doc.set_attr(more, "name", "ico-more");
        for child in [title, info, check, more] {
            doc.append_child(root, child);
        }

        let row = Self {
            root,
            title,
            info,
            check,
            task,
        };
        row.render(doc);
        row
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Re-renders with `task`; returns `false` when nothing changed.
    pub fn set_task(&mut self, doc: &mut Document, task: Task) -> bool {
        if self.task == task {
            return false;
        }
        self.task = task;
        self.render(doc);
        true
    }

    fn render(&self, doc: &mut Document) {
        doc.set_attr(self.root, "data-id", &self.task.id);
        doc.set_text(self.title, &self.task.title);
        doc.set_text(self.info, &format!("(ctime: {})", ctime_suffix(&self.task.ctime)));
        if self.task.done {
            doc.set_attr(self.check, "checked", "");
        } else {
            doc.remove_attr(self.check, "checked");
        }
    }
}

fn ctime_suffix(ctime: &str) -> &str {
    let start = ctime
        .char_indices()
        .rev()
        .nth(4)
        .map_or(0, |(index, _)| index);
    &ctime[start..]
}

/// Task grid of one project.
///
/// # Invariants
/// - `create` events rebuild the grid from a fresh list.
/// - `update` events refetch only the updated task and patch its rows.
/// - `update` events arriving while a list is loading are replayed once it
///   renders, so a list computed before the update never wins.
/// - `delete` events fade rows out, then remove them; deleted ids never come
///   back through a late list result.
pub struct TasksDataTable {
    this: Weak<Self>,
    ctx: AppContext,
    lifecycle: Lifecycle,
    root: NodeId,
    project_id: String,
    filter: ListFilter,
    rows: RefCell<Vec<TaskRow>>,
    deleted: RefCell<HashSet<String>>,
    list_request: Latest,
    loading: Cell<bool>,
    pending_updates: RefCell<HashSet<String>>,
    task_requests: RefCell<HashMap<String, u64>>,
    on_empty: Box<dyn Fn()>,
    handlers: UiHandlerTable<Self>,
}

impl TasksDataTable {
    pub fn mount(
        ctx: &AppContext,
        parent: NodeId,
        project_id: &str,
        filter: ListFilter,
        on_empty: impl Fn() + 'static,
    ) -> Rc<Self> {
        let root = {
            let mut doc = ctx.doc().borrow_mut();
            let root = doc.create_element("tasks-dt");
            doc.append_child(parent, root);
            root
        };

        let table = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            ctx: ctx.clone(),
            lifecycle: Lifecycle::default(),
            root,
            project_id: project_id.to_string(),
            filter,
            rows: RefCell::new(Vec::new()),
            deleted: RefCell::new(HashSet::new()),
            list_request: Latest::default(),
            loading: Cell::new(false),
            pending_updates: RefCell::new(HashSet::new()),
            task_requests: RefCell::new(HashMap::new()),
            on_empty: Box::new(on_empty),
            handlers: UiHandlerTable::new()
                .on(
                    UiEventKind::PointerUp,
                    Selector::TagWithClass("d-ico", "show-more"),
                    Self::on_show_more,
                )
                .on(
                    UiEventKind::Change,
                    Selector::TagWithClass("d-check", "done"),
                    Self::on_check_change,
                ),
        });

        let weak = Rc::downgrade(&table);
        for action in [ModelAction::Create, ModelAction::Update, ModelAction::Delete] {
            table
                .lifecycle
                .hold(listen(ctx, &weak, Topic::model(action, EntityKind::Task)));
        }
        table.lifecycle.mark_mounted();
        table.refresh();
        table
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Ids of the rendered rows, in display order, fading rows included.
    pub fn row_ids(&self) -> Vec<String> {
        self.rows
            .borrow()
            .iter()
            .map(|row| row.task().id.clone())
            .collect()
    }

    /// Deleted ids still kept out of list results.
    pub fn tombstone_count(&self) -> usize {
        self.deleted.borrow().len()
    }

    /// Root node of the row showing `task_id`.
    pub fn row_node(&self, task_id: &str) -> Option<NodeId> {
        self.ctx
            .doc()
            .borrow()
            .find_by_attr(self.root, "task-row", "data-id", task_id)
            .first()
            .copied()
    }

    /// Reloads the whole grid.
    pub fn refresh(&self) {
        let tag = self.list_request.next();
        self.loading.set(true);
        let mut filter = ListFilter::new();
        filter.insert("project_id".to_string(), Value::from(self.project_id.clone()));
        filter.extend(self.filter.clone());

        let client = self.ctx.tasks().clone();
        let this = self.this.clone();
        self.ctx.scheduler().spawn(async move {
            let result = client.list(filter).await;
            if let Some(table) = this.upgrade() {
                table.apply_list(tag, result);
            }
        });
    }

    fn apply_list(&self, tag: u64, result: IpcResult<Vec<Task>>) {
        if !self.is_mounted() || !self.list_request.is_current(tag) {
            debug!("event=view_discard module=view status=skipped component=tasks_table op=list");
            return;
        }
        self.loading.set(false);
        let pending = std::mem::take(&mut *self.pending_updates.borrow_mut());
        match result {
            Ok(tasks) => self.render_list(tasks),
            Err(err) => warn!("event=view_load module=view status=error component=tasks_table error={err}"),
        }
        for id in pending {
            self.on_task_update(&id);
        }
    }

    fn render_list(&self, tasks: Vec<Task>) {
        let tasks = {
            let mut deleted = self.deleted.borrow_mut();
            let (late, tasks): (Vec<Task>, Vec<Task>) = tasks
                .into_iter()
                .partition(|task| deleted.contains(&task.id));
            // Ids missing from a current list are gone on the host for good.
            deleted.retain(|id| late.iter().any(|task| &task.id == id));
            tasks
        };
        let is_empty = tasks.is_empty();
        {
            let mut doc = self.ctx.doc().borrow_mut();
            let mut children = HEADER_CELLS
                .iter()
                .map(|(label, class)| {
                    let cell = doc.create_text_element("div", label);
                    doc.add_class(cell, "th");
                    if let Some(class) = class {
                        doc.add_class(cell, class);
                    }
                    cell
                })
                .collect::<Vec<_>>();
            let rows = tasks
                .into_iter()
                .map(|task| TaskRow::create(&mut doc, task))
                .collect::<Vec<_>>();
            children.extend(rows.iter().map(TaskRow::root));
            doc.replace_children(self.root, children);
            *self.rows.borrow_mut() = rows;
        }
        debug!(
            "event=view_render module=view status=ok component=tasks_table rows={}",
            self.rows.borrow().len()
        );

        if is_empty {
            (self.on_empty)();
        }
    }

    fn on_task_update(&self, id: &str) {
        if self.deleted.borrow().contains(id) {
            return;
        }
        if self.loading.get() {
            self.pending_updates.borrow_mut().insert(id.to_string());
            return;
        }
        if self.row_node(id).is_none() {
            return;
        }
        let tag = {
            let mut requests = self.task_requests.borrow_mut();
            let tag = requests.get(id).copied().unwrap_or(0) + 1;
            requests.insert(id.to_string(), tag);
            tag
        };

        let client = self.ctx.tasks().clone();
        let this = self.this.clone();
        let id = id.to_string();
        self.ctx.scheduler().spawn(async move {
            let result = client.get(&id).await;
            if let Some(table) = this.upgrade() {
                table.apply_task(&id, tag, result);
            }
        });
    }

    fn apply_task(&self, id: &str, tag: u64, result: IpcResult<Task>) {
        let is_current = self.task_requests.borrow().get(id) == Some(&tag);
        if !self.is_mounted() || !is_current || self.deleted.borrow().contains(id) {
            debug!("event=view_discard module=view status=skipped component=tasks_table op=get");
            return;
        }
        let task = match result {
            Ok(task) => task,
            Err(err) => {
                warn!("event=view_load module=view status=error component=tasks_table id={id} error={err}");
                return;
            }
        };

        let mut doc = self.ctx.doc().borrow_mut();
        let targets = doc.find_by_attr(self.root, "task-row", "data-id", id);
        let mut patched = 0;
        for row in self.rows.borrow_mut().iter_mut() {
            if targets.contains(&row.root()) && row.set_task(&mut doc, task.clone()) {
                patched += 1;
            }
        }
        debug!("event=view_patch module=view status=ok component=tasks_table id={id} rows={patched}");
    }

    fn on_task_delete(&self, id: &str) {
        self.deleted.borrow_mut().insert(id.to_string());
        self.pending_updates.borrow_mut().remove(id);
        let targets = {
            let mut doc = self.ctx.doc().borrow_mut();
            let targets = doc
                .find_by_attr(self.root, "task-row", "data-id", id)
                .into_iter()
                .filter(|row| !doc.has_class(*row, "anim-delete"))
                .collect::<Vec<_>>();
            for row in &targets {
                doc.add_class(*row, "anim-delete");
            }
            targets
        };

        for row in targets {
            let doc = self.ctx.doc().clone();
            let this = self.this.clone();
            self.ctx
                .scheduler()
                .defer(self.ctx.config().delete_transition, move || {
                    doc.borrow_mut().remove(row);
                    if let Some(table) = this.upgrade() {
                        table.rows.borrow_mut().retain(|kept| kept.root() != row);
                    }
                });
        }
    }

    fn task_for(&self, node: NodeId) -> Option<Task> {
        let row_root = self
            .ctx
            .doc()
            .borrow()
            .closest(node, self.root, |doc, id| doc.tag(id) == Some("task-row"))?;
        self.rows
            .borrow()
            .iter()
            .find(|row| row.root() == row_root)
            .map(|row| row.task().clone())
    }

    fn on_show_more(&self, _: &UiEvent, node: NodeId) {
        let already_open = {
            let doc = self.ctx.doc().borrow();
            doc.first(doc.body(), "menu-c", Some(TASK_MENU_CLASS)).is_some()
        };
        if already_open {
            return;
        }
        let Some(task) = self.task_for(node) else {
            return;
        };

        let toggle_label = if task.done { "Mark Undone" } else { "Mark Done" };
        let options = [("toggle", toggle_label), ("delete", "Delete")];
        let this = self.this.clone();
        MenuComponent::open(&self.ctx, TASK_MENU_CLASS, &options, move |key| {
            if let Some(table) = this.upgrade() {
                table.on_menu_select(&task, key);
            }
        });
    }

    fn on_menu_select(&self, task: &Task, key: &str) {
        match key {
            "delete" => self.delete_task(&task.id),
            "toggle" => self.update_done(&task.id, !task.done),
            other => debug!("event=menu_select module=view status=ignored key={other}"),
        }
    }

    fn on_check_change(&self, _: &UiEvent, node: NodeId) {
        let checked = self.ctx.doc().borrow().attr(node, "checked").is_some();
        let Some(task) = self.task_for(node) else {
            return;
        };
        // Rows re-rendered from an update event report the value they already hold.
        if checked != task.done {
            self.update_done(&task.id, checked);
        }
    }

    fn update_done(&self, id: &str, done: bool) {
        let client = self.ctx.tasks().clone();
        let id = id.to_string();
        self.ctx.scheduler().spawn(async move {
            if let Err(err) = client.update(&id, &TaskForUpdate::done(done)).await {
                warn!("event=task_update module=view status=error id={id} error={err}");
            }
        });
    }

    fn delete_task(&self, id: &str) {
        let client = self.ctx.tasks().clone();
        let id = id.to_string();
        self.ctx.scheduler().spawn(async move {
            if let Err(err) = client.delete(&id).await {
                warn!("event=task_delete module=view status=error id={id} error={err}");
            }
        });
    }
}

impl Component for TasksDataTable {
    fn root(&self) -> NodeId {
        self.root
    }

    fn handle_event(&self, event: &DomainEvent) -> HandlerResult {
        let DomainEvent::Model(model) = event else {
            return Ok(());
        };
        if model.entity != EntityKind::Task {
            return Ok(());
        }
        match model.action {
            ModelAction::Create => self.refresh(),
            ModelAction::Update => self.on_task_update(model.id()),
            ModelAction::Delete => self.on_task_delete(model.id()),
        }
        Ok(())
    }

    fn dispatch_ui(&self, event: &UiEvent) -> bool {
        self.is_mounted()
            && self
                .handlers
                .dispatch(self, self.ctx.doc(), self.root, event)
    }

    fn unmount(&self) {
        if !self.lifecycle.release() {
            return;
        }
        self.rows.borrow_mut().clear();
        self.ctx.doc().borrow_mut().remove(self.root);
    }

    fn is_mounted(&self) -> bool {
        self.lifecycle.is_mounted()
    }
}
