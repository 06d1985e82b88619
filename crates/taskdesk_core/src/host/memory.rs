use crate::event::{HubEvent, HubEventBridge, ModelAction};
use crate::ipc::{IpcError, IpcResult, Transport, TransportFuture};
use crate::model::{
    EntityKind, Project, ProjectForCreate, ProjectForUpdate, Task, TaskForCreate, TaskForUpdate,
};
use futures::channel::oneshot;
use futures::FutureExt;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use uuid::Uuid;

const FIRST_CTIME_MS: u64 = 1_700_000_000_000;
const CTIME_STEP_MS: u64 = 1_000;

/// One request as received by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct HostCall {
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Deserialize)]
struct IdParams {
    id: String,
}

#[derive(Debug, Deserialize)]
struct DataParams<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct UpdateParams<T> {
    id: String,
    data: T,
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    #[serde(default)]
    filter: Map<String, Value>,
}

enum Scripted {
    RemoteError(String),
    TransportError(String),
    Data(Value),
}

#[derive(Default)]
struct HostState {
    projects: Vec<Project>,
    tasks: Vec<Task>,
    next_ctime: u64,
    outbox: VecDeque<HubEvent>,
    calls: Vec<HostCall>,
    scripted: HashMap<String, VecDeque<Scripted>>,
    holding: bool,
    held: Vec<oneshot::Sender<()>>,
}

impl HostState {
    fn next_ctime(&mut self) -> String {
        if self.next_ctime == 0 {
            self.next_ctime = FIRST_CTIME_MS;
        }
        let ctime = self.next_ctime;
        self.next_ctime += CTIME_STEP_MS;
        ctime.to_string()
    }

    fn emit(&mut self, action: ModelAction, entity: EntityKind, id: &str) {
        self.outbox.push_back(HubEvent::model(action, entity, id));
    }

    fn insert_project(&mut self, data: ProjectForCreate) -> String {
        let project = Project {
            id: new_id(EntityKind::Project),
            name: data.name,
            ctime: self.next_ctime(),
        };
        let id = project.id.clone();
        self.projects.push(project);
        id
    }

    fn insert_task(&mut self, data: TaskForCreate) -> String {
        let task = Task {
            id: new_id(EntityKind::Task),
            ctime: self.next_ctime(),
            project_id: data.project_id,
            done: data.done.unwrap_or(false),
            title: data.title,
            desc: data.desc,
        };
        let id = task.id.clone();
        self.tasks.push(task);
        id
    }

    fn dispatch(&mut self, method: &str, params: Value) -> Result<Value, String> {
        match method {
            "get_project" => {
                let IdParams { id } = decode(params)?;
                let project = self
                    .projects
                    .iter()
                    .find(|project| project.id == id)
                    .ok_or_else(|| not_found(EntityKind::Project, &id))?;
                encode(project)
            }
            "create_project" => {
                let DataParams { data } = decode::<DataParams<ProjectForCreate>>(params)?;
                let id = self.insert_project(data);
                self.emit(ModelAction::Create, EntityKind::Project, &id);
                Ok(json!({ "id": id }))
            }
            "update_project" => {
                let UpdateParams { id, data } = decode::<UpdateParams<ProjectForUpdate>>(params)?;
                let project = self
                    .projects
                    .iter_mut()
                    .find(|project| project.id == id)
                    .ok_or_else(|| not_found(EntityKind::Project, &id))?;
                if let Some(name) = data.name {
                    project.name = name;
                }
                self.emit(ModelAction::Update, EntityKind::Project, &id);
                Ok(json!({ "id": id }))
            }
            "delete_project" => {
                let IdParams { id } = decode(params)?;
                let index = self
                    .projects
                    .iter()
                    .position(|project| project.id == id)
                    .ok_or_else(|| not_found(EntityKind::Project, &id))?;
                self.projects.remove(index);
                self.tasks.retain(|task| task.project_id != id);
                self.emit(ModelAction::Delete, EntityKind::Project, &id);
                Ok(json!({ "id": id }))
            }
            "list_projects" => encode(&self.projects),
            "get_task" => {
                let IdParams { id } = decode(params)?;
                let task = self
                    .tasks
                    .iter()
                    .find(|task| task.id == id)
                    .ok_or_else(|| not_found(EntityKind::Task, &id))?;
                encode(task)
            }
            "create_task" => {
                let DataParams { data } = decode::<DataParams<TaskForCreate>>(params)?;
                let id = self.insert_task(data);
                self.emit(ModelAction::Create, EntityKind::Task, &id);
                Ok(json!({ "id": id }))
            }
            "update_task" => {
                let UpdateParams { id, data } = decode::<UpdateParams<TaskForUpdate>>(params)?;
                let task = self
                    .tasks
                    .iter_mut()
                    .find(|task| task.id == id)
                    .ok_or_else(|| not_found(EntityKind::Task, &id))?;
                if let Some(title) = data.title {
                    task.title = title;
                }
                if let Some(done) = data.done {
                    task.done = done;
                }
                if data.desc.is_some() {
                    task.desc = data.desc;
                }
                self.emit(ModelAction::Update, EntityKind::Task, &id);
                Ok(json!({ "id": id }))
            }
            "delete_task" => {
                let IdParams { id } = decode(params)?;
                let index = self
                    .tasks
                    .iter()
                    .position(|task| task.id == id)
                    .ok_or_else(|| not_found(EntityKind::Task, &id))?;
                self.tasks.remove(index);
                self.emit(ModelAction::Delete, EntityKind::Task, &id);
                Ok(json!({ "id": id }))
            }
            "list_tasks" => {
                let ListParams { filter } = decode(params)?;
                let mut matched = Vec::new();
                // Newest first.
                for task in self.tasks.iter().rev() {
                    if task_matches(task, &filter)? {
                        matched.push(task);
                    }
                }
                encode(&matched)
            }
            other => Err(format!("unknown command `{other}`")),
        }
    }
}

/// Host double keeping projects and tasks in memory.
///
/// Mutations answer `{data: {id}}` and queue the matching model event; the
/// embedder forwards queued events with [`MemoryHost::flush_events`], which
/// keeps them strictly after the request that caused them.
#[derive(Clone, Default)]
pub struct MemoryHost {
    state: Rc<RefCell<HostState>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a project without queueing an event.
    pub fn seed_project(&self, name: &str) -> String {
        self.state.borrow_mut().insert_project(ProjectForCreate {
            name: name.to_string(),
        })
    }

    /// Adds a task without queueing an event.
    pub fn seed_task(&self, project_id: &str, title: &str, done: bool) -> String {
        let mut data = TaskForCreate::new(project_id, title);
        data.done = Some(done);
        self.state.borrow_mut().insert_task(data)
    }

    pub fn project(&self, id: &str) -> Option<Project> {
        let state = self.state.borrow();
        state.projects.iter().find(|project| project.id == id).cloned()
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        let state = self.state.borrow();
        state.tasks.iter().find(|task| task.id == id).cloned()
    }

    /// Queues an arbitrary event, as if pushed by the host.
    pub fn emit(&self, event: HubEvent) {
        self.state.borrow_mut().outbox.push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        self.state.borrow().outbox.len()
    }

    pub fn take_events(&self) -> Vec<HubEvent> {
        self.state.borrow_mut().outbox.drain(..).collect()
    }

    /// Delivers queued events in emission order; returns how many were sent.
    pub fn flush_events(&self, bridge: &HubEventBridge) -> usize {
        let mut sent = 0;
        // Handlers may issue new requests; never hold the state across delivery.
        loop {
            let next = self.state.borrow_mut().outbox.pop_front();
            let Some(event) = next else {
                break;
            };
            bridge.deliver(event);
            sent += 1;
        }
        sent
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state.borrow().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<HostCall> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| call.method == method)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Next call to `method` answers with a host error envelope.
    pub fn fail_next(&self, method: &str, message: &str) {
        self.script(method, Scripted::RemoteError(message.to_string()));
    }

    /// Next call to `method` fails below the envelope layer.
    pub fn break_next(&self, method: &str, message: &str) {
        self.script(method, Scripted::TransportError(message.to_string()));
    }

    /// Next call to `method` answers `{data}` without touching storage.
    pub fn respond_next(&self, method: &str, data: Value) {
        self.script(method, Scripted::Data(data));
    }

    /// While holding, responses wait for [`MemoryHost::release_held`].
    pub fn hold_responses(&self, holding: bool) {
        self.state.borrow_mut().holding = holding;
    }

    /// Lets every held response complete; returns how many were released.
    pub fn release_held(&self) -> usize {
        let held = std::mem::take(&mut self.state.borrow_mut().held);
        let released = held.len();
        for gate in held {
            let _ = gate.send(());
        }
        released
    }

    fn script(&self, method: &str, scripted: Scripted) {
        self.state
            .borrow_mut()
            .scripted
            .entry(method.to_string())
            .or_default()
            .push_back(scripted);
    }

    fn respond(&self, method: &str, params: Value) -> IpcResult<Value> {
        let mut state = self.state.borrow_mut();
        state.calls.push(HostCall {
            method: method.to_string(),
            params: params.clone(),
        });

        let scripted = state
            .scripted
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        let outcome = match scripted {
            Some(Scripted::TransportError(message)) => return Err(IpcError::Transport(message)),
            Some(Scripted::RemoteError(message)) => Err(message),
            Some(Scripted::Data(data)) => Ok(data),
            None => state.dispatch(method, params),
        };

        debug!(
            "event=host_call module=host status={} method={}",
            if outcome.is_ok() { "ok" } else { "error" },
            method
        );
        Ok(match outcome {
            Ok(data) => json!({ "result": { "data": data }, "error": null }),
            Err(message) => json!({ "result": null, "error": { "message": message } }),
        })
    }
}

impl Transport for MemoryHost {
    fn call(&self, method: &str, params: Value) -> TransportFuture {
        let response = self.respond(method, params);
        let gate = {
            let mut state = self.state.borrow_mut();
            if state.holding {
                let (sender, receiver) = oneshot::channel();
                state.held.push(sender);
                Some(receiver)
            } else {
                None
            }
        };

        async move {
            if let Some(gate) = gate {
                gate.await
                    .map_err(|_| IpcError::Transport("held response dropped".to_string()))?;
            }
            response
        }
        .boxed_local()
    }
}

fn new_id(kind: EntityKind) -> String {
    format!("{}:{}", kind.as_str(), Uuid::new_v4().simple())
}

fn not_found(kind: EntityKind, id: &str) -> String {
    format!("{} not found: {id}", kind.as_str())
}

fn decode<T: DeserializeOwned>(params: Value) -> Result<T, String> {
    serde_json::from_value(params).map_err(|err| format!("invalid params: {err}"))
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|err| format!("encode failed: {err}"))
}

fn task_matches(task: &Task, filter: &Map<String, Value>) -> Result<bool, String> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "project_id" => text_matches(Some(task.project_id.as_str()), condition)?,
            "title" => text_matches(Some(task.title.as_str()), condition)?,
            "desc" => text_matches(task.desc.as_deref(), condition)?,
            "done" => match condition {
                Value::Bool(done) => task.done == *done,
                other => return Err(format!("`done` filter must be a boolean, got `{other}`")),
            },
            other => return Err(format!("unsupported filter key `{other}`")),
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn text_matches(value: Option<&str>, condition: &Value) -> Result<bool, String> {
    match condition {
        Value::Null => Ok(value.is_none()),
        Value::String(expected) => Ok(value == Some(expected.as_str())),
        Value::Object(operators) => {
            let value = value.unwrap_or_default();
            for (operator, operand) in operators {
                let Value::String(operand) = operand else {
                    return Err(format!("operand of `{operator}` must be a string"));
                };
                let matched = match operator.as_str() {
                    "$eq" => value == operand.as_str(),
                    "$contains" => value.contains(operand.as_str()),
                    "$startsWith" => value.starts_with(operand.as_str()),
                    other => return Err(format!("unsupported filter operator `{other}`")),
                };
                if !matched {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        other => Err(format!("unsupported filter value `{other}`")),
    }
}
