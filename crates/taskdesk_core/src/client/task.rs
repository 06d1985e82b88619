use super::filter::{prune_empty, ListFilter};
use super::EntityClient;
use crate::ipc::IpcResult;
use crate::model::Task;
use serde_json::{Map, Value};

pub type TaskClient = EntityClient<Task>;

impl EntityClient<Task> {
    /// Lists tasks matching `filter` after pruning empty-string values.
    pub async fn list(&self, filter: ListFilter) -> IpcResult<Vec<Task>> {
        let mut params = Map::new();
        params.insert("filter".to_string(), Value::Object(prune_empty(filter)));
        self.list_with(Value::Object(params)).await
    }
}
