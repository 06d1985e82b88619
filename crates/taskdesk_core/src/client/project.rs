use super::EntityClient;
use crate::ipc::IpcResult;
use crate::model::Project;
use serde_json::{Map, Value};

pub type ProjectClient = EntityClient<Project>;

impl EntityClient<Project> {
    /// Lists every project (`list_projects`, no filter).
    pub async fn list(&self) -> IpcResult<Vec<Project>> {
        self.list_with(Value::Object(Map::new())).await
    }
}
