use super::{Entity, EntityKind};
use serde::{Deserialize, Serialize};

/// Task owned by one project.
///
/// `ctime` is the host creation timestamp rendered as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub ctime: String,
    pub project_id: String,
    pub done: bool,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskForCreate {
    pub project_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl TaskForCreate {
    pub fn new(project_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            title: title.into(),
            done: None,
            desc: None,
        }
    }
}

/// Partial task update; `None` fields are left untouched by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskForUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl TaskForUpdate {
    pub fn done(done: bool) -> Self {
        Self {
            done: Some(done),
            ..Self::default()
        }
    }
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;
    type ForCreate = TaskForCreate;
    type ForUpdate = TaskForUpdate;

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::TaskForUpdate;
    use serde_json::json;

    #[test]
    fn partial_update_only_serializes_present_fields() {
        let value = serde_json::to_value(TaskForUpdate::done(true)).unwrap();
        assert_eq!(value, json!({"done": true}));
    }
}
