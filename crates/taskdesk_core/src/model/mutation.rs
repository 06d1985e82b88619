use crate::ipc::{IpcError, IpcResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Acknowledgement returned by every create/update/delete call.
///
/// Carries only the id; callers that need the entity fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationAck {
    pub id: String,
}

impl MutationAck {
    /// Validates a raw host value as an ack.
    ///
    /// # Errors
    /// Returns [`IpcError::MalformedResponse`] unless `value` is an object
    /// with exactly one key `id` holding a string.
    pub fn ensure(value: &Value) -> IpcResult<Self> {
        if let Value::Object(fields) = value {
            if fields.len() == 1 {
                if let Some(Value::String(id)) = fields.get("id") {
                    return Ok(Self { id: id.clone() });
                }
            }
        }
        Err(IpcError::MalformedResponse(format!(
            "expected mutation ack `{{\"id\": string}}`, got `{value}`"
        )))
    }
}

impl From<String> for MutationAck {
    fn from(id: String) -> Self {
        Self { id }
    }
}
