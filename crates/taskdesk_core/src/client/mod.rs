//! Per-entity CRUD clients over the IPC bridge.
//!
//! # Responsibility
//! - Map entity operations to host command names (`get_<entity>`, ...).
//! - Validate mutation acknowledgements at the boundary.
//!
//! # Invariants
//! - Client calls never touch the document; rendering is driven by model
//!   events only.
//! - `list` filters never transmit `""` values.

mod filter;
mod project;
mod task;

pub use filter::{prune_empty, ListFilter};
pub use project::ProjectClient;
pub use task::TaskClient;

use crate::ipc::{IpcBridge, IpcResult};
use crate::model::{Entity, MutationAck};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// Generic entity client; `list` lives on the concrete instantiations.
pub struct EntityClient<M: Entity> {
    bridge: IpcBridge,
    _model: PhantomData<fn() -> M>,
}

impl<M: Entity> Clone for EntityClient<M> {
    fn clone(&self) -> Self {
        Self::new(self.bridge.clone())
    }
}

impl<M: Entity> EntityClient<M> {
    pub fn new(bridge: IpcBridge) -> Self {
        Self {
            bridge,
            _model: PhantomData,
        }
    }

    /// Host command suffix, e.g. `task`.
    pub fn cmd_suffix(&self) -> &'static str {
        M::KIND.as_str()
    }

    pub async fn get(&self, id: &str) -> IpcResult<M> {
        let params = params([("id", Value::from(id))]);
        let result = self.bridge.invoke(&self.command("get"), params).await?;
        decode_data(&result)
    }

    pub async fn create(&self, data: &M::ForCreate) -> IpcResult<MutationAck> {
        let params = params([("data", to_param(data)?)]);
        let result = self.bridge.invoke(&self.command("create"), params).await?;
        MutationAck::ensure(&result["data"])
    }

    /// Partial update: only fields present in `data` change on the host.
    pub async fn update(&self, id: &str, data: &M::ForUpdate) -> IpcResult<MutationAck> {
        let params = params([("id", Value::from(id)), ("data", to_param(data)?)]);
        let result = self.bridge.invoke(&self.command("update"), params).await?;
        MutationAck::ensure(&result["data"])
    }

    pub async fn delete(&self, id: &str) -> IpcResult<MutationAck> {
        let params = params([("id", Value::from(id))]);
        let result = self.bridge.invoke(&self.command("delete"), params).await?;
        MutationAck::ensure(&result["data"])
    }

    async fn list_with(&self, params: Value) -> IpcResult<Vec<M>> {
        let method = format!("list_{}s", self.cmd_suffix());
        let result = self.bridge.invoke(&method, params).await?;
        decode_data(&result)
    }

    fn command(&self, operation: &str) -> String {
        format!("{operation}_{}", self.cmd_suffix())
    }
}

fn params<const N: usize>(fields: [(&str, Value); N]) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect::<Map<_, _>>(),
    )
}

fn to_param<T: Serialize>(data: &T) -> IpcResult<Value> {
    Ok(serde_json::to_value(data)?)
}

fn decode_data<T: DeserializeOwned>(result: &Value) -> IpcResult<T> {
    Ok(T::deserialize(&result["data"])?)
}
