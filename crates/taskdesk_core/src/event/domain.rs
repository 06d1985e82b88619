use crate::ipc::{freeze, Frozen};
use crate::model::{EntityKind, MutationAck};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Hub carrying host model mutation events.
pub const MODEL_HUB: &str = "Model";
/// Hub carrying router notifications.
pub const ROUTE_HUB: &str = "Route";
/// Topic published by the router after every state update.
pub const ROUTE_CHANGE_TOPIC: &str = "change";

/// Event as pushed by the host, outside of any request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEvent {
    pub hub: String,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl HubEvent {
    /// Builds the model event the host emits after a mutation.
    pub fn model(action: ModelAction, entity: EntityKind, id: impl Into<String>) -> Self {
        Self {
            hub: MODEL_HUB.to_string(),
            topic: action.as_str().to_string(),
            label: Some(entity.as_str().to_string()),
            data: serde_json::json!({ "id": id.into() }),
        }
    }
}

/// Mutation kind, carried as the model event topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelAction {
    Create,
    Update,
    Delete,
}

impl ModelAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Validated model mutation notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelEvent {
    pub action: ModelAction,
    pub entity: EntityKind,
    pub ack: MutationAck,
}

impl ModelEvent {
    pub fn id(&self) -> &str {
        &self.ack.id
    }
}

/// Typed event travelling on the in-process bus.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    Model(ModelEvent),
    RouteChange,
    /// Event of a hub the core does not type; kept verbatim.
    Other {
        hub: String,
        topic: String,
        label: Option<String>,
        data: Frozen,
    },
}

impl DomainEvent {
    pub fn hub(&self) -> &str {
        match self {
            Self::Model(_) => MODEL_HUB,
            Self::RouteChange => ROUTE_HUB,
            Self::Other { hub, .. } => hub,
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            Self::Model(event) => event.action.as_str(),
            Self::RouteChange => ROUTE_CHANGE_TOPIC,
            Self::Other { topic, .. } => topic,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Model(event) => Some(event.entity.as_str()),
            Self::RouteChange => None,
            Self::Other { label, .. } => label.as_deref(),
        }
    }

    /// Types one host event.
    ///
    /// # Errors
    /// Rejects `Model` hub events whose topic, label or payload does not
    /// follow the model event contract. Other hubs always succeed.
    pub fn from_hub_event(event: HubEvent) -> Result<Self, EventError> {
        let HubEvent {
            hub,
            topic,
            label,
            data,
        } = event;

        if hub == MODEL_HUB {
            let action =
                ModelAction::parse(&topic).ok_or(EventError::UnknownModelTopic(topic))?;
            let entity = label
                .as_deref()
                .and_then(EntityKind::parse)
                .ok_or(EventError::UnknownEntityLabel(label))?;
            let ack = MutationAck::ensure(&data)
                .map_err(|err| EventError::InvalidPayload(err.to_string()))?;
            return Ok(Self::Model(ModelEvent {
                action,
                entity,
                ack,
            }));
        }

        if hub == ROUTE_HUB && topic == ROUTE_CHANGE_TOPIC {
            return Ok(Self::RouteChange);
        }

        Ok(Self::Other {
            hub,
            topic,
            label,
            data: freeze(data),
        })
    }
}

/// Reasons a pushed host event is dropped at the bus boundary.
#[derive(Debug)]
pub enum EventError {
    InvalidJson(serde_json::Error),
    UnknownModelTopic(String),
    UnknownEntityLabel(Option<String>),
    InvalidPayload(String),
}

impl Display for EventError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(err) => write!(f, "hub event is not valid json: {err}"),
            Self::UnknownModelTopic(topic) => write!(f, "unknown model event topic `{topic}`"),
            Self::UnknownEntityLabel(Some(label)) => {
                write!(f, "unknown model event label `{label}`")
            }
            Self::UnknownEntityLabel(None) => write!(f, "model event without label"),
            Self::InvalidPayload(details) => write!(f, "invalid model event payload: {details}"),
        }
    }
}

impl Error for EventError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidJson(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EventError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidJson(value)
    }
}
