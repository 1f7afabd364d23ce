//! Messages exchanged with AR clients.
//!
//! Every message travels as one binary frame encoded with the server's
//! [`WireFormat`](crate::codec::WireFormat).

use arscene_runtime::{InstanceId, Tag};
use arscene_value::Object;
use serde::{Deserialize, Serialize};

/// Tag value in an [`InstantiateRequest`] meaning "do not bind".
pub const NO_TAG: Tag = -1;

/// Client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// The user tapped an entity of an instance's scene.
    Tap {
        instance: InstanceId,
        entity_id: String,
    },
    /// The user is pointing at an entity. Logged only.
    Hover {
        instance: InstanceId,
        entity_id: String,
    },
    /// Start a new instance of a program.
    Instantiate(InstantiateRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantiateRequest {
    pub program: String,
    /// Encoded state table. Empty means "run the init hook instead".
    pub data: Vec<u8>,
    /// Tag to bind the new instance to, or [`NO_TAG`].
    pub tag: Tag,
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Every instance the server knows about.
    Instances(Vec<InstanceUpdate>),
    /// The latest scene of one tag-bound instance.
    Scene(SceneUpdate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceUpdate {
    pub instance: InstanceId,
    pub program: String,
    /// Encoded state table.
    pub data: Vec<u8>,
    /// Smallest tag bound to this instance, if any.
    pub tag: Option<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneUpdate {
    pub instance: InstanceId,
    pub object: Object,
}
