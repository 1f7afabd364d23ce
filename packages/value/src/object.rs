//! Scene objects - the tree a program's render hook produces each tick.

use serde::{Deserialize, Serialize};

use crate::math::{Quat, Vec3};

/// Text size used when a program leaves `textsize` unset or zero.
pub const DEFAULT_TEXT_SIZE: f64 = 0.05;

/// The primitive a scene node draws.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// Invisible grouping node.
    #[default]
    Anchor,
    Box,
    Sphere,
    Cylinder,
    Cone,
    Text,
    /// Invisible box that reports taps.
    TriggerBox,
}

impl ObjectType {
    /// Parse the `type` field a script writes. The empty string is an anchor.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "" | "anchor" => Some(ObjectType::Anchor),
            "box" => Some(ObjectType::Box),
            "sphere" => Some(ObjectType::Sphere),
            "cylinder" => Some(ObjectType::Cylinder),
            "cone" => Some(ObjectType::Cone),
            "text" => Some(ObjectType::Text),
            "triggerbox" => Some(ObjectType::TriggerBox),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ObjectType::Anchor => "anchor",
            ObjectType::Box => "box",
            ObjectType::Sphere => "sphere",
            ObjectType::Cylinder => "cylinder",
            ObjectType::Cone => "cone",
            ObjectType::Text => "text",
            ObjectType::TriggerBox => "triggerbox",
        }
    }
}

/// One node of a rendered scene. Children are owned; the scene is a tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(rename = "type")]
    pub kind: ObjectType,
    pub id: String,
    pub pos: Vec3,
    pub rot: Quat,
    pub size: Vec3,
    pub color: String,

    // Only meaningful for `ObjectType::Text`.
    pub text: String,
    #[serde(rename = "textsize")]
    pub text_size: f64,
    #[serde(rename = "textalign")]
    pub text_align: String,
    #[serde(rename = "textwrap")]
    pub text_wrap: bool,

    pub children: Vec<Object>,
}

impl Default for Object {
    fn default() -> Self {
        Self::new(ObjectType::Anchor)
    }
}

impl Object {
    /// A node of the given type with every other field at its default.
    pub fn new(kind: ObjectType) -> Self {
        Self {
            kind,
            id: String::new(),
            pos: Vec3::ZERO,
            rot: Quat::IDENTITY,
            size: Vec3::ONE,
            color: String::new(),
            text: String::new(),
            text_size: DEFAULT_TEXT_SIZE,
            text_align: String::new(),
            text_wrap: false,
            children: Vec::new(),
        }
    }

    /// An empty anchor, the scene of a program that draws nothing.
    pub fn anchor() -> Self {
        Self::new(ObjectType::Anchor)
    }

    pub fn with_child(mut self, child: Object) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Object::node_count).sum::<usize>()
    }

    /// Depth-first search for a node by id.
    pub fn find(&self, id: &str) -> Option<&Object> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_roundtrip() {
        for kind in [
            ObjectType::Anchor,
            ObjectType::Box,
            ObjectType::Sphere,
            ObjectType::Cylinder,
            ObjectType::Cone,
            ObjectType::Text,
            ObjectType::TriggerBox,
        ] {
            assert_eq!(ObjectType::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ObjectType::from_name(""), Some(ObjectType::Anchor));
        assert_eq!(ObjectType::from_name("bogus"), None);
    }

    #[test]
    fn defaults() {
        let obj = Object::new(ObjectType::Box);
        assert_eq!(obj.size, Vec3::ONE);
        assert_eq!(obj.rot, Quat::IDENTITY);
        assert_eq!(obj.text_size, DEFAULT_TEXT_SIZE);
        assert!(obj.children.is_empty());
    }

    #[test]
    fn find_and_count() {
        let mut cell = Object::new(ObjectType::TriggerBox);
        cell.id = "cell-3".to_string();
        let scene = Object::anchor().with_child(Object::anchor().with_child(cell));

        assert_eq!(scene.node_count(), 3);
        assert_eq!(scene.find("cell-3").map(|o| o.kind), Some(ObjectType::TriggerBox));
        assert!(scene.find("missing").is_none());
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let json = serde_json::to_value(Object::new(ObjectType::TriggerBox)).unwrap();
        assert_eq!(json["type"], "triggerbox");
        assert_eq!(json["textsize"], 0.05);
        assert_eq!(json["rot"], serde_json::json!([0.0, 0.0, 0.0, 1.0]));
    }
}
