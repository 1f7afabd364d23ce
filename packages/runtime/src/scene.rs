//! Building scene `Object` trees from the tables a render hook returns.
//!
//! Reading is lenient in the way Lua is: missing fields take defaults,
//! numbers stand in for strings and numeric strings for numbers. The one
//! hard rule is the `type` field. A node whose type is unknown is dropped
//! together with its subtree, and a warning is logged.

use arscene_value::{Object, ObjectType, Quat, Vec3, DEFAULT_TEXT_SIZE};
use mlua::{Table, Value as LuaValue};
use tracing::warn;

/// Deepest scene nesting that will be rendered.
pub const MAX_SCENE_DEPTH: usize = 64;

/// Convert one scene table into an `Object`.
///
/// Returns `None` when the node is dropped: an unrecognized `type`, a value
/// that is not a table, or nesting past [`MAX_SCENE_DEPTH`].
pub fn render_object(value: &LuaValue) -> Option<Object> {
    render_node(value, 0)
}

fn render_node(value: &LuaValue, depth: usize) -> Option<Object> {
    let LuaValue::Table(table) = value else {
        warn!(
            kind = value.type_name(),
            "dropping scene node that is not a table"
        );
        return None;
    };
    if depth >= MAX_SCENE_DEPTH {
        warn!(depth, "dropping scene node nested too deeply");
        return None;
    }

    let type_name = as_string(&field(table, "type"));
    let Some(kind) = ObjectType::from_name(&type_name) else {
        warn!(object_type = %type_name, "dropping scene object with unrecognized type");
        return None;
    };

    let mut object = Object::new(kind);
    object.id = as_string(&field(table, "id"));
    object.pos = as_vec3(&field(table, "pos"), Vec3::ZERO);
    object.size = as_vec3(&field(table, "size"), Vec3::ONE);
    object.rot = as_rotation(&field(table, "rot"));
    object.color = as_string(&field(table, "color"));
    object.text = as_string(&field(table, "text"));
    object.text_align = as_string(&field(table, "textalign"));
    object.text_wrap = is_truthy(&field(table, "textwrap"));
    let text_size = as_number(&field(table, "textsize"));
    if text_size != 0.0 {
        object.text_size = text_size;
    }

    // Raw reads: an `__index` metamethod must not invent children.
    for index in 1..=table.raw_len() {
        let child = table.raw_get::<LuaValue>(index).unwrap_or(LuaValue::Nil);
        if child.is_nil() {
            break;
        }
        if let Some(child) = render_node(&child, depth + 1) {
            object.children.push(child);
        }
    }

    Some(object)
}

/// Rotation from `{axis, angle}`, `{from, to}`, or identity.
fn as_rotation(value: &LuaValue) -> Quat {
    let LuaValue::Table(rot) = value else {
        return Quat::IDENTITY;
    };

    let axis = field(rot, "axis");
    if !axis.is_nil() {
        let axis = as_vec3(&axis, Vec3::X);
        let angle = as_number(&field(rot, "angle"));
        return Quat::from_axis_angle(axis, angle);
    }

    let from = field(rot, "from");
    if !from.is_nil() {
        let from = as_vec3(&from, Vec3::X);
        let to = as_vec3(&field(rot, "to"), Vec3::X);
        return Quat::from_to(from, to);
    }

    Quat::IDENTITY
}

// A field whose metamethod raises reads as nil.
fn field(table: &Table, name: &str) -> LuaValue {
    table.get::<LuaValue>(name).unwrap_or(LuaValue::Nil)
}

fn index_field(table: &Table, index: i64) -> LuaValue {
    table.get::<LuaValue>(index).unwrap_or(LuaValue::Nil)
}

/// `n` expands to `(n, n, n)`; `{x, y, z}` reads the first three slots.
fn as_vec3(value: &LuaValue, default: Vec3) -> Vec3 {
    match value {
        LuaValue::Integer(i) => Vec3::splat(*i as f64),
        LuaValue::Number(n) => Vec3::splat(*n),
        LuaValue::Table(t) => Vec3::new(
            as_number(&index_field(t, 1)),
            as_number(&index_field(t, 2)),
            as_number(&index_field(t, 3)),
        ),
        _ => default,
    }
}

fn as_string(value: &LuaValue) -> String {
    match value {
        LuaValue::String(s) => String::from_utf8_lossy(&s.as_bytes()).into_owned(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => format_number(*n),
        _ => String::new(),
    }
}

fn as_number(value: &LuaValue) -> f64 {
    match value {
        LuaValue::Integer(i) => *i as f64,
        LuaValue::Number(n) => *n,
        LuaValue::String(s) => std::str::from_utf8(&s.as_bytes())
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

fn is_truthy(value: &LuaValue) -> bool {
    !matches!(value, LuaValue::Nil | LuaValue::Boolean(false))
}

/// Floats print the way Lua's `tostring` prints them.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{:.1}", n)
    } else if n.is_nan() {
        "nan".to_string()
    } else {
        n.to_string()
    }
}
