//! Conversion between Lua values and host `Value`s.
//!
//! `to_host` is fallible: functions, userdata, threads and tables keyed by
//! anything but strings and numbers have no `Value` form. `to_engine` only
//! fails if Lua itself cannot allocate.

use arscene_value::{Entry, Error, Key, Value};
use mlua::{Lua, Value as LuaValue};

/// Deepest table nesting `to_host` will follow. Guards against cycles.
pub const MAX_DEPTH: usize = 64;

/// Convert a Lua value into a host `Value`.
///
/// Table entries keep the order in which Lua iterates them.
///
/// # Errors
///
/// Returns `Error::Conversion` for values or keys with no host form, for
/// strings that are not UTF-8, and for tables nested deeper than
/// [`MAX_DEPTH`].
pub fn to_host(value: &LuaValue) -> Result<Value, Error> {
    to_host_at(value, 0)
}

fn to_host_at(value: &LuaValue, depth: usize) -> Result<Value, Error> {
    match value {
        LuaValue::Nil => Ok(Value::Nil),
        LuaValue::Boolean(b) => Ok(Value::Bool(*b)),
        LuaValue::Integer(i) => Ok(Value::Number(*i as f64)),
        LuaValue::Number(n) => Ok(Value::Number(*n)),
        LuaValue::String(s) => Ok(Value::String(utf8(s)?)),
        LuaValue::Table(table) => {
            if depth >= MAX_DEPTH {
                return Err(Error::conversion(format!(
                    "table nesting deeper than {} (cyclic table?)",
                    MAX_DEPTH
                )));
            }
            let mut entries = Vec::new();
            for pair in table.pairs::<LuaValue, LuaValue>() {
                let (key, value) = pair.map_err(|e| Error::conversion(e.to_string()))?;
                let key = lua_key(&key).ok_or_else(|| {
                    Error::conversion(format!("unsupported table key of type {}", key.type_name()))
                })??;
                entries.push(Entry {
                    key,
                    value: to_host_at(&value, depth + 1)?,
                });
            }
            Ok(Value::Table(entries))
        }
        other => Err(Error::conversion(format!(
            "cannot convert value of type {}",
            other.type_name()
        ))),
    }
}

/// Convert a Lua value used as a path segment into a `Key`.
///
/// # Errors
///
/// Returns `Error::BadKey` unless the value is a string or a number.
pub fn to_key(value: &LuaValue) -> Result<Key, Error> {
    match lua_key(value) {
        Some(Ok(key)) => Ok(key),
        Some(Err(e)) => Err(Error::bad_key(e.to_string())),
        None => Err(Error::bad_key(format!(
            "bad key / index type: {}",
            value.type_name()
        ))),
    }
}

/// `None` when the value is not a key kind at all.
fn lua_key(value: &LuaValue) -> Option<Result<Key, Error>> {
    match value {
        LuaValue::String(s) => Some(utf8(s).map(Key::String)),
        LuaValue::Integer(i) => Some(Ok(Key::Number(*i as f64))),
        LuaValue::Number(n) => Some(Ok(Key::Number(*n))),
        _ => None,
    }
}

fn utf8(s: &mlua::String) -> Result<String, Error> {
    let bytes = s.as_bytes();
    std::str::from_utf8(&bytes)
        .map(str::to_owned)
        .map_err(|e| Error::conversion(format!("string is not valid UTF-8: {}", e)))
}

/// Convert a host `Value` into a fresh Lua value.
///
/// Table entries are inserted in order. `Nil`-valued entries vanish, as
/// they would in Lua, and so do NaN-keyed ones, which Lua cannot store.
/// Integral numbers become Lua integers.
pub fn to_engine(lua: &Lua, value: &Value) -> mlua::Result<LuaValue> {
    Ok(match value {
        Value::Nil => LuaValue::Nil,
        Value::Bool(b) => LuaValue::Boolean(*b),
        Value::Number(n) => engine_number(*n),
        Value::String(s) => LuaValue::String(lua.create_string(s)?),
        Value::Table(entries) => {
            let table = lua.create_table_with_capacity(sequence_len(entries), 0)?;
            for entry in entries {
                let key = match &entry.key {
                    Key::String(s) => LuaValue::String(lua.create_string(s)?),
                    Key::Number(n) if n.is_nan() => continue,
                    Key::Number(n) => engine_number(*n),
                };
                table.raw_set(key, to_engine(lua, &entry.value)?)?;
            }
            LuaValue::Table(table)
        }
    })
}

/// Integral numbers go in as Lua integers, so `t[1]` finds them and
/// `tostring` prints `1` rather than `1.0`.
fn engine_number(n: f64) -> LuaValue {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        LuaValue::Integer(n as i64)
    } else {
        LuaValue::Number(n)
    }
}

/// Length of the `1..n` prefix, used to presize the array part.
fn sequence_len(entries: &[Entry]) -> usize {
    entries
        .iter()
        .enumerate()
        .take_while(|(i, entry)| entry.key == Key::Number((i + 1) as f64))
        .count()
}
