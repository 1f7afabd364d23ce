//! The Value type - a typed mirror of a dynamic script value.
//!
//! Tables are ordered entry lists rather than maps. The engine's own
//! iteration order is captured when a table crosses into the host and is
//! replayed when it crosses back, so a state round-trip is byte-for-byte
//! stable on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A table key. Scripts may only key tables by strings or numbers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Key {
    String(String),
    Number(f64),
}

impl Key {
    /// Name of the key kind, as a script author would call it.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Key::String(_) => "string",
            Key::Number(_) => "number",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::String(s) => write!(f, "{:?}", s),
            Key::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Key {
    fn from(k: &str) -> Self {
        Key::String(k.to_string())
    }
}

impl From<String> for Key {
    fn from(k: String) -> Self {
        Key::String(k)
    }
}

impl From<f64> for Key {
    fn from(k: f64) -> Self {
        Key::Number(k)
    }
}

impl From<i64> for Key {
    fn from(k: i64) -> Self {
        Key::Number(k as f64)
    }
}

/// One key/value pair of a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub key: Key,
    pub value: Value,
}

impl Entry {
    pub fn new(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A script value that has been pulled out of the engine.
///
/// # Design Notes
///
/// - `Table` keeps insertion order; lookups are a linear scan, first match wins
/// - Duplicate keys are representable and are not collapsed
/// - Numbers are always `f64`, matching the engine's number model on the wire
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Nil,
    Table(Vec<Entry>),
    Bool(bool),
    Number(f64),
    String(String),
}

impl Value {
    /// Create an empty table.
    pub fn table() -> Self {
        Value::Table(Vec::new())
    }

    /// Create a table from entries, keeping their order.
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        Value::Table(entries.into_iter().collect())
    }

    /// Create a table whose keys are `1..=n`, like a script array literal.
    pub fn sequence(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Table(
            items
                .into_iter()
                .enumerate()
                .map(|(i, value)| Entry {
                    key: Key::Number((i + 1) as f64),
                    value,
                })
                .collect(),
        )
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Value::Table(_))
    }

    /// Name of the value kind, as a script author would call it.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Table(_) => "table",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    /// Table entries in order, or `None` for non-tables.
    pub fn entries(&self) -> Option<&[Entry]> {
        match self {
            Value::Table(entries) => Some(entries),
            _ => None,
        }
    }

    /// Fail if any table at any depth holds a NaN key.
    ///
    /// A Lua table cannot be indexed by NaN, so such a value can never be
    /// handed to a script.
    pub fn check_keys(&self) -> Result<()> {
        let Value::Table(entries) = self else {
            return Ok(());
        };
        for entry in entries {
            if matches!(entry.key, Key::Number(n) if n.is_nan()) {
                return Err(Error::bad_key("table holds a NaN key"));
            }
            entry.value.check_keys()?;
        }
        Ok(())
    }

    /// Look up a key in a table. The first entry with an equal key wins.
    ///
    /// Returns `None` for missing keys and for non-table values.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.entries()?
            .iter()
            .find(|entry| &entry.key == key)
            .map(|entry| &entry.value)
    }

    /// Mutable variant of [`Value::get`].
    pub fn get_mut(&mut self, key: &Key) -> Option<&mut Value> {
        match self {
            Value::Table(entries) => entries
                .iter_mut()
                .find(|entry| &entry.key == key)
                .map(|entry| &mut entry.value),
            _ => None,
        }
    }

    /// Append an entry to a table without checking for an existing key.
    ///
    /// A `Nil` receiver becomes an empty table first.
    pub fn push(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        if self.is_nil() {
            *self = Value::table();
        }
        match self {
            Value::Table(entries) => {
                entries.push(Entry::new(key, value));
                Ok(())
            }
            other => Err(Error::bad_key(format!(
                "cannot add an entry to a {}",
                other.kind_name()
            ))),
        }
    }

    /// Write `value` at the end of `keys`, creating tables along the way.
    ///
    /// Missing segments are appended as new entries. A `Nil` node on the path
    /// is promoted to an empty table; any other non-table node is an error.
    /// On error the receiver is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::BadKey` if `keys` is empty, contains a NaN number, or
    /// walks through a boolean, number or string.
    pub fn set_path(&mut self, keys: &[Key], value: Value) -> Result<()> {
        if keys.is_empty() {
            return Err(Error::bad_key("path must contain at least one key"));
        }
        self.check_path(keys)?;

        let mut current = self;
        for key in keys {
            current = current.slot(key)?;
        }
        *current = value;
        Ok(())
    }

    /// Walk `keys` without mutating, failing where `set_path` would.
    fn check_path(&self, keys: &[Key]) -> Result<()> {
        for (depth, key) in keys.iter().enumerate() {
            if matches!(key, Key::Number(n) if n.is_nan()) {
                return Err(Error::bad_key(format!("NaN key at segment {}", depth + 1)));
            }
        }

        let mut current = self;
        for (depth, key) in keys.iter().enumerate() {
            match current {
                // Everything below here is created fresh.
                Value::Nil => return Ok(()),
                Value::Table(_) => match current.get(key) {
                    Some(next) => current = next,
                    None => return Ok(()),
                },
                other => {
                    return Err(Error::bad_key(format!(
                        "cannot index {} with key {} at segment {}",
                        other.kind_name(),
                        key,
                        depth + 1
                    )))
                }
            }
        }
        Ok(())
    }

    /// Entry for `key`, appending a `Nil` entry if it is missing.
    fn slot(&mut self, key: &Key) -> Result<&mut Value> {
        if self.is_nil() {
            *self = Value::table();
        }
        match self {
            Value::Table(entries) => {
                let index = match entries.iter().position(|entry| &entry.key == key) {
                    Some(index) => index,
                    None => {
                        entries.push(Entry {
                            key: key.clone(),
                            value: Value::Nil,
                        });
                        entries.len() - 1
                    }
                };
                Ok(&mut entries[index].value)
            }
            other => Err(Error::bad_key(format!(
                "cannot index {} with key {}",
                other.kind_name(),
                key
            ))),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(parts: &[&str]) -> Vec<Key> {
        parts.iter().map(|p| Key::from(*p)).collect()
    }

    #[test]
    fn set_path_creates_intermediate_tables() {
        let mut root = Value::table();
        root.set_path(&keys(&["a", "b"]), Value::Number(1.0)).unwrap();

        let a = root.get(&Key::from("a")).unwrap();
        assert!(a.is_table());
        assert_eq!(a.get(&Key::from("b")), Some(&Value::Number(1.0)));
    }

    #[test]
    fn set_path_overwrites_existing_leaf() {
        let mut root = Value::table();
        root.set_path(&keys(&["turn"]), Value::from("x")).unwrap();
        root.set_path(&keys(&["turn"]), Value::from("o")).unwrap();

        assert_eq!(root.entries().unwrap().len(), 1);
        assert_eq!(root.get(&Key::from("turn")), Some(&Value::from("o")));
    }

    #[test]
    fn set_path_promotes_nil_nodes() {
        let mut root = Value::from_entries([Entry::new("board", Value::Nil)]);
        root.set_path(&[Key::from("board"), Key::from(2i64)], Value::from("x"))
            .unwrap();

        let board = root.get(&Key::from("board")).unwrap();
        assert_eq!(board.get(&Key::Number(2.0)), Some(&Value::from("x")));
    }

    #[test]
    fn set_path_through_scalar_fails_and_leaves_root_alone() {
        let mut root = Value::table();
        root.set_path(&keys(&["score"]), Value::Number(3.0)).unwrap();
        let before = root.clone();

        let err = root
            .set_path(&keys(&["score", "deep", "er"]), Value::Bool(true))
            .unwrap_err();

        assert!(matches!(err, Error::BadKey { .. }));
        assert_eq!(root, before);
    }

    #[test]
    fn set_path_rejects_empty_path() {
        let mut root = Value::table();
        assert!(matches!(
            root.set_path(&[], Value::Nil),
            Err(Error::BadKey { .. })
        ));
    }

    #[test]
    fn set_path_rejects_nan_key() {
        let mut root = Value::table();
        assert!(root.set_path(&[Key::Number(f64::NAN)], Value::Nil).is_err());
        assert_eq!(root, Value::table());
    }

    #[test]
    fn check_keys_finds_nested_nan() {
        let clean = Value::from_entries([
            Entry::new("board", Value::sequence([Value::from("x")])),
            Entry::new(2.5, true),
        ]);
        assert!(clean.check_keys().is_ok());
        assert!(Value::from("scalar").check_keys().is_ok());

        let nested = Value::from_entries([Entry::new(
            "board",
            Value::from_entries([Entry::new(f64::NAN, "x")]),
        )]);
        assert!(matches!(nested.check_keys(), Err(Error::BadKey { .. })));
    }

    #[test]
    fn lookup_is_kind_sensitive() {
        let root = Value::from_entries([Entry::new("1", "string"), Entry::new(1.0, "number")]);

        assert_eq!(root.get(&Key::from("1")), Some(&Value::from("string")));
        assert_eq!(root.get(&Key::from(1.0)), Some(&Value::from("number")));
    }

    #[test]
    fn duplicate_keys_first_match_wins() {
        let mut root = Value::table();
        root.push("k", "first").unwrap();
        root.push("k", "second").unwrap();

        assert_eq!(root.entries().unwrap().len(), 2);
        assert_eq!(root.get(&Key::from("k")), Some(&Value::from("first")));
    }

    #[test]
    fn sequence_uses_one_based_keys() {
        let seq = Value::sequence([Value::from("a"), Value::from("b")]);
        let entries = seq.entries().unwrap();
        assert_eq!(entries[0].key, Key::Number(1.0));
        assert_eq!(entries[1].key, Key::Number(2.0));
    }

    #[test]
    fn push_on_scalar_fails() {
        let mut v = Value::Bool(true);
        assert!(v.push("k", 1.0).is_err());
    }

    #[test]
    fn serde_keeps_entry_order() {
        let value = Value::from_entries([
            Entry::new("z", 1.0),
            Entry::new("a", 2.0),
            Entry::new(3.0, "three"),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
        assert!(json.find("\"z\"").unwrap() < json.find("\"a\"").unwrap());
    }
}
