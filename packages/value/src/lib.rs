//! Host-side data types for arscene.
//!
//! This crate is engine-agnostic. It holds the two shapes that leave a running
//! program and travel to clients:
//! - `Value`: the typed mirror of a dynamic script value (an instance's state)
//! - `Object`: one node of the rendered scene tree
//!
//! Conversion to and from the scripting engine lives in `arscene-runtime`;
//! everything here can be serialized with any serde format.
//!
//! # Example
//!
//! ```rust
//! use arscene_value::{Key, Value};
//!
//! let mut state = Value::table();
//! state
//!     .set_path(&[Key::from("board"), Key::from(1.0)], Value::from("x"))
//!     .unwrap();
//!
//! let board = state.get(&Key::from("board")).unwrap();
//! assert_eq!(board.get(&Key::from(1.0)), Some(&Value::from("x")));
//! ```

mod error;
pub mod math;
mod object;
mod value;

pub use error::{Error, Result};
pub use math::{Quat, Vec3};
pub use object::{Object, ObjectType, DEFAULT_TEXT_SIZE};
pub use value::{Entry, Key, Value};
