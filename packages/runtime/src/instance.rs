//! Program instances - one Lua state plus one persistent state table.
//!
//! An instance has two locks. The Lua state is only touched by whoever is
//! running a hook (the simulation tick, or an init call). The small shared
//! cell holding the state table and the pending tap is also reachable from
//! connection tasks, so delivering a tap never waits on a running hook.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arscene_value::{Object, Value};
use mlua::{Lua, Value as LuaValue, Variadic};
use tracing::{debug, info};

use crate::bridge;
use crate::error::{Result, RuntimeError};
use crate::program::Program;
use crate::scene;

/// Global the host primitives are installed under.
pub const HOST_TABLE: &str = "ar";

/// Optional global function run once on creation.
pub const INIT_HOOK: &str = "ARInit";

/// Optional global function run every simulation tick.
pub const RENDER_HOOK: &str = "ARRenderScene";

/// Where an instance is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Sources are loaded; init has not run.
    Created,
    /// Init ran (or state was installed directly).
    Initialized,
    /// At least one scene has been rendered.
    Running,
}

/// State shared between the Lua primitives and the host.
#[derive(Debug)]
struct Shared {
    data: Value,
    tapped: Option<String>,
}

/// A running copy of a program.
pub struct Instance {
    program: Arc<Program>,
    lua: Mutex<Lua>,
    shared: Arc<Mutex<Shared>>,
    lifecycle: Mutex<Lifecycle>,
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("program", &self.program.name)
            .field("lifecycle", &self.lifecycle())
            .finish_non_exhaustive()
    }
}

impl Instance {
    /// Load `program` into a fresh Lua state.
    ///
    /// The `ar` primitives and a `print` routed to tracing are installed
    /// first, then each library in order, then the program itself.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Load` naming the library or program whose
    /// source failed to parse or run.
    pub fn instantiate(program: Arc<Program>, libraries: &[Arc<Program>]) -> Result<Self> {
        let lua = Lua::new();
        let shared = Arc::new(Mutex::new(Shared {
            data: Value::table(),
            tapped: None,
        }));

        install_host_table(&lua, &shared).map_err(|source| RuntimeError::Load {
            program: program.name.clone(),
            source,
        })?;
        install_print(&lua, &program.name).map_err(|source| RuntimeError::Load {
            program: program.name.clone(),
            source,
        })?;

        for script in libraries.iter().chain(std::iter::once(&program)) {
            lua.load(script.source.as_str())
                .set_name(script.name.as_str())
                .exec()
                .map_err(|source| RuntimeError::Load {
                    program: script.name.clone(),
                    source,
                })?;
        }

        debug!(program = %program.name, "loaded program");
        Ok(Self {
            program,
            lua: Mutex::new(lua),
            shared,
            lifecycle: Mutex::new(Lifecycle::Created),
        })
    }

    pub fn program_name(&self) -> &str {
        &self.program.name
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *lock(&self.lifecycle)
    }

    /// Run the init hook, if the program defines one.
    ///
    /// Init runs at most once per instance. A failing hook still uses up
    /// that one attempt; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Init` if the hook raises, or if `ARInit` is
    /// defined but is not a function.
    pub fn init(&self) -> Result<()> {
        let mut lifecycle = lock(&self.lifecycle);
        if *lifecycle != Lifecycle::Created {
            debug!(program = %self.program.name, "init already ran, skipping");
            return Ok(());
        }
        *lifecycle = Lifecycle::Initialized;

        let lua = lock(&self.lua);
        let init_error = |source| RuntimeError::Init {
            program: self.program.name.clone(),
            instance: None,
            source,
        };
        let hook = lua.globals().get::<LuaValue>(INIT_HOOK).map_err(init_error)?;
        match hook {
            LuaValue::Nil => Ok(()),
            LuaValue::Function(hook) => hook.call::<()>(()).map_err(init_error),
            other => Err(init_error(not_a_function(INIT_HOOK, &other))),
        }
    }

    /// Run the render hook and build the scene it describes.
    ///
    /// A program without a render hook, or whose hook returns `nil` or an
    /// unusable root, renders as an empty anchor.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Render` if the hook raises or is not a function.
    pub fn render_scene(&self) -> Result<Object> {
        let scene = {
            let lua = lock(&self.lua);
            let render_error = |source| RuntimeError::Render {
                program: self.program.name.clone(),
                source,
            };
            let hook = lua.globals().get::<LuaValue>(RENDER_HOOK).map_err(render_error)?;
            match hook {
                LuaValue::Nil => Object::anchor(),
                LuaValue::Function(hook) => {
                    let root = hook.call::<LuaValue>(()).map_err(render_error)?;
                    if root.is_nil() {
                        Object::anchor()
                    } else {
                        scene::render_object(&root).unwrap_or_else(Object::anchor)
                    }
                }
                other => return Err(render_error(not_a_function(RENDER_HOOK, &other))),
            }
        };

        *lock(&self.lifecycle) = Lifecycle::Running;
        Ok(scene)
    }

    /// Record `entity_id` as the pending input, replacing any unread one.
    pub fn tap(&self, entity_id: impl Into<String>) {
        let entity_id = entity_id.into();
        debug!(program = %self.program.name, entity = %entity_id, "tap");
        lock(&self.shared).tapped = Some(entity_id);
    }

    /// The pending tapped entity, if any.
    pub fn tapped(&self) -> Option<String> {
        lock(&self.shared).tapped.clone()
    }

    /// A copy of the instance's state table.
    pub fn state(&self) -> Value {
        lock(&self.shared).data.clone()
    }

    /// Replace the state table wholesale, skipping init.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::InvalidState` unless `state` is a table, and
    /// `RuntimeError::Value` if any nested table has a NaN key.
    pub fn install_state(&self, state: Value) -> Result<()> {
        if !state.is_table() {
            return Err(RuntimeError::InvalidState(state.kind_name()));
        }
        state.check_keys()?;
        lock(&self.shared).data = state;

        let mut lifecycle = lock(&self.lifecycle);
        if *lifecycle == Lifecycle::Created {
            *lifecycle = Lifecycle::Initialized;
        }
        info!(program = %self.program.name, "installed instance state");
        Ok(())
    }
}

fn install_host_table(lua: &Lua, shared: &Arc<Mutex<Shared>>) -> mlua::Result<()> {
    let ar = lua.create_table()?;

    let cell = Arc::clone(shared);
    ar.set(
        "getdata",
        lua.create_function(move |lua, ()| {
            let data = lock(&cell).data.clone();
            bridge::to_engine(lua, &data)
        })?,
    )?;

    // ar.setdata(key1, ..., keyN, value)
    let cell = Arc::clone(shared);
    ar.set(
        "setdata",
        lua.create_function(move |_, args: Variadic<LuaValue>| {
            let Some((value, path)) = args.split_last() else {
                return Err(mlua::Error::RuntimeError(
                    "ar.setdata expects one or more keys followed by a value".to_string(),
                ));
            };
            let keys = path
                .iter()
                .map(bridge::to_key)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(mlua::Error::external)?;
            let value = bridge::to_host(value).map_err(mlua::Error::external)?;
            lock(&cell)
                .data
                .set_path(&keys, value)
                .map_err(mlua::Error::external)
        })?,
    )?;

    let cell = Arc::clone(shared);
    ar.set(
        "gettapped",
        lua.create_function(move |_, ()| Ok(lock(&cell).tapped.clone()))?,
    )?;

    let cell = Arc::clone(shared);
    ar.set(
        "cleartap",
        lua.create_function(move |_, ()| {
            lock(&cell).tapped = None;
            Ok(())
        })?,
    )?;

    lua.globals().set(HOST_TABLE, ar)
}

fn install_print(lua: &Lua, program: &str) -> mlua::Result<()> {
    let program = program.to_string();
    let print = lua.create_function(move |_, args: Variadic<LuaValue>| {
        let line = args
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join("\t");
        info!(target: "arscene::script", program = %program, "{}", line);
        Ok(())
    })?;
    lua.globals().set("print", print)
}

fn display_value(value: &LuaValue) -> String {
    match value {
        LuaValue::Nil => "nil".to_string(),
        LuaValue::Boolean(b) => b.to_string(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => n.to_string(),
        LuaValue::String(s) => String::from_utf8_lossy(&s.as_bytes()).into_owned(),
        other => other.type_name().to_string(),
    }
}

fn not_a_function(hook: &str, value: &LuaValue) -> mlua::Error {
    mlua::Error::RuntimeError(format!(
        "{} is a {}, not a function",
        hook,
        value.type_name()
    ))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arscene_value::{Key, ObjectType};

    fn instance(source: &str) -> Instance {
        Instance::instantiate(Arc::new(Program::new("test", source)), &[]).unwrap()
    }

    const COUNTER: &str = r#"
        function ARInit()
            ar.setdata("count", 0)
        end

        function ARRenderScene()
            local data = ar.getdata()
            if ar.gettapped() == "button" then
                ar.setdata("count", data.count + 1)
                ar.cleartap()
            end
            return {
                type = "anchor",
                { type = "triggerbox", id = "button" },
                { type = "text", id = "label", text = tostring(ar.getdata().count) },
            }
        end
    "#;

    #[test]
    fn lifecycle_created_initialized_running() {
        let inst = instance(COUNTER);
        assert_eq!(inst.lifecycle(), Lifecycle::Created);

        inst.init().unwrap();
        assert_eq!(inst.lifecycle(), Lifecycle::Initialized);
        assert_eq!(inst.state().get(&Key::from("count")), Some(&Value::Number(0.0)));

        inst.render_scene().unwrap();
        assert_eq!(inst.lifecycle(), Lifecycle::Running);
    }

    #[test]
    fn tap_is_consumed_by_script() {
        let inst = instance(COUNTER);
        inst.init().unwrap();

        inst.tap("button");
        let scene = inst.render_scene().unwrap();
        assert_eq!(scene.find("label").unwrap().text, "1");
        assert_eq!(inst.tapped(), None);

        let scene = inst.render_scene().unwrap();
        assert_eq!(scene.find("label").unwrap().text, "1");
    }

    #[test]
    fn tap_overwrites_pending_input() {
        let inst = instance("");
        inst.tap("a");
        inst.tap("b");
        assert_eq!(inst.tapped().as_deref(), Some("b"));
    }

    #[test]
    fn missing_hooks_are_not_errors() {
        let inst = instance("x = 1");
        inst.init().unwrap();
        let scene = inst.render_scene().unwrap();
        assert_eq!(scene, Object::anchor());
    }

    #[test]
    fn init_runs_once() {
        let inst = instance(
            r#"
            function ARInit()
                local n = (ar.getdata().runs or 0) + 1
                ar.setdata("runs", n)
            end
        "#,
        );
        inst.init().unwrap();
        inst.init().unwrap();
        assert_eq!(inst.state().get(&Key::from("runs")), Some(&Value::Number(1.0)));
    }

    #[test]
    fn init_error_propagates() {
        let inst = instance(r#"function ARInit() error("no board") end"#);
        let err = inst.init().unwrap_err();
        assert!(matches!(err, RuntimeError::Init { .. }));
        assert!(err.to_string().contains("no board"));
    }

    #[test]
    fn render_error_propagates() {
        let inst = instance(r#"function ARRenderScene() error("kaboom") end"#);
        assert!(matches!(
            inst.render_scene(),
            Err(RuntimeError::Render { .. })
        ));
        assert_eq!(inst.lifecycle(), Lifecycle::Created);
    }

    #[test]
    fn render_hook_must_be_function() {
        let inst = instance("ARRenderScene = 3");
        assert!(matches!(
            inst.render_scene(),
            Err(RuntimeError::Render { .. })
        ));
    }

    #[test]
    fn unknown_root_type_renders_empty_anchor() {
        let inst = instance(r#"function ARRenderScene() return { type = "bogus" } end"#);
        assert_eq!(inst.render_scene().unwrap(), Object::anchor());
    }

    #[test]
    fn syntax_error_is_load_error() {
        let err = Instance::instantiate(Arc::new(Program::new("broken", "function (")), &[])
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Load { ref program, .. } if program == "broken"));
    }

    #[test]
    fn libraries_load_before_program() {
        let lib = Arc::new(Program::new(
            "vectors",
            "function vadd(a, b) return { a[1] + b[1], a[2] + b[2], a[3] + b[3] } end",
        ));
        let program = Arc::new(Program::new(
            "uses-lib",
            r#"
            local p = vadd({1, 0, 0}, {0, 2, 0})
            function ARRenderScene() return { type = "box", pos = p } end
        "#,
        ));
        let inst = Instance::instantiate(program, &[lib]).unwrap();
        let scene = inst.render_scene().unwrap();
        assert_eq!(scene.kind, ObjectType::Box);
        assert_eq!(scene.pos, arscene_value::Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn broken_library_is_load_error_naming_library() {
        let lib = Arc::new(Program::new("pprint", "error('missing dep')"));
        let err = Instance::instantiate(Arc::new(Program::new("p", "")), &[lib]).unwrap_err();
        assert!(matches!(err, RuntimeError::Load { ref program, .. } if program == "pprint"));
    }

    #[test]
    fn setdata_bad_key_is_script_error() {
        let inst = instance(
            r#"
            function ARInit()
                ar.setdata(true, 1)
            end
        "#,
        );
        let err = inst.init().unwrap_err();
        assert!(err.to_string().contains("bad key"));
        assert_eq!(inst.state(), Value::table());
    }

    #[test]
    fn setdata_through_scalar_is_script_error() {
        let inst = instance(
            r#"
            function ARInit()
                ar.setdata("score", 3)
                local ok = pcall(ar.setdata, "score", "inner", 1)
                ar.setdata("ok", ok)
            end
        "#,
        );
        inst.init().unwrap();
        let state = inst.state();
        assert_eq!(state.get(&Key::from("score")), Some(&Value::Number(3.0)));
        assert_eq!(state.get(&Key::from("ok")), Some(&Value::Bool(false)));
    }

    #[test]
    fn setdata_builds_nested_state() {
        let inst = instance(
            r#"
            function ARInit()
                ar.setdata("board", 1, "x")
                ar.setdata("board", 2, "o")
            end
        "#,
        );
        inst.init().unwrap();
        let board = inst.state().get(&Key::from("board")).cloned().unwrap();
        assert_eq!(board, Value::sequence([Value::from("x"), Value::from("o")]));
    }

    #[test]
    fn install_state_skips_init_and_requires_table() {
        let inst = instance(COUNTER);
        assert!(matches!(
            inst.install_state(Value::Number(1.0)),
            Err(RuntimeError::InvalidState("number"))
        ));

        let state = Value::from_entries([arscene_value::Entry::new("count", 41.0)]);
        inst.install_state(state.clone()).unwrap();
        assert_eq!(inst.lifecycle(), Lifecycle::Initialized);
        assert_eq!(inst.state(), state);

        inst.tap("button");
        let scene = inst.render_scene().unwrap();
        assert_eq!(scene.find("label").unwrap().text, "42");
    }

    #[test]
    fn install_state_rejects_nan_keys() {
        let inst = instance(COUNTER);
        inst.init().unwrap();
        let before = inst.state();

        let poisoned = Value::from_entries([
            arscene_value::Entry::new("count", 3.0),
            arscene_value::Entry::new(
                "cells",
                Value::from_entries([arscene_value::Entry::new(f64::NAN, "x")]),
            ),
        ]);
        assert!(matches!(
            inst.install_state(poisoned),
            Err(RuntimeError::Value(arscene_value::Error::BadKey { .. }))
        ));
        assert_eq!(inst.state(), before);

        inst.tap("button");
        let scene = inst.render_scene().unwrap();
        assert_eq!(scene.find("label").unwrap().text, "1");
    }
}
