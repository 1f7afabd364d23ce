//! # arscene runtime
//!
//! Runs user programs (Lua scripts) as long-lived instances and keeps a
//! point-in-time snapshot of every instance's rendered scene.
//!
//! ## Core Concepts
//!
//! ### Programs and instances
//!
//! A **Program** is named script source that may define two hooks:
//!
//! - `ARInit()` runs once when an instance is created without prior state
//! - `ARRenderScene()` returns a table describing the scene, every tick
//!
//! An **Instance** is one running copy of a program. It owns its own Lua
//! state and one persistent `Value` table. Scripts reach the host through the
//! global `ar` table:
//!
//! ```lua
//! ar.getdata()                 -- copy of the instance state
//! ar.setdata("board", 3, "x")  -- state.board[3] = "x", creating tables
//! ar.gettapped()               -- pending tapped entity id, or nil
//! ar.cleartap()                -- consume the pending tap
//! ```
//!
//! ### Registry and snapshots
//!
//! The [`Registry`] is append-only: instance ids are indices and stay valid
//! for the life of the process. Tags (physical marker numbers) point at
//! instances and may be rebound at any time.
//!
//! Each simulation tick renders every instance into a brand new
//! [`Snapshot`] and publishes it with an atomic swap. Readers hold an
//! `Arc<Snapshot>` and never see a half-updated set of scenes.
//!
//! ```text
//!  ┌──────────────┐  render   ┌──────────────┐  swap   ┌───────────────┐
//!  │ Instance 0   │ ────────▶ │ new Snapshot │ ──────▶ │ Registry      │ ──▶ readers
//!  │ Instance 1   │           │ [obj, obj]   │         │  ArcSwap<..>  │
//!  └──────────────┘           └──────────────┘         └───────────────┘
//! ```

pub mod bridge;
pub mod error;
pub mod instance;
pub mod program;
pub mod registry;
pub mod scene;
pub mod simulation;
pub mod snapshot;

pub use error::{Result, RuntimeError};
pub use instance::{Instance, Lifecycle};
pub use program::{Catalog, Program};
pub use registry::{InstanceId, Registry, RuntimeConfig, Tag};
pub use simulation::TickReport;
pub use snapshot::Snapshot;

// Re-export mlua for callers that embed extra host functions
pub use mlua;
