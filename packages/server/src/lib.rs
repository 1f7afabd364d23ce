//! # arscene server
//!
//! Serves the arscene runtime to AR clients over one websocket endpoint.
//!
//! Each connection gets a reader that applies client messages (taps,
//! hovers, instantiation requests) and a writer that, every broadcast
//! interval, sends the instance roster followed by the latest scene of
//! every tag-bound instance:
//!
//! ```text
//!  client ──Tap/Hover/Instantiate──▶ reader ──▶ Registry
//!  client ◀──Instances, Scene*────── writer ◀── Registry::snapshot()
//! ```

pub mod broadcast;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod ws;

use std::sync::Arc;

use arscene_runtime::{simulation, Catalog, Registry};
use tokio::net::TcpListener;
use tracing::info;

pub use codec::WireFormat;
pub use config::{Cli, ServerConfig, Spawn};
pub use connection::{Connection, ConnectionConfig, Frame};
pub use error::{Result, ServerError};
pub use protocol::{
    ClientMessage, InstanceUpdate, InstantiateRequest, SceneUpdate, ServerMessage, NO_TAG,
};

/// Create the startup instances and bind their tags.
///
/// # Errors
///
/// Fails on the first program that cannot be instantiated or initialized.
pub fn spawn_instances(registry: &Registry, spawns: &[Spawn]) -> Result<()> {
    for spawn in spawns {
        let id = registry.instantiate(&spawn.program, true)?;
        registry.bind(spawn.tag, id)?;
    }
    Ok(())
}

/// Load the program catalog, start the simulation and serve clients until
/// the listener fails.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let catalog = Catalog::from_dir(&config.programs)?;
    info!(
        programs = catalog.programs.len(),
        libraries = catalog.libraries.len(),
        dir = %config.programs.display(),
        "loaded program catalog"
    );

    let registry = Arc::new(Registry::from_catalog(config.runtime.clone(), catalog));
    spawn_instances(&registry, &config.spawn)?;

    let _simulation = simulation::spawn(Arc::clone(&registry));

    let app = ws::router(registry, config.connection.clone());
    let listener = TcpListener::bind(config.bind).await?;
    info!(
        bind = %config.bind,
        format = %config.connection.format,
        "serving AR scenes"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
