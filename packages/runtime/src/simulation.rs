//! The simulation loop: render every instance, publish a fresh snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use crate::registry::{InstanceId, Registry};
use crate::snapshot::Snapshot;

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Instances whose render succeeded.
    pub rendered: usize,
    /// Instances whose render failed. Their previous scene was kept.
    pub failed: Vec<InstanceId>,
}

/// Render every registered instance once and publish the result.
///
/// The new snapshot is built from scratch, sized to the instance list as it
/// was when the tick began. Instances created mid-tick wait for the next one.
pub fn tick(registry: &Registry) -> TickReport {
    let previous = registry.snapshot();
    let instances = registry.instances();
    let tick = previous.tick() + 1;

    let mut scenes = Vec::with_capacity(instances.len());
    let mut failed = Vec::new();
    for (id, instance) in instances.iter().enumerate() {
        match instance.render_scene() {
            Ok(scene) => scenes.push(Some(Arc::new(scene))),
            Err(e) => {
                warn!(
                    instance = id,
                    program = %instance.program_name(),
                    error = %e,
                    "render failed, keeping previous scene"
                );
                failed.push(id);
                scenes.push(previous.get(id).cloned());
            }
        }
    }

    let report = TickReport {
        tick,
        rendered: instances.len() - failed.len(),
        failed,
    };
    registry.publish(Snapshot::new(tick, scenes));
    report
}

/// Tick forever at `interval`.
///
/// Each tick runs on the blocking pool since it executes Lua. A tick that
/// overruns the interval delays the next one rather than bunching them up.
pub async fn run(registry: Arc<Registry>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let registry = Arc::clone(&registry);
        match tokio::task::spawn_blocking(move || tick(&registry)).await {
            Ok(report) if report.failed.is_empty() => {
                debug!(tick = report.tick, rendered = report.rendered, "tick");
            }
            Ok(report) => {
                debug!(
                    tick = report.tick,
                    rendered = report.rendered,
                    failed = report.failed.len(),
                    "tick"
                );
            }
            Err(e) => error!(error = %e, "simulation tick panicked"),
        }
    }
}

/// Start [`run`] on the current runtime at the registry's tick interval.
pub fn spawn(registry: Arc<Registry>) -> JoinHandle<()> {
    let interval = registry.config().tick_interval;
    tokio::spawn(run(registry, interval))
}
