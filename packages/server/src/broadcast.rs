//! What the server tells each client every broadcast interval.

use arscene_runtime::Registry;
use tracing::debug;

use crate::codec::WireFormat;
use crate::error::Result;
use crate::protocol::{InstanceUpdate, SceneUpdate, ServerMessage};

/// Messages of one broadcast round, in send order.
///
/// First a roster of every instance, then one scene per tag-bound instance
/// taken from a single snapshot. An instance bound to several tags gets one
/// scene. A bound instance with no scene in the snapshot (created after the
/// last tick, or never rendered successfully) is skipped this round.
///
/// # Errors
///
/// Fails if an instance's state cannot be encoded.
pub fn round(registry: &Registry, format: WireFormat) -> Result<Vec<ServerMessage>> {
    let tags = registry.tag_index();
    let roster = registry
        .instances()
        .iter()
        .enumerate()
        .map(|(id, instance)| {
            Ok(InstanceUpdate {
                instance: id,
                program: instance.program_name().to_string(),
                data: format.encode(&instance.state())?,
                tag: tags.get(&id).copied(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let snapshot = registry.snapshot();
    let mut messages = Vec::with_capacity(1 + tags.len());
    messages.push(ServerMessage::Instances(roster));
    for &id in tags.keys() {
        match snapshot.get(id) {
            Some(scene) => messages.push(ServerMessage::Scene(SceneUpdate {
                instance: id,
                object: scene.as_ref().clone(),
            })),
            None => debug!(
                instance = id,
                tick = snapshot.tick(),
                "no scene for bound instance yet, skipping"
            ),
        }
    }
    Ok(messages)
}
