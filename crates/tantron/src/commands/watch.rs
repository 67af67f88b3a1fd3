//! Live state follower.
//!
//! Starts the hub, prints the entity table once, then one line per entity
//! whose state changed until Ctrl-C.

use chrono::Local;
use tantron_core::{Entity, EntitySummary, Hub, RegistrySnapshot, build_entities};
use tracing::{debug, info};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::entities;

/// The entity set being followed, rebuilt whenever a full refresh lands.
struct Followed {
    entities: Vec<Entity>,
    generation: u64,
}

impl Followed {
    fn new(snapshot: &RegistrySnapshot) -> Self {
        Self {
            entities: build_entities(snapshot),
            generation: snapshot.generation,
        }
    }

    /// Summaries of the entities that changed in `snapshot`.
    fn changes(&mut self, snapshot: &RegistrySnapshot) -> Vec<EntitySummary> {
        if snapshot.generation != self.generation {
            debug!(generation = snapshot.generation, "registry replaced, rebuilding entities");
            let previous = std::mem::replace(self, Self::new(snapshot));
            return self
                .entities
                .iter()
                .map(Entity::summary)
                .filter(|s| {
                    !previous
                        .entities
                        .iter()
                        .any(|e| e.unique_id() == s.unique_id && e.state_text() == s.state)
                })
                .collect();
        }
        self.entities
            .iter_mut()
            .filter_map(|entity| entity.refresh(snapshot).then(|| entity.summary()))
            .collect()
    }
}

fn change_line(summary: &EntitySummary, format: &OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(summary)?,
        _ => format!(
            "{}  {:<28} {}",
            Local::now().format("%H:%M:%S"),
            summary.unique_id,
            summary.state.as_deref().unwrap_or("unavailable"),
        ),
    })
}

pub async fn handle(hub: &Hub, global: &GlobalOpts) -> Result<(), CliError> {
    let mut stream = hub.subscribe();
    hub.initialize().await?;

    let mut followed = Followed::new(&stream.latest());
    let summaries: Vec<EntitySummary> = followed.entities.iter().map(Entity::summary).collect();
    output::print_output(&entities::render(&summaries, global)?, global.quiet);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res?;
                info!("interrupted, shutting down");
                break;
            }
            snap = stream.changed() => {
                let Some(snap) = snap else { break };
                for summary in followed.changes(&snap) {
                    output::print_output(&change_line(&summary, &global.output)?, global.quiet);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use tantron_api::StateDelta;
    use tantron_core::{Device, DeviceRegistry, Gateway};

    use super::*;

    fn registry() -> DeviceRegistry {
        let registry = DeviceRegistry::new();
        let device: tantron_api::RawDevice = serde_json::from_value(json!({
            "id": "D1", "masterId": "M1", "configVersion": 1, "type": "AC", "name": "Bedroom",
            "functionValues": { "switch": "1", "mode": "2", "targetTemp": "24" }
        }))
        .unwrap();
        let gateway: tantron_api::Gateway =
            serde_json::from_value(json!({ "id": "G1", "onlineState": 1 })).unwrap();
        registry.replace_all(vec![Device::from(device)], None, Gateway::from(gateway));
        registry
    }

    fn delta(version: i64, function: serde_json::Value) -> StateDelta {
        serde_json::from_value(json!({
            "deviceConfigId": "D1", "version": version, "function": function
        }))
        .unwrap()
    }

    #[test]
    fn reports_change_that_keeps_state_text() {
        let registry = registry();
        let mut followed = Followed::new(&registry.snapshot());
        let before = followed.entities[1].state_text();

        assert!(registry.apply_delta(&delta(2, json!({ "targetTemp": "26" }))));
        let changes = followed.changes(&registry.snapshot());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].unique_id, followed.entities[1].unique_id());
        assert_eq!(changes[0].state, before);
    }

    #[test]
    fn untouched_snapshot_reports_nothing() {
        let registry = registry();
        let mut followed = Followed::new(&registry.snapshot());
        assert!(followed.changes(&registry.snapshot()).is_empty());
    }

    #[test]
    fn unavailable_device_is_reported() {
        let registry = registry();
        let mut followed = Followed::new(&registry.snapshot());

        assert!(registry.apply_delta(&delta(2, serde_json::Value::Null)));
        let changes = followed.changes(&registry.snapshot());

        assert_eq!(changes.len(), 1);
        assert!(!changes[0].available);
        assert_eq!(changes[0].state, None);
    }

    #[test]
    fn new_generation_rebuilds_entity_set() {
        let registry = registry();
        let mut followed = Followed::new(&registry.snapshot());
        let gateway: tantron_api::Gateway =
            serde_json::from_value(json!({ "id": "G1", "onlineState": 1 })).unwrap();

        registry.replace_all(Vec::new(), None, Gateway::from(gateway));
        let changes = followed.changes(&registry.snapshot());

        assert!(changes.is_empty());
        assert_eq!(followed.entities.len(), 1);
        assert_eq!(followed.generation, registry.generation());
    }
}
