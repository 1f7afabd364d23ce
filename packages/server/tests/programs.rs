use std::path::PathBuf;
use std::sync::Arc;

use arscene_runtime::{simulation, Catalog, Registry, RuntimeConfig};
use arscene_server::{spawn_instances, Spawn};
use arscene_value::{Key, ObjectType, Value};

fn programs_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../programs")
}

fn registry() -> Arc<Registry> {
    let catalog = Catalog::from_dir(programs_dir()).unwrap();
    Arc::new(Registry::from_catalog(RuntimeConfig::default(), catalog))
}

fn text_of(registry: &Registry, id: usize, entity: &str) -> String {
    registry
        .snapshot()
        .get(id)
        .unwrap()
        .find(entity)
        .unwrap()
        .text
        .clone()
}

#[test]
fn shipped_catalog_loads() {
    let registry = registry();
    let names = registry.program_names();
    assert!(names.contains(&"tictactoe".to_string()));
    assert!(names.contains(&"counter".to_string()));
    assert!(!names.contains(&"vectors".to_string()));
}

#[test]
fn tictactoe_plays_a_game() {
    let registry = registry();
    spawn_instances(
        &registry,
        &[
            Spawn {
                tag: 0,
                program: "tictactoe".to_string(),
            },
            Spawn {
                tag: 1,
                program: "tictactoe".to_string(),
            },
        ],
    )
    .unwrap();
    assert_eq!(registry.tags(), vec![(0, 0), (1, 1)]);

    simulation::tick(&registry);
    let scene = registry.snapshot().get(0).cloned().unwrap();
    assert!(scene.children.len() >= 9);
    assert_eq!(scene.find("cell-5").unwrap().kind, ObjectType::TriggerBox);
    assert_eq!(text_of(&registry, 0, "status"), "x to play");

    // x takes the left column while o plays the middle one.
    for cell in [1, 2, 4, 5, 7] {
        registry.tap(0, format!("cell-{}", cell)).unwrap();
        simulation::tick(&registry);
    }

    assert_eq!(text_of(&registry, 0, "status"), "x wins!");
    assert_eq!(text_of(&registry, 0, "mark-5"), "o");

    let state = registry.instance(0).unwrap().state();
    assert_eq!(state.get(&Key::from("winner")), Some(&Value::from("x")));

    // The other board is untouched.
    assert_eq!(text_of(&registry, 1, "status"), "x to play");
    assert!(registry.snapshot().get(1).unwrap().find("mark-1").is_none());
}

#[test]
fn counter_counts_taps() {
    let registry = registry();
    let id = registry.instantiate("counter", true).unwrap();
    simulation::tick(&registry);
    assert_eq!(text_of(&registry, id, "label"), "0");

    registry.tap(id, "button").unwrap();
    simulation::tick(&registry);
    assert_eq!(text_of(&registry, id, "label"), "1");
}
