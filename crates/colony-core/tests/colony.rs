//! End-to-end tests driving a full colony session through the tick loop.

#![allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]

use colony_blueprint::{BlueprintPayload, StructureTemplate, TemplateBlock};
use colony_core::{
    ColonyConfig, ColonySession, RoadsSubmission, SaveFile, TaskSubmission, run_tick,
};
use colony_tasks::{TaskEvent, TaskTarget};
use colony_types::{Coordinate, Item, Material, Region, Rotation, TaskId, TaskKind};

fn config() -> ColonyConfig {
    let mut config = ColonyConfig::default();
    config.workers.dig_ticks = 1;
    config.workers.place_ticks = 1;
    config.ledger.sync_interval_ticks = 1;
    config
}

fn run_until_quiescent(session: &mut ColonySession, limit: usize) -> Vec<TaskEvent> {
    let mut events = Vec::new();
    for _ in 0..limit {
        let summary = run_tick(session).unwrap();
        assert!(summary.anomaly.is_none(), "{:?}", summary.anomaly);
        events.extend(summary.events.iter().cloned());
        if summary.is_quiescent() {
            return events;
        }
    }
    panic!("colony still busy after {limit} ticks");
}

fn hut_with_chest() -> StructureTemplate {
    let mut blocks: Vec<TemplateBlock> = [(0, 0), (1, 0), (0, 1), (1, 1)]
        .into_iter()
        .map(|(x, z)| TemplateBlock {
            pos: Coordinate::new(x, 0, z),
            material: Material::block("oak_planks"),
        })
        .collect();
    blocks.push(TemplateBlock {
        pos: Coordinate::new(0, 1, 0),
        material: Material::with_entity("chest"),
    });
    StructureTemplate {
        size: Coordinate::new(2, 2, 2),
        blocks,
    }
}

fn hut_submission(origin: Coordinate) -> TaskSubmission {
    TaskSubmission {
        task_id: TaskId::new(),
        kind: TaskKind::Build,
        target: TaskTarget::Region(Region::single(origin)),
        blueprint: Some(BlueprintPayload {
            template: hut_with_chest(),
            rotation: Rotation::None,
            floor_level: 0,
        }),
        named_blueprint: None,
        material: None,
        workers: Vec::new(),
    }
}

#[test]
fn blueprint_build_places_floor_then_chest() {
    let mut config = config();
    config.ledger.starting_resources.insert("oak_planks".to_owned(), 10);
    config.ledger.starting_resources.insert("chest".to_owned(), 1);
    let mut session = ColonySession::new(config);
    session.spawn_worker(Coordinate::new(-4, 0, -4));
    session.spawn_worker(Coordinate::new(-4, 0, 4));

    let origin = Coordinate::new(4, 0, 4);
    let task_id = session.submit(hut_submission(origin)).unwrap();
    let planks = Item::new("oak_planks");
    assert_eq!(session.ledger().pool_amount(&planks), 6);
    assert_eq!(session.ledger().pool_amount(&Item::new("chest")), 0);

    let events = run_until_quiescent(&mut session, 500);

    assert!(matches!(
        events.as_slice(),
        [TaskEvent::Completed(c)] if c.task_id == task_id
    ));
    for (x, z) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        assert_eq!(
            session.world().material_at(origin.offset(x, 0, z)),
            Material::block("oak_planks")
        );
    }
    assert_eq!(
        session.world().material_at(origin.offset(0, 1, 0)),
        Material::with_entity("chest")
    );
    assert_eq!(session.ledger().pool_amount(&planks), 6);
    assert!(!session.ledger().has_reservation(task_id));

    let reports = session.building_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].total, 5);
    assert_eq!(reports[0].health, 100);
}

#[test]
fn insufficient_stock_is_rejected_without_task() {
    let mut config = config();
    config.ledger.starting_resources.insert("oak_planks".to_owned(), 2);
    let mut session = ColonySession::new(config);

    let json = serde_json::to_string(&hut_submission(Coordinate::new(4, 0, 4))).unwrap();
    let response = session.submit_json(&json);

    assert!(!response.accepted);
    assert!(response.task_id.is_none());
    assert!(response.error.is_some());
    assert_eq!(session.manager().task_count(), 0);
    assert_eq!(session.ledger().pool_amount(&Item::new("oak_planks")), 2);
}

#[test]
fn roads_dig_then_pave() {
    let mut config = config();
    config.ledger.starting_resources.insert("gravel".to_owned(), 4);
    let mut session = ColonySession::new(config);
    let cells: Vec<Coordinate> = (1..=4).map(|x| Coordinate::new(x, 0, 6)).collect();
    for pos in &cells {
        session
            .world_mut()
            .set_material(*pos, Material::block("stone"))
            .unwrap();
    }
    session.spawn_worker(Coordinate::new(0, 0, 3));

    let roads = RoadsSubmission {
        dig_id: TaskId::new(),
        place_id: TaskId::new(),
        coordinates: cells.clone(),
        material: Material::block("gravel"),
        workers: Vec::new(),
    };
    let place_id = roads.place_id;
    session.submit_roads(roads).unwrap();
    assert_eq!(session.ledger().pool_amount(&Item::new("gravel")), 0);

    let events = run_until_quiescent(&mut session, 500);

    let completed: Vec<TaskKind> = events
        .iter()
        .filter_map(|e| match e {
            TaskEvent::Completed(c) => Some(c.kind),
            TaskEvent::Failed(_) | TaskEvent::Cancelled(_) => None,
        })
        .collect();
    assert_eq!(completed, vec![TaskKind::Remove, TaskKind::Build]);
    assert!(events.iter().any(
        |e| matches!(e, TaskEvent::Completed(c) if c.task_id == place_id)
    ));
    for pos in cells {
        assert_eq!(session.world().material_at(pos), Material::block("gravel"));
    }
    assert_eq!(session.ledger().pool_amount(&Item::new("stone")), 4);
    assert_eq!(session.ledger().pool_amount(&Item::new("gravel")), 0);
}

#[test]
fn damaged_building_is_repaired() {
    let mut config = config();
    config.ledger.starting_resources.insert("oak_planks".to_owned(), 5);
    config.ledger.starting_resources.insert("chest".to_owned(), 1);
    let mut session = ColonySession::new(config);
    session.spawn_worker(Coordinate::new(-3, 0, -3));

    let origin = Coordinate::new(3, 0, 3);
    session.submit(hut_submission(origin)).unwrap();
    run_until_quiescent(&mut session, 500);
    let building = session.building_reports()[0].building_id;

    let broken = origin.offset(1, 0, 1);
    session
        .world_mut()
        .set_material(broken, Material::empty())
        .unwrap();
    // The checker walks a bounded batch of cells per tick.
    for _ in 0..5 {
        run_tick(&mut session).unwrap();
    }
    let damaged = &session.building_reports()[0];
    assert_eq!(damaged.destroyed, 1);
    assert!(damaged.health < 100);

    let repair = session.request_repair(building).unwrap();
    assert!(repair.is_some());
    run_until_quiescent(&mut session, 200);

    assert_eq!(session.world().material_at(broken), Material::block("oak_planks"));
    let reports = session.building_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].health, 100);
    assert_eq!(session.ledger().pool_amount(&Item::new("oak_planks")), 0);
}

#[test]
fn lost_worker_part_is_finished_by_others() {
    let mut config = config();
    config.ledger.starting_resources.insert("stone".to_owned(), 36);
    let mut session = ColonySession::new(config);
    let first = session.spawn_worker(Coordinate::new(-6, 0, 0));
    session.spawn_worker(Coordinate::new(-6, 0, 2));

    let region = Region::new(Coordinate::new(2, 0, 2), Coordinate::new(7, 0, 7));
    let submission = TaskSubmission {
        task_id: TaskId::new(),
        kind: TaskKind::Build,
        target: TaskTarget::Region(region),
        blueprint: None,
        named_blueprint: None,
        material: Some(Material::block("stone")),
        workers: Vec::new(),
    };
    session.submit(submission).unwrap();
    for _ in 0..5 {
        run_tick(&mut session).unwrap();
    }
    assert!(session.remove_worker(first));

    run_until_quiescent(&mut session, 1_000);
    for pos in region.positions() {
        assert_eq!(session.world().material_at(pos), Material::block("stone"));
    }
    assert_eq!(session.ledger().pool_amount(&Item::new("stone")), 0);
}

#[test]
fn save_and_load_restore_stock_and_blueprints() {
    let path = std::env::temp_dir()
        .join(format!("colony-it-{}", std::process::id()))
        .join("save.json");

    let mut config = config();
    config.ledger.starting_resources.insert("stone".to_owned(), 7);
    let mut session = ColonySession::new(config.clone());
    session
        .blueprints_mut()
        .update("hut", hut_with_chest())
        .unwrap();
    session.save(&path).unwrap();

    let mut restored = ColonySession::new(ColonyConfig::default());
    assert!(restored.load(&path).unwrap());
    assert_eq!(restored.ledger().pool_amount(&Item::new("stone")), 7);
    assert_eq!(restored.blueprints().template("hut"), Some(&hut_with_chest()));

    let save = SaveFile::load(&path).unwrap().unwrap();
    assert_eq!(save.version, colony_core::SAVE_VERSION);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn save_keeps_units_reserved_by_live_tasks() {
    let path = std::env::temp_dir()
        .join(format!("colony-it-reserved-{}", std::process::id()))
        .join("save.json");

    let mut config = config();
    config.ledger.starting_resources.insert("stone".to_owned(), 10);
    let mut session = ColonySession::new(config);
    let submission = TaskSubmission {
        task_id: TaskId::new(),
        kind: TaskKind::Build,
        target: TaskTarget::Region(Region::new(
            Coordinate::new(3, 0, 3),
            Coordinate::new(4, 0, 4),
        )),
        blueprint: None,
        named_blueprint: None,
        material: Some(Material::block("stone")),
        workers: Vec::new(),
    };
    session.submit(submission).unwrap();
    assert_eq!(session.ledger().pool_amount(&Item::new("stone")), 6);
    session.save(&path).unwrap();

    let mut restored = ColonySession::new(ColonyConfig::default());
    assert!(restored.load(&path).unwrap());
    assert_eq!(restored.ledger().pool_amount(&Item::new("stone")), 10);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn inverted_region_json_builds_every_cell() {
    let mut config = config();
    config.ledger.starting_resources.insert("oak_planks".to_owned(), 10);
    let mut session = ColonySession::new(config);
    session.spawn_worker(Coordinate::new(0, 0, 2));

    let json = format!(
        r#"{{
            "task_id": "{}",
            "kind": "BUILD",
            "target": {{"region": {{"min": {{"x":6,"y":0,"z":5}}, "max": {{"x":4,"y":0,"z":5}}}}}},
            "material": {{"block": "oak_planks"}}
        }}"#,
        TaskId::new()
    );
    let response = session.submit_json(&json);
    assert!(response.accepted, "{:?}", response.error);
    assert_eq!(session.ledger().pool_amount(&Item::new("oak_planks")), 7);

    run_until_quiescent(&mut session, 500);
    for x in 4..=6 {
        assert_eq!(
            session.world().material_at(Coordinate::new(x, 0, 5)),
            Material::block("oak_planks")
        );
    }
    assert_eq!(session.ledger().pool_amount(&Item::new("oak_planks")), 7);
}

#[test]
fn oversized_region_is_rejected_before_reserving() {
    let mut config = config();
    config.tasks.max_volume = 64;
    config.ledger.starting_resources.insert("stone".to_owned(), 500);
    let mut session = ColonySession::new(config);

    let json = format!(
        r#"{{
            "task_id": "{}",
            "kind": "BUILD",
            "target": {{"region": {{"min": {{"x":0,"y":0,"z":0}}, "max": {{"x":4,"y":4,"z":4}}}}}},
            "material": {{"block": "stone"}}
        }}"#,
        TaskId::new()
    );
    let response = session.submit_json(&json);
    assert!(!response.accepted);
    assert!(response.error.unwrap().contains("limit is 64"));
    assert_eq!(session.manager().task_count(), 0);
    assert_eq!(session.ledger().pool_amount(&Item::new("stone")), 500);
}
