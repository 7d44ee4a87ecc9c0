//! Decoding full host payloads into snapshots.

use civic_core::snapshot::{Position, StructureKind, Terrain};
use civic_headless::protocol::{GameInfoDto, GameStateDto};

const GAME_INFO: &str = r#"{
    "gameId": "8f1c2d",
    "mapName": "training1",
    "maxTurns": 700,
    "maxTemp": 18.0,
    "minTemp": -12.0,
    "map": [
        [0, 0, 1],
        [0, 2, 0],
        [0, 0, 0]
    ],
    "availableResidenceBuildings": [
        {
            "buildingName": "Cabin",
            "cost": 3500,
            "co2Cost": 300,
            "baseEnergyNeed": 1.8,
            "buildSpeed": 50,
            "releaseTick": 0,
            "maxPop": 4,
            "incomePerPop": 12,
            "emissivity": 0.7,
            "maintenanceCost": 150,
            "decayRate": 0.4,
            "maxHappiness": 0.5
        },
        {
            "buildingName": "HighRise",
            "cost": 18000,
            "baseEnergyNeed": 6.5,
            "buildSpeed": 10,
            "releaseTick": 300,
            "maxPop": 60,
            "emissivity": 0.3
        }
    ],
    "availableUtilityBuildings": [
        {
            "buildingName": "Park",
            "cost": 2500,
            "baseEnergyNeed": 0,
            "buildSpeed": 25,
            "effects": ["Park"]
        }
    ],
    "availableUpgrades": [
        {"name": "Insulation", "effect": "Insulation", "cost": 1200},
        {"name": "Caretaker", "cost": 800}
    ],
    "turn": 3,
    "funds": 16500,
    "totalCo2": 300,
    "totalHappiness": 0,
    "currentTemp": 9.5,
    "housingQueue": 15,
    "queueHappiness": 0,
    "residenceBuildings": [{
        "buildingName": "Cabin",
        "position": {"x": 2, "y": 2},
        "buildProgress": 50,
        "effectiveEnergyIn": 0,
        "canBeDemolished": true,
        "effects": [],
        "currentPop": 0,
        "temperature": 18,
        "requestedEnergyIn": 0,
        "happinessPerTickPerPop": 0,
        "health": 100
    }],
    "utilityBuildings": [],
    "errors": [],
    "messages": []
}"#;

#[test]
fn game_info_becomes_a_snapshot() {
    let dto: GameInfoDto = serde_json::from_str(GAME_INFO).unwrap();
    let snapshot = dto.into_snapshot();

    assert_eq!(snapshot.game_id, "8f1c2d");
    assert_eq!(snapshot.map_name, "training1");
    assert_eq!(snapshot.max_turns, 700);
    assert_eq!(snapshot.turn, 3);
    assert_eq!(snapshot.housing_queue, 15);
    assert!(!snapshot.is_over());

    // Only code zero is buildable.
    assert_eq!(snapshot.map.width(), 3);
    assert_eq!(snapshot.map.get(Position::new(0, 2)), Some(Terrain::Blocked));
    assert_eq!(snapshot.map.get(Position::new(1, 1)), Some(Terrain::Blocked));
    assert!(snapshot.map.is_buildable(Position::new(2, 0)));
    assert_eq!(snapshot.map.get(Position::new(3, 0)), None);

    let cabin = snapshot.residence_blueprint("Cabin").unwrap();
    assert_eq!(cabin.max_pop, 4);
    assert_eq!(cabin.build_speed, 50);
    let high_rise = snapshot.residence_blueprint("HighRise").unwrap();
    assert_eq!(high_rise.release_tick, 300);
    assert_eq!(high_rise.maintenance_cost, 0.0);

    let park = snapshot.utility_blueprint("Park").unwrap();
    assert_eq!(park.effects, vec!["Park".to_string()]);

    // An upgrade without an explicit effect is known by its name.
    let caretaker = snapshot.upgrades.iter().find(|u| u.name == "Caretaker").unwrap();
    assert_eq!(caretaker.effect, "Caretaker");

    assert_eq!(snapshot.temperature_history.len(), 1);
    assert_eq!(snapshot.temperature_history.get(&3), Some(&9.5));

    let structure = snapshot.structure_at(Position::new(2, 2)).unwrap();
    assert!(!structure.is_complete());
    assert!(matches!(structure.kind, StructureKind::Residence(_)));
    assert!(!snapshot.is_buildable(Position::new(2, 2)));
}

#[test]
fn state_updates_keep_static_data_and_extend_history() {
    let mut snapshot = serde_json::from_str::<GameInfoDto>(GAME_INFO)
        .unwrap()
        .into_snapshot();

    let update: GameStateDto = serde_json::from_str(
        r#"{
            "turn": 4,
            "funds": 16500,
            "currentTemp": 8.0,
            "residenceBuildings": [{
                "buildingName": "Cabin",
                "position": {"x": 2, "y": 2},
                "buildProgress": 100
            }],
            "messages": ["Cabin at (2, 2) completed"]
        }"#,
    )
    .unwrap();
    update.apply_to(&mut snapshot);

    assert_eq!(snapshot.turn, 4);
    assert_eq!(snapshot.residence_blueprints.len(), 2);
    assert_eq!(snapshot.map.width(), 3);
    assert_eq!(snapshot.temperature_history.get(&3), Some(&9.5));
    assert_eq!(snapshot.temperature_history.get(&4), Some(&8.0));
    assert_eq!(snapshot.messages.len(), 1);
    assert!(snapshot.errors.is_empty());
    assert_eq!(snapshot.completed().count(), 1);
}
