//! Property-based testing strategies.

use civic_core::snapshot::{Position, ResidenceBlueprint, ResidenceState, Structure, StructureKind};
use proptest::prelude::*;

/// Plausible outdoor readings in degrees.
pub fn outdoor_temperature() -> impl Strategy<Value = f64> {
    -30.0..40.0_f64
}

/// Outdoor history of three to ten readings.
pub fn outdoor_history() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(outdoor_temperature(), 3..10)
}

/// Residence blueprint with randomized thermal parameters.
pub fn residence_blueprint() -> impl Strategy<Value = ResidenceBlueprint> {
    (0.5..10.0_f64, 0.05..0.9_f64, 1..60_u32).prop_map(|(base, emissivity, max_pop)| {
        ResidenceBlueprint {
            name: "Prop".into(),
            cost: 1000.0,
            co2_cost: 0.0,
            base_energy_need: base,
            build_speed: 20,
            release_tick: 0,
            max_pop,
            income_per_pop: 10.0,
            emissivity,
            maintenance_cost: 500.0,
            decay_rate: 0.1,
            max_happiness: 0.5,
        }
    })
}

/// Completed residence of `blueprint` with random climate and occupancy.
pub fn completed_residence(blueprint: &ResidenceBlueprint) -> impl Strategy<Value = Structure> {
    let name = blueprint.name.clone();
    let max_pop = blueprint.max_pop;
    (
        0..10_i32,
        0..10_i32,
        0.0..40.0_f64,
        0.0..30.0_f64,
        0..=max_pop,
    )
        .prop_map(move |(x, y, temperature, energy, pop)| Structure {
            name: name.clone(),
            position: Position::new(x, y),
            build_progress: 100,
            health: 100.0,
            effective_energy_in: energy,
            effects: Vec::new(),
            kind: StructureKind::Residence(ResidenceState {
                current_pop: pop,
                temperature,
                requested_energy_in: energy,
                happiness_per_tick_per_pop: 0.0,
            }),
        })
}
