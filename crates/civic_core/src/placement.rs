//! Scoring and selection of cells for new buildings.
//!
//! All functions here are pure reads of a [`Snapshot`]; random choice takes an
//! explicit RNG so sessions stay reproducible.

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::snapshot::{Position, Snapshot};

/// Every buildable, unoccupied cell, column-major.
#[must_use]
pub fn buildable_positions(snapshot: &Snapshot) -> Vec<Position> {
    snapshot
        .map
        .positions()
        .filter(|&p| snapshot.is_buildable(p))
        .collect()
}

/// Free space around a cell.
///
/// Counts every cell within `radius` (square neighborhood, centre excluded)
/// that is on buildable terrain and free. With `occupied_bonus`, cells on
/// buildable terrain that already carry a structure count double, since
/// neighbouring buildings boost each other's score on the host.
#[must_use]
pub fn availability(
    snapshot: &Snapshot,
    position: Position,
    radius: i32,
    occupied_bonus: bool,
) -> u32 {
    let mut rating = 0;
    for x in position.x - radius..=position.x + radius {
        for y in position.y - radius..=position.y + radius {
            let cell = Position::new(x, y);
            if cell == position || !snapshot.map.is_buildable(cell) {
                continue;
            }
            if !snapshot.is_occupied(cell) {
                rating += 1;
            } else if occupied_bonus {
                rating += 2;
            }
        }
    }
    rating
}

/// Best free cell adjacent to a completed residence.
///
/// Candidates are scored by free space at radius 1; ties go to the higher
/// radius-2 score with the occupied bonus. Remaining ties keep the first
/// candidate found.
#[must_use]
pub fn best_position_near_residences(snapshot: &Snapshot) -> Option<Position> {
    let mut best: Option<(Position, (u32, u32))> = None;
    for (residence, _) in snapshot.completed_residences() {
        for candidate in residence.position.neighbors() {
            if !snapshot.is_buildable(candidate) {
                continue;
            }
            let score = (
                availability(snapshot, candidate, 1, false),
                availability(snapshot, candidate, 2, true),
            );
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((candidate, score)),
            }
        }
    }
    best.map(|(position, _)| position)
}

/// Buildable cell with the most free space around it (radius 2).
#[must_use]
pub fn most_spacious_position(snapshot: &Snapshot) -> Option<Position> {
    let mut best: Option<(Position, u32)> = None;
    for candidate in buildable_positions(snapshot) {
        let score = availability(snapshot, candidate, 2, false);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best.map(|(position, _)| position)
}

/// Uniformly random buildable cell.
pub fn random_buildable_position(snapshot: &Snapshot, rng: &mut dyn RngCore) -> Option<Position> {
    buildable_positions(snapshot).choose(rng).copied()
}

/// How a construction policy picks its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Placement {
    /// Any buildable cell.
    #[default]
    Random,
    /// Next to existing residences, falling back to the most spacious cell.
    NearResidences,
    /// The cell with the most free space around it.
    Spacious,
}

impl Placement {
    /// Pick a cell, or `None` when the map is full.
    pub fn choose(self, snapshot: &Snapshot, rng: &mut dyn RngCore) -> Option<Position> {
        match self {
            Placement::Random => random_buildable_position(snapshot, rng),
            Placement::NearResidences => best_position_near_residences(snapshot)
                .or_else(|| most_spacious_position(snapshot)),
            Placement::Spacious => most_spacious_position(snapshot),
        }
    }
}
