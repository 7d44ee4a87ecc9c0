//! Built-in decision policies.
//!
//! Each policy owns an immutable config struct (serde, every field defaulted)
//! and no session state, so one chain can drive a whole session.

pub mod construction;
pub mod maintenance;
pub mod progress;
pub mod thermal;
pub mod upgrade;
pub mod utility;

pub use construction::{
    select_residence, IdleConfig, IdleConstruction, InitialConfig, InitialConstruction,
    SingletonConstruction, ThresholdConfig, ThresholdConstruction,
};
pub use maintenance::{Maintenance, MaintenanceConfig};
pub use progress::{ProgressConfig, ProgressConstruction};
pub use thermal::{outdoor_trend, ThermalConfig, ThermalDecision, ThermalPlan, ThermalRegulation};
pub use upgrade::{UpgradeConfig, UpgradePurchase};
pub use utility::{UtilityConfig, UtilityPlacement};

use crate::chain::PolicyChain;

/// The stock chain, in append order (last runs first):
///
/// mall, park, threshold construction, upgrades, maintenance, progress,
/// thermal regulation, singleton construction.
#[must_use]
pub fn standard_chain() -> PolicyChain {
    PolicyChain::new()
        .append(UtilityPlacement::with_building("Mall", 2))
        .append(UtilityPlacement::with_building("Park", 2))
        .append(ThresholdConstruction::default())
        .append(UpgradePurchase::default())
        .append(Maintenance::default())
        .append(ProgressConstruction::default())
        .append(ThermalRegulation::default())
        .append(SingletonConstruction::new(InitialConfig {
            building: None,
            ..InitialConfig::default()
        }))
}
