//! Strategy files: which policies to chain, in which order.
//!
//! A strategy lists policies in append order; the last one listed is tried
//! first each turn. Each entry can be guarded on a blueprint being unlocked.
//!
//! ```ron
//! (
//!     name: "cabins",
//!     description: "Cabins only",
//!     policies: [
//!         (policy: Threshold((building: Some("Cabin")))),
//!         (policy: Thermal((target_temperature: 21.0))),
//!         (policy: Singleton((building: Some("Cabin"))), requires_blueprint: Some("Cabin")),
//!     ],
//! )
//! ```

use std::path::Path;

use civic_core::chain::{ChainEntry, PolicyChain};
use civic_core::policies::{
    IdleConfig, IdleConstruction, InitialConfig, InitialConstruction, Maintenance,
    MaintenanceConfig, ProgressConfig, ProgressConstruction, SingletonConstruction,
    ThermalConfig, ThermalRegulation, ThresholdConfig, ThresholdConstruction, UpgradeConfig,
    UpgradePurchase, UtilityConfig, UtilityPlacement,
};
use civic_core::policy::Policy;
use civic_core::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for strategy operations.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// File not found.
    #[error("Strategy file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read strategy file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse strategy: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Neither a file nor a known preset.
    #[error("Unknown strategy preset: {0}")]
    UnknownPreset(String),
}

/// A policy and its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolicyKind {
    /// Indoor temperature regulation.
    Thermal(ThermalConfig),
    /// First building on turn zero.
    Initial(InitialConfig),
    /// First building whenever the map is empty.
    Singleton(InitialConfig),
    /// New residence when occupancy is high.
    Threshold(ThresholdConfig),
    /// Continue the furthest-along construction.
    Progress(ProgressConfig),
    /// Spend idle money on housing.
    Idle(IdleConfig),
    /// Repair damaged residences.
    Maintenance(MaintenanceConfig),
    /// Buy upgrades.
    Upgrade(UpgradeConfig),
    /// Place a capped number of utilities.
    Utility(UtilityConfig),
}

impl PolicyKind {
    /// Instantiate the policy.
    #[must_use]
    pub fn build(&self) -> Box<dyn Policy> {
        match self {
            PolicyKind::Thermal(c) => Box::new(ThermalRegulation::new(c.clone())),
            PolicyKind::Initial(c) => Box::new(InitialConstruction::new(c.clone())),
            PolicyKind::Singleton(c) => Box::new(SingletonConstruction::new(c.clone())),
            PolicyKind::Threshold(c) => Box::new(ThresholdConstruction::new(c.clone())),
            PolicyKind::Progress(c) => Box::new(ProgressConstruction::new(c.clone())),
            PolicyKind::Idle(c) => Box::new(IdleConstruction::new(c.clone())),
            PolicyKind::Maintenance(c) => Box::new(Maintenance::new(c.clone())),
            PolicyKind::Upgrade(c) => Box::new(UpgradePurchase::new(c.clone())),
            PolicyKind::Utility(c) => Box::new(UtilityPlacement::new(c.clone())),
        }
    }
}

/// One chain entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    /// Policy and settings.
    pub policy: PolicyKind,
    /// Skip the policy until this blueprint exists and is released.
    #[serde(default)]
    pub requires_blueprint: Option<String>,
}

impl From<PolicyKind> for PolicySpec {
    fn from(policy: PolicyKind) -> Self {
        Self {
            policy,
            requires_blueprint: None,
        }
    }
}

/// A named policy chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Policies in append order (last is tried first).
    pub policies: Vec<PolicySpec>,
}

impl Default for Strategy {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            description: "Utilities, expansion, upkeep, then climate control".to_string(),
            policies: vec![
                PolicyKind::Utility(UtilityConfig {
                    building: Some("Mall".to_string()),
                    max_count: 2,
                })
                .into(),
                PolicyKind::Utility(UtilityConfig {
                    building: Some("Park".to_string()),
                    max_count: 2,
                })
                .into(),
                PolicyKind::Threshold(ThresholdConfig::default()).into(),
                PolicyKind::Upgrade(UpgradeConfig::default()).into(),
                PolicyKind::Maintenance(MaintenanceConfig::default()).into(),
                PolicyKind::Progress(ProgressConfig::default()).into(),
                PolicyKind::Thermal(ThermalConfig::default()).into(),
                PolicyKind::Singleton(InitialConfig {
                    building: None,
                    ..InitialConfig::default()
                })
                .into(),
            ],
        }
    }
}

/// Upkeep shared by the presets: upgrades, maintenance, progress, thermal.
fn upkeep() -> Vec<PolicySpec> {
    vec![
        PolicyKind::Upgrade(UpgradeConfig::default()).into(),
        PolicyKind::Maintenance(MaintenanceConfig::default()).into(),
        PolicyKind::Progress(ProgressConfig::default()).into(),
        PolicyKind::Thermal(ThermalConfig::default()).into(),
    ]
}

impl Strategy {
    /// Load a strategy from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StrategyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StrategyError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let strategy: Strategy = ron::from_str(&contents)?;
        Ok(strategy)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, StrategyError> {
        let strategy: Strategy = ron::from_str(ron)?;
        Ok(strategy)
    }

    /// Resolve a CLI argument: a preset name or a path to a RON file.
    ///
    /// Presets: `default`, `no_turn_zero`, `residence:<Name>`,
    /// `singleton:<Name>`.
    pub fn resolve(arg: &str) -> Result<Self, StrategyError> {
        if arg.ends_with(".ron") || Path::new(arg).is_file() {
            return Self::load(arg);
        }
        match arg.split_once(':') {
            None if arg == "default" => Ok(Self::default()),
            None if arg == "no_turn_zero" => Ok(Self::no_turn_zero()),
            Some(("residence", name)) if !name.is_empty() => Ok(Self::residence(name)),
            Some(("singleton", name)) if !name.is_empty() => Ok(Self::singleton(name)),
            _ => Err(StrategyError::UnknownPreset(arg.to_string())),
        }
    }

    /// Expansion and upkeep only; relies on an existing first building.
    #[must_use]
    pub fn no_turn_zero() -> Self {
        let mut policies = vec![PolicyKind::Threshold(ThresholdConfig::default()).into()];
        policies.extend(upkeep());
        Self {
            name: "no_turn_zero".to_string(),
            description: "Expansion and upkeep without an opening build".to_string(),
            policies,
        }
    }

    /// Expand with one residence type, opening with a cabin on turn zero.
    #[must_use]
    pub fn residence(building: &str) -> Self {
        let mut policies = vec![PolicySpec {
            policy: PolicyKind::Threshold(ThresholdConfig {
                building: Some(building.to_string()),
                ..ThresholdConfig::default()
            }),
            requires_blueprint: Some(building.to_string()),
        }];
        policies.extend(upkeep());
        policies.push(PolicyKind::Initial(InitialConfig::default()).into());
        Self {
            name: format!("residence:{building}"),
            description: format!("Expand with {building} once released"),
            policies,
        }
    }

    /// Keep exactly one building of a type going, and look after it.
    #[must_use]
    pub fn singleton(building: &str) -> Self {
        let mut policies = upkeep();
        policies.push(PolicySpec {
            policy: PolicyKind::Singleton(InitialConfig {
                building: Some(building.to_string()),
                ..InitialConfig::default()
            }),
            requires_blueprint: Some(building.to_string()),
        });
        Self {
            name: format!("singleton:{building}"),
            description: format!("A single {building} and its upkeep"),
            policies,
        }
    }

    /// Build the policy chain.
    #[must_use]
    pub fn build_chain(&self) -> PolicyChain {
        let mut chain = PolicyChain::new();
        for spec in &self.policies {
            let mut entry = ChainEntry::from_boxed(spec.policy.build());
            if let Some(building) = spec.requires_blueprint.clone() {
                entry = entry.with_guard(move |snapshot| blueprint_released(snapshot, &building));
            }
            chain.push(entry);
        }
        chain
    }
}

/// Whether a blueprint of this name exists and is unlocked this turn.
#[must_use]
pub fn blueprint_released(snapshot: &Snapshot, building: &str) -> bool {
    let release = snapshot
        .residence_blueprint(building)
        .map(|b| b.release_tick)
        .or_else(|| snapshot.utility_blueprint(building).map(|b| b.release_tick));
    release.is_some_and(|tick| tick <= snapshot.turn)
}
