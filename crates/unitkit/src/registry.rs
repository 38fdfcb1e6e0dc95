//! Unit registry
//!
//! Built once at startup and read-only afterwards. The engine borrows it,
//! so concurrent invocations share it without locking.

use crate::error::{Error, Result};
use crate::unit::Unit;
use serde::Serialize;
use std::collections::BTreeMap;

/// Immutable map from unit name to unit
#[derive(Debug, Default)]
pub struct Registry {
    units: BTreeMap<String, Unit>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up a unit by name
    pub fn resolve(&self, name: &str) -> Result<&Unit> {
        self.units.get(name).ok_or_else(|| Error::UnitNotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Units in name order
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Summaries of every unit, for listings
    pub fn summaries(&self) -> Vec<UnitSummary> {
        self.units()
            .map(|unit| UnitSummary {
                name: unit.name().to_string(),
                description: unit.description().to_string(),
                actions: unit
                    .actions()
                    .map(|(name, action)| ActionSummary {
                        name: name.to_string(),
                        description: action.description(),
                        params: action
                            .params()
                            .iter()
                            .map(|p| ParamSummary {
                                name: p.name.to_string(),
                                required: p.required,
                                description: p.description.to_string(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Collects units before freezing them into a [`Registry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    units: BTreeMap<String, Unit>,
}

impl RegistryBuilder {
    /// Add a unit. A name that is already taken is an error.
    pub fn register(&mut self, unit: Unit) -> Result<&mut Self> {
        if self.units.contains_key(unit.name()) {
            return Err(Error::DuplicateUnit {
                name: unit.name().to_string(),
            });
        }
        log::debug!("Registered unit {}", unit.name());
        self.units.insert(unit.name().to_string(), unit);
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn build(self) -> Registry {
        Registry { units: self.units }
    }
}

/// Listing entry for a unit
#[derive(Debug, Clone, Serialize)]
pub struct UnitSummary {
    pub name: String,
    pub description: String,
    pub actions: Vec<ActionSummary>,
}

/// Listing entry for an action
#[derive(Debug, Clone, Serialize)]
pub struct ActionSummary {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSummary>,
}

/// Listing entry for a parameter
#[derive(Debug, Clone, Serialize)]
pub struct ParamSummary {
    pub name: String,
    pub required: bool,
    pub description: String,
}
