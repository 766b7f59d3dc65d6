// src/pipeline/aggregate.rs

//! Collects extracted gear sets, keeping the first record per name.

use std::collections::HashMap;

use crate::models::GearTier;
use crate::utils::slugify;

/// Outcome of offering a record to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// A record with the same name came from `first_file`
    Duplicate { first_file: String },
}

/// First-wins collection of gear sets.
///
/// Names are compared by their store key, so `Bronze` and `bronze` are the
/// same gear set.
#[derive(Debug, Default)]
pub struct Aggregator {
    gear: Vec<GearTier>,
    seen: HashMap<String, String>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `gear` unless a record with the same name was already kept.
    pub fn admit(&mut self, file: &str, gear: GearTier) -> Admission {
        let key = slugify(&gear.name);
        if let Some(first_file) = self.seen.get(&key) {
            log::warn!(
                "{}: SKIPPED - duplicate gear set '{}' (first seen in {})",
                file,
                gear.name,
                first_file
            );
            return Admission::Duplicate {
                first_file: first_file.clone(),
            };
        }
        self.seen.insert(key, file.to_string());
        self.gear.push(gear);
        Admission::Accepted
    }

    pub fn len(&self) -> usize {
        self.gear.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gear.is_empty()
    }

    pub fn into_gear(self) -> Vec<GearTier> {
        self.gear
    }
}
