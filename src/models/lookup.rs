// src/models/lookup.rs

//! Static lookup tables used during classification.
//!
//! `LookupConfig` is the serialized form read from `[lookup]` in the config
//! file. `LookupTables` is built from it once at start-up and then only read.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Lookup tables as they appear in the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Item display name (or its trailing words) to canonical slot id
    #[serde(default = "defaults::slots")]
    pub slots: BTreeMap<String, String>,

    /// Gear-set name to tier
    #[serde(default = "defaults::tiers")]
    pub tiers: BTreeMap<String, u32>,

    /// Tier to character level
    #[serde(default = "defaults::levels")]
    pub levels: Vec<TierLevel>,

    /// Weapon type to fixed attack speed
    #[serde(default = "defaults::attack_speeds")]
    pub attack_speeds: BTreeMap<String, i64>,

    /// Tiers at or above this resolve to `high_tier_level` when no level is known
    #[serde(default = "defaults::high_tier_threshold")]
    pub high_tier_threshold: u32,

    #[serde(default = "defaults::high_tier_level")]
    pub high_tier_level: u32,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            slots: defaults::slots(),
            tiers: defaults::tiers(),
            levels: defaults::levels(),
            attack_speeds: defaults::attack_speeds(),
            high_tier_threshold: defaults::high_tier_threshold(),
            high_tier_level: defaults::high_tier_level(),
        }
    }
}

/// One row of the tier to level table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLevel {
    pub tier: u32,
    pub level: u32,
}

/// Read-only, case-insensitive lookup tables.
#[derive(Debug, Clone)]
pub struct LookupTables {
    slots: HashMap<String, String>,
    /// Slot keys sorted longest first for suffix matching
    slot_suffixes: Vec<String>,
    tiers: HashMap<String, u32>,
    levels: HashMap<u32, u32>,
    attack_speeds: HashMap<String, i64>,
    speed_suffixes: Vec<String>,
    high_tier_threshold: u32,
    high_tier_level: u32,
}

impl LookupTables {
    /// Build the tables, rejecting entries that would make lookups ambiguous.
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let slots = lowercase_keys(&config.slots, "slots")?;
        let tiers = lowercase_keys(&config.tiers, "tiers")?;
        let attack_speeds = lowercase_keys(&config.attack_speeds, "attack_speeds")?;

        let mut levels = HashMap::new();
        for row in &config.levels {
            if row.tier == 0 {
                return Err(AppError::validation("lookup.levels: tier must be > 0"));
            }
            if levels.insert(row.tier, row.level).is_some() {
                return Err(AppError::validation(format!(
                    "lookup.levels: tier {} listed twice",
                    row.tier
                )));
            }
        }

        if tiers.values().any(|tier| *tier == 0) {
            return Err(AppError::validation("lookup.tiers: tiers must be > 0"));
        }

        Ok(Self {
            slot_suffixes: longest_first(slots.keys()),
            speed_suffixes: longest_first(attack_speeds.keys()),
            slots,
            tiers,
            levels,
            attack_speeds,
            high_tier_threshold: config.high_tier_threshold,
            high_tier_level: config.high_tier_level,
        })
    }

    /// Slot for an item name: exact match, then the longest key the name ends with.
    pub fn slot_for(&self, item: &str) -> Option<&str> {
        let item = item.trim().to_lowercase();
        if let Some(slot) = self.slots.get(&item) {
            return Some(slot);
        }
        self.slot_suffixes
            .iter()
            .find(|key| ends_with_word(&item, key))
            .and_then(|key| self.slots.get(key))
            .map(String::as_str)
    }

    pub fn tier_for(&self, gear_name: &str) -> Option<u32> {
        self.tiers.get(&gear_name.trim().to_lowercase()).copied()
    }

    /// Level for a tier, with the high-tier fallback.
    pub fn level_for(&self, tier: u32) -> Option<u32> {
        match self.levels.get(&tier) {
            Some(level) => Some(*level),
            None if tier >= self.high_tier_threshold => Some(self.high_tier_level),
            None => None,
        }
    }

    pub fn attack_speed_for(&self, weapon_type: &str) -> Option<i64> {
        let weapon_type = weapon_type.trim().to_lowercase();
        if let Some(speed) = self.attack_speeds.get(&weapon_type) {
            return Some(*speed);
        }
        self.speed_suffixes
            .iter()
            .find(|key| ends_with_word(&weapon_type, key))
            .and_then(|key| self.attack_speeds.get(key))
            .copied()
    }
}

fn lowercase_keys<V: Clone>(
    table: &BTreeMap<String, V>,
    name: &str,
) -> Result<HashMap<String, V>> {
    let mut out = HashMap::with_capacity(table.len());
    for (key, value) in table {
        let normalized = key.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(AppError::validation(format!("lookup.{name}: empty key")));
        }
        if out.insert(normalized, value.clone()).is_some() {
            return Err(AppError::validation(format!(
                "lookup.{name}: '{key}' differs from another key only by case"
            )));
        }
    }
    Ok(out)
}

fn longest_first<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut keys: Vec<String> = keys.cloned().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    keys
}

/// True when `text` is `word` or ends with a whitespace-separated `word`.
fn ends_with_word(text: &str, word: &str) -> bool {
    match text.strip_suffix(word) {
        Some("") => true,
        Some(rest) => rest.ends_with(char::is_whitespace),
        None => false,
    }
}

mod defaults {
    use std::collections::BTreeMap;

    use super::TierLevel;

    fn table<V: Copy>(rows: &[(&str, V)]) -> BTreeMap<String, V> {
        rows.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    pub fn slots() -> BTreeMap<String, String> {
        let rows: &[(&str, &str)] = &[
            ("Helm", "helm"),
            ("Helmet", "helm"),
            ("Hood", "helm"),
            ("Hat", "helm"),
            ("Cap", "helm"),
            ("Crown", "helm"),
            ("Circlet", "helm"),
            ("Mask", "helm"),
            ("Chest", "chest"),
            ("Chestplate", "chest"),
            ("Breastplate", "chest"),
            ("Cuirass", "chest"),
            ("Robe", "chest"),
            ("Tunic", "chest"),
            ("Vest", "chest"),
            ("Garb", "chest"),
            ("Legs", "legs"),
            ("Leggings", "legs"),
            ("Legguards", "legs"),
            ("Pants", "legs"),
            ("Trousers", "legs"),
            ("Skirt", "legs"),
            ("Gauntlets", "gauntlets"),
            ("Gloves", "gauntlets"),
            ("Bracers", "gauntlets"),
            ("Handguards", "gauntlets"),
            ("Wraps", "gauntlets"),
            ("Greaves", "greaves"),
            ("Shinguards", "greaves"),
            ("Boots", "boots"),
            ("Shoes", "boots"),
            ("Sandals", "boots"),
            ("Sabatons", "boots"),
            ("Shield", "shield"),
            ("Buckler", "shield"),
            ("Offhand", "offhand"),
            ("Off-hand", "offhand"),
            ("Tome", "offhand"),
            ("Orb", "offhand"),
            ("Focus", "offhand"),
            ("Relic", "offhand"),
            ("Quiver", "offhand"),
        ];
        rows.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn tiers() -> BTreeMap<String, u32> {
        table(&[
            ("Bronze", 1),
            ("Steel", 2),
            ("Spiderfang", 3),
            ("Mithril", 4),
            ("Obsidian", 5),
            ("Runic", 6),
            ("Dragonbone", 7),
            ("Celestial", 8),
        ])
    }

    pub fn levels() -> Vec<TierLevel> {
        (1..=16)
            .map(|tier| TierLevel {
                tier,
                level: if tier == 1 { 1 } else { (tier - 1) * 10 },
            })
            .collect()
    }

    pub fn attack_speeds() -> BTreeMap<String, i64> {
        table(&[
            ("Sword", 1000),
            ("Greatsword", 1500),
            ("Axe", 1200),
            ("Mace", 1200),
            ("Hammer", 1400),
            ("Spear", 1100),
            ("Dagger", 800),
            ("Bow", 1100),
            ("Staff", 1300),
            ("Wand", 1000),
        ])
    }

    pub fn high_tier_threshold() -> u32 {
        17
    }

    pub fn high_tier_level() -> u32 {
        160
    }
}
