// src/models/gear.rs

//! Canonical gear-set records produced by the extractor.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered stat rolls (low/mid/high, or however many the source lists).
pub type StatValues = Vec<i64>;

/// Item quality variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Normal,
    Excellent,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Normal => "normal",
            Quality::Excellent => "excellent",
        }
    }

    /// Capitalized form used in exported identifiers.
    pub fn label(&self) -> &'static str {
        match self {
            Quality::Normal => "Normal",
            Quality::Excellent => "Excellent",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bonus stat category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Armor,
    Weapon,
}

/// One named, tiered equipment set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GearTier {
    /// Natural key
    pub name: String,

    pub tier: Option<u32>,

    pub level: Option<u32>,

    #[serde(default)]
    pub armor: Vec<ArmorPiece>,

    #[serde(default)]
    pub weapons: Vec<WeaponEntry>,

    #[serde(default)]
    pub bonus_stats: BonusStatTable,
}

impl GearTier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tier: None,
            level: None,
            armor: Vec::new(),
            weapons: Vec::new(),
            bonus_stats: BonusStatTable::default(),
        }
    }

    /// Insert a weapon, replacing any entry with the same class, type and
    /// quality in place so source order is kept.
    pub fn upsert_weapon(&mut self, weapon: WeaponEntry) {
        match self.weapons.iter_mut().find(|w| w.same_slot_as(&weapon)) {
            Some(existing) => *existing = weapon,
            None => self.weapons.push(weapon),
        }
    }
}

/// One equippable armor item variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorPiece {
    /// Canonical slot id (helm, chest, legs, ...)
    pub slot: String,

    pub quality: Quality,

    /// Classes allowed to equip this variant; never empty
    pub allowed_classes: Vec<String>,

    /// Display name with the excellence marker removed
    pub item_name: String,

    /// Stat name to rolls; absent stats are omitted
    pub base_stats: BTreeMap<String, StatValues>,
}

/// One weapon type available to one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponEntry {
    pub class_id: String,

    pub weapon_type: String,

    pub item_name: String,

    pub quality: Quality,

    pub damage: StatValues,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_speed: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus_attack_speed: Option<StatValues>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitality: Option<StatValues>,
}

impl WeaponEntry {
    fn same_slot_as(&self, other: &WeaponEntry) -> bool {
        self.class_id == other.class_id
            && self.weapon_type == other.weapon_type
            && self.quality == other.quality
    }
}

/// Modifiers attached to a quality/category pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_speed: Option<StatValues>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<StatValues>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitality: Option<StatValues>,
}

impl BonusStats {
    pub fn is_empty(&self) -> bool {
        self.attack_speed.is_none() && self.strength.is_none() && self.vitality.is_none()
    }
}

/// Bonus stats keyed by quality, then category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BonusStatTable(BTreeMap<Quality, BTreeMap<Category, BonusStats>>);

impl BonusStatTable {
    /// Store an entry. Entries with every field absent are not stored.
    pub fn insert(&mut self, quality: Quality, category: Category, stats: BonusStats) {
        if stats.is_empty() {
            return;
        }
        self.0.entry(quality).or_default().insert(category, stats);
    }

    pub fn get(&self, quality: Quality, category: Category) -> Option<&BonusStats> {
        self.0.get(&quality).and_then(|by_category| by_category.get(&category))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries as (quality, category, stats).
    pub fn iter(&self) -> impl Iterator<Item = (Quality, Category, &BonusStats)> {
        self.0.iter().flat_map(|(quality, by_category)| {
            by_category
                .iter()
                .map(move |(category, stats)| (*quality, *category, stats))
        })
    }
}
