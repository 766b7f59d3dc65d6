// src/pipeline/export.rs

//! JSON export of stored gear sets.
//!
//! `gear_sets.json` nests armor by slot and quality and weapons by class and
//! type. `armor.json`, `weapons.json` and `items.json` are flat lists whose
//! records carry an id of the form `{gear_set}-{item_name}-{Quality}`.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::error::Result;
use crate::models::{ArmorPiece, BonusStatTable, GearTier, Quality, StatValues, WeaponEntry};
use crate::storage::{GearStore, LocalStorage};
use crate::utils::{log, slugify};

pub const GEAR_SETS_FILE: &str = "gear_sets.json";
pub const ARMOR_FILE: &str = "armor.json";
pub const WEAPONS_FILE: &str = "weapons.json";
pub const ITEMS_FILE: &str = "items.json";

/// Counts of exported records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub gear_sets: usize,
    pub armor: usize,
    pub weapons: usize,
}

#[derive(Debug, Serialize)]
pub struct GearSetDoc<'a> {
    pub name: &'a str,
    pub tier: Option<u32>,
    pub level: Option<u32>,
    pub armor_pieces: Vec<ArmorSlotDoc<'a>>,
    pub weapons: Vec<WeaponGroupDoc<'a>>,
    #[serde(skip_serializing_if = "BonusStatTable::is_empty")]
    pub bonus_stats: &'a BonusStatTable,
}

#[derive(Debug, Serialize)]
pub struct ArmorSlotDoc<'a> {
    pub slot: &'a str,
    pub normal: VariantList<'a>,
    pub excellent: VariantList<'a>,
}

#[derive(Debug, Default, Serialize)]
pub struct VariantList<'a> {
    pub variants: Vec<ArmorVariantDoc<'a>>,
}

#[derive(Debug, Serialize)]
pub struct ArmorVariantDoc<'a> {
    pub classes: &'a [String],
    pub item_name: &'a str,
    #[serde(flatten)]
    pub stats: &'a BTreeMap<String, StatValues>,
}

#[derive(Debug, Serialize)]
pub struct WeaponGroupDoc<'a> {
    pub class: &'a str,
    pub weapon_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normal: Option<WeaponStatsDoc<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excellent: Option<WeaponStatsDoc<'a>>,
}

#[derive(Debug, Serialize)]
pub struct WeaponStatsDoc<'a> {
    pub item_name: &'a str,
    pub damage: &'a [i64],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_speed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_attack_speed: Option<&'a [i64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vitality: Option<&'a [i64]>,
}

impl<'a> From<&'a WeaponEntry> for WeaponStatsDoc<'a> {
    fn from(weapon: &'a WeaponEntry) -> Self {
        Self {
            item_name: &weapon.item_name,
            damage: &weapon.damage,
            attack_speed: weapon.attack_speed,
            bonus_attack_speed: weapon.bonus_attack_speed.as_deref(),
            vitality: weapon.vitality.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FlatArmor<'a> {
    pub id: String,
    pub gear_set: &'a str,
    pub tier: Option<u32>,
    pub level: Option<u32>,
    pub slot: &'a str,
    pub quality: Quality,
    pub classes: &'a [String],
    pub item_name: &'a str,
    #[serde(flatten)]
    pub stats: &'a BTreeMap<String, StatValues>,
}

#[derive(Debug, Serialize)]
pub struct FlatWeapon<'a> {
    pub id: String,
    pub gear_set: &'a str,
    pub tier: Option<u32>,
    pub level: Option<u32>,
    pub class: &'a str,
    pub weapon_type: &'a str,
    pub quality: Quality,
    #[serde(flatten)]
    pub stats: WeaponStatsDoc<'a>,
}

/// One record of `items.json`.
#[derive(Debug, Serialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum ItemDoc<'a> {
    Armor(&'a FlatArmor<'a>),
    Weapon(&'a FlatWeapon<'a>),
}

/// All export documents, borrowing from the stored records.
#[derive(Debug)]
pub struct Exports<'a> {
    pub gear_sets: Vec<GearSetDoc<'a>>,
    pub armor: Vec<FlatArmor<'a>>,
    pub weapons: Vec<FlatWeapon<'a>>,
}

impl<'a> Exports<'a> {
    pub fn build(gear: &'a [GearTier]) -> Self {
        let mut ids = IdAllocator::default();
        let mut exports = Exports {
            gear_sets: Vec::with_capacity(gear.len()),
            armor: Vec::new(),
            weapons: Vec::new(),
        };

        for set in gear {
            exports.gear_sets.push(GearSetDoc {
                name: &set.name,
                tier: set.tier,
                level: set.level,
                armor_pieces: armor_by_slot(&set.armor),
                weapons: weapons_by_type(&set.weapons),
                bonus_stats: &set.bonus_stats,
            });

            exports
                .armor
                .extend(set.armor.iter().map(|piece| flat_armor(set, piece, &mut ids)));
            exports
                .weapons
                .extend(set.weapons.iter().map(|weapon| flat_weapon(set, weapon, &mut ids)));
        }

        exports
    }

    pub fn items(&self) -> Vec<ItemDoc<'_>> {
        self.armor
            .iter()
            .map(ItemDoc::Armor)
            .chain(self.weapons.iter().map(ItemDoc::Weapon))
            .collect()
    }

    pub fn summary(&self) -> ExportSummary {
        ExportSummary {
            gear_sets: self.gear_sets.len(),
            armor: self.armor.len(),
            weapons: self.weapons.len(),
        }
    }
}

/// Read every stored gear set and write the export documents.
pub async fn run_export(store: &dyn GearStore, output: &LocalStorage) -> Result<ExportSummary> {
    let gear = store.load_all().await?;
    let exports = Exports::build(&gear);

    output.write_json(GEAR_SETS_FILE, &exports.gear_sets).await?;
    output.write_json(ARMOR_FILE, &exports.armor).await?;
    output.write_json(WEAPONS_FILE, &exports.weapons).await?;
    output.write_json(ITEMS_FILE, &exports.items()).await?;

    let summary = exports.summary();
    log::sub_item(&format!(
        "{} ({} gear sets)",
        output.path(GEAR_SETS_FILE).display(),
        summary.gear_sets
    ));
    log::sub_item(&format!(
        "{} ({} armor entries)",
        output.path(ARMOR_FILE).display(),
        summary.armor
    ));
    log::sub_item(&format!(
        "{} ({} weapon entries)",
        output.path(WEAPONS_FILE).display(),
        summary.weapons
    ));
    log::sub_item(&format!(
        "{} ({} items)",
        output.path(ITEMS_FILE).display(),
        summary.armor + summary.weapons
    ));

    Ok(summary)
}

/// Group armor by slot in first-seen order, then by quality.
fn armor_by_slot(armor: &[ArmorPiece]) -> Vec<ArmorSlotDoc<'_>> {
    let mut slots: Vec<ArmorSlotDoc<'_>> = Vec::new();
    for piece in armor {
        let index = match slots.iter().position(|doc| doc.slot == piece.slot) {
            Some(index) => index,
            None => {
                slots.push(ArmorSlotDoc {
                    slot: &piece.slot,
                    normal: VariantList::default(),
                    excellent: VariantList::default(),
                });
                slots.len() - 1
            }
        };
        let variant = ArmorVariantDoc {
            classes: &piece.allowed_classes,
            item_name: &piece.item_name,
            stats: &piece.base_stats,
        };
        match piece.quality {
            Quality::Normal => slots[index].normal.variants.push(variant),
            Quality::Excellent => slots[index].excellent.variants.push(variant),
        }
    }
    slots
}

/// Group weapons by (class, weapon type) in first-seen order.
fn weapons_by_type(weapons: &[WeaponEntry]) -> Vec<WeaponGroupDoc<'_>> {
    let mut groups: Vec<WeaponGroupDoc<'_>> = Vec::new();
    for weapon in weapons {
        let index = match groups
            .iter()
            .position(|g| g.class == weapon.class_id && g.weapon_type == weapon.weapon_type)
        {
            Some(index) => index,
            None => {
                groups.push(WeaponGroupDoc {
                    class: &weapon.class_id,
                    weapon_type: &weapon.weapon_type,
                    normal: None,
                    excellent: None,
                });
                groups.len() - 1
            }
        };
        let stats = Some(WeaponStatsDoc::from(weapon));
        match weapon.quality {
            Quality::Normal => groups[index].normal = stats,
            Quality::Excellent => groups[index].excellent = stats,
        }
    }
    groups
}

fn flat_armor<'a>(set: &'a GearTier, piece: &'a ArmorPiece, ids: &mut IdAllocator) -> FlatArmor<'a> {
    let id = ids.allocate(
        &record_id(&set.name, &piece.item_name, piece.quality),
        &piece.allowed_classes.join("-"),
    );
    FlatArmor {
        id,
        gear_set: &set.name,
        tier: set.tier,
        level: set.level,
        slot: &piece.slot,
        quality: piece.quality,
        classes: &piece.allowed_classes,
        item_name: &piece.item_name,
        stats: &piece.base_stats,
    }
}

fn flat_weapon<'a>(
    set: &'a GearTier,
    weapon: &'a WeaponEntry,
    ids: &mut IdAllocator,
) -> FlatWeapon<'a> {
    let id = ids.allocate(
        &record_id(&set.name, &weapon.item_name, weapon.quality),
        &weapon.class_id,
    );
    FlatWeapon {
        id,
        gear_set: &set.name,
        tier: set.tier,
        level: set.level,
        class: &weapon.class_id,
        weapon_type: &weapon.weapon_type,
        quality: weapon.quality,
        stats: WeaponStatsDoc::from(weapon),
    }
}

/// `{gear_set}-{normalized item name}-{Quality}`
pub fn record_id(gear_set: &str, item_name: &str, quality: Quality) -> String {
    format!("{}-{}-{}", slugify(gear_set), slugify(item_name), quality.label())
}

/// Hands out unique ids, qualifying repeats.
#[derive(Debug, Default)]
struct IdAllocator {
    taken: HashSet<String>,
}

impl IdAllocator {
    /// `base`, else `base-{qualifier}`, else that with a counter.
    fn allocate(&mut self, base: &str, qualifier: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let qualified = format!("{}-{}", base, slugify(qualifier));
        let mut candidate = qualified.clone();
        let mut n = 2;
        while !self.taken.insert(candidate.clone()) {
            candidate = format!("{qualified}-{n}");
            n += 1;
        }
        candidate
    }
}
