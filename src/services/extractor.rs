// src/services/extractor.rs

//! Turns a decoded document into one canonical `GearTier`.

use std::collections::BTreeMap;

use crate::error::DocumentError;
use crate::models::{
    ArmorPiece, BonusStats, Category, ExtractionConfig, GearTier, LookupTables, Quality,
    StatValues, WeaponEntry,
};
use crate::services::classify::{Classifier, ColumnKind, Section, StatKind};
use crate::services::decoder::{RawDocument, RawRow, RawTable};

/// Stat order assumed for armor cells without a usable header.
static ARMOR_POSITIONS: [StatKind; 3] = [
    StatKind::Hp,
    StatKind::BonusAttackSpeed,
    StatKind::Strength,
];
/// Stat order assumed for weapon cells without a usable header.
static WEAPON_POSITIONS: [StatKind; 3] = [
    StatKind::Damage,
    StatKind::BonusAttackSpeed,
    StatKind::Vitality,
];
/// Stat order assumed for bonus cells without a usable header.
static BONUS_POSITIONS: [StatKind; 3] = [
    StatKind::AttackSpeed,
    StatKind::Strength,
    StatKind::Vitality,
];

/// Result of extracting one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub gear: GearTier,
    /// Rows skipped for lacking a name or any usable stat
    pub dropped_rows: usize,
}

/// Builds gear sets from decoded documents.
#[derive(Debug, Clone)]
pub struct GearExtractor<'a> {
    classifier: Classifier<'a>,
}

impl<'a> GearExtractor<'a> {
    pub fn new(rules: &'a ExtractionConfig, lookup: &'a LookupTables) -> Self {
        Self {
            classifier: Classifier::new(rules, lookup),
        }
    }

    /// Extract one gear set. Calling this twice on the same document gives
    /// the same record.
    pub fn extract(&self, doc: &RawDocument) -> Result<Extraction, DocumentError> {
        let name = self
            .classifier
            .gear_name(&doc.title)
            .ok_or(DocumentError::MissingName)?;

        let mut gear = GearTier::new(name);
        gear.tier = self.classifier.tier(&doc.text, &gear.name);
        gear.level = self.classifier.level(&doc.text, gear.tier);

        let mut dropped_rows = 0;
        for (index, table) in doc.tables.iter().enumerate() {
            match self.classifier.section(&table.title, index) {
                Some(Section::Bonus) => dropped_rows += self.read_bonus(table, &mut gear),
                Some(Section::Armor) => dropped_rows += self.read_armor(table, &mut gear),
                Some(Section::Weapons { class }) => {
                    dropped_rows += self.read_weapons(table, class.as_deref(), &mut gear)
                }
                None => log::debug!("{}: skipping table '{}'", gear.name, table.title),
            }
        }

        log::debug!(
            "{}: tier {:?}, level {:?}, {} armor, {} weapons, {} dropped row(s)",
            gear.name,
            gear.tier,
            gear.level,
            gear.armor.len(),
            gear.weapons.len(),
            dropped_rows
        );

        Ok(Extraction { gear, dropped_rows })
    }

    /// Armor rows become one piece per class-group variant. Returns the
    /// number of dropped rows.
    fn read_armor(&self, table: &RawTable, gear: &mut GearTier) -> usize {
        let mut dropped = 0;
        // Class groups set by an in-table row such as `Guardian / Warrior | Sorcerer`
        let mut column_groups: Option<Vec<Option<Vec<String>>>> = None;

        for row in &table.rows {
            if too_short(row) {
                dropped += 1;
                continue;
            }

            let groups: Vec<Option<Vec<String>>> = row
                .cells
                .iter()
                .map(|cell| self.classifier.class_group(cell))
                .collect();
            if groups.iter().any(Option::is_some)
                && row
                    .cells
                    .iter()
                    .zip(&groups)
                    .all(|(cell, group)| group.is_some() || self.classifier.is_blank(cell))
            {
                column_groups = Some(groups);
                continue;
            }

            match self.armor_row(table, row, column_groups.as_deref(), &gear.name) {
                Some(pieces) => gear.armor.extend(pieces),
                None => dropped += 1,
            }
        }
        dropped
    }

    fn armor_row(
        &self,
        table: &RawTable,
        row: &RawRow,
        column_groups: Option<&[Option<Vec<String>>]>,
        gear_name: &str,
    ) -> Option<Vec<ArmorPiece>> {
        let kinds = self.kinds(table, row);
        let separator = self.classifier.separator();
        let defaults = self.classifier.default_class_groups();

        let mut row_classes: Option<Vec<String>> = None;
        let mut items: Vec<(Vec<String>, &str)> = Vec::new();
        let mut stats: BTreeMap<String, StatValues> = BTreeMap::new();
        let mut positions = ARMOR_POSITIONS.iter();
        let mut next_default = 0;
        let mut in_stats = false;

        for (i, (cell, kind)) in row.cells.iter().zip(&kinds).enumerate() {
            match kind {
                ColumnKind::Stat(stat) => {
                    in_stats = true;
                    if let Some(values) = self.classifier.numbers().parse(cell) {
                        stats.insert(armor_key(stat).to_string(), values);
                    }
                }
                ColumnKind::ClassColumn => {
                    let classes = self.classifier.class_list(cell);
                    if !classes.is_empty() {
                        row_classes = Some(classes);
                    }
                }
                ColumnKind::Label | ColumnKind::Unknown | ColumnKind::Classes(_) => {
                    let numeric = self.classifier.is_numeric(cell);
                    let blank = self.classifier.is_blank(cell);

                    if numeric || (blank && in_stats && !matches!(kind, ColumnKind::Classes(_))) {
                        // Positional stat column
                        in_stats = true;
                        let stat = positions.next()?;
                        if let Some(values) = self.classifier.numbers().parse(cell) {
                            stats.insert(stat.key().to_string(), values);
                        }
                        continue;
                    }

                    let explicit = match kind {
                        ColumnKind::Classes(classes) => Some(classes.clone()),
                        _ => column_groups
                            .and_then(|groups| groups.get(i).cloned().flatten()),
                    };

                    match explicit {
                        Some(classes) => {
                            if !blank {
                                items.push((classes, cell.as_str()));
                            }
                        }
                        // `Bronze Helm / Bronze Hood` holds one variant per default group.
                        None => {
                            for part in cell.split(separator) {
                                let part = part.trim();
                                let group = defaults.get(next_default)?;
                                next_default += 1;
                                if !self.classifier.is_blank(part) {
                                    items.push((group.clone(), part));
                                }
                            }
                        }
                    }
                }
            }
        }

        if items.is_empty() || stats.is_empty() {
            return None;
        }

        let mut context: Vec<&str> = Vec::new();
        context.extend(row.marker.as_deref());
        context.extend(row.group.as_deref());
        let excellent = items
            .iter()
            .any(|(_, name)| self.classifier.marks_excellent(name))
            || context.iter().any(|text| self.classifier.marks_excellent(text));
        let quality = if excellent {
            Quality::Excellent
        } else {
            Quality::Normal
        };

        let names: Vec<String> = items
            .iter()
            .map(|(_, name)| self.classifier.strip_marker(name))
            .collect();

        let slot = names
            .iter()
            .find_map(|name| self.classifier.mapped_slot(name, gear_name))
            .unwrap_or_else(|| self.classifier.fallback_slot(&names[0]));

        Some(
            items
                .into_iter()
                .zip(names)
                .map(|((classes, _), item_name)| ArmorPiece {
                    slot: slot.clone(),
                    quality,
                    allowed_classes: row_classes.clone().unwrap_or(classes),
                    item_name,
                    base_stats: stats.clone(),
                })
                .collect(),
        )
    }

    /// Weapon rows become one entry per class. Returns the number of dropped
    /// rows.
    fn read_weapons(&self, table: &RawTable, class: Option<&str>, gear: &mut GearTier) -> usize {
        let mut dropped = 0;
        for row in &table.rows {
            if too_short(row) {
                dropped += 1;
                continue;
            }
            match self.weapon_row(table, row, class, &gear.name) {
                Some(entries) => entries.into_iter().for_each(|w| gear.upsert_weapon(w)),
                None => dropped += 1,
            }
        }
        dropped
    }

    fn weapon_row(
        &self,
        table: &RawTable,
        row: &RawRow,
        section_class: Option<&str>,
        gear_name: &str,
    ) -> Option<Vec<WeaponEntry>> {
        let kinds = self.kinds(table, row);
        let numbers = self.classifier.numbers();

        let mut name: Option<&str> = None;
        let mut classes: Vec<String> = Vec::new();
        let mut damage = None;
        let mut attack_speed = None;
        let mut bonus_attack_speed = None;
        let mut vitality = None;
        let mut positions = WEAPON_POSITIONS.iter();

        for (cell, kind) in row.cells.iter().zip(&kinds) {
            let stat = match kind {
                ColumnKind::Stat(stat) => stat,
                ColumnKind::ClassColumn => {
                    classes = self.classifier.class_list(cell);
                    continue;
                }
                _ if self.classifier.is_numeric(cell) => match positions.next() {
                    Some(stat) => stat,
                    None => continue,
                },
                _ => {
                    if name.is_none() && !self.classifier.is_blank(cell) {
                        name = Some(cell.as_str());
                    }
                    continue;
                }
            };

            let values = numbers.parse(cell);
            match stat {
                StatKind::Damage => damage = values,
                // A percentage in a speed column is a bonus, not the base speed.
                StatKind::AttackSpeed if cell.contains('%') => bonus_attack_speed = values,
                StatKind::AttackSpeed => attack_speed = numbers.first(cell),
                StatKind::BonusAttackSpeed => bonus_attack_speed = values,
                StatKind::Vitality => vitality = values,
                _ => {}
            }
        }

        let raw_name = name.or(row.marker.as_deref())?;
        let damage = damage?;

        if classes.is_empty() {
            let class = section_class
                .map(str::to_string)
                .or_else(|| {
                    row.group
                        .as_deref()
                        .and_then(|group| self.classifier.class_mentions(group).into_iter().next())
                })?;
            classes.push(class);
        }

        let mut context: Vec<&str> = Vec::new();
        if name.is_some() {
            context.extend(row.marker.as_deref());
        }
        context.extend(row.group.as_deref());
        let (quality, item_name) = self.classifier.quality(raw_name, &context);

        let weapon_type = self.classifier.weapon_type(&item_name, gear_name);
        let attack_speed = self.classifier.attack_speed(attack_speed, &weapon_type);

        Some(
            classes
                .into_iter()
                .map(|class_id| WeaponEntry {
                    class_id,
                    weapon_type: weapon_type.clone(),
                    item_name: item_name.clone(),
                    quality,
                    damage: damage.clone(),
                    attack_speed,
                    bonus_attack_speed: bonus_attack_speed.clone(),
                    vitality: vitality.clone(),
                })
                .collect(),
        )
    }

    /// Bonus rows are keyed by the quality and category in their label
    /// (`Armor`, `Ex. Weapon`, ...). Returns the number of dropped rows.
    fn read_bonus(&self, table: &RawTable, gear: &mut GearTier) -> usize {
        let mut dropped = 0;
        for row in &table.rows {
            if too_short(row) {
                dropped += 1;
                continue;
            }
            match self.bonus_row(table, row) {
                Some((quality, category, stats)) if !stats.is_empty() => {
                    gear.bonus_stats.insert(quality, category, stats)
                }
                _ => dropped += 1,
            }
        }
        dropped
    }

    fn bonus_row(&self, table: &RawTable, row: &RawRow) -> Option<(Quality, Category, BonusStats)> {
        let kinds = self.kinds(table, row);
        let numbers = self.classifier.numbers();

        let mut label = row.marker.as_deref();
        let mut stats = BonusStats::default();
        let mut positions = BONUS_POSITIONS.iter();

        for (cell, kind) in row.cells.iter().zip(&kinds) {
            let stat = match kind {
                ColumnKind::Stat(stat) => Some(stat),
                _ if label.is_none() && !self.classifier.is_numeric(cell) => {
                    label = Some(cell.as_str());
                    continue;
                }
                _ => positions.next(),
            };
            let Some(stat) = stat else { continue };

            let values = numbers.parse(cell);
            match stat {
                StatKind::AttackSpeed | StatKind::BonusAttackSpeed => stats.attack_speed = values,
                StatKind::Strength => stats.strength = values,
                StatKind::Vitality => stats.vitality = values,
                _ => {}
            }
        }

        let label = label?;
        let lower = label.to_lowercase();
        let category = if lower.contains("weapon") {
            Category::Weapon
        } else if lower.contains("armor") || lower.contains("armour") {
            Category::Armor
        } else {
            return None;
        };

        let context: Vec<&str> = row.group.as_deref().into_iter().collect();
        let (quality, _) = self.classifier.quality(label, &context);

        Some((quality, category, stats))
    }

    /// Column kind for each cell of `row`.
    fn kinds(&self, table: &RawTable, row: &RawRow) -> Vec<ColumnKind> {
        let columns = table.columns_for(row);
        (0..row.cells.len())
            .map(|i| {
                columns
                    .get(i)
                    .map(|header| self.classifier.column(header))
                    .unwrap_or(ColumnKind::Unknown)
            })
            .collect()
    }
}

/// Armor has no base attack speed; a speed column is always a bonus.
fn armor_key(stat: &StatKind) -> &str {
    match stat {
        StatKind::AttackSpeed => "bonus_attack_speed",
        other => other.key(),
    }
}

/// Rows with fewer than two cells, counting the marker, carry no data.
fn too_short(row: &RawRow) -> bool {
    row.cells.len() + usize::from(row.marker.is_some()) < 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LookupConfig;
    use crate::services::decoder::SourceFormat;

    const BRONZE_PAGE: &str = r#"
        <html><body><div id="mw-content-text">
          <p>Bronze gear is the first set of equipment.</p>
          <h2>Bonus Stats</h2>
          <table class="wikitable">
            <tr><th>Type</th><th>Attack Speed</th><th>Strength</th><th>Vitality</th></tr>
            <tr><td>Armor</td><td>-</td><td>2/3/4</td><td>-</td></tr>
            <tr><td>Ex. Armor</td><td>5%</td><td>3/4/5</td><td>-</td></tr>
            <tr><td>Weapon</td><td>-</td><td>-</td><td>-</td></tr>
          </table>
          <h2>All Classes Armors</h2>
          <table class="wikitable">
            <tr><th>Guardian / Warrior / Rogue</th><th>Sorcerer</th><th>HP</th></tr>
            <tr><td>Bronze Helm</td><td>Bronze Hood</td><td>120/150/180</td></tr>
            <tr><td>Ex. Bronze Helm</td><td>Ex. Bronze Hood</td><td>150/180/210</td></tr>
            <tr><td>Bronze Chestplate</td><td>Bronze Robe</td><td>-</td></tr>
            <tr><td>Bronze Amulet</td><td>-</td><td>10.9K</td></tr>
          </table>
          <h3>Guardian Weapons</h3>
          <table class="wikitable">
            <tr><th>Weapon</th><th>Damage</th></tr>
            <tr><td>Bronze Mace</td><td>10/12/14</td></tr>
            <tr><td>Ex. Bronze Mace</td><td>13/15/17</td></tr>
            <tr><td>Bronze Shield</td><td>-</td></tr>
          </table>
          <h3>Warrior Weapons</h3>
          <table class="wikitable">
            <tr><th>Weapon</th><th>Damage</th><th>Attack Speed</th></tr>
            <tr><td>Bronze Greatsword</td><td>20/24/28</td><td>1600</td></tr>
            <tr><td>Bronze Greatsword</td><td>21/25/29</td><td>1600</td></tr>
          </table>
        </div></body></html>
    "#;

    fn extract(title: &str, html: &str) -> Extraction {
        let rules = ExtractionConfig::default();
        let lookup = LookupTables::new(&LookupConfig::default()).unwrap();
        let doc = SourceFormat::Html.decode(title, html).unwrap();
        GearExtractor::new(&rules, &lookup).extract(&doc).unwrap()
    }

    fn bronze() -> Extraction {
        extract("Bronze Gear - Eterspire Wiki", BRONZE_PAGE)
    }

    #[test]
    fn test_two_class_columns_yield_two_helm_variants() {
        let gear = bronze().gear;
        let helms: Vec<&ArmorPiece> = gear
            .armor
            .iter()
            .filter(|p| p.slot == "helm" && p.quality == Quality::Normal)
            .collect();

        assert_eq!(helms.len(), 2);
        assert_eq!(helms[0].item_name, "Bronze Helm");
        assert_eq!(helms[0].allowed_classes, ["Guardian", "Warrior", "Rogue"]);
        assert_eq!(helms[1].item_name, "Bronze Hood");
        assert_eq!(helms[1].allowed_classes, ["Sorcerer"]);
        for helm in helms {
            assert_eq!(helm.base_stats["hp"], vec![120, 150, 180]);
        }
    }

    #[test]
    fn test_excellent_marker_sets_quality_and_is_stripped() {
        let gear = bronze().gear;
        let ex: Vec<&ArmorPiece> = gear
            .armor
            .iter()
            .filter(|p| p.quality == Quality::Excellent)
            .collect();
        assert_eq!(ex.len(), 2);
        assert_eq!(ex[0].item_name, "Bronze Helm");
        assert_eq!(ex[0].slot, "helm");
        assert_eq!(ex[0].base_stats["hp"], vec![150, 180, 210]);
    }

    #[test]
    fn test_rows_without_stats_are_dropped_and_counted() {
        let extraction = bronze();
        // Chestplate row (no hp), Shield row (no damage), empty Weapon bonus row
        assert_eq!(extraction.dropped_rows, 3);
        assert!(!extraction.gear.armor.iter().any(|p| p.slot == "chest"));
    }

    #[test]
    fn test_unmapped_slot_falls_back_to_display_name() {
        let gear = bronze().gear;
        let amulet = gear
            .armor
            .iter()
            .find(|p| p.item_name == "Bronze Amulet")
            .unwrap();
        assert_eq!(amulet.slot, "bronze_amulet");
        assert_eq!(amulet.allowed_classes, ["Guardian", "Warrior", "Rogue"]);
        assert_eq!(amulet.base_stats["hp"], vec![10900]);
    }

    #[test]
    fn test_weapons_per_class_and_quality() {
        let gear = bronze().gear;
        let maces: Vec<&WeaponEntry> = gear
            .weapons
            .iter()
            .filter(|w| w.class_id == "Guardian")
            .collect();
        assert_eq!(maces.len(), 2);
        assert_eq!(maces[0].weapon_type, "Mace");
        assert_eq!(maces[0].attack_speed, Some(1200));
        assert_eq!(maces[1].quality, Quality::Excellent);
        assert_eq!(maces[1].item_name, "Bronze Mace");
    }

    #[test]
    fn test_later_weapon_row_overwrites_in_place() {
        let gear = bronze().gear;
        let swords: Vec<&WeaponEntry> = gear
            .weapons
            .iter()
            .filter(|w| w.class_id == "Warrior")
            .collect();
        assert_eq!(swords.len(), 1);
        assert_eq!(swords[0].damage, vec![21, 25, 29]);
        assert_eq!(swords[0].attack_speed, Some(1600));
    }

    #[test]
    fn test_bonus_stats_by_quality_and_category() {
        let gear = bronze().gear;
        let normal = gear.bonus_stats.get(Quality::Normal, Category::Armor).unwrap();
        assert_eq!(normal.strength, Some(vec![2, 3, 4]));
        assert_eq!(normal.attack_speed, None);

        let ex = gear
            .bonus_stats
            .get(Quality::Excellent, Category::Armor)
            .unwrap();
        assert_eq!(ex.attack_speed, Some(vec![5]));

        // All-placeholder row is omitted
        assert!(gear.bonus_stats.get(Quality::Normal, Category::Weapon).is_none());
    }

    #[test]
    fn test_tier_and_level_from_tables() {
        let gear = bronze().gear;
        assert_eq!(gear.name, "Bronze");
        assert_eq!(gear.tier, Some(1));
        assert_eq!(gear.level, Some(1));

        let steel = extract("Steel Gear", "<html><body></body></html>").gear;
        assert_eq!(steel.tier, Some(2));
        assert_eq!(steel.level, Some(10));
    }

    #[test]
    fn test_high_tier_level_fallback() {
        let page = "<html><body><p>Tier 17 equipment.</p></body></html>";
        let gear = extract("Voidforged Gear", page).gear;
        assert_eq!(gear.tier, Some(17));
        assert_eq!(gear.level, Some(160));
    }

    #[test]
    fn test_single_cell_split_into_default_groups() {
        let page = r#"<html><body>
            <h2>Bonus Stats</h2><table class="wikitable"><tr><th>Type</th></tr></table>
            <h2>Armors</h2>
            <table class="wikitable">
              <tr><td>Bronze Helm / Bronze Hood</td><td>120/150/180</td></tr>
            </table></body></html>"#;
        let gear = extract("Bronze", page).gear;
        assert_eq!(gear.armor.len(), 2);
        assert_eq!(gear.armor[0].allowed_classes, ["Guardian", "Warrior", "Rogue"]);
        assert_eq!(gear.armor[1].allowed_classes, ["Sorcerer"]);
        assert!(gear.armor.iter().all(|p| p.slot == "helm"));
        assert_eq!(gear.armor[1].base_stats["hp"], vec![120, 150, 180]);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        assert_eq!(bronze(), bronze());
    }

    #[test]
    fn test_wikitext_document() {
        let source = "== Armors ==\n{| class=\"wikitable\"\n! Guardian / Warrior / Rogue !! Sorcerer !! HP\n|-\n| [[Steel Helm]] || Steel Hood || 220/250/280\n|}\n";
        let content = serde_json::json!({ "title": "Steel Gear", "source": source }).to_string();
        let rules = ExtractionConfig::default();
        let lookup = LookupTables::new(&LookupConfig::default()).unwrap();
        let doc = SourceFormat::Wikitext.decode("ignored", &content).unwrap();
        let extraction = GearExtractor::new(&rules, &lookup).extract(&doc).unwrap();

        assert_eq!(extraction.gear.name, "Steel");
        assert_eq!(extraction.gear.tier, Some(2));
        assert_eq!(extraction.gear.armor.len(), 2);
        assert_eq!(extraction.gear.armor[0].item_name, "Steel Helm");
    }

    #[test]
    fn test_missing_name_is_an_error() {
        let rules = ExtractionConfig::default();
        let lookup = LookupTables::new(&LookupConfig::default()).unwrap();
        let doc = RawDocument {
            title: " - Eterspire Wiki".into(),
            ..RawDocument::default()
        };
        let err = GearExtractor::new(&rules, &lookup).extract(&doc).unwrap_err();
        assert!(matches!(err, DocumentError::MissingName));
    }
}
