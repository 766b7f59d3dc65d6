// src/services/classify.rs

//! Classification rules: names, quality, slots, classes, tiers and columns.
//!
//! Everything here is a pure function of the configured rules and lookup
//! tables, so the same document always classifies the same way.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ExtractionConfig, LookupTables, Quality};
use crate::services::NumericParser;

static TIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btier\s*[:=]?\s*(\d+)").expect("valid tier pattern"));
static LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:level|lv\.?)\s*[:=]?\s*(\d+)").expect("valid level pattern")
});

/// Field names exported next to armor stats; a stat header matching one is
/// stored under a `stat_` prefix.
const RESERVED_STAT_KEYS: &[&str] = &[
    "id",
    "gear_set",
    "tier",
    "level",
    "slot",
    "quality",
    "classes",
    "item_name",
    "category",
];

/// What a table holds, judged from its title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section {
    Bonus,
    Armor,
    /// Weapon table, with the class named in the title if any
    Weapons { class: Option<String> },
}

/// Meaning of a column, judged from its header label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    /// Item or row name
    Label,
    /// Item column for the listed classes
    Classes(Vec<String>),
    /// Cells hold class lists
    ClassColumn,
    Stat(StatKind),
    /// No header, or an empty one
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatKind {
    Hp,
    Damage,
    AttackSpeed,
    BonusAttackSpeed,
    Strength,
    Vitality,
    /// Any other stat, keyed by its snake_case header
    Other(String),
}

impl StatKind {
    /// Key used in `base_stats`.
    pub fn key(&self) -> &str {
        match self {
            StatKind::Hp => "hp",
            StatKind::Damage => "damage",
            StatKind::AttackSpeed => "attack_speed",
            StatKind::BonusAttackSpeed => "bonus_attack_speed",
            StatKind::Strength => "strength",
            StatKind::Vitality => "vitality",
            StatKind::Other(key) => key,
        }
    }
}

/// Applies the extraction rules and lookup tables to decoded text.
#[derive(Debug, Clone)]
pub struct Classifier<'a> {
    rules: &'a ExtractionConfig,
    lookup: &'a LookupTables,
    numbers: NumericParser,
}

impl<'a> Classifier<'a> {
    pub fn new(rules: &'a ExtractionConfig, lookup: &'a LookupTables) -> Self {
        Self {
            rules,
            lookup,
            numbers: NumericParser::from_config(rules),
        }
    }

    pub fn numbers(&self) -> &NumericParser {
        &self.numbers
    }

    /// Gear-set name from a page title or file stem.
    ///
    /// `Bronze Gear - Eterspire Wiki` and `Bronze_Gear` both give `Bronze`.
    pub fn gear_name(&self, title: &str) -> Option<String> {
        let title = title.replace('_', " ");
        let mut name = title.trim();

        let suffix = self.rules.site_suffix.trim();
        if !suffix.is_empty() {
            if let Some(rest) = strip_suffix_ignore_case(name, suffix) {
                name = rest.trim_end();
            }
        }

        if let Some(rest) = strip_suffix_ignore_case(name, "gear") {
            if rest.ends_with(char::is_whitespace) && !rest.trim().is_empty() {
                name = rest.trim_end();
            }
        }

        let name = collapse(name);
        (!name.is_empty()).then_some(name)
    }

    /// True when `text` carries the excellence marker or reads "excellent".
    pub fn marks_excellent(&self, text: &str) -> bool {
        let lower = text.to_ascii_lowercase();
        let marker = self.rules.excellence_marker.trim().to_ascii_lowercase();
        (!marker.is_empty() && !token_positions(&lower, &marker).is_empty())
            || words(&lower).any(|word| word == "excellent")
    }

    /// Remove every excellence marker from a display name.
    pub fn strip_marker(&self, name: &str) -> String {
        let marker = self.rules.excellence_marker.trim();
        if marker.is_empty() {
            return collapse(name);
        }
        let lower = name.to_ascii_lowercase();
        let mut out = String::with_capacity(name.len());
        let mut last = 0;
        for start in token_positions(&lower, &marker.to_ascii_lowercase()) {
            out.push_str(&name[last..start]);
            out.push(' ');
            last = start + marker.len();
        }
        out.push_str(&name[last..]);
        collapse(&out)
    }

    /// Quality of an item, given its name and the row context (marker,
    /// sub-header). Returns the name with the marker stripped.
    pub fn quality(&self, name: &str, context: &[&str]) -> (Quality, String) {
        let excellent =
            self.marks_excellent(name) || context.iter().any(|text| self.marks_excellent(text));
        let quality = if excellent {
            Quality::Excellent
        } else {
            Quality::Normal
        };
        (quality, self.strip_marker(name))
    }

    /// Slot for an item through the lookup table, gear-set prefix removed.
    pub fn mapped_slot(&self, item_name: &str, gear_name: &str) -> Option<String> {
        let bare = strip_prefix_word(item_name, gear_name);
        self.lookup
            .slot_for(bare)
            .or_else(|| self.lookup.slot_for(item_name))
            .map(str::to_string)
    }

    /// Slot id for a name the lookup table does not know.
    pub fn fallback_slot(&self, item_name: &str) -> String {
        item_name
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Split a class-list cell into canonical class names, keeping order.
    pub fn class_list(&self, cell: &str) -> Vec<String> {
        let mut classes: Vec<String> = Vec::new();
        for token in cell.split(self.separator()) {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let class = self.canonical_class(token).unwrap_or(token).to_string();
            if !classes.contains(&class) {
                classes.push(class);
            }
        }
        classes
    }

    /// The class list in `cell`, only if every token is a known class.
    pub fn class_group(&self, cell: &str) -> Option<Vec<String>> {
        let tokens: Vec<&str> = cell
            .split(self.separator())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.is_empty() || tokens.iter().any(|t| self.canonical_class(t).is_none()) {
            return None;
        }
        Some(self.class_list(cell))
    }

    /// Known classes mentioned as words in `text`, in order of appearance.
    pub fn class_mentions(&self, text: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for word in words(text) {
            if let Some(class) = self.canonical_class(word) {
                if !found.iter().any(|c| c == class) {
                    found.push(class.to_string());
                }
            }
        }
        found
    }

    /// Tier from an explicit marker in the page text, else the name table.
    pub fn tier(&self, text: &str, gear_name: &str) -> Option<u32> {
        TIER_RE
            .captures(text)
            .and_then(|caps| caps[1].parse().ok())
            .filter(|tier| *tier > 0)
            .or_else(|| self.lookup.tier_for(gear_name))
    }

    /// Level from an explicit marker, else derived from the tier.
    pub fn level(&self, text: &str, tier: Option<u32>) -> Option<u32> {
        LEVEL_RE
            .captures(text)
            .and_then(|caps| caps[1].parse().ok())
            .or_else(|| tier.and_then(|tier| self.lookup.level_for(tier)))
    }

    /// Weapon type: the display name without the gear-set prefix.
    pub fn weapon_type(&self, item_name: &str, gear_name: &str) -> String {
        strip_prefix_word(item_name, gear_name).to_string()
    }

    pub fn attack_speed(&self, explicit: Option<i64>, weapon_type: &str) -> Option<i64> {
        explicit.or_else(|| self.lookup.attack_speed_for(weapon_type))
    }

    /// Section of a table from its title. An unrecognized first table is the
    /// bonus table.
    pub fn section(&self, title: &str, index: usize) -> Option<Section> {
        let lower = title.to_lowercase();
        let mentions = self.class_mentions(title);

        if lower.contains("bonus") {
            Some(Section::Bonus)
        } else if lower.contains("weapon") {
            Some(Section::Weapons {
                class: mentions.into_iter().next(),
            })
        } else if lower.contains("armor") || lower.contains("armour") {
            Some(Section::Armor)
        } else if !mentions.is_empty() {
            Some(Section::Weapons {
                class: mentions.into_iter().next(),
            })
        } else if index == 0 {
            Some(Section::Bonus)
        } else {
            None
        }
    }

    /// Kind of a column from its header label.
    pub fn column(&self, header: &str) -> ColumnKind {
        let lower = header.trim().to_lowercase();
        if lower.is_empty() {
            return ColumnKind::Unknown;
        }

        let mentions = self.class_mentions(header);
        if !mentions.is_empty() {
            return ColumnKind::Classes(mentions);
        }

        let words: Vec<&str> = words(&lower).collect();
        let has = |w: &str| words.contains(&w);
        let starts = |p: &str| words.iter().any(|w| w.starts_with(p));

        if has("class") || has("classes") {
            ColumnKind::ClassColumn
        } else if (has("speed") || has("spd") || has("aspd")) && has("bonus") {
            ColumnKind::Stat(StatKind::BonusAttackSpeed)
        } else if has("speed") || has("spd") || has("aspd") {
            ColumnKind::Stat(StatKind::AttackSpeed)
        } else if has("hp") || has("health") {
            ColumnKind::Stat(StatKind::Hp)
        } else if has("damage") || has("dmg") || has("atk") || has("attack") {
            ColumnKind::Stat(StatKind::Damage)
        } else if starts("str") {
            ColumnKind::Stat(StatKind::Strength)
        } else if starts("vit") {
            ColumnKind::Stat(StatKind::Vitality)
        } else if words.iter().any(|w| {
            matches!(
                *w,
                "item" | "items" | "name" | "weapon" | "weapons" | "armor" | "armour" | "type"
                    | "piece" | "slot" | "equipment"
            )
        }) {
            ColumnKind::Label
        } else if words.is_empty() {
            ColumnKind::Unknown
        } else {
            ColumnKind::Stat(StatKind::Other(stat_key(&words)))
        }
    }

    /// True for cells holding only numbers (and their `K`/`%` decorations).
    pub fn is_numeric(&self, cell: &str) -> bool {
        self.numbers.parse(cell).is_some()
            && !cell
                .chars()
                .any(|c| c.is_alphabetic() && !matches!(c, 'k' | 'K'))
    }

    /// True for empty cells and the placeholder.
    pub fn is_blank(&self, cell: &str) -> bool {
        let cell = cell.trim();
        cell.is_empty() || cell == self.rules.placeholder
    }

    pub fn default_class_groups(&self) -> &[Vec<String>] {
        &self.rules.default_class_groups
    }

    pub fn separator(&self) -> &str {
        self.rules.class_separator.as_str()
    }

    fn canonical_class(&self, token: &str) -> Option<&'a str> {
        self.rules
            .classes
            .iter()
            .find(|class| class.eq_ignore_ascii_case(token))
            .map(String::as_str)
    }
}

/// Byte offsets where `token` starts a word in `haystack`.
fn token_positions(haystack: &str, token: &str) -> Vec<usize> {
    haystack
        .match_indices(token)
        .map(|(start, _)| start)
        .filter(|start| {
            !haystack[..*start]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric)
        })
        .collect()
}

fn stat_key(words: &[&str]) -> String {
    let key = words.join("_");
    if RESERVED_STAT_KEYS.contains(&key.as_str()) {
        format!("stat_{key}")
    } else {
        key
    }
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_suffix_ignore_case<'t>(text: &'t str, suffix: &str) -> Option<&'t str> {
    let split = text.len().checked_sub(suffix.len())?;
    if !text.is_char_boundary(split) || !text[split..].eq_ignore_ascii_case(suffix) {
        return None;
    }
    Some(&text[..split])
}

/// `name` without a leading `prefix` word; unchanged when that would leave
/// nothing.
fn strip_prefix_word<'t>(name: &'t str, prefix: &str) -> &'t str {
    let name = name.trim();
    let prefix = prefix.trim();
    if prefix.is_empty() || name.len() <= prefix.len() || !name.is_char_boundary(prefix.len()) {
        return name;
    }
    let (head, rest) = name.split_at(prefix.len());
    if head.eq_ignore_ascii_case(prefix) && rest.starts_with(char::is_whitespace) {
        let rest = rest.trim();
        if !rest.is_empty() {
            return rest;
        }
    }
    name
}
