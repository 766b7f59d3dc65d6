// src/services/decoder/wikitext.rs

//! Decoder for JSON-wrapped wikitext.
//!
//! The wrapper is `{ "title": "...", "source": "..." }`. Sections are found by
//! `== heading ==` lines and tables by the `{| ... |}` pseudo-table syntax:
//! `|-` ends a row, `|`/`||` separate data cells, `!`/`!!` header cells.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{Cell, RawDocument, RawTable, assemble_table, normalize_whitespace};
use crate::error::DocumentError;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(={1,6})\s*(.+?)\s*={1,6}\s*$").expect("valid heading pattern"));
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[(?:[^\]|]*\|)?([^\]|]*)\]\]").expect("valid internal link pattern")
});
static EXTERNAL_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[https?://\S+\s+([^\]]+)\]").expect("valid external link pattern")
});
static TEMPLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^{}]*\}\}").expect("valid template pattern"));
static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid line break pattern"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

/// Reads the `source` field of a JSON wrapper as wikitext.
#[derive(Debug, Clone, Copy, Default)]
pub struct WikitextDecoder;

impl WikitextDecoder {
    pub fn decode(&self, fallback_title: &str, content: &str) -> Result<RawDocument, DocumentError> {
        let wrapper: Value = serde_json::from_str(content)?;

        let source = wrapper
            .get("source")
            .or_else(|| wrapper.get("content"))
            .and_then(Value::as_str)
            .ok_or(DocumentError::MissingField("source"))?;

        let title = wrapper
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(fallback_title);

        Ok(parse_wikitext(title, source))
    }
}

/// Parse raw wikitext into titled tables.
pub fn parse_wikitext(title: &str, source: &str) -> RawDocument {
    let mut heading = String::new();
    let mut tables = Vec::new();
    let mut open: Option<TableBuilder> = None;
    let mut nested = 0usize;

    for raw in source.lines() {
        let line = raw.trim();

        let Some(table) = open.as_mut() else {
            if line.starts_with("{|") {
                open = Some(TableBuilder::new(heading.clone()));
            } else if let Some(caps) = HEADING_RE.captures(line) {
                heading = clean_text(&caps[2]);
            }
            continue;
        };

        // Nested tables are skipped whole.
        if line.starts_with("{|") {
            nested += 1;
            continue;
        }
        if line.starts_with("|}") {
            if nested > 0 {
                nested -= 1;
            } else if let Some(done) = open.take() {
                tables.push(done.finish());
            }
            continue;
        }
        if nested > 0 {
            continue;
        }

        if let Some(rest) = line.strip_prefix("|+") {
            table.caption = Some(clean_cell(rest)).filter(|c| !c.is_empty());
        } else if line.starts_with("|-") {
            table.end_row();
        } else if let Some(rest) = line.strip_prefix('!') {
            for part in rest.split("!!").flat_map(|p| p.split("||")) {
                table.push_cell(true, part);
            }
        } else if let Some(rest) = line.strip_prefix('|') {
            for part in rest.split("||") {
                table.push_cell(false, part);
            }
        } else {
            table.continue_cell(line);
        }
    }

    // An unterminated table still yields its rows.
    if let Some(table) = open {
        tables.push(table.finish());
    }

    log::debug!("{}: {} table(s) found in wikitext", title, tables.len());

    RawDocument {
        title: title.to_string(),
        text: clean_text(source),
        tables,
    }
}

/// Accumulates the cells of one `{| ... |}` block.
struct TableBuilder {
    heading: String,
    caption: Option<String>,
    lines: Vec<Vec<Cell>>,
    current: Vec<Cell>,
}

impl TableBuilder {
    fn new(heading: String) -> Self {
        Self {
            heading,
            caption: None,
            lines: Vec::new(),
            current: Vec::new(),
        }
    }

    fn push_cell(&mut self, header: bool, raw: &str) {
        self.current.push(Cell {
            header,
            text: clean_cell(raw),
        });
    }

    /// A line without a leading cell token continues the previous cell.
    fn continue_cell(&mut self, line: &str) {
        let text = clean_cell(line);
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.current.last_mut() {
            last.text = normalize_whitespace(&format!("{} {}", last.text, text));
        }
    }

    fn end_row(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        }
    }

    fn finish(mut self) -> RawTable {
        self.end_row();
        let title = self.caption.take().unwrap_or(self.heading);
        assemble_table(title, self.lines)
    }
}

/// Strip markup from one cell, dropping a leading attribute block
/// (`style="..." | value`).
fn clean_cell(raw: &str) -> String {
    let text = strip_links(raw);
    let text = strip_templates(&text);
    let text = match text.split_once('|') {
        Some((attrs, value)) if attrs.contains('=') => value.to_string(),
        _ => text,
    };
    strip_inline(&text)
}

/// Page text for marker searches. Template parameters are kept as words so
/// `{{Gear|tier=3}}` still reads as "tier=3".
fn clean_text(raw: &str) -> String {
    let text = strip_links(raw)
        .replace("{{", " ")
        .replace("}}", " ")
        .replace('|', " ");
    strip_inline(&text)
}

fn strip_links(raw: &str) -> String {
    let text = LINK_RE.replace_all(raw, "$1");
    EXTERNAL_LINK_RE.replace_all(&text, "$1").into_owned()
}

fn strip_templates(raw: &str) -> String {
    let mut text = raw.to_string();
    // Innermost templates first, so nesting unwinds one level per pass.
    while TEMPLATE_RE.is_match(&text) {
        text = TEMPLATE_RE.replace_all(&text, "").into_owned();
    }
    text
}

/// Remove bold/italic quotes, tags and common entities.
fn strip_inline(raw: &str) -> String {
    let text = BREAK_RE.replace_all(raw, " ");
    let text = TAG_RE.replace_all(&text, "");
    let text = text
        .replace("'''", "")
        .replace("''", "")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");
    normalize_whitespace(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"Steel gear is a set of equipment. {{GearInfo|tier=2}}

== Bonus Stats ==
{| class="wikitable"
! Type !! Attack Speed !! Strength !! Vitality
|-
! Armor
| - || 2 || 4
|-
! Ex. Armor
| 3% || 3 || 6
|}

== Armors ==
{| class="wikitable"
|+ All Classes Armors
! Guardian / Warrior / Rogue !! Sorcerer !! HP
|-
| '''[[Steel Helm]]''' || [[Steel Hood|Steel Hood]] || 220<br/>250<br/>280
|-
| style="background:#eee" | Ex. Steel Helm || Ex. Steel Hood
| 300/340/380
|}

=== Warrior Weapons ===
{| class="wikitable"
! Weapon !! Damage
|-
| Steel Sword || 30/35/40
|-
|
{| class="wikitable"
| nested 1
|}
|}
"#;

    fn wrapped(source: &str) -> String {
        serde_json::json!({ "title": "Steel Gear", "source": source }).to_string()
    }

    #[test]
    fn test_decode_wrapper() {
        let doc = WikitextDecoder.decode("fallback", &wrapped(SOURCE)).unwrap();
        assert_eq!(doc.title, "Steel Gear");
        assert_eq!(doc.tables.len(), 3);
        assert!(doc.text.contains("tier=2"));
    }

    #[test]
    fn test_titles_from_headings_and_captions() {
        let doc = parse_wikitext("Steel Gear", SOURCE);
        let titles: Vec<&str> = doc.tables.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["Bonus Stats", "All Classes Armors", "Warrior Weapons"]);
    }

    #[test]
    fn test_row_markers_in_bonus_table() {
        let doc = parse_wikitext("Steel Gear", SOURCE);
        let bonus = &doc.tables[0];
        assert_eq!(bonus.header, ["Type", "Attack Speed", "Strength", "Vitality"]);
        assert_eq!(bonus.rows.len(), 2);
        assert_eq!(bonus.rows[0].marker.as_deref(), Some("Armor"));
        assert_eq!(bonus.rows[0].cells, ["-", "2", "4"]);
        assert_eq!(bonus.rows[1].marker.as_deref(), Some("Ex. Armor"));
    }

    #[test]
    fn test_cells_are_stripped_of_markup() {
        let doc = parse_wikitext("Steel Gear", SOURCE);
        let armor = &doc.tables[1];
        assert_eq!(armor.rows[0].cells, ["Steel Helm", "Steel Hood", "220 250 280"]);
        // Attribute block dropped; the stat cell sits on its own line.
        assert_eq!(
            armor.rows[1].cells,
            ["Ex. Steel Helm", "Ex. Steel Hood", "300/340/380"]
        );
    }

    #[test]
    fn test_nested_table_is_skipped() {
        let doc = parse_wikitext("Steel Gear", SOURCE);
        let weapons = &doc.tables[2];
        assert_eq!(weapons.rows[0].cells, ["Steel Sword", "30/35/40"]);
        assert_eq!(weapons.rows[1].cells, [""]);
    }

    #[test]
    fn test_missing_source_field() {
        let err = WikitextDecoder
            .decode("x", r#"{"title": "Steel Gear"}"#)
            .unwrap_err();
        assert!(matches!(err, DocumentError::MissingField("source")));
    }

    #[test]
    fn test_invalid_json() {
        let err = WikitextDecoder.decode("x", "not json").unwrap_err();
        assert!(matches!(err, DocumentError::InvalidJson(_)));
    }

    #[test]
    fn test_title_falls_back() {
        let content = serde_json::json!({ "source": "no tables" }).to_string();
        let doc = WikitextDecoder.decode("Bronze Gear", &content).unwrap();
        assert_eq!(doc.title, "Bronze Gear");
        assert!(doc.tables.is_empty());
    }

    #[test]
    fn test_missing_section_yields_no_tables() {
        let doc = parse_wikitext("x", "== Armors ==\nNo data yet.\n");
        assert!(doc.tables.is_empty());
    }

    #[test]
    fn test_clean_cell_templates_and_links() {
        assert_eq!(clean_cell("{{Icon|{{Sword}}}} [[Items/Sword|Sword]]"), "Sword");
        assert_eq!(clean_cell("colspan=2 | ''Bronze''"), "Bronze");
        assert_eq!(clean_cell("[https://example.com the site]"), "the site");
    }
}
