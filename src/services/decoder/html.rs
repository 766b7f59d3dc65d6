// src/services/decoder/html.rs

//! Decoder for rendered HTML exports.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{Cell, RawDocument, RawTable, assemble_table, normalize_whitespace};
use crate::error::DocumentError;

static EDIT_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*edit(?:\s+source)?\s*\]").expect("valid edit link pattern"));

/// Reads `table.wikitable` elements and the headings above them.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDecoder;

impl HtmlDecoder {
    pub fn decode(&self, title: &str, content: &str) -> Result<RawDocument, DocumentError> {
        let document = Html::parse_document(content);
        let outline = Self::parse_selector("h1, h2, h3, h4, table")?;
        let content_root = Self::parse_selector("#mw-content-text")?;

        let text = match document.select(&content_root).next() {
            Some(root) => element_text(root),
            None => element_text(document.root_element()),
        };

        let mut heading = String::new();
        let mut tables = Vec::new();

        // `select` yields elements in document order, so the last heading
        // seen is the one closest above each table.
        for element in document.select(&outline) {
            if element.value().name() != "table" {
                heading = heading_text(element);
                continue;
            }
            if !is_wikitable(element) || is_nested(element) {
                continue;
            }
            let table_title = caption(element).unwrap_or_else(|| heading.clone());
            tables.push(read_table(element, table_title));
        }

        log::debug!("{}: {} table(s) found in HTML", title, tables.len());

        Ok(RawDocument {
            title: title.to_string(),
            text,
            tables,
        })
    }

    fn parse_selector(s: &str) -> Result<Selector, DocumentError> {
        Selector::parse(s)
            .map_err(|e| DocumentError::malformed(format!("invalid selector '{s}': {e:?}")))
    }
}

fn read_table(table: ElementRef<'_>, title: String) -> RawTable {
    let lines = table_rows(table)
        .into_iter()
        .map(|row| {
            row.children()
                .filter_map(ElementRef::wrap)
                .filter_map(|cell| match cell.value().name() {
                    "th" => Some(Cell {
                        header: true,
                        text: element_text(cell),
                    }),
                    "td" => Some(Cell {
                        header: false,
                        text: element_text(cell),
                    }),
                    _ => None,
                })
                .collect()
        })
        .collect();
    assemble_table(title, lines)
}

/// Direct rows of a table, looking through `thead`/`tbody`/`tfoot`.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|row| row.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

fn is_wikitable(table: ElementRef<'_>) -> bool {
    table.value().classes().any(|class| class == "wikitable")
}

fn is_nested(table: ElementRef<'_>) -> bool {
    table.ancestors().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|element| element.name() == "table")
    })
}

fn caption(table: ElementRef<'_>) -> Option<String> {
    table
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "caption")
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// Heading text without MediaWiki's "[edit]" links.
fn heading_text(heading: ElementRef<'_>) -> String {
    normalize_whitespace(&EDIT_LINK_RE.replace_all(&element_text(heading), ""))
}

/// Text nodes joined by spaces, so `120<br>150` stays two numbers.
fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"
        <html><body>
        <h1 id="firstHeading">Bronze Gear</h1>
        <div id="mw-content-text">
          <p>Bronze gear is the Tier 1 equipment set.</p>
          <h2><span class="mw-headline">Bonus Stats</span><span class="mw-editsection">[<a href="#">edit</a>]</span></h2>
          <table class="wikitable">
            <tbody>
              <tr><th>Type</th><th>Attack Speed</th><th>Strength</th></tr>
              <tr><td>Ex. Armor</td><td>5%</td><td>3</td></tr>
            </tbody>
          </table>
          <h2>All Classes Armors</h2>
          <table class="wikitable">
            <tr><th>Guardian / Warrior / Rogue</th><th>Sorcerer</th><th>HP</th></tr>
            <tr><td><b>Bronze</b> Helm</td><td>Bronze Hood</td><td>120<br>150<br>180</td></tr>
          </table>
          <table class="navbox"><tr><td>not data 1</td></tr></table>
          <h3>Guardian Weapons</h3>
          <table class="wikitable">
            <caption>Guardian Weapons</caption>
            <tr><th>Weapon</th><th>Damage</th></tr>
            <tr><td>Bronze Mace</td><td>10/12/14</td></tr>
            <tr><td><table class="wikitable"><tr><td>inner 9</td></tr></table></td><td>1</td></tr>
          </table>
        </div>
        </body></html>
    "##;

    #[test]
    fn test_finds_wikitables_with_headings() {
        let doc = HtmlDecoder.decode("Bronze Gear", PAGE).unwrap();
        let titles: Vec<&str> = doc.tables.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["Bonus Stats", "All Classes Armors", "Guardian Weapons"]);
    }

    #[test]
    fn test_cell_text_keeps_line_breaks_apart() {
        let doc = HtmlDecoder.decode("Bronze Gear", PAGE).unwrap();
        let armor = &doc.tables[1];
        assert_eq!(armor.header, ["Guardian / Warrior / Rogue", "Sorcerer", "HP"]);
        assert_eq!(armor.rows[0].cells, ["Bronze Helm", "Bronze Hood", "120 150 180"]);
    }

    #[test]
    fn test_page_text_comes_from_content() {
        let doc = HtmlDecoder.decode("Bronze Gear", PAGE).unwrap();
        assert!(doc.text.contains("Tier 1 equipment"));
        assert_eq!(doc.title, "Bronze Gear");
    }

    #[test]
    fn test_nested_tables_are_not_separate_tables() {
        let doc = HtmlDecoder.decode("Bronze Gear", PAGE).unwrap();
        assert_eq!(doc.tables.len(), 3);
        // The nested table's text still belongs to its parent cell.
        assert_eq!(doc.tables[2].rows.len(), 2);
    }

    #[test]
    fn test_page_without_tables() {
        let doc = HtmlDecoder
            .decode("Empty", "<html><body><p>nothing</p></body></html>")
            .unwrap();
        assert!(doc.tables.is_empty());
        assert_eq!(doc.text, "nothing");
    }
}
