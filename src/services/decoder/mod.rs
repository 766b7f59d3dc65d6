// src/services/decoder/mod.rs

//! Table/row decoding for exported wiki pages.
//!
//! Both source encodings are reduced to the same shape: a page title, the
//! plain page text (for tier/level markers) and a list of titled tables whose
//! rows are flat lists of cell strings.

mod html;
mod wikitext;

use std::path::Path;

pub use html::HtmlDecoder;
pub use wikitext::WikitextDecoder;

use crate::error::DocumentError;

/// Input encodings, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Rendered HTML export
    Html,
    /// JSON wrapper carrying raw wikitext
    Wikitext,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" => Some(Self::Html),
            "json" => Some(Self::Wikitext),
            _ => None,
        }
    }

    /// Decode `content`. `fallback_title` names the page when the document
    /// carries no title of its own.
    pub fn decode(&self, fallback_title: &str, content: &str) -> Result<RawDocument, DocumentError> {
        match self {
            Self::Html => HtmlDecoder.decode(fallback_title, content),
            Self::Wikitext => WikitextDecoder.decode(fallback_title, content),
        }
    }
}

/// A decoded page, before any classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocument {
    pub title: String,
    /// Page text with markup removed
    pub text: String,
    pub tables: Vec<RawTable>,
}

/// One table and the caption or heading it sits under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    /// Header labels lined up with `row.cells`.
    ///
    /// A row with a marker cell has one cell fewer than the header; the first
    /// header label then belongs to the marker.
    pub fn columns_for(&self, row: &RawRow) -> &[String] {
        if row.marker.is_some() && self.header.len() == row.cells.len() + 1 {
            &self.header[1..]
        } else {
            &self.header
        }
    }
}

/// One data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// Leading header cell(s) of the row
    pub marker: Option<String>,
    /// Label of the sub-header row this row sits under
    pub group: Option<String>,
    pub cells: Vec<String>,
}

/// A cell as read from the source, before header detection.
#[derive(Debug, Clone)]
pub(crate) struct Cell {
    pub header: bool,
    pub text: String,
}

/// Build a table from raw lines of cells.
///
/// The first line is the header when every cell is a header cell or no cell
/// holds a digit. Later all-header lines with a single cell are sub-headers
/// whose label is attached to the rows below them; other all-header lines are
/// skipped.
pub(crate) fn assemble_table(title: String, lines: Vec<Vec<Cell>>) -> RawTable {
    let mut lines = lines.into_iter().filter(|line| !line.is_empty()).peekable();
    let mut table = RawTable {
        title,
        ..RawTable::default()
    };

    if let Some(first) = lines.peek() {
        let all_header = first.iter().all(|c| c.header);
        let has_digit = first.iter().any(|c| c.text.chars().any(|ch| ch.is_ascii_digit()));
        if all_header || !has_digit {
            table.header = lines
                .next()
                .map(|line| line.into_iter().map(|c| c.text).collect())
                .unwrap_or_default();
        }
    }

    let mut group: Option<String> = None;
    for line in lines {
        if line.iter().all(|c| c.header) {
            if line.len() == 1 {
                group = line.into_iter().next().map(|c| c.text);
            }
            continue;
        }

        let lead = line.iter().take_while(|c| c.header).count();
        let mut cells = line.into_iter();
        let marker_parts: Vec<String> = cells.by_ref().take(lead).map(|c| c.text).collect();
        let marker = (!marker_parts.is_empty()).then(|| marker_parts.join(" "));

        table.rows.push(RawRow {
            marker,
            group: group.clone(),
            cells: cells.map(|c| c.text).collect(),
        });
    }

    table
}

/// Collapse runs of whitespace and trim.
pub(crate) fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn th(text: &str) -> Cell {
        Cell {
            header: true,
            text: text.to_string(),
        }
    }

    fn td(text: &str) -> Cell {
        Cell {
            header: false,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_source_format_from_extension() {
        assert_eq!(
            SourceFormat::from_path(Path::new("Bronze Gear.html")),
            Some(SourceFormat::Html)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("x/Steel.HTM")),
            Some(SourceFormat::Html)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("Steel.json")),
            Some(SourceFormat::Wikitext)
        );
        assert_eq!(SourceFormat::from_path(Path::new("notes.txt")), None);
        assert_eq!(SourceFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_header_from_th_row() {
        let table = assemble_table(
            "Armors".into(),
            vec![
                vec![th("Guardian / Warrior / Rogue"), th("Sorcerer"), th("HP")],
                vec![td("Bronze Helm"), td("Bronze Hood"), td("120/150/180")],
            ],
        );
        assert_eq!(table.header.len(), 3);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].cells[2], "120/150/180");
        assert_eq!(table.rows[0].marker, None);
    }

    #[test]
    fn test_digitless_first_row_is_header() {
        let table = assemble_table(
            "Weapons".into(),
            vec![
                vec![td("Weapon"), td("Damage")],
                vec![td("Bronze Sword"), td("10/12/14")],
            ],
        );
        assert_eq!(table.header, vec!["Weapon", "Damage"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_numeric_first_row_is_data() {
        let table = assemble_table(
            "Weapons".into(),
            vec![vec![td("Bronze Sword"), td("10/12/14")]],
        );
        assert!(table.header.is_empty());
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_row_marker_and_alignment() {
        let table = assemble_table(
            "Bonus Stats".into(),
            vec![
                vec![th("Type"), th("Attack Speed"), th("Strength")],
                vec![th("Ex. Armor"), td("5%"), td("3")],
            ],
        );
        let row = &table.rows[0];
        assert_eq!(row.marker.as_deref(), Some("Ex. Armor"));
        assert_eq!(row.cells, vec!["5%", "3"]);
        assert_eq!(table.columns_for(row), ["Attack Speed", "Strength"]);
    }

    #[test]
    fn test_sub_header_becomes_group() {
        let table = assemble_table(
            "Weapons".into(),
            vec![
                vec![th("Weapon"), th("Damage")],
                vec![td("Bronze Sword"), td("10")],
                vec![th("Excellent")],
                vec![td("Bronze Sword"), td("14")],
            ],
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].group, None);
        assert_eq!(table.rows[1].group.as_deref(), Some("Excellent"));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n b\t c "), "a b c");
    }
}
