//! Tabular HTML schema exports.
//!
//! The export marks each table with an anchor (`<a name='tbl_users'>`) followed by
//! an HTML table of `Field | Type` rows, and separates tables with
//! `<br class=page>` markers.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{Column, NormalizedSchema, Table};

/// Anchor name used by the export for its title block.
const HEADER_ANCHOR: &str = "header";

/// Field name carried by each table's column-header row.
const HEADER_FIELD: &str = "Field";

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a\s+name\s*=\s*['"]([^'"]*)['"]\s*>"#).expect("valid anchor regex")
});

static PAGE_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<br\s+class\s*=\s*['"]?page['"]?\s*/?>"#).expect("valid page break regex")
});

static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid row selector"));

static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("valid cell selector"));

/// Parse every anchored table section in an HTML export.
pub(super) fn parse(html: &str) -> NormalizedSchema {
    let mut tables = Vec::new();

    for (name, section) in table_sections(html) {
        let columns = extract_columns(section);
        if columns.is_empty() {
            debug!(table = %name, "No columns found in section, skipping");
            continue;
        }

        let mut table = Table::new(name);
        table.columns = columns;
        tables.push(table);
    }

    NormalizedSchema { tables }
}

/// Slice the document into `(table name, section)` pairs.
///
/// A section starts at its anchor and ends at the next page break, or at the end
/// of the document for the last table.
fn table_sections(html: &str) -> Vec<(String, &str)> {
    ANCHOR
        .captures_iter(html)
        .filter_map(|caps| {
            let anchor = caps.get(0)?;
            let name = caps[1].trim().to_string();
            if name.is_empty() || name == HEADER_ANCHOR {
                return None;
            }

            let end = PAGE_BREAK
                .find_at(html, anchor.end())
                .map_or(html.len(), |m| m.start());
            Some((name, &html[anchor.start()..end]))
        })
        .collect()
}

/// Extract `(name, type)` columns from one section's table rows.
///
/// The first row whose field name is `Field` is the column-header row and is
/// skipped; later rows with that name are kept.
fn extract_columns(section: &str) -> Vec<Column> {
    let fragment = Html::parse_fragment(section);
    let mut header_skipped = false;
    let mut columns = Vec::new();

    for row in fragment.select(&ROW) {
        let Some((field, field_type)) = extract_field_pair(row) else {
            continue;
        };

        if !header_skipped && field == HEADER_FIELD {
            header_skipped = true;
            continue;
        }

        columns.push(Column::new(field, field_type));
    }

    columns
}

/// The first two non-empty cells of a table row.
fn extract_field_pair(row: ElementRef<'_>) -> Option<(String, String)> {
    let mut cells = row.select(&CELL).map(cell_text);
    let field = cells.next()?;
    let field_type = cells.next()?;

    if field.is_empty() || field_type.is_empty() {
        return None;
    }
    Some((field, field_type))
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
