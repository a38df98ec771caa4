//! Rendering of a [`NormalizedSchema`] into the grounding document.

use chrono::{DateTime, Utc};

use super::ContextTemplate;
use crate::schema::{Column, NormalizedSchema, Table};

/// Prefix of the only line whose content depends on the clock.
pub const GENERATED_LINE_PREFIX: &str = "<!-- Generated: ";

/// Render `schema` stamped with the current time.
pub fn render(schema: &NormalizedSchema, template: &ContextTemplate) -> String {
    render_at(schema, template, Utc::now())
}

/// Render `schema` stamped with `generated_at`.
///
/// Output is a pure function of the arguments.
pub fn render_at(
    schema: &NormalizedSchema,
    template: &ContextTemplate,
    generated_at: DateTime<Utc>,
) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{}{} -->\n",
        GENERATED_LINE_PREFIX,
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("<!-- Database: {} -->\n", template.database_label));
    out.push_str(&format!("<!-- Tables: {} -->\n\n", schema.tables.len()));
    out.push_str(&format!("# {}\n\n", template.title));

    for table in &schema.tables {
        out.push_str(&table_doc(table, template));
    }

    out.push_str("---\n\n## RELATIONSHIP RULES:\n\n");
    out.push_str(template.relationship_rules.trim_end());
    out.push_str("\n\n---\n\n## COMMON QUERY PATTERNS:\n\n");
    out.push_str(template.query_patterns.trim_end());
    out.push('\n');

    out
}

fn table_doc(table: &Table, template: &ContextTemplate) -> String {
    let mut doc = format!("## Table: {}\n", table.name);

    if let Some(description) = template.description(&table.name) {
        doc.push_str(description);
        doc.push('\n');
    }

    doc.push_str("Columns:\n");
    for column in &table.columns {
        let tags = column_tags(table, column);
        if tags.is_empty() {
            doc.push_str(&format!("- {} ({})\n", column.name, column.column_type));
        } else {
            doc.push_str(&format!(
                "- {} ({}) [{}]\n",
                column.name,
                column.column_type,
                tags.join(", ")
            ));
        }
    }

    doc.push('\n');
    doc
}

/// Tags for one column, always in the same order.
fn column_tags(table: &Table, column: &Column) -> Vec<String> {
    let mut tags = Vec::new();

    if table.is_primary_key(&column.name) {
        tags.push("PRIMARY KEY".to_string());
    }
    if column.auto_increment {
        tags.push("AUTO_INCREMENT".to_string());
    }
    if table.is_unique(&column.name) {
        tags.push("UNIQUE".to_string());
    }
    if is_foreign_key_name(&column.name) {
        tags.push("FOREIGN KEY".to_string());
    }
    if column.generated {
        tags.push("GENERATED/COMPUTED".to_string());
    }
    if let Some(default) = &column.default_value {
        if default.is_empty() {
            tags.push("DEFAULT: ''".to_string());
        } else {
            tags.push(format!("DEFAULT: {}", default));
        }
    }

    tags
}

/// Foreign keys follow the `<table>_id` naming convention.
fn is_foreign_key_name(name: &str) -> bool {
    name.ends_with("_id") && name != "id"
}
