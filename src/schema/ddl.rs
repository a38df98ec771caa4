//! Structured DDL parser for `CREATE TABLE` dumps.
//!
//! Each table block is split into top-level definitions. A definition is either a
//! constraint directive (`PRIMARY KEY`, `UNIQUE KEY`, `KEY`, ...) or a column
//! definition `<name> <type>[(args)] [modifiers...]`. Anything else is skipped.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{Column, Constraints, NormalizedSchema, Table};

static CREATE_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\bCREATE\s+(?:TEMPORARY\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?((?:[`"\[]?[\w$]+[`"\]]?\s*\.\s*)*[`"\[]?[\w$]+[`"\]]?)\s*\("#,
    )
    .expect("valid CREATE TABLE regex")
});

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:PRIMARY\s+KEY|UNIQUE\b|KEY\b|INDEX\b|CONSTRAINT\b|FOREIGN\s+KEY|CHECK\b|FULLTEXT\b|SPATIAL\b)",
    )
    .expect("valid directive regex")
});

static COLUMN_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)^(?:`([^`]+)`|"([^"]+)"|\[([^\]]+)\]|([A-Za-z_][\w$]*))\s+([A-Za-z_]\w*(?:\s*\([^)]*\))?)(.*)$"#,
    )
    .expect("valid column regex")
});

// Column list with optional prefix lengths, e.g. (`name`(10), `id`)
const COLUMN_LIST: &str = r"\(((?:[^()]|\([^()]*\))*)\)";
const IDENT: &str = r#"[`"\[]?[\w$]+[`"\]]?"#;

static PRIMARY_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^(?:CONSTRAINT\s+(?:{IDENT}\s+)?)?PRIMARY\s+KEY\s*(?:USING\s+\w+\s*)?{COLUMN_LIST}"
    ))
    .expect("valid primary key regex")
});

static UNIQUE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^(?:CONSTRAINT\s+(?:{IDENT}\s+)?)?UNIQUE(?:\s+(?:KEY|INDEX))?(?:\s+{IDENT})?\s*(?:USING\s+\w+\s*)?{COLUMN_LIST}"
    ))
    .expect("valid unique key regex")
});

static INDEX_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)^(?:(?:FULLTEXT|SPATIAL)\s+)?(?:KEY|INDEX)(?:\s+{IDENT})?\s*(?:USING\s+\w+\s*)?{COLUMN_LIST}"
    ))
    .expect("valid index regex")
});

static LIST_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[`"\[]?([^`"\]\s(]+)"#).expect("valid list entry regex")
});

static NOT_NULL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b").expect("valid NOT NULL regex"));

static AUTO_INCREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bAUTO_?INCREMENT\b|\bGENERATED\s+(?:ALWAYS|BY\s+DEFAULT)\s+AS\s+IDENTITY\b")
        .expect("valid auto increment regex")
});

static GENERATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bGENERATED\s+ALWAYS\s+AS\s*\(|\bAS\s*\(.*\)\s*(?:STORED|VIRTUAL|PERSISTENT)\b")
        .expect("valid generated regex")
});

static DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bDEFAULT\s+('(?:[^'\\]|\\.|'')*'|"[^"]*"|[^\s,]+)"#)
        .expect("valid default regex")
});

static COMMENT_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bCOMMENT\s+'(?:[^'\\]|\\.|'')*'").expect("valid comment regex")
});

static INLINE_PRIMARY_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").expect("valid inline PK regex"));

static INLINE_UNIQUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bUNIQUE\b").expect("valid inline unique regex"));

static QUOTED_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'(?:[^'\\]|\\.|'')*'|"(?:[^"\\]|\\.)*""#).expect("valid literal regex")
});

static ENGINE_TERMINATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\)\s*ENGINE\s*=").expect("valid terminator regex"));

/// Parse every `CREATE TABLE` block in a DDL dump.
pub(super) fn parse(sql: &str) -> NormalizedSchema {
    let cleaned = strip_comments(sql);
    let mut tables = Vec::new();
    let mut search_from = 0;

    while let Some(caps) = CREATE_TABLE.captures_at(&cleaned, search_from) {
        let Some(header) = caps.get(0) else { break };
        let name = table_name(&caps[1]);
        let open = header.end() - 1;
        let limit = CREATE_TABLE
            .find_at(&cleaned, header.end())
            .map_or(cleaned.len(), |m| m.start());

        let Some(close) = find_block_end(&cleaned[..limit], open) else {
            debug!(table = %name, "Unterminated table block, skipping");
            search_from = limit;
            continue;
        };

        debug!("Parsing table: {}", name);
        tables.push(parse_table(name, &cleaned[open + 1..close]));
        search_from = close + 1;
    }

    NormalizedSchema { tables }
}

/// Byte index of the `)` ending the block opened at `open`.
///
/// `text` stops at the next `CREATE TABLE` header. The balancing parenthesis wins
/// unless a malformed line unbalanced the block, in which case the statement ends at
/// its `) ENGINE=` terminator or, failing that, at the last `)` before the next table.
fn find_block_end(text: &str, open: usize) -> Option<usize> {
    let balanced = find_closing_paren(text, open);
    let terminator = ENGINE_TERMINATOR.find_at(text, open).map(|m| m.start());

    match (balanced, terminator) {
        // A stray `)` closed the block before the statement ended.
        (Some(close), Some(end)) if close < end && !text[close..end].contains(';') => Some(end),
        (Some(close), _) => Some(close),
        (None, Some(end)) => Some(end),
        (None, None) => text[open + 1..].rfind(')').map(|i| open + 1 + i),
    }
}

fn parse_table(name: String, body: &str) -> Table {
    let mut table = Table::new(name);

    for definition in split_definitions(body) {
        if is_constraint_directive(definition) {
            apply_directive(&mut table.constraints, definition);
            continue;
        }

        match parse_column(definition) {
            Some(parsed) => {
                if parsed.primary_key {
                    table.constraints.primary_keys.push(parsed.column.name.clone());
                }
                if parsed.unique {
                    table.constraints.unique_keys.push(parsed.column.name.clone());
                }
                table.columns.push(parsed.column);
            }
            None => debug!(
                table = %table.name,
                definition = %definition,
                "Skipping unparseable definition"
            ),
        }
    }

    table
}

/// Column parsed from one definition, with any inline key markers.
#[derive(Debug)]
struct ParsedColumn {
    column: Column,
    primary_key: bool,
    unique: bool,
}

fn parse_column(definition: &str) -> Option<ParsedColumn> {
    if !parens_balanced(definition) {
        return None;
    }
    let caps = COLUMN_DEF.captures(definition.trim())?;
    let name = (1..=4).find_map(|i| caps.get(i))?.as_str().to_string();
    let column_type = caps.get(5)?.as_str().trim().to_string();
    let modifiers = strip_comment_clause(caps.get(6).map_or("", |m| m.as_str()));
    // Keywords inside string literals are data, not flags.
    let flags = strip_string_literals(&modifiers);

    let column = Column {
        nullable: !is_not_null(&flags),
        auto_increment: is_auto_increment(&flags, &column_type),
        default_value: extract_default(&modifiers),
        generated: is_generated(&flags),
        name,
        column_type,
    };

    Some(ParsedColumn {
        column,
        primary_key: INLINE_PRIMARY_KEY.is_match(&flags),
        unique: INLINE_UNIQUE.is_match(&flags),
    })
}

fn is_constraint_directive(definition: &str) -> bool {
    DIRECTIVE.is_match(definition.trim_start())
}

fn apply_directive(constraints: &mut Constraints, definition: &str) {
    let definition = definition.trim();
    if let Some(cols) = extract_primary_key(definition) {
        constraints.primary_keys.extend(cols);
    } else if let Some(cols) = extract_unique_key(definition) {
        constraints.unique_keys.extend(cols);
    } else if let Some(cols) = extract_index(definition) {
        constraints.indexes.extend(cols);
    } else {
        // Foreign keys and checks are not part of the model.
        debug!(definition = %definition, "Ignoring constraint directive");
    }
}

/// Columns named by a `PRIMARY KEY (...)` directive.
fn extract_primary_key(definition: &str) -> Option<Vec<String>> {
    PRIMARY_KEY
        .captures(definition)
        .map(|caps| parse_column_list(&caps[1]))
}

/// Columns named by a `UNIQUE [KEY|INDEX] [name] (...)` directive.
fn extract_unique_key(definition: &str) -> Option<Vec<String>> {
    UNIQUE_KEY
        .captures(definition)
        .map(|caps| parse_column_list(&caps[1]))
}

/// Columns named by a plain `KEY name (...)` or `INDEX name (...)` directive.
fn extract_index(definition: &str) -> Option<Vec<String>> {
    INDEX_KEY
        .captures(definition)
        .map(|caps| parse_column_list(&caps[1]))
}

fn parse_column_list(list: &str) -> Vec<String> {
    list.split(',')
        .filter_map(|entry| LIST_ENTRY.captures(entry.trim()))
        .map(|caps| caps[1].to_string())
        .collect()
}

fn is_not_null(modifiers: &str) -> bool {
    NOT_NULL.is_match(modifiers)
}

fn is_auto_increment(modifiers: &str, column_type: &str) -> bool {
    let base = column_type.to_ascii_lowercase();
    AUTO_INCREMENT.is_match(modifiers) || matches!(base.as_str(), "serial" | "bigserial" | "smallserial")
}

fn is_generated(modifiers: &str) -> bool {
    GENERATED.is_match(modifiers)
}

/// The token following `DEFAULT`, with surrounding quotes removed.
fn extract_default(modifiers: &str) -> Option<String> {
    let caps = DEFAULT.captures(modifiers)?;
    Some(unquote(&caps[1]))
}

fn unquote(token: &str) -> String {
    let quoted = token.len() >= 2
        && ((token.starts_with('\'') && token.ends_with('\''))
            || (token.starts_with('"') && token.ends_with('"')));
    if !quoted {
        return token.to_string();
    }
    token[1..token.len() - 1].replace("''", "'").replace("\\'", "'")
}

fn strip_comment_clause(modifiers: &str) -> String {
    COMMENT_CLAUSE.replace_all(modifiers, "").into_owned()
}

fn strip_string_literals(modifiers: &str) -> String {
    QUOTED_LITERAL.replace_all(modifiers, "''").into_owned()
}

/// Last segment of a possibly qualified and quoted table name.
fn table_name(raw: &str) -> String {
    raw.rsplit('.')
        .next()
        .unwrap_or(raw)
        .trim()
        .trim_matches(|c| matches!(c, '`' | '"' | '[' | ']'))
        .to_string()
}

/// Tracks whether the scanner is inside a quoted literal or identifier.
///
/// Dumps escape line breaks inside literals, so a quote still open at a newline is
/// a stray one. It is dropped there and the damage stays on that line.
#[derive(Debug, Default)]
struct QuoteTracker {
    quote: Option<char>,
    escaped: bool,
    abandoned: bool,
}

impl QuoteTracker {
    /// Feed one character; true when it sits outside any quoted region.
    fn feed(&mut self, c: char) -> bool {
        match self.quote {
            Some(_) if c == '\n' => {
                self.quote = None;
                self.escaped = false;
                self.abandoned = true;
                true
            }
            Some(q) => {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' && q != '`' {
                    self.escaped = true;
                } else if c == q {
                    self.quote = None;
                }
                false
            }
            None => {
                if matches!(c, '\'' | '"' | '`') {
                    self.quote = Some(c);
                    false
                } else {
                    true
                }
            }
        }
    }

    fn in_quote(&self) -> bool {
        self.quote.is_some()
    }

    /// Whether a stray quote was dropped since the last call.
    fn take_abandoned(&mut self) -> bool {
        std::mem::take(&mut self.abandoned)
    }
}

/// Remove `-- ...` and `/* ... */` comments outside quoted text.
fn strip_comments(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut tracker = QuoteTracker::default();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if !tracker.in_quote() && c == '-' && next == Some('-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if !tracker.in_quote() && c == '/' && next == Some('*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            i += 2;
            out.push(' ');
            continue;
        }

        tracker.feed(c);
        out.push(c);
        i += 1;
    }

    out
}

/// Byte index of the parenthesis closing the one at `open`.
fn find_closing_paren(text: &str, open: usize) -> Option<usize> {
    let mut tracker = QuoteTracker::default();
    let mut depth = 0usize;

    for (offset, c) in text[open..].char_indices() {
        if !tracker.feed(c) {
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a table body at top-level commas.
///
/// A line ending in a comma after a stray quote still ends its definition. Once a
/// parenthesis is left open the rest of the body falls back to one definition per line.
fn split_definitions(body: &str) -> Vec<&str> {
    let mut tracker = QuoteTracker::default();
    let mut depth = 0usize;
    let mut start = 0;
    let mut parts = Vec::new();

    for (idx, c) in body.char_indices() {
        let outside = tracker.feed(c);
        if c == '\n' && tracker.take_abandoned() && depth == 0 {
            if let Some(definition) = body[start..idx].trim_end().strip_suffix(',') {
                parts.push(definition);
                start = idx + 1;
            }
        }
        if !outside {
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }

    if depth > 0 {
        parts.extend(body[start..].lines().map(|line| line.trim().trim_end_matches(',')));
    } else {
        parts.push(&body[start..]);
    }

    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

fn parens_balanced(definition: &str) -> bool {
    let mut tracker = QuoteTracker::default();
    let mut depth = 0usize;

    for c in definition.chars() {
        if !tracker.feed(c) {
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}
