use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use serde_json::Value;

use crate::error::CliResult;

#[derive(Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

pub fn print_json(value: &Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render one JSON value as a table cell.
pub fn value_cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.2}"),
            _ => n.to_string(),
        },
        Value::Array(items) => items.iter().map(value_cell).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Build a table from query results. Each column is a header and a JSON
/// pointer into the result entry.
pub fn results_table(rows: &[Value], columns: &[(&str, &str)], width: usize) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(columns.iter().map(|(header, _)| *header));

    for row in rows {
        table.add_row(columns.iter().map(|(_, pointer)| {
            let cell = row.pointer(pointer).map(value_cell).unwrap_or_else(|| "-".to_string());
            truncate_string(&cell, width)
        }));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("a longer sentence", 8), "a lon...");
        assert_eq!(truncate_string("héllo wörld", 6), "hél...");
    }

    #[test]
    fn test_value_cell() {
        assert_eq!(value_cell(&json!(null)), "-");
        assert_eq!(value_cell(&json!("text")), "text");
        assert_eq!(value_cell(&json!(0.8)), "0.80");
        assert_eq!(value_cell(&json!(3)), "3");
        assert_eq!(value_cell(&json!(["work", "urgent"])), "work, urgent");
    }

    #[test]
    fn test_results_table_uses_pointers() {
        let rows = vec![json!({ "userPrompt": "hello", "_additional": { "id": "abc" } })];
        let table = results_table(&rows, &[("ID", "/_additional/id"), ("Tone", "/tone")], 40);
        let rendered = table.to_string();
        assert!(rendered.contains("abc"));
        assert!(rendered.contains("Tone"));
    }
}
