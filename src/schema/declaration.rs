//! Pre-structured JSON schema declarations.

use super::{IngestError, NormalizedSchema};

/// Decode a JSON document shaped like [`NormalizedSchema`].
pub(super) fn parse(content: &str) -> Result<NormalizedSchema, IngestError> {
    serde_json::from_str(content)
        .map_err(|e| IngestError::MalformedInput(format!("Invalid schema declaration: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declaration() {
        let json = r#"{
            "tables": [{
                "name": "tbl_products",
                "columns": [
                    {"name": "id", "type": "int", "nullable": false, "autoIncrement": true},
                    {"name": "isActive", "type": "tinyint(1)", "defaultValue": "1"}
                ],
                "constraints": {"primaryKeys": ["id"], "foreignKeys": []}
            }]
        }"#;

        let schema = parse(json).unwrap();
        let products = schema.table("tbl_products").unwrap();
        assert!(products.columns[0].auto_increment);
        assert!(!products.columns[0].nullable);
        assert_eq!(products.columns[1].default_value.as_deref(), Some("1"));
        assert!(products.columns[1].nullable);
        assert_eq!(products.constraints.primary_keys, vec!["id"]);
    }

    #[test]
    fn test_missing_constraints_default_empty() {
        let schema = parse(r#"{"tables": [{"name": "t", "columns": [{"name": "a", "type": "text"}]}]}"#)
            .unwrap();
        assert!(schema.tables[0].constraints.unique_keys.is_empty());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        assert!(matches!(parse("{tables: "), Err(IngestError::MalformedInput(_))));
    }
}
