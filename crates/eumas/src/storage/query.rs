//! GraphQL `Get` query builder
//!
//! Mirrors the shape of a Weaviate `Get` query: one class, a field selection,
//! an optional where-filter, an optional limit and `_additional` metadata.

use serde_json::Value;
use uuid::Uuid;

use crate::error::{ErrorContext, EumasError, Result};
use crate::storage::filter::WhereFilter;

/// A `Get` query against a single class
#[derive(Debug, Clone, PartialEq)]
pub struct GetQuery {
    pub class: String,
    pub fields: Vec<String>,
    pub filter: Option<WhereFilter>,
    pub limit: Option<usize>,
    pub additional: Vec<String>,
}

impl GetQuery {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            fields: Vec::new(),
            filter: None,
            limit: None,
            additional: Vec::new(),
        }
    }

    /// Append selected fields. Nested selections are passed as one string,
    /// e.g. `"evaluatedMemory { ... on Memory { userPrompt } }"`.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Replace the where-filter
    pub fn with_where(mut self, filter: WhereFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Conjoin a filter with the current one, or set it if there is none
    pub fn and_where(mut self, filter: WhereFilter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    /// Restrict the query to a single object id
    pub fn with_id(self, id: Uuid) -> Self {
        self.and_where(WhereFilter::equal_text(&["id"], id.to_string()))
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Request `_additional` metadata such as `id`, `score` or `distance`
    pub fn with_additional(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.additional.contains(&field) {
            self.additional.push(field);
        }
        self
    }

    /// Render the query document sent to `/v1/graphql`
    pub fn to_graphql(&self) -> String {
        let mut arguments = Vec::new();
        if let Some(filter) = &self.filter {
            arguments.push(format!("where: {}", filter.to_graphql()));
        }
        if let Some(limit) = self.limit {
            arguments.push(format!("limit: {limit}"));
        }

        let arguments = if arguments.is_empty() {
            String::new()
        } else {
            format!("({})", arguments.join(", "))
        };

        let mut selection = self.fields.clone();
        if !self.additional.is_empty() {
            selection.push(format!("_additional {{ {} }}", self.additional.join(" ")));
        }

        format!(
            "{{ Get {{ {}{} {{ {} }} }} }}",
            self.class,
            arguments,
            selection.join(" ")
        )
    }
}

/// Pull `data.Get.<class>` out of a GraphQL response.
///
/// Any entry in `errors` fails the whole query; a missing class entry is an
/// empty result.
pub fn extract_results(response: &Value, class: &str) -> Result<Vec<Value>> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            return Err(EumasError::database(
                ErrorContext::new(format!("GraphQL query failed: {}", messages.join("; ")))
                    .with_code("GRAPHQL_ERROR")
                    .with_detail("errors", Value::Array(errors.clone())),
            ));
        }
    }

    Ok(response
        .pointer(&format!("/data/Get/{class}"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_query() {
        let query = GetQuery::new("Memory").with_fields(["userPrompt"]);
        assert_eq!(query.to_graphql(), "{ Get { Memory { userPrompt } } }");
    }

    #[test]
    fn test_query_with_arguments_and_additional() {
        let query = GetQuery::new("Memory")
            .with_fields(["userPrompt", "memoryPriority"])
            .with_where(WhereFilter::greater_than_equal(&["memoryPriority"], 0.5).unwrap())
            .with_limit(10)
            .with_additional("id")
            .with_additional("score");

        assert_eq!(
            query.to_graphql(),
            concat!(
                r#"{ Get { Memory(where: {path: ["memoryPriority"], operator: GreaterThanEqual, valueNumber: 0.5}, limit: 10) "#,
                r#"{ userPrompt memoryPriority _additional { id score } } } }"#
            )
        );
    }

    #[test]
    fn test_additional_deduplicates() {
        let query = GetQuery::new("Memory")
            .with_additional("id")
            .with_additional("id");
        assert_eq!(query.additional, vec!["id".to_string()]);
    }

    #[test]
    fn test_and_where_conjoins() {
        let query = GetQuery::new("ArchetypeMemoryRelation")
            .with_where(WhereFilter::equal_text(&["archetype"], "Ella-M"))
            .and_where(WhereFilter::contains_any(
                &["evaluatedMemory", "Memory", "contextTags"],
                vec!["work".to_string()],
            ));

        match query.filter {
            Some(WhereFilter::And(ref operands)) => assert_eq!(operands.len(), 2),
            ref other => panic!("expected And filter, got {other:?}"),
        }
    }

    #[test]
    fn test_with_id() {
        let id = Uuid::new_v4();
        let query = GetQuery::new("Memory").with_id(id);
        assert!(query
            .to_graphql()
            .contains(&format!(r#"path: ["id"], operator: Equal, valueText: "{id}""#)));
    }

    #[test]
    fn test_extract_results() {
        let response = json!({
            "data": {"Get": {"Memory": [{"userPrompt": "hello"}]}}
        });
        let results = extract_results(&response, "Memory").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["userPrompt"], "hello");
    }

    #[test]
    fn test_extract_missing_class_is_empty() {
        let response = json!({"data": {"Get": {}}});
        assert!(extract_results(&response, "Memory").unwrap().is_empty());
    }

    #[test]
    fn test_extract_graphql_errors() {
        let response = json!({
            "data": null,
            "errors": [{"message": "no such prop with name 'relationshipStrength' found"}]
        });
        let err = extract_results(&response, "Memory").unwrap_err();
        assert!(err.to_string().contains("relationshipStrength"));
        assert_eq!(err.code(), Some("GRAPHQL_ERROR"));
    }
}
