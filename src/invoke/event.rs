//! Invocation event construction.

use serde_json::{Map, Value};

/// The flat mapping passed to a handler.
pub type InvocationEvent = Map<String, Value>;

/// Merge request inputs into one event. Later sources win: body, then path, then query.
pub fn build_event<P>(body: Map<String, Value>, path_params: P, query: Map<String, Value>) -> InvocationEvent
where
    P: IntoIterator<Item = (String, String)>,
{
    let mut event = body;
    for (name, value) in path_params {
        event.insert(name, Value::String(value));
    }
    event.extend(query);
    event
}

/// Fold decoded query pairs into a mapping. Repeated keys become arrays.
pub fn fold_query(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut query = Map::new();
    for (key, value) in pairs {
        match query.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                query.insert(key, Value::String(value));
            }
        }
    }
    query
}

/// Keys contributed by a decoded body. Non-object bodies contribute none.
pub fn body_fields(body: Value) -> Map<String, Value> {
    match body {
        Value::Object(fields) => fields,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        body_fields(value)
    }

    #[test]
    fn test_precedence_query_over_path_over_body() {
        let body = object(json!({"id": "body", "name": "body", "only_body": 1, "shared": true}));
        let path = vec![
            ("id".to_string(), "path".to_string()),
            ("name".to_string(), "path".to_string()),
        ];
        let query = object(json!({"id": "query"}));

        let event = build_event(body, path, query);
        assert_eq!(event["id"], "query");
        assert_eq!(event["name"], "path");
        assert_eq!(event["only_body"], 1);
        assert_eq!(event["shared"], true);
    }

    #[test]
    fn test_path_param_in_event() {
        let event = build_event(
            Map::new(),
            vec![("id".to_string(), "42".to_string())],
            Map::new(),
        );
        assert_eq!(Value::Object(event), json!({"id": "42"}));
    }

    #[test]
    fn test_no_type_coercion() {
        let body = object(json!({"count": 3, "nested": {"a": [1, 2]}}));
        let query = fold_query(vec![("count".to_string(), "7".to_string())]);
        let event = build_event(body, Vec::new(), query);
        assert_eq!(event["count"], "7");
        assert_eq!(event["nested"], json!({"a": [1, 2]}));
    }

    #[test]
    fn test_fold_query_repeated_keys() {
        let query = fold_query(vec![
            ("tag".to_string(), "a".to_string()),
            ("q".to_string(), "x".to_string()),
            ("tag".to_string(), "b".to_string()),
            ("tag".to_string(), "c".to_string()),
        ]);
        assert_eq!(query["tag"], json!(["a", "b", "c"]));
        assert_eq!(query["q"], "x");
    }

    #[test]
    fn test_non_object_body_contributes_nothing() {
        assert!(body_fields(json!([1, 2, 3])).is_empty());
        assert!(body_fields(json!("text")).is_empty());
        assert!(body_fields(Value::Null).is_empty());
    }
}
