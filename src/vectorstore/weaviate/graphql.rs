use serde_json::Value;

/// Renders a JSON value as a GraphQL input literal.
///
/// Object keys are unquoted and `operator` values are emitted as enums.
pub(super) fn to_graphql(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let fields: Vec<String> = map
                .iter()
                .map(|(k, v)| match (k.as_str(), v) {
                    ("operator", Value::String(op)) => format!("{}: {}", k, op),
                    _ => format!("{}: {}", k, to_graphql(v)),
                })
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(to_graphql).collect();
            format!("[{}]", items.join(", "))
        }
        other => other.to_string(),
    }
}
