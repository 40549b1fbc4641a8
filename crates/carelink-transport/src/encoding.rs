//! Query string encoding
//!
//! Nested parameter values are flattened into bracket paths
//! (`filter[created_at][gte]`, `ids[0]`) before being percent-encoded. The
//! ordering of the input is preserved all the way to the wire.

use serde_json::{Number, Value};

/// Largest magnitude at which every whole `f64` is exact (2^53).
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

/// Ordered list of flattened `(bracket-path, value)` pairs.
pub type QueryPairs = Vec<(String, String)>;

/// Flatten a JSON value into bracket-path pairs.
///
/// Objects become `key` at the top level and `parent[key]` below it, arrays
/// become `parent[i]`. `null` and empty containers produce nothing, so optional
/// parameters that were never set do not show up on the wire. A bare scalar at
/// the root has no name and is ignored.
pub fn flatten(value: &Value) -> QueryPairs {
    let mut pairs = Vec::new();
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(key.clone(), child, &mut pairs);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(index.to_string(), child, &mut pairs);
            }
        }
        _ => {}
    }
    pairs
}

/// Flatten `value` under an explicit path prefix.
pub fn flatten_with_prefix(prefix: &str, value: &Value) -> QueryPairs {
    let mut pairs = Vec::new();
    flatten_into(prefix.to_string(), value, &mut pairs);
    pairs
}

fn flatten_into(path: String, value: &Value, out: &mut QueryPairs) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((path, b.to_string())),
        Value::Number(n) => out.push((path, format_number(n))),
        Value::String(s) => out.push((path, s.clone())),
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(format!("{path}[{index}]"), child, out);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(format!("{path}[{key}]"), child, out);
            }
        }
    }
}

/// Whole floats print without a fraction (`1.0` as `1`) so paging and limit
/// parameters read the same whether they came from an integer or a float.
fn format_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT => {
            format!("{f:.0}")
        }
        _ => n.to_string(),
    }
}

/// Percent-encode each key and value and join them with `&`.
pub fn serialize(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Append a serialized query string to a path.
///
/// Uses `&` when the path already carries a query, `?` otherwise.
pub fn append_query(path: &str, query: &str) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    if path.ends_with('?') || path.ends_with('&') {
        format!("{path}{query}")
    } else if path.contains('?') {
        format!("{path}&{query}")
    } else {
        format!("{path}?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> QueryPairs {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_flatten_scalars() {
        let flat = flatten(&json!({"limit": 5, "active": true, "name": "Ada"}));
        assert_eq!(
            flat,
            pairs(&[("limit", "5"), ("active", "true"), ("name", "Ada")])
        );
    }

    #[test]
    fn test_flatten_whole_floats() {
        let flat = flatten(&json!({"page": 1.0, "ratio": 1.5, "offset": -20.0}));
        assert_eq!(
            flat,
            pairs(&[("page", "1"), ("ratio", "1.5"), ("offset", "-20")])
        );
        assert_eq!(serialize(&flat[..1]), "page=1");
    }

    #[test]
    fn test_flatten_nested_array() {
        let flat = flatten(&json!({"a": {"b": [1, 2]}}));
        assert_eq!(flat, pairs(&[("a[b][0]", "1"), ("a[b][1]", "2")]));
        assert_eq!(serialize(&flat), "a%5Bb%5D%5B0%5D=1&a%5Bb%5D%5B1%5D=2");
    }

    #[test]
    fn test_flatten_range_filter() {
        let flat = flatten(&json!({
            "created_at": {"gte": "2024-01-01T00:00:00Z", "lt": "2024-02-01T00:00:00Z"},
            "limit": 10
        }));
        assert_eq!(
            flat,
            pairs(&[
                ("created_at[gte]", "2024-01-01T00:00:00Z"),
                ("created_at[lt]", "2024-02-01T00:00:00Z"),
                ("limit", "10"),
            ])
        );
    }

    #[test]
    fn test_flatten_skips_empty() {
        assert!(flatten(&Value::Null).is_empty());
        assert!(flatten(&json!({})).is_empty());
        assert!(flatten(&json!({"cursor": null, "ids": []})).is_empty());
        assert!(flatten(&json!("bare")).is_empty());
    }

    #[test]
    fn test_flatten_with_prefix() {
        let flat = flatten_with_prefix("profile", &json!({"first_name": "Ada", "tags": ["a"]}));
        assert_eq!(
            flat,
            pairs(&[("profile[first_name]", "Ada"), ("profile[tags][0]", "a")])
        );
        assert_eq!(flatten_with_prefix("note", &json!("hi")), pairs(&[("note", "hi")]));
    }

    #[test]
    fn test_serialize_round_trips() {
        let flat = flatten(&json!({
            "q": "a b&c=d",
            "member": {"ids": ["mem_1", "mem_2"]},
            "page": 1.5
        }));
        let encoded = serialize(&flat);

        let decoded: QueryPairs = encoded
            .split('&')
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap();
                (
                    urlencoding::decode(k).unwrap().into_owned(),
                    urlencoding::decode(v).unwrap().into_owned(),
                )
            })
            .collect();
        assert_eq!(decoded, flat);
    }

    #[test]
    fn test_append_query() {
        assert_eq!(append_query("/v1/members", "limit=5"), "/v1/members?limit=5");
        assert_eq!(
            append_query("/v1/members?cursor=abc", "limit=5"),
            "/v1/members?cursor=abc&limit=5"
        );
        assert_eq!(append_query("/v1/members?", "limit=5"), "/v1/members?limit=5");
        assert_eq!(append_query("/v1/members", ""), "/v1/members");
    }
}
