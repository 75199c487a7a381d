//! Query-string rendering for storage requests.
//!
//! Fields are read from the query's serde representation. Null fields are
//! skipped, lists become comma-separated values, and parameters are sorted by
//! name so the rendered endpoint doubles as a stable cache key.

use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

/// Flatten a serializable query into sorted `(name, value)` pairs.
pub fn query_pairs<Q: Serialize>(query: &Q) -> Result<Vec<(String, String)>, serde_json::Error> {
    let mut pairs = match serde_json::to_value(query)? {
        Value::Object(fields) => fields
            .into_iter()
            .filter_map(|(name, value)| render_value(&value).map(|v| (name, v)))
            .collect::<Vec<_>>(),
        Value::Null => Vec::new(),
        other => {
            return Err(serde::ser::Error::custom(format!(
                "query must serialize to an object, got {}",
                other
            )))
        }
    };
    pairs.sort();
    Ok(pairs)
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let rendered: Vec<String> = items.iter().filter_map(render_value).collect();
            if rendered.is_empty() {
                None
            } else {
                Some(rendered.join(","))
            }
        }
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Append the query's parameters to `endpoint`.
pub fn with_query<Q: Serialize>(endpoint: &str, query: &Q) -> Result<String, serde_json::Error> {
    let pairs = query_pairs(query)?;
    if pairs.is_empty() {
        return Ok(endpoint.to_string());
    }

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}{}", endpoint, separator, encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Browse {
        results: u32,
        page: u32,
        categories: Vec<String>,
        state: Option<String>,
        latest: bool,
    }

    #[test]
    fn test_pairs_are_sorted_and_skip_nulls() {
        let query = Browse {
            results: 10,
            page: 2,
            categories: vec!["damages".into(), "litter".into()],
            state: None,
            latest: true,
        };

        let rendered = with_query("remarks", &query).unwrap();
        assert_eq!(
            rendered,
            "remarks?categories=damages%2Clitter&latest=true&page=2&results=10"
        );
    }

    #[test]
    fn test_existing_query_string_is_extended() {
        #[derive(Serialize)]
        struct Only {
            page: u32,
        }

        let rendered = with_query("statistics/remarks/general?from=1", &Only { page: 1 }).unwrap();
        assert_eq!(rendered, "statistics/remarks/general?from=1&page=1");
    }

    #[test]
    fn test_empty_query_keeps_endpoint() {
        #[derive(Serialize)]
        struct Nothing {
            state: Option<String>,
        }

        assert_eq!(with_query("users", &Nothing { state: None }).unwrap(), "users");
    }
}
