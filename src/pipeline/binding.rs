//! Binding raw request input into commands and queries.
//!
//! Commands bind from a JSON body merged with path parameters; queries bind
//! from the query string merged with path parameters. In both, path
//! parameters win and caller-supplied user ids are dropped. An uploaded file
//! binds into the command field named after its form field, as a
//! [`FilePayload`].

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::commands::FilePayload;
use crate::http::request::RequestInput;
use crate::pipeline::PipelineError;
use crate::queries::Query;

/// Fields a client may never set directly.
const BLACKLISTED_FIELDS: &[&str] = &["userId", "user_id"];

fn is_blacklisted(name: &str) -> bool {
    BLACKLISTED_FIELDS.contains(&name)
}

/// Path parameters end up as storage path segments; `.` and `..` would
/// climb out of the endpoint they are placed in.
fn check_path_params(input: &RequestInput) -> Result<(), PipelineError> {
    match input
        .path_params
        .iter()
        .find(|(_, value)| value.is_empty() || value.chars().all(|c| c == '.'))
    {
        Some((name, _)) => Err(PipelineError::Binding(format!("invalid path parameter '{name}'"))),
        None => Ok(()),
    }
}

/// Bind a command. An empty body binds as `{}`.
pub fn bind_command<C: DeserializeOwned>(input: &RequestInput) -> Result<C, PipelineError> {
    check_path_params(input)?;
    let mut object = if input.body.iter().all(u8::is_ascii_whitespace) {
        Map::new()
    } else {
        match serde_json::from_slice::<Value>(&input.body) {
            Ok(Value::Object(object)) => object,
            Ok(_) => return Err(PipelineError::Binding("request body must be a JSON object".into())),
            Err(e) => return Err(PipelineError::Binding(e.to_string())),
        }
    };

    object.retain(|name, _| !is_blacklisted(name));
    if let Some(file) = input.file.as_ref().filter(|file| !is_blacklisted(&file.field)) {
        let payload = FilePayload::encode(file.file_name.as_str(), file.content_type.as_str(), &file.data);
        let payload = serde_json::to_value(payload).map_err(|e| PipelineError::Binding(e.to_string()))?;
        object.insert(file.field.clone(), payload);
    }
    for (name, value) in &input.path_params {
        if !is_blacklisted(name) {
            object.insert(name.clone(), Value::String(value.clone()));
        }
    }

    serde_json::from_value(Value::Object(object)).map_err(|e| PipelineError::Binding(e.to_string()))
}

/// Bind a query. Nothing supplied binds to `Q::default()`.
pub fn bind_query<Q: Query>(input: &RequestInput) -> Result<Q, PipelineError> {
    check_path_params(input)?;
    let mut pairs: Vec<(String, String)> = match input.query.as_deref() {
        Some(query) if !query.is_empty() => serde_urlencoded::from_str(query)
            .map_err(|e| PipelineError::Binding(format!("malformed query string: {e}")))?,
        _ => Vec::new(),
    };

    pairs.retain(|(name, _)| {
        !is_blacklisted(name) && !input.path_params.iter().any(|(path_name, _)| path_name == name)
    });
    pairs.extend(
        input
            .path_params
            .iter()
            .filter(|(name, _)| !is_blacklisted(name))
            .cloned(),
    );

    if pairs.is_empty() {
        return Ok(Q::default());
    }

    let encoded = serde_urlencoded::to_string(&pairs)
        .map_err(|e| PipelineError::Binding(e.to_string()))?;
    serde_urlencoded::from_str(&encoded).map_err(|e| PipelineError::Binding(e.to_string()))
}
