//! Command trait and the envelope that travels with every command.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// An intent to change state, bound from a request body and path parameters.
///
/// `NAME` identifies the command on the bus. Authenticated commands set
/// `REQUIRES_AUTH` and receive the caller's id through `set_user_id`.
pub trait Command: Serialize + DeserializeOwned + Send + Sync + 'static {
    const NAME: &'static str;
    const REQUIRES_AUTH: bool = false;

    fn set_user_id(&mut self, _user_id: String) {}
}

/// Per-request envelope. `id` is the correlation id for the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: Uuid,
    /// Command name.
    pub name: String,
    /// Path the request arrived on.
    pub origin: String,
    pub culture: String,
    /// Unix milliseconds.
    pub created_at: i64,
}

impl Request {
    pub fn new(id: Uuid, name: impl Into<String>, origin: impl Into<String>, culture: impl Into<String>) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();
        Self {
            id,
            name: name.into(),
            origin: origin.into(),
            culture: culture.into(),
            created_at,
        }
    }
}

/// A file uploaded with a command, carried inline as base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePayload {
    pub name: String,
    pub content_type: String,
    pub base64: String,
}

impl FilePayload {
    pub fn encode(name: impl Into<String>, content_type: impl Into<String>, data: &[u8]) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            base64: BASE64.encode(data),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.base64)
    }
}

/// What is published on the command bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusMessage {
    pub request: Request,
    pub payload: Value,
}

impl BusMessage {
    pub fn new<C: Command>(request: Request, command: &C) -> Result<Self, serde_json::Error> {
        Ok(Self {
            request,
            payload: serde_json::to_value(command)?,
        })
    }

    pub fn correlation_id(&self) -> Uuid {
        self.request.id
    }

    pub fn command_name(&self) -> &str {
        &self.request.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct DeleteRemark {
        remark_id: String,
    }

    impl Command for DeleteRemark {
        const NAME: &'static str = "delete_remark";
    }

    #[test]
    fn test_bus_message_wire_format() {
        let id = Uuid::new_v4();
        let request = Request::new(id, DeleteRemark::NAME, "/remarks/7", "en-gb");
        let message = BusMessage::new(request, &DeleteRemark { remark_id: "7".into() }).unwrap();

        assert_eq!(message.correlation_id(), id);
        let wire = serde_json::to_value(&message).unwrap();
        assert_eq!(wire["request"]["name"], "delete_remark");
        assert_eq!(wire["request"]["origin"], "/remarks/7");
        assert!(wire["request"]["createdAt"].as_i64().unwrap() > 0);
        assert_eq!(wire["payload"], json!({"remarkId": "7"}));
    }

    #[test]
    fn test_file_payload_wire_format() {
        let file = FilePayload::encode("pothole.jpg", "image/jpeg", b"\xff\xd8jpeg");
        assert_eq!(file.decode().unwrap(), b"\xff\xd8jpeg");

        let wire = serde_json::to_value(&file).unwrap();
        assert_eq!(wire["name"], "pothole.jpg");
        assert_eq!(wire["contentType"], "image/jpeg");
        assert_eq!(wire["base64"], "/9hqcGVn");
    }
}
