use crate::message::Part;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Push-channel frame, server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Full current `parts` of one assistant message
    #[serde(rename_all = "camelCase")]
    MessageUpdate {
        message_id: String,
        thread_id: String,
        parts: Vec<Part>,
        timestamp: String,
    },
    Done,
    Error {
        message: String,
    },
}

impl ServerFrame {
    pub fn message_update(
        message_id: impl Into<String>,
        thread_id: impl Into<String>,
        parts: Vec<Part>,
    ) -> Self {
        Self::MessageUpdate {
            message_id: message_id.into(),
            thread_id: thread_id.into(),
            parts,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn frame_type(&self) -> &'static str {
        match self {
            Self::MessageUpdate { .. } => "message_update",
            Self::Done => "done",
            Self::Error { .. } => "error",
        }
    }
}

/// Control frame, client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    Register { thread_id: String },
    #[serde(rename_all = "camelCase")]
    Stop { thread_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_server_frames_wire_format() {
        let done = serde_json::to_value(ServerFrame::Done).unwrap();
        assert_eq!(done, json!({"type": "done"}));

        let err = serde_json::to_value(ServerFrame::error("boom")).unwrap();
        assert_eq!(err, json!({"type": "error", "message": "boom"}));

        let update = serde_json::to_value(ServerFrame::message_update("m1", "t1", vec![Part::text("hi")])).unwrap();
        assert_eq!(update["type"], "message_update");
        assert_eq!(update["messageId"], "m1");
        assert_eq!(update["threadId"], "t1");
        assert_eq!(update["parts"][0]["content"], "hi");
        assert!(update["timestamp"].is_string());
    }

    #[test]
    fn test_client_frames_parse() {
        let register: ClientFrame = serde_json::from_str(r#"{"type":"register","threadId":"t1"}"#).unwrap();
        assert_eq!(register, ClientFrame::Register { thread_id: "t1".to_string() });

        let stop: ClientFrame = serde_json::from_str(r#"{"type":"stop","threadId":"t2"}"#).unwrap();
        assert_eq!(stop, ClientFrame::Stop { thread_id: "t2".to_string() });

        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"ping"}"#).is_err());
    }
}
