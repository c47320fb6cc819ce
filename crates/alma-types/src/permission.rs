use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Pending,
    Resolved,
    Expired,
}

/// Approval prompt for one tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    pub id: String,
    pub tool_name: String,
    pub params: Value,
    /// Creation time in milliseconds since the epoch
    pub timestamp: i64,
    pub status: PermissionStatus,
}

impl PermissionRequest {
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>, params: Value) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            params,
            timestamp: Utc::now().timestamp_millis(),
            status: PermissionStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    ApproveOnce,
    ApproveAll,
    Deny,
}

impl ApprovalDecision {
    pub fn is_approval(&self) -> bool {
        !matches!(self, Self::Deny)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decision_wire_names() {
        let d: ApprovalDecision = serde_json::from_value(json!("approve_all")).unwrap();
        assert_eq!(d, ApprovalDecision::ApproveAll);
        assert!(d.is_approval());
        assert!(!ApprovalDecision::Deny.is_approval());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let req = PermissionRequest::new("perm-1", "bash", json!({"command": "ls"}));
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["toolName"], "bash");
        assert_eq!(value["status"], "pending");
        assert!(value["timestamp"].as_i64().unwrap() > 0);
    }
}
