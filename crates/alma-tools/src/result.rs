use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Structured outcome of one tool invocation, fed back to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Normalize an error; `metadata.kind` names the failure class
    pub fn from_error(err: &ToolError) -> Self {
        let mut metadata = json!({ "kind": err.kind() });
        if let ToolError::Execution {
            metadata: Some(Value::Object(extra)),
            ..
        } = err
        {
            if let Value::Object(map) = &mut metadata {
                for (k, v) in extra {
                    map.insert(k.clone(), v.clone());
                }
            }
        }
        Self::failure(err.to_string()).with_metadata(metadata)
    }

    pub fn kind(&self) -> Option<&str> {
        self.metadata.as_ref()?.get("kind")?.as_str()
    }

    /// Text handed to the model as the tool message content
    pub fn to_model_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| match &self.error {
            Some(err) => format!("Error: {}", err),
            None => String::new(),
        })
    }
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        Self::from_error(&err)
    }
}
