use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub title: String,
    /// Model reference of the form `<providerId>/<modelName>`
    pub model: Option<String>,
    pub is_generating: bool,
    pub is_favorited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            model: None,
            is_generating: false,
            is_favorited: false,
            workspace_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_workspace(mut self, workspace_id: impl Into<String>) -> Self {
        self.workspace_id = Some(workspace_id.into());
        self
    }

    /// Apply a partial update and bump `updated_at`
    pub fn apply(&mut self, update: ThreadUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(model) = update.model {
            self.model = Some(model);
        }
        if let Some(is_generating) = update.is_generating {
            self.is_generating = is_generating;
        }
        if let Some(is_favorited) = update.is_favorited {
            self.is_favorited = is_favorited;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial thread update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadUpdate {
    pub title: Option<String>,
    pub model: Option<String>,
    pub is_generating: Option<bool>,
    pub is_favorited: Option<bool>,
}

impl ThreadUpdate {
    pub fn generating(value: bool) -> Self {
        Self {
            is_generating: Some(value),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_leaves_unset_fields() {
        let mut thread = Thread::new("Untitled").with_model("openai/gpt-4o-mini");
        thread.apply(ThreadUpdate {
            is_favorited: Some(true),
            ..Default::default()
        });

        assert_eq!(thread.title, "Untitled");
        assert_eq!(thread.model.as_deref(), Some("openai/gpt-4o-mini"));
        assert!(thread.is_favorited);
        assert!(!thread.is_generating);
    }

    #[test]
    fn test_thread_serializes_camel_case() {
        let thread = Thread::new("t").with_id("t1");
        let value = serde_json::to_value(&thread).unwrap();

        assert_eq!(value["id"], "t1");
        assert_eq!(value["isGenerating"], false);
        assert!(value.get("workspaceId").is_none());
    }
}
