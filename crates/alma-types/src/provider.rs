use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAI,
    Anthropic,
    Google,
}

/// Configured model provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl Provider {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ProviderKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            api_key: None,
            base_url: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid model reference '{0}': expected <providerId>/<modelName>")]
pub struct ModelRefError(pub String);

/// `<providerId>/<modelName>`; the model name may itself contain `/`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelRef {
    pub provider_id: String,
    pub model_name: String,
}

impl FromStr for ModelRef {
    type Err = ModelRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((provider, model)) if !provider.is_empty() && !model.is_empty() => Ok(Self {
                provider_id: provider.to_string(),
                model_name: model.to_string(),
            }),
            _ => Err(ModelRefError(s.to_string())),
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider_id, self.model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_ref_parse() {
        let r: ModelRef = "openai/gpt-4o-mini".parse().unwrap();
        assert_eq!(r.provider_id, "openai");
        assert_eq!(r.model_name, "gpt-4o-mini");
        assert_eq!(r.to_string(), "openai/gpt-4o-mini");
    }

    #[test]
    fn test_model_ref_keeps_nested_name() {
        let r: ModelRef = "router/meta/llama-3".parse().unwrap();
        assert_eq!(r.provider_id, "router");
        assert_eq!(r.model_name, "meta/llama-3");
    }

    #[test]
    fn test_model_ref_rejects_malformed() {
        assert!("gpt-4o".parse::<ModelRef>().is_err());
        assert!("/gpt-4o".parse::<ModelRef>().is_err());
        assert!("openai/".parse::<ModelRef>().is_err());
    }

    #[test]
    fn test_provider_hides_api_key() {
        let p = Provider::new("openai", "OpenAI", ProviderKind::OpenAI).with_api_key("sk-secret");
        let value = serde_json::to_value(&p).unwrap();

        assert_eq!(value["type"], "openai");
        assert!(value.get("apiKey").is_none());
    }
}
