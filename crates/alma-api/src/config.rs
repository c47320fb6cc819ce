use alma_tools::{PermissionConfig, ToolsConfig};
use alma_types::SessionConfig;
use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub permissions: PermissionSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    pub workspace: WorkspaceSettings,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Applies to REST routes only; push channels stay open
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

fn default_max_steps() -> usize {
    10
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            max_steps: settings.max_steps,
            system_prompt: settings.system_prompt.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionSettings {
    pub timeout_secs: u64,
}

impl Default for PermissionSettings {
    fn default() -> Self {
        Self { timeout_secs: 60 }
    }
}

impl From<&PermissionSettings> for PermissionConfig {
    fn from(settings: &PermissionSettings) -> Self {
        PermissionConfig::default().with_timeout(Duration::from_secs(settings.timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub bash_timeout_secs: u64,
    pub max_output_bytes: usize,
    pub glob_max_results: usize,
    pub grep_max_matches: usize,
}

impl Default for ToolSettings {
    fn default() -> Self {
        let defaults = ToolsConfig::default();
        Self {
            bash_timeout_secs: defaults.bash_timeout.as_secs(),
            max_output_bytes: defaults.max_output_bytes,
            glob_max_results: defaults.glob_max_results,
            grep_max_matches: defaults.grep_max_matches,
        }
    }
}

impl From<&ToolSettings> for ToolsConfig {
    fn from(settings: &ToolSettings) -> Self {
        ToolsConfig::new()
            .with_bash_timeout(Duration::from_secs(settings.bash_timeout_secs))
            .with_max_output_bytes(settings.max_output_bytes)
            .with_glob_max_results(settings.glob_max_results)
            .with_grep_max_matches(settings.grep_max_matches)
    }
}

/// Workspace activated at startup when none is active
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceSettings {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    /// Model backend; only `echo` ships with the server
    pub backend: String,
    /// Provider seeded at startup for the built-in backend
    pub default_provider: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            backend: "echo".to_string(),
            default_provider: "local".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables prefixed `ALMA__`, e.g. `ALMA__SERVER__PORT=9000`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("ALMA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 3000

        [cors]
        enabled = true
        origins = ["http://localhost:3000"]

        [workspace]
        name = "default"
        path = "/tmp/ws"

        [logging]
        level = "debug"
        format = "json"
    "#;

    #[test]
    fn test_config_structure() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.request_timeout_secs, 300);
        assert_eq!(config.session.max_steps, 10);
        assert_eq!(config.permissions.timeout_secs, 60);
        assert_eq!(config.llm.backend, "echo");
    }

    #[test]
    fn test_sections_convert_to_runtime_config() {
        let toml = format!(
            "{}\n[session]\nmax_steps = 3\nsystem_prompt = \"be brief\"\n[permissions]\ntimeout_secs = 5\n[tools]\nbash_timeout_secs = 2\n",
            MINIMAL
        );
        let config: Config = toml::from_str(&toml).unwrap();

        let session = SessionConfig::from(&config.session);
        assert_eq!(session.max_steps, 3);
        assert_eq!(session.system_prompt.as_deref(), Some("be brief"));

        let permissions = PermissionConfig::from(&config.permissions);
        assert_eq!(permissions.timeout, Duration::from_secs(5));

        let tools = ToolsConfig::from(&config.tools);
        assert_eq!(tools.bash_timeout, Duration::from_secs(2));
        assert_eq!(tools.grep_max_matches, 100);
    }

    #[test]
    fn test_default_file_parses() {
        let config = Config::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml")).unwrap();
        assert_eq!(config.workspace.name, "default");
        assert_eq!(config.tools.max_output_bytes, 40960);
    }
}
