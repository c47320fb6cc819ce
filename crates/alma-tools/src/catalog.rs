use crate::builtins::{BashTool, EditFileTool, GlobTool, GrepTool, ReadFileTool, WriteFileTool};
use crate::error::ToolError;
use crate::result::ToolResult;
use crate::sandbox::WorkspaceSandbox;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Read,
    Write,
    Edit,
    Execute,
    Search,
    Network,
}

/// Per-invocation environment handed to tools
#[derive(Clone)]
pub struct ToolContext {
    pub sandbox: Arc<WorkspaceSandbox>,
}

impl ToolContext {
    pub fn new(sandbox: Arc<WorkspaceSandbox>) -> Self {
        Self { sandbox }
    }
}

/// A capability the model may invoke.
///
/// `validate` runs before any approval prompt and must not have side
/// effects; `execute` runs only after the call was authorized.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn category(&self) -> ToolCategory;

    fn needs_approval(&self) -> bool;

    /// JSON Schema for the arguments
    fn parameters(&self) -> Value;

    fn validate(&self, _args: &Value, _ctx: &ToolContext) -> Result<(), ToolError> {
        Ok(())
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError>;

    /// Function-tool form offered to the model
    fn definition(&self) -> alma_llm::Tool {
        alma_llm::Tool::new(self.name(), self.description(), self.parameters())
    }
}

/// Parse tool arguments, mapping serde failures to a validation error
pub fn parse_args<T: DeserializeOwned>(args: &Value) -> Result<T, ToolError> {
    serde_json::from_value(args.clone()).map_err(|e| ToolError::Validation(e.to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub bash_timeout: Duration,
    /// Cap per output stream
    pub max_output_bytes: usize,
    pub glob_max_results: usize,
    pub grep_max_matches: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            bash_timeout: Duration::from_secs(30),
            max_output_bytes: 40 * 1024,
            glob_max_results: 500,
            grep_max_matches: 100,
        }
    }
}

impl ToolsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bash_timeout(mut self, timeout: Duration) -> Self {
        self.bash_timeout = timeout;
        self
    }

    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    pub fn with_glob_max_results(mut self, max: usize) -> Self {
        self.glob_max_results = max;
        self
    }

    pub fn with_grep_max_matches(mut self, max: usize) -> Self {
        self.grep_max_matches = max;
        self
    }
}

/// Registry of tools keyed by unique name; populated at startup
#[derive(Default, Clone)]
pub struct ToolCatalog {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with read_file, write_file, edit_file, bash, glob and grep
    pub fn with_builtins(config: &ToolsConfig) -> Result<Self, ToolError> {
        let mut catalog = Self::new();
        catalog.register(Arc::new(ReadFileTool))?;
        catalog.register(Arc::new(WriteFileTool))?;
        catalog.register(Arc::new(EditFileTool))?;
        catalog.register(Arc::new(BashTool::new(config)?))?;
        catalog.register(Arc::new(GlobTool::new(config.glob_max_results)))?;
        catalog.register(Arc::new(GrepTool::new(config.grep_max_matches)))?;
        Ok(catalog)
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolError::Validation(format!(
                "tool '{}' is already registered",
                name
            )));
        }
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Sorted tool names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn model_tools(&self) -> Vec<alma_llm::Tool> {
        self.names()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.definition())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
