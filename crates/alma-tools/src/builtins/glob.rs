use super::walk::{display_relative, walk_files};
use crate::catalog::{parse_args, Tool, ToolCategory, ToolContext};
use crate::error::ToolError;
use crate::result::ToolResult;
use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GlobArgs {
    pattern: String,
    #[serde(default)]
    path: Option<String>,
}

fn compile(pattern: &str) -> Result<GlobMatcher, ToolError> {
    let trimmed = pattern.trim();
    if trimmed.is_empty() {
        return Err(ToolError::Validation("pattern must not be empty".to_string()));
    }
    GlobBuilder::new(trimmed)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| ToolError::Validation(format!("Invalid glob '{}': {}", trimmed, e)))
}

/// File path pattern matching under the workspace
pub struct GlobTool {
    max_results: usize,
}

impl GlobTool {
    pub fn new(max_results: usize) -> Self {
        Self { max_results }
    }
}

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Find files whose workspace-relative path matches a glob pattern such as `src/**/*.rs`."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Search
    }

    fn needs_approval(&self) -> bool {
        true
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Glob pattern" },
                "path": { "type": "string", "description": "Directory to search, defaults to the workspace root" }
            },
            "required": ["pattern"],
            "additionalProperties": false
        })
    }

    fn validate(&self, args: &Value, ctx: &ToolContext) -> Result<(), ToolError> {
        let args: GlobArgs = parse_args(args)?;
        compile(&args.pattern)?;
        ctx.sandbox.resolve_path(args.path.as_deref().unwrap_or("."))?;
        Ok(())
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: GlobArgs = parse_args(&args)?;
        let matcher = compile(&args.pattern)?;
        let root = ctx.sandbox.active_root()?;
        let base = ctx.sandbox.resolve_path(args.path.as_deref().unwrap_or("."))?;
        let sandbox = ctx.sandbox.clone();
        let max = self.max_results;

        let files = tokio::task::spawn_blocking(move || {
            walk_files(&sandbox, &root, &base)
                .into_iter()
                .filter(|p| matcher.is_match(display_relative(p, &base)))
                .map(|p| display_relative(&p, &root))
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| ToolError::execution(format!("glob task failed: {}", e)))?;

        let total = files.len();
        let truncated = total > max;
        let files: Vec<String> = files.into_iter().take(max).collect();

        Ok(ToolResult::success(json!({
            "pattern": args.pattern,
            "files": files,
            "total": total,
            "truncated": truncated,
        })))
    }
}
