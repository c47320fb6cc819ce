use crate::catalog::{parse_args, Tool, ToolCategory, ToolContext};
use crate::error::ToolError;
use crate::result::ToolResult;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReadFileArgs {
    #[serde(alias = "filePath")]
    file_path: String,
}

pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the full content of a file in the active workspace."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Read
    }

    fn needs_approval(&self) -> bool {
        false
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path relative to the workspace root"
                }
            },
            "required": ["file_path"],
            "additionalProperties": false
        })
    }

    fn validate(&self, args: &Value, ctx: &ToolContext) -> Result<(), ToolError> {
        let args: ReadFileArgs = parse_args(args)?;
        ctx.sandbox.resolve_path(&args.file_path)?;
        Ok(())
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: ReadFileArgs = parse_args(&args)?;
        let path = ctx.sandbox.resolve_path(&args.file_path)?;

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ToolError::execution(format!("Failed to read file {}: {}", args.file_path, e))
        })?;
        let bytes = content.len();
        let lines = content.lines().count();

        Ok(ToolResult::success(json!({
            "path": args.file_path,
            "content": content,
        }))
        .with_metadata(json!({ "bytes": bytes, "lines": lines })))
    }
}
