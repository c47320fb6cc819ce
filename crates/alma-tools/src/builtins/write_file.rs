use crate::catalog::{parse_args, Tool, ToolCategory, ToolContext};
use crate::error::ToolError;
use crate::result::ToolResult;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WriteFileArgs {
    #[serde(alias = "filePath")]
    file_path: String,
    content: String,
}

pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create or overwrite a file in the active workspace. Parent directories are created."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Write
    }

    fn needs_approval(&self) -> bool {
        true
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path relative to the workspace root"
                },
                "content": {
                    "type": "string",
                    "description": "Full file content"
                }
            },
            "required": ["file_path", "content"],
            "additionalProperties": false
        })
    }

    fn validate(&self, args: &Value, ctx: &ToolContext) -> Result<(), ToolError> {
        let args: WriteFileArgs = parse_args(args)?;
        ctx.sandbox.resolve_path(&args.file_path)?;
        Ok(())
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: WriteFileArgs = parse_args(&args)?;
        let path = ctx.sandbox.resolve_path(&args.file_path)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ToolError::execution(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        tokio::fs::write(&path, args.content.as_bytes())
            .await
            .map_err(|e| ToolError::execution(format!("Failed to write {}: {}", args.file_path, e)))?;

        debug!(path = %path.display(), bytes = args.content.len(), "Wrote file");
        Ok(ToolResult::success(json!({
            "written": true,
            "path": args.file_path,
        }))
        .with_metadata(json!({ "bytes": args.content.len() })))
    }
}
