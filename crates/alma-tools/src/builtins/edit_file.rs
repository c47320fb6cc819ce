use crate::catalog::{parse_args, Tool, ToolCategory, ToolContext};
use crate::error::ToolError;
use crate::result::ToolResult;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EditFileArgs {
    #[serde(alias = "filePath")]
    file_path: String,
    #[serde(alias = "oldString")]
    old_string: String,
    #[serde(alias = "newString")]
    new_string: String,
    #[serde(default, alias = "replaceAll")]
    replace_all: bool,
}

/// Exact substring replacement
pub struct EditFileTool;

impl EditFileTool {
    fn parse(args: &Value) -> Result<EditFileArgs, ToolError> {
        let args: EditFileArgs = parse_args(args)?;
        if args.old_string.is_empty() {
            return Err(ToolError::Validation("old_string must not be empty".to_string()));
        }
        Ok(args)
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Replace an exact substring in a file. Replaces the first occurrence, or every occurrence when replace_all is true."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Edit
    }

    fn needs_approval(&self) -> bool {
        true
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": { "type": "string", "description": "Path relative to the workspace root" },
                "old_string": { "type": "string", "description": "Exact text to replace" },
                "new_string": { "type": "string", "description": "Replacement text" },
                "replace_all": { "type": "boolean", "default": false }
            },
            "required": ["file_path", "old_string", "new_string"],
            "additionalProperties": false
        })
    }

    fn validate(&self, args: &Value, ctx: &ToolContext) -> Result<(), ToolError> {
        let args = Self::parse(args)?;
        ctx.sandbox.resolve_path(&args.file_path)?;
        Ok(())
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let args = Self::parse(&args)?;
        let path = ctx.sandbox.resolve_path(&args.file_path)?;

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ToolError::execution(format!("Failed to read file {}: {}", args.file_path, e))
        })?;

        let occurrences = content.matches(args.old_string.as_str()).count();
        if occurrences == 0 {
            return Err(ToolError::execution(format!(
                "old_string not found in {}",
                args.file_path
            )));
        }

        let (updated, replacements) = if args.replace_all {
            (content.replace(&args.old_string, &args.new_string), occurrences)
        } else {
            (content.replacen(&args.old_string, &args.new_string, 1), 1)
        };

        tokio::fs::write(&path, updated.as_bytes())
            .await
            .map_err(|e| ToolError::execution(format!("Failed to write {}: {}", args.file_path, e)))?;

        Ok(ToolResult::success(json!({
            "path": args.file_path,
            "replacements": replacements,
        }))
        .with_metadata(json!({ "occurrences": occurrences })))
    }
}
