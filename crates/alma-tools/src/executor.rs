use crate::catalog::{Tool, ToolCatalog, ToolContext};
use crate::error::ToolError;
use crate::permission::PermissionGate;
use crate::result::ToolResult;
use crate::sandbox::WorkspaceSandbox;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A call whose arguments already passed validation
#[derive(Clone)]
pub struct PreparedCall {
    tool: Arc<dyn Tool>,
    args: Value,
}

impl PreparedCall {
    pub fn name(&self) -> &str {
        self.tool.name()
    }

    pub fn args(&self) -> &Value {
        &self.args
    }

    pub fn tool(&self) -> &Arc<dyn Tool> {
        &self.tool
    }
}

/// Validate, authorize and run tool calls.
///
/// Failures never escape as errors; they come back as `ToolResult`s with
/// `success: false` so the model loop keeps going.
pub struct ToolExecutor {
    catalog: Arc<ToolCatalog>,
    gate: Arc<PermissionGate>,
    ctx: ToolContext,
}

impl ToolExecutor {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        gate: Arc<PermissionGate>,
        sandbox: Arc<WorkspaceSandbox>,
    ) -> Self {
        Self {
            catalog,
            gate,
            ctx: ToolContext::new(sandbox),
        }
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    pub fn gate(&self) -> &Arc<PermissionGate> {
        &self.gate
    }

    pub fn sandbox(&self) -> &Arc<WorkspaceSandbox> {
        &self.ctx.sandbox
    }

    /// Look the tool up and validate arguments, sandbox paths and command
    /// blocklist. Nothing here prompts or touches the filesystem.
    pub fn prepare(&self, name: &str, args: Value) -> Result<PreparedCall, ToolResult> {
        let tool = self
            .catalog
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
            .map_err(|e| self.reject(name, e))?;

        tool.validate(&args, &self.ctx)
            .map_err(|e| self.reject(name, e))?;

        Ok(PreparedCall { tool, args })
    }

    fn reject(&self, name: &str, err: ToolError) -> ToolResult {
        warn!(tool = %name, kind = err.kind(), error = %err, "Tool call rejected");
        ToolResult::from_error(&err)
    }

    /// Whether `authorize` would suspend on a prompt
    pub fn needs_prompt(&self, call: &PreparedCall) -> bool {
        self.gate.needs_prompt(call.tool.as_ref())
    }

    pub async fn authorize(&self, call: &PreparedCall) -> bool {
        self.gate
            .request_permission(call.tool.as_ref(), &call.args)
            .await
    }

    /// Execute an authorized call under the active workspace
    pub async fn run(&self, call: PreparedCall) -> ToolResult {
        let name = call.tool.name().to_string();
        let started = Instant::now();
        debug!(tool = %name, "Executing tool");

        let result = match call.tool.execute(call.args, &self.ctx).await {
            Ok(result) => result,
            Err(err) => self.reject(&name, err),
        };

        info!(
            tool = %name,
            success = result.success,
            duration_ms = started.elapsed().as_millis() as u64,
            "Tool finished"
        );
        result
    }

    /// Full path: validate, ask for permission, run
    pub async fn execute(&self, name: &str, args: Value) -> ToolResult {
        let call = match self.prepare(name, args) {
            Ok(call) => call,
            Err(result) => return result,
        };

        if !self.authorize(&call).await {
            return self.reject(name, ToolError::PermissionDenied);
        }

        self.run(call).await
    }
}
