use crate::blocklist::CommandBlocklist;
use crate::catalog::{parse_args, Tool, ToolCategory, ToolContext, ToolsConfig};
use crate::error::ToolError;
use crate::result::ToolResult;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const PIPE_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BashArgs {
    command: String,
    /// Lowers the configured timeout, never raises it
    #[serde(default)]
    timeout_secs: Option<u64>,
}

/// Runs `sh -c <command>` in the active workspace root
pub struct BashTool {
    blocklist: CommandBlocklist,
    timeout: Duration,
    max_output_bytes: usize,
}

impl BashTool {
    pub fn new(config: &ToolsConfig) -> Result<Self, ToolError> {
        let blocklist = CommandBlocklist::with_defaults()
            .map_err(|e| ToolError::Validation(format!("invalid command blocklist: {}", e)))?;
        Ok(Self {
            blocklist,
            timeout: config.bash_timeout,
            max_output_bytes: config.max_output_bytes,
        })
    }

    fn parse(&self, args: &Value) -> Result<BashArgs, ToolError> {
        let args: BashArgs = parse_args(args)?;
        if args.command.trim().is_empty() {
            return Err(ToolError::Validation("command cannot be empty".to_string()));
        }
        if let Err(e) = self.blocklist.check(&args.command) {
            warn!(command = %args.command, "Blocked destructive command");
            return Err(e.into());
        }
        Ok(args)
    }

    fn effective_timeout(&self, requested: Option<u64>) -> Duration {
        requested
            .map(Duration::from_secs)
            .map_or(self.timeout, |t| t.min(self.timeout))
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the workspace root. Returns stdout, stderr and exit code."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Execute
    }

    fn needs_approval(&self) -> bool {
        true
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "timeout_secs": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Optional shorter timeout in seconds"
                }
            },
            "required": ["command"],
            "additionalProperties": false
        })
    }

    fn validate(&self, args: &Value, ctx: &ToolContext) -> Result<(), ToolError> {
        self.parse(args)?;
        ctx.sandbox.active_root()?;
        Ok(())
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let args = self.parse(&args)?;
        let root = ctx.sandbox.active_root()?;
        let timeout = self.effective_timeout(args.timeout_secs);

        debug!(command = %args.command, root = %root.display(), "Running command");
        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&args.command)
            .current_dir(&root)
            .env("TERM", "dumb")
            .env("NO_COLOR", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::execution(format!("Failed to spawn command: {}", e)))?;

        let stdout = Capture::start(child.stdout.take(), self.max_output_bytes);
        let stderr = Capture::start(child.stderr.take(), self.max_output_bytes);

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(result) => {
                Some(result.map_err(|e| ToolError::execution(format!("Failed to run command: {}", e)))?)
            }
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill timed out command");
                }
                None
            }
        };

        // Background children may hold the pipes open past exit
        let stdout = stdout.finish(PIPE_GRACE).await;
        let stderr = stderr.finish(PIPE_GRACE).await;
        let mut data = output_data(&stdout, &stderr, self.max_output_bytes);

        let Some(status) = status else {
            data["timed_out"] = json!(true);
            return Err(ToolError::execution_with(
                format!("Command timed out after {} seconds", timeout.as_secs()),
                data,
            ));
        };

        let exit_code = status.code().unwrap_or(-1);
        data["exit_code"] = json!(exit_code);

        if status.success() {
            Ok(ToolResult::success(data))
        } else {
            Err(ToolError::execution_with(
                format!("Command exited with status {}", exit_code),
                data,
            ))
        }
    }
}

/// Bytes kept from one pipe and the full length seen
#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    total: usize,
}

/// Drains a child pipe in the background so output survives a kill
struct Capture {
    buf: Arc<Mutex<Captured>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn start<R>(pipe: Option<R>, max_bytes: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Captured::default()));
        // A few bytes past the cap so truncation lands on a char boundary
        let keep = max_bytes.saturating_add(4);
        let sink = Arc::clone(&buf);

        let task = tokio::spawn(async move {
            let Some(mut pipe) = pipe else { return };
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => {
                        let mut captured = sink.lock().unwrap_or_else(|e| e.into_inner());
                        captured.total += n;
                        let room = keep.saturating_sub(captured.bytes.len());
                        captured.bytes.extend_from_slice(&chunk[..n.min(room)]);
                    }
                    Err(e) => {
                        debug!(error = %e, "Pipe read failed");
                        break;
                    }
                }
            }
        });

        Self { buf, task }
    }

    async fn finish(self, grace: Duration) -> Captured {
        let mut task = self.task;
        if tokio::time::timeout(grace, &mut task).await.is_err() {
            task.abort();
        }
        let mut captured = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *captured)
    }
}

fn output_data(stdout: &Captured, stderr: &Captured, max_bytes: usize) -> Value {
    let (stdout_text, stdout_truncated) = render(stdout, max_bytes);
    let (stderr_text, stderr_truncated) = render(stderr, max_bytes);
    json!({
        "stdout": stdout_text,
        "stderr": stderr_text,
        "timed_out": false,
        "stdout_truncated": stdout_truncated,
        "stderr_truncated": stderr_truncated,
        "stdout_total_bytes": stdout.total,
        "stderr_total_bytes": stderr.total,
    })
}

fn render(captured: &Captured, max_bytes: usize) -> (String, bool) {
    let (text, cut, _) = truncate_at_utf8_boundary(&captured.bytes, max_bytes);
    (text, cut || captured.total > max_bytes)
}

/// Cut `bytes` to at most `max_bytes` on a char boundary.
///
/// Returns the text, whether it was cut and the original length.
pub(crate) fn truncate_at_utf8_boundary(bytes: &[u8], max_bytes: usize) -> (String, bool, usize) {
    let total = bytes.len();
    if total <= max_bytes {
        return (String::from_utf8_lossy(bytes).into_owned(), false, total);
    }

    let mut end = max_bytes;
    // The byte at `end` must start a character
    while end > 0 && (bytes[end] & 0xC0) == 0x80 {
        end -= 1;
    }
    (String::from_utf8_lossy(&bytes[..end]).into_owned(), true, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_output() {
        let (s, cut, total) = truncate_at_utf8_boundary(b"hello", 10);
        assert_eq!(s, "hello");
        assert!(!cut);
        assert_eq!(total, 5);
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // "é" is two bytes; cutting at 2 would split the second one
        let text = "aéé".as_bytes();
        let (s, cut, total) = truncate_at_utf8_boundary(text, 2);
        assert_eq!(s, "a");
        assert!(cut);
        assert_eq!(total, 5);

        let (s, _, _) = truncate_at_utf8_boundary(text, 3);
        assert_eq!(s, "aé");
    }

    #[test]
    fn test_render_reports_bytes_dropped_while_capturing() {
        let captured = Captured {
            bytes: b"abcdefgh".to_vec(),
            total: 100,
        };
        let (text, cut) = render(&captured, 6);
        assert_eq!(text, "abcdef");
        assert!(cut);

        let short = Captured {
            bytes: b"ok\n".to_vec(),
            total: 3,
        };
        assert_eq!(render(&short, 6), ("ok\n".to_string(), false));
    }

    #[test]
    fn test_effective_timeout_is_capped() {
        let tool = BashTool::new(&ToolsConfig::default().with_bash_timeout(Duration::from_secs(10))).unwrap();
        assert_eq!(tool.effective_timeout(None), Duration::from_secs(10));
        assert_eq!(tool.effective_timeout(Some(2)), Duration::from_secs(2));
        assert_eq!(tool.effective_timeout(Some(60)), Duration::from_secs(10));
    }
}
