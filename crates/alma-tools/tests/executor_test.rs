use alma_tools::{
    PermissionConfig, PermissionEvent, PermissionGate, ToolCatalog, ToolExecutor, ToolsConfig,
    WorkspaceSandbox,
};
use alma_types::ApprovalDecision;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn executor(timeout: Duration) -> (Arc<ToolExecutor>, TempDir) {
    let dir = TempDir::new().unwrap();
    let sandbox = Arc::new(WorkspaceSandbox::new());
    let ws = sandbox.register_workspace("test", dir.path()).unwrap();
    sandbox.set_active(&ws.id).unwrap();

    let catalog = Arc::new(ToolCatalog::with_builtins(&ToolsConfig::default()).unwrap());
    let gate = Arc::new(PermissionGate::new(PermissionConfig::default().with_timeout(timeout)));
    (Arc::new(ToolExecutor::new(catalog, gate, sandbox)), dir)
}

async fn next_request_id(events: &mut tokio::sync::broadcast::Receiver<PermissionEvent>) -> String {
    loop {
        if let PermissionEvent::Required(req) = events.recv().await.unwrap() {
            return req.id;
        }
    }
}

#[tokio::test]
async fn test_unknown_tool() {
    let (executor, _dir) = executor(Duration::from_secs(60));
    let result = executor.execute("teleport", json!({})).await;
    assert!(!result.success);
    assert_eq!(result.kind(), Some("validation_error"));
}

#[tokio::test]
async fn test_invalid_arguments_never_prompt() {
    let (executor, _dir) = executor(Duration::from_secs(60));
    let mut events = executor.gate().subscribe();

    let result = executor.execute("write_file", json!({"file_path": 7})).await;
    assert!(!result.success);
    assert_eq!(result.kind(), Some("validation_error"));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_destructive_command_blocked_before_prompt() {
    let (executor, _dir) = executor(Duration::from_secs(60));
    let mut events = executor.gate().subscribe();

    let result = executor.execute("bash", json!({"command": "rm -rf /"})).await;
    assert!(!result.success);
    assert_eq!(result.kind(), Some("sandbox_violation"));
    assert_eq!(executor.gate().pending_count(), 0);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_env_write_denied_before_prompt() {
    let (executor, dir) = executor(Duration::from_secs(60));
    let result = executor
        .execute("write_file", json!({"file_path": ".env", "content": "X=1"}))
        .await;

    assert!(!result.success);
    assert_eq!(result.kind(), Some("sandbox_violation"));
    assert!(!dir.path().join(".env").exists());
}

#[tokio::test]
async fn test_denied_call_is_not_executed() {
    let (executor, dir) = executor(Duration::from_secs(60));
    let mut events = executor.gate().subscribe();

    let task = {
        let executor = executor.clone();
        tokio::spawn(async move {
            executor
                .execute("write_file", json!({"file_path": "a.txt", "content": "x"}))
                .await
        })
    };
    let id = next_request_id(&mut events).await;
    executor.gate().handle_decision(&id, ApprovalDecision::Deny);

    let result = task.await.unwrap();
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("permission denied"));
    assert!(!dir.path().join("a.txt").exists());
}

#[tokio::test]
async fn test_approved_call_runs() {
    let (executor, dir) = executor(Duration::from_secs(60));
    let mut events = executor.gate().subscribe();

    let task = {
        let executor = executor.clone();
        tokio::spawn(async move {
            executor
                .execute("write_file", json!({"file_path": "a.txt", "content": "x"}))
                .await
        })
    };
    let id = next_request_id(&mut events).await;
    executor.gate().handle_decision(&id, ApprovalDecision::ApproveOnce);

    let result = task.await.unwrap();
    assert!(result.success);
    assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "x");
}

#[tokio::test(start_paused = true)]
async fn test_timeout_counts_as_denial() {
    let (executor, dir) = executor(Duration::from_secs(60));
    let result = executor
        .execute("write_file", json!({"file_path": "late.txt", "content": "x"}))
        .await;

    assert_eq!(result.error.as_deref(), Some("permission denied"));
    assert!(!dir.path().join("late.txt").exists());
    assert_eq!(executor.gate().pending_count(), 0);
}

#[tokio::test]
async fn test_read_only_tools_skip_prompt() {
    let (executor, dir) = executor(Duration::from_secs(60));
    std::fs::write(dir.path().join("r.txt"), "content").unwrap();

    let result = executor.execute("read_file", json!({"file_path": "r.txt"})).await;
    assert!(result.success);
    assert_eq!(executor.gate().pending_count(), 0);
}
