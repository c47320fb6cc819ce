use alma_tools::{ToolCatalog, ToolContext, ToolError, ToolsConfig, WorkspaceSandbox};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    root: std::path::PathBuf,
    catalog: ToolCatalog,
    ctx: ToolContext,
}

fn fixture_with(config: ToolsConfig) -> Fixture {
    let dir = TempDir::new().unwrap();
    let sandbox = Arc::new(WorkspaceSandbox::new());
    let ws = sandbox.register_workspace("test", dir.path()).unwrap();
    sandbox.set_active(&ws.id).unwrap();
    Fixture {
        root: ws.path.clone(),
        _dir: dir,
        catalog: ToolCatalog::with_builtins(&config).unwrap(),
        ctx: ToolContext::new(sandbox),
    }
}

fn fixture() -> Fixture {
    fixture_with(ToolsConfig::default())
}

#[tokio::test]
async fn test_write_then_read_file() {
    let f = fixture();
    let write = f.catalog.get("write_file").unwrap();
    let result = write
        .execute(json!({"file_path": "nested/dir/a.txt", "content": "hello"}), &f.ctx)
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.metadata.unwrap()["bytes"], 5);
    assert_eq!(std::fs::read_to_string(f.root.join("nested/dir/a.txt")).unwrap(), "hello");

    let read = f.catalog.get("read_file").unwrap();
    let result = read
        .execute(json!({"file_path": "nested/dir/a.txt"}), &f.ctx)
        .await
        .unwrap();
    assert_eq!(result.data.unwrap()["content"], "hello");
}

#[tokio::test]
async fn test_read_missing_file_is_execution_error() {
    let f = fixture();
    let err = f
        .catalog
        .get("read_file")
        .unwrap()
        .execute(json!({"file_path": "nope.txt"}), &f.ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "execution_error");
}

#[tokio::test]
async fn test_write_env_file_is_sandbox_violation() {
    let f = fixture();
    let tool = f.catalog.get("write_file").unwrap();
    let args = json!({"file_path": ".env", "content": "SECRET=1"});

    let err = tool.validate(&args, &f.ctx).unwrap_err();
    assert!(matches!(err, ToolError::SandboxViolation(_)));
    let err = tool.execute(args, &f.ctx).await.unwrap_err();
    assert_eq!(err.kind(), "sandbox_violation");
    assert!(!f.root.join(".env").exists());
}

#[tokio::test]
async fn test_unknown_argument_rejected() {
    let f = fixture();
    let err = f
        .catalog
        .get("read_file")
        .unwrap()
        .validate(&json!({"file_path": "a", "extra": 1}), &f.ctx)
        .unwrap_err();
    assert!(matches!(err, ToolError::Validation(_)));
}

#[tokio::test]
async fn test_edit_first_occurrence() {
    let f = fixture();
    std::fs::write(f.root.join("code.rs"), "foo foo foo").unwrap();

    let result = f
        .catalog
        .get("edit_file")
        .unwrap()
        .execute(
            json!({"file_path": "code.rs", "old_string": "foo", "new_string": "bar"}),
            &f.ctx,
        )
        .await
        .unwrap();
    assert_eq!(result.data.unwrap()["replacements"], 1);
    assert_eq!(std::fs::read_to_string(f.root.join("code.rs")).unwrap(), "bar foo foo");
}

#[tokio::test]
async fn test_edit_replace_all_counts() {
    let f = fixture();
    std::fs::write(f.root.join("code.rs"), "foo foo foo").unwrap();

    let result = f
        .catalog
        .get("edit_file")
        .unwrap()
        .execute(
            json!({"filePath": "code.rs", "oldString": "foo", "newString": "baz", "replaceAll": true}),
            &f.ctx,
        )
        .await
        .unwrap();
    assert_eq!(result.data.unwrap()["replacements"], 3);
    assert_eq!(std::fs::read_to_string(f.root.join("code.rs")).unwrap(), "baz baz baz");
}

#[tokio::test]
async fn test_edit_absent_string_leaves_file() {
    let f = fixture();
    std::fs::write(f.root.join("code.rs"), "alpha").unwrap();
    let tool = f.catalog.get("edit_file").unwrap();

    for replace_all in [false, true] {
        let err = tool
            .execute(
                json!({"file_path": "code.rs", "old_string": "beta", "new_string": "x", "replace_all": replace_all}),
                &f.ctx,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "execution_error");
    }
    assert_eq!(std::fs::read_to_string(f.root.join("code.rs")).unwrap(), "alpha");

    let err = tool
        .validate(&json!({"file_path": "code.rs", "old_string": "", "new_string": "x"}), &f.ctx)
        .unwrap_err();
    assert!(matches!(err, ToolError::Validation(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_bash_runs_in_workspace_root() {
    let f = fixture();
    let result = f
        .catalog
        .get("bash")
        .unwrap()
        .execute(json!({"command": "pwd && echo hi"}), &f.ctx)
        .await
        .unwrap();
    let data = result.data.unwrap();
    let stdout = data["stdout"].as_str().unwrap();
    assert!(stdout.contains(f.root.to_str().unwrap()));
    assert!(stdout.contains("hi"));
    assert_eq!(data["exit_code"], 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_bash_nonzero_exit_keeps_output() {
    let f = fixture();
    let err = f
        .catalog
        .get("bash")
        .unwrap()
        .execute(json!({"command": "echo partial; exit 3"}), &f.ctx)
        .await
        .unwrap_err();
    match err {
        ToolError::Execution { metadata: Some(meta), .. } => {
            assert_eq!(meta["exit_code"], 3);
            assert!(meta["stdout"].as_str().unwrap().contains("partial"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_bash_truncates_output() {
    let f = fixture_with(ToolsConfig::default().with_max_output_bytes(10));
    let result = f
        .catalog
        .get("bash")
        .unwrap()
        .execute(json!({"command": "printf '%0100d' 0"}), &f.ctx)
        .await
        .unwrap();
    let data = result.data.unwrap();
    assert_eq!(data["stdout"].as_str().unwrap().len(), 10);
    assert_eq!(data["stdout_truncated"], true);
    assert_eq!(data["stdout_total_bytes"], 100);
}

#[cfg(unix)]
#[tokio::test]
async fn test_bash_timeout() {
    let f = fixture_with(ToolsConfig::default().with_bash_timeout(Duration::from_secs(1)));
    let err = f
        .catalog
        .get("bash")
        .unwrap()
        .execute(json!({"command": "echo partial; echo oops >&2; sleep 5"}), &f.ctx)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timed out"));

    // Output written before the kill is kept
    let result = alma_tools::ToolResult::from_error(&err);
    let metadata = result.metadata.unwrap();
    assert_eq!(metadata["kind"], "execution_error");
    assert_eq!(metadata["timed_out"], true);
    assert_eq!(metadata["stdout"], "partial\n");
    assert_eq!(metadata["stderr"], "oops\n");
}

#[tokio::test]
async fn test_bash_blocklist_in_validate() {
    let f = fixture();
    let err = f
        .catalog
        .get("bash")
        .unwrap()
        .validate(&json!({"command": "rm -rf /"}), &f.ctx)
        .unwrap_err();
    assert_eq!(err.kind(), "sandbox_violation");
}

#[tokio::test]
async fn test_glob_skips_excluded_dirs_and_caps() {
    let f = fixture_with(ToolsConfig::default().with_glob_max_results(2));
    for p in ["src/a.rs", "src/b.rs", "src/c.rs", "node_modules/x.rs", "target/y.rs"] {
        let path = f.root.join(p);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    let result = f
        .catalog
        .get("glob")
        .unwrap()
        .execute(json!({"pattern": "**/*.rs"}), &f.ctx)
        .await
        .unwrap();
    let data = result.data.unwrap();
    assert_eq!(data["total"], 3);
    assert_eq!(data["truncated"], true);
    assert_eq!(data["files"], json!(["src/a.rs", "src/b.rs"]));
}

#[tokio::test]
async fn test_grep_finds_matches() {
    let f = fixture();
    std::fs::create_dir_all(f.root.join("src")).unwrap();
    std::fs::write(f.root.join("src/main.ts"), "const TODO = 1;\nlet x = 2;\n// todo later\n").unwrap();
    std::fs::write(f.root.join("notes.md"), "TODO: docs\n").unwrap();
    std::fs::write(f.root.join(".env"), "TODO=secret\n").unwrap();

    let tool = f.catalog.get("grep").unwrap();
    let result = tool
        .execute(json!({"pattern": "todo", "case_sensitive": false, "glob": "*.ts"}), &f.ctx)
        .await
        .unwrap();
    let data = result.data.unwrap();
    assert_eq!(data["total"], 2);
    assert_eq!(data["matches"][0], "src/main.ts:1:const TODO = 1;");
    assert_eq!(data["matches"][1], "src/main.ts:3:// todo later");

    let result = tool.execute(json!({"pattern": "TODO"}), &f.ctx).await.unwrap();
    let data = result.data.unwrap();
    // .env is never searched
    assert_eq!(data["total"], 2);
}

#[tokio::test]
async fn test_grep_caps_kept_matches_but_counts_all() {
    let f = fixture_with(ToolsConfig::default().with_grep_max_matches(2));
    std::fs::write(f.root.join("a.txt"), "hit 1\nmiss\nhit 2\r\nhit 3\n").unwrap();
    std::fs::write(f.root.join("b.txt"), "hit 4\nhit 5").unwrap();
    std::fs::write(f.root.join("c.bin"), b"hit\0binary\n").unwrap();

    let result = f
        .catalog
        .get("grep")
        .unwrap()
        .execute(json!({"pattern": "^hit"}), &f.ctx)
        .await
        .unwrap();
    let data = result.data.unwrap();
    assert_eq!(data["total"], 5);
    assert_eq!(data["truncated"], true);
    assert_eq!(data["matches"], json!(["a.txt:1:hit 1", "a.txt:3:hit 2"]));
}

#[tokio::test]
async fn test_grep_invalid_regex() {
    let f = fixture();
    let err = f
        .catalog
        .get("grep")
        .unwrap()
        .validate(&json!({"pattern": "("}), &f.ctx)
        .unwrap_err();
    assert!(matches!(err, ToolError::Validation(_)));
}
