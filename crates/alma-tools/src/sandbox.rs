use crate::error::SandboxError;
use alma_types::Workspace;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// Sensitive files no tool may touch, matched against the workspace-relative path
pub const DEFAULT_DENY_PATTERNS: &[&str] = &[
    "**/.env*",
    "**/.git/config",
    "**/id_rsa",
    "**/.ssh",
    "**/.ssh/**",
];

#[derive(Default)]
struct Registry {
    workspaces: HashMap<String, Workspace>,
    active: Option<String>,
}

/// Resolves tool paths against the active workspace root.
///
/// Workspace roots are stored canonicalized, so every check compares
/// canonical prefixes component by component.
pub struct WorkspaceSandbox {
    registry: RwLock<Registry>,
    deny: GlobSet,
}

impl Default for WorkspaceSandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceSandbox {
    pub fn new() -> Self {
        Self::with_deny_patterns(DEFAULT_DENY_PATTERNS)
    }

    pub fn with_deny_patterns(patterns: &[&str]) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            deny: build_deny_set(patterns),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a workspace rooted at an existing directory
    pub fn register_workspace(
        &self,
        name: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Workspace, SandboxError> {
        let path = path.as_ref();
        let root = std::fs::canonicalize(path)
            .map_err(|e| SandboxError::InvalidWorkspace(format!("{}: {}", path.display(), e)))?;
        if !root.is_dir() {
            return Err(SandboxError::InvalidWorkspace(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let workspace = Workspace::new(name, root);
        self.write()
            .workspaces
            .insert(workspace.id.clone(), workspace.clone());
        info!(workspace_id = %workspace.id, path = %workspace.path.display(), "Registered workspace");
        Ok(workspace)
    }

    pub fn set_active(&self, workspace_id: &str) -> Result<Workspace, SandboxError> {
        let mut registry = self.write();
        let mut workspace = registry
            .workspaces
            .get(workspace_id)
            .cloned()
            .ok_or_else(|| SandboxError::InvalidWorkspace(format!("unknown id {}", workspace_id)))?;
        registry.active = Some(workspace_id.to_string());
        workspace.is_active = true;
        info!(workspace_id = %workspace_id, "Activated workspace");
        Ok(workspace)
    }

    pub fn active_workspace(&self) -> Option<Workspace> {
        let registry = self.read();
        let id = registry.active.as_ref()?;
        registry.workspaces.get(id).cloned().map(|mut ws| {
            ws.is_active = true;
            ws
        })
    }

    pub fn active_root(&self) -> Result<PathBuf, SandboxError> {
        self.active_workspace()
            .map(|ws| ws.path)
            .ok_or(SandboxError::NoActiveWorkspace)
    }

    pub fn get_workspace(&self, workspace_id: &str) -> Option<Workspace> {
        let registry = self.read();
        registry.workspaces.get(workspace_id).cloned().map(|mut ws| {
            ws.is_active = registry.active.as_deref() == Some(workspace_id);
            ws
        })
    }

    /// All registered workspaces, oldest first
    pub fn list_workspaces(&self) -> Vec<Workspace> {
        let registry = self.read();
        let mut list: Vec<Workspace> = registry
            .workspaces
            .values()
            .cloned()
            .map(|mut ws| {
                ws.is_active = registry.active.as_deref() == Some(ws.id.as_str());
                ws
            })
            .collect();
        list.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        list
    }

    /// Return the active workspace, creating and activating one at
    /// `default_path` when none is active.
    pub fn ensure_active_workspace(
        &self,
        name: &str,
        default_path: impl AsRef<Path>,
    ) -> Result<Workspace, SandboxError> {
        if let Some(ws) = self.active_workspace() {
            return Ok(ws);
        }
        let default_path = default_path.as_ref();
        std::fs::create_dir_all(default_path).map_err(|e| {
            SandboxError::InvalidWorkspace(format!("{}: {}", default_path.display(), e))
        })?;
        let ws = self.register_workspace(name, default_path)?;
        self.set_active(&ws.id)
    }

    /// Resolve a tool-supplied path inside the active workspace
    pub fn resolve_path(&self, path: &str) -> Result<PathBuf, SandboxError> {
        let root = self.active_root()?;
        self.resolve_in(&root, path)
    }

    fn resolve_in(&self, root: &Path, raw: &str) -> Result<PathBuf, SandboxError> {
        let raw = raw.trim();
        let input = Path::new(if raw.is_empty() { "." } else { raw });
        let joined = if input.is_absolute() {
            input.to_path_buf()
        } else {
            root.join(input)
        };
        let resolved = normalize(&joined);

        if !resolved.starts_with(root) {
            return Err(SandboxError::denied(raw, "path escapes the workspace root"));
        }
        self.check_denied(root, &resolved, raw)?;

        // Follow symlinks on the deepest existing ancestor
        if let Some(existing) = deepest_existing(&resolved) {
            let canonical = std::fs::canonicalize(&existing)
                .map_err(|e| SandboxError::denied(raw, e.to_string()))?;
            if !canonical.starts_with(root) {
                return Err(SandboxError::denied(raw, "symlink escapes the workspace root"));
            }
            self.check_denied(root, &canonical, raw)?;
        }

        Ok(resolved)
    }

    fn check_denied(&self, root: &Path, path: &Path, raw: &str) -> Result<(), SandboxError> {
        if let Ok(rel) = path.strip_prefix(root) {
            if self.is_path_denied(rel) {
                warn!(path = %raw, "Blocked access to sensitive file");
                return Err(SandboxError::denied(raw, "sensitive file"));
            }
        }
        Ok(())
    }

    /// Membership check against a specific workspace root
    pub fn is_path_in_workspace(&self, path: &Path, workspace_id: &str) -> bool {
        let Some(ws) = self.read().workspaces.get(workspace_id).cloned() else {
            return false;
        };
        path.is_absolute() && normalize(path).starts_with(&ws.path)
    }

    /// Deny-pattern check on a workspace-relative path
    pub fn is_path_denied(&self, relative: &Path) -> bool {
        !relative.as_os_str().is_empty() && self.deny.is_match(relative)
    }
}

fn build_deny_set(patterns: &[&str]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match GlobBuilder::new(pattern)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
        {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => warn!(pattern = %pattern, error = %e, "Skipping invalid deny pattern"),
        }
    }
    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to build deny set");
        GlobSet::empty()
    })
}

/// Lexical normalization: drops `.` and applies `..` without touching the filesystem
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn deepest_existing(path: &Path) -> Option<PathBuf> {
    let mut current = Some(path);
    while let Some(p) = current {
        if std::fs::symlink_metadata(p).is_ok() {
            return Some(p.to_path_buf());
        }
        current = p.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sandbox_with_root() -> (WorkspaceSandbox, TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let sandbox = WorkspaceSandbox::new();
        let ws = sandbox.register_workspace("test", dir.path()).unwrap();
        sandbox.set_active(&ws.id).unwrap();
        let root = ws.path.clone();
        (sandbox, dir, root)
    }

    #[test]
    fn test_no_active_workspace() {
        let sandbox = WorkspaceSandbox::new();
        assert_eq!(
            sandbox.resolve_path("a.txt").unwrap_err(),
            SandboxError::NoActiveWorkspace
        );
    }

    #[test]
    fn test_relative_paths_resolve_under_root() {
        let (sandbox, _dir, root) = sandbox_with_root();
        for p in ["a.txt", "src/lib.rs", "./x/../y.txt", "new/dir/file.md", "."] {
            let resolved = sandbox.resolve_path(p).unwrap();
            assert!(resolved.starts_with(&root), "{} -> {:?}", p, resolved);
        }
    }

    #[test]
    fn test_parent_traversal_denied() {
        let (sandbox, _dir, _root) = sandbox_with_root();
        for p in ["../outside.txt", "a/../../b", "../../../../etc/passwd"] {
            assert!(matches!(
                sandbox.resolve_path(p),
                Err(SandboxError::AccessDenied { .. })
            ));
        }
    }

    #[test]
    fn test_absolute_paths() {
        let (sandbox, _dir, root) = sandbox_with_root();
        let inside = root.join("file.txt");
        assert_eq!(sandbox.resolve_path(inside.to_str().unwrap()).unwrap(), inside);
        assert!(sandbox.resolve_path("/etc/passwd").is_err());
    }

    #[test]
    fn test_sensitive_files_denied() {
        let (sandbox, _dir, _root) = sandbox_with_root();
        for p in [".env", ".env.local", "sub/.ENV", ".git/config", "keys/id_rsa", ".ssh/known_hosts"] {
            let err = sandbox.resolve_path(p).unwrap_err();
            assert!(
                matches!(err, SandboxError::AccessDenied { ref reason, .. } if reason == "sensitive file"),
                "{}",
                p
            );
        }
        assert!(sandbox.resolve_path("environment.md").is_ok());
        assert!(sandbox.resolve_path(".gitignore").is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_denied() {
        let (sandbox, _dir, root) = sandbox_with_root();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("link")).unwrap();

        assert!(sandbox.resolve_path("link/secret.txt").is_err());
    }

    #[test]
    fn test_is_path_in_workspace() {
        let (sandbox, _dir, root) = sandbox_with_root();
        let id = sandbox.active_workspace().unwrap().id;

        assert!(sandbox.is_path_in_workspace(&root.join("a/b.txt"), &id));
        assert!(!sandbox.is_path_in_workspace(&root.join("../x"), &id));
        assert!(!sandbox.is_path_in_workspace(&root.join("a"), "unknown"));
    }

    #[test]
    fn test_register_rejects_missing_dir() {
        let sandbox = WorkspaceSandbox::new();
        assert!(matches!(
            sandbox.register_workspace("x", "/definitely/not/here"),
            Err(SandboxError::InvalidWorkspace(_))
        ));
    }

    #[test]
    fn test_ensure_active_workspace_creates_default() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("default-ws");
        let sandbox = WorkspaceSandbox::new();

        let ws = sandbox.ensure_active_workspace("default", &target).unwrap();
        assert!(target.is_dir());
        assert!(ws.is_active);

        let again = sandbox.ensure_active_workspace("other", dir.path()).unwrap();
        assert_eq!(again.id, ws.id);
        assert_eq!(sandbox.list_workspaces().len(), 1);
    }

    #[test]
    fn test_switch_active_workspace() {
        let (sandbox, _dir, _root) = sandbox_with_root();
        let other_dir = TempDir::new().unwrap();
        let other = sandbox.register_workspace("other", other_dir.path()).unwrap();

        sandbox.set_active(&other.id).unwrap();
        let root = sandbox.active_root().unwrap();
        assert_eq!(root, other.path);
        assert_eq!(sandbox.list_workspaces().iter().filter(|w| w.is_active).count(), 1);
    }
}
