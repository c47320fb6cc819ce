use crate::sandbox::WorkspaceSandbox;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Directories never descended into
pub(crate) const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    ".venv",
    "__pycache__",
];

/// Files under `base`, sorted, minus excluded directories and sensitive files
pub(crate) fn walk_files(sandbox: &WorkspaceSandbox, root: &Path, base: &Path) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(base);
    builder.hidden(false);
    builder.filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        !(entry.file_type().is_some_and(|t| t.is_dir()) && EXCLUDED_DIRS.contains(&name.as_ref()))
    });
    builder.sort_by_file_path(|a, b| a.cmp(b));

    builder
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| match path.strip_prefix(root) {
            Ok(rel) => !sandbox.is_path_denied(rel),
            Err(_) => false,
        })
        .collect()
}

/// Forward-slash display form of `path` relative to `base`
pub(crate) fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
