use super::walk::{display_relative, walk_files};
use crate::catalog::{parse_args, Tool, ToolCategory, ToolContext};
use crate::error::ToolError;
use crate::result::ToolResult;
use async_trait::async_trait;
use globset::{GlobBuilder, GlobMatcher};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Longest line echoed back per match
const MAX_LINE_CHARS: usize = 500;

fn default_case_sensitive() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GrepArgs {
    pattern: String,
    #[serde(default)]
    path: Option<String>,
    /// File filter such as `*.ts`
    #[serde(default)]
    glob: Option<String>,
    #[serde(default = "default_case_sensitive", alias = "caseSensitive")]
    case_sensitive: bool,
}

impl GrepArgs {
    fn regex(&self) -> Result<Regex, ToolError> {
        RegexBuilder::new(&self.pattern)
            .case_insensitive(!self.case_sensitive)
            .build()
            .map_err(|e| ToolError::Validation(format!("Invalid regex '{}': {}", self.pattern, e)))
    }

    fn file_filter(&self) -> Result<Option<GlobMatcher>, ToolError> {
        self.glob
            .as_deref()
            .map(|g| {
                GlobBuilder::new(g)
                    .build()
                    .map(|g| g.compile_matcher())
                    .map_err(|e| ToolError::Validation(format!("Invalid glob '{}': {}", g, e)))
            })
            .transpose()
    }
}

/// Content search within the workspace
pub struct GrepTool {
    max_matches: usize,
}

impl GrepTool {
    pub fn new(max_matches: usize) -> Self {
        Self { max_matches }
    }
}

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search file contents with a regular expression. Returns `path:line:text` matches."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Search
    }

    fn needs_approval(&self) -> bool {
        false
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": { "type": "string", "description": "Regular expression" },
                "path": { "type": "string", "description": "File or directory to search, defaults to the workspace root" },
                "glob": { "type": "string", "description": "File filter, e.g. \"*.ts\"" },
                "case_sensitive": { "type": "boolean", "default": true }
            },
            "required": ["pattern"],
            "additionalProperties": false
        })
    }

    fn validate(&self, args: &Value, ctx: &ToolContext) -> Result<(), ToolError> {
        let args: GrepArgs = parse_args(args)?;
        args.regex()?;
        args.file_filter()?;
        ctx.sandbox.resolve_path(args.path.as_deref().unwrap_or("."))?;
        Ok(())
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let args: GrepArgs = parse_args(&args)?;
        let regex = args.regex()?;
        let filter = args.file_filter()?;
        let root = ctx.sandbox.active_root()?;
        let base = ctx.sandbox.resolve_path(args.path.as_deref().unwrap_or("."))?;
        let sandbox = ctx.sandbox.clone();

        let max_matches = self.max_matches;
        let found = tokio::task::spawn_blocking(move || {
            let mut found = Matches::new(max_matches);
            for path in walk_files(&sandbox, &root, &base) {
                if let Some(filter) = &filter {
                    if !matches_filter(filter, &path, &base) {
                        continue;
                    }
                }
                search_file(&regex, &path, &display_relative(&path, &root), &mut found);
            }
            found
        })
        .await
        .map_err(|e| ToolError::execution(format!("grep task failed: {}", e)))?;

        Ok(ToolResult::success(json!({
            "pattern": args.pattern,
            "total": found.total,
            "truncated": found.total > found.lines.len(),
            "matches": found.lines,
        })))
    }
}

/// Keeps the first `limit` hits and counts the rest
struct Matches {
    lines: Vec<String>,
    total: usize,
    limit: usize,
}

impl Matches {
    fn new(limit: usize) -> Self {
        Self {
            lines: Vec::new(),
            total: 0,
            limit,
        }
    }

    fn record(&mut self, render: impl FnOnce() -> String) {
        self.total += 1;
        if self.lines.len() < self.limit {
            self.lines.push(render());
        }
    }
}

fn matches_filter(filter: &GlobMatcher, path: &Path, base: &Path) -> bool {
    let by_name = path
        .file_name()
        .is_some_and(|name| filter.is_match(Path::new(name)));
    by_name || filter.is_match(display_relative(path, base))
}

/// Record `rel:line:text` for every matching line.
///
/// Files are read line by line. A NUL in the first block marks a binary
/// file; a line that is not UTF-8 ends the search of that file.
fn search_file(regex: &Regex, path: &Path, rel: &str, out: &mut Matches) {
    let Ok(file) = File::open(path) else {
        return;
    };
    let mut reader = BufReader::new(file);
    match reader.fill_buf() {
        Ok(head) if !head.contains(&0) => {}
        _ => return,
    }

    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        line_no += 1;
        let Ok(line) = std::str::from_utf8(&buf) else {
            return;
        };
        let line = line.trim_end_matches(['\n', '\r']);
        if regex.is_match(line) {
            out.record(|| {
                let shown: String = line.chars().take(MAX_LINE_CHARS).collect();
                format!("{}:{}:{}", rel, line_no, shown)
            });
        }
    }
}
