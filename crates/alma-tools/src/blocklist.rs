//! Destructive shell command patterns rejected before any approval prompt.

use crate::error::SandboxError;
use regex::RegexSet;

/// `(pattern, reason)` pairs
pub const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    (
        r"(?i)\brm\s+(?:(?:--recursive|-[^\s-]*[rR][^\s-]*)(?:\s+(?:--[\w-]+|-[^\s]+))*|(?:--[\w-]+|-[^\s]+)\s+(?:--recursive|-[^\s-]*[rR][^\s-]*)(?:\s+(?:--[\w-]+|-[^\s]+))*)\s+(?:--\s+)?(?:/+|/\*|/\.\*(?:/+)?|/(?:\.{1,2})(?:/\.{1,2})*(?:/+)?)(?:\s|$|[&|;])",
        "deletes the root filesystem",
    ),
    (
        r"(?i)\brm\s+(?:(?:--recursive|-[^\s-]*[rR][^\s-]*)(?:\s+(?:--[\w-]+|-[^\s]+))*|(?:--[\w-]+|-[^\s]+)\s+(?:--recursive|-[^\s-]*[rR][^\s-]*)(?:\s+(?:--[\w-]+|-[^\s]+))*)\s+(?:--\s+)?(?:~|\$HOME|\$\{HOME\})(?:\s|$|[&|;/])",
        "deletes the home directory",
    ),
    (r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:", "fork bomb"),
    (
        r"(?i)\bdd\s+.*of=/dev/(?:sd|hd|nvme|vd|xvd|loop|disk)\w*",
        "raw write to a disk device",
    ),
    (
        r"(?i)\bmkfs(?:\.\w+)?\s+(?:-\S+\s+)*/dev/\w+",
        "formats a disk device",
    ),
    (
        r">\s*/dev/(?:sd|hd|nvme|vd|xvd|disk)\w*",
        "raw write to a disk device",
    ),
    (
        r"(?i)\bchmod\s+-R\s+\d+\s+/(?:\s|$|[&|;])",
        "recursive permission change on the root filesystem",
    ),
];

#[derive(Debug, Clone)]
pub struct CommandBlocklist {
    set: RegexSet,
    reasons: Vec<String>,
}

impl CommandBlocklist {
    pub fn new(patterns: &[(&str, &str)]) -> Result<Self, regex::Error> {
        let set = RegexSet::new(patterns.iter().map(|(p, _)| *p))?;
        let reasons = patterns.iter().map(|(_, r)| (*r).to_string()).collect();
        Ok(Self { set, reasons })
    }

    pub fn with_defaults() -> Result<Self, regex::Error> {
        Self::new(DEFAULT_PATTERNS)
    }

    pub fn check(&self, command: &str) -> Result<(), SandboxError> {
        match self.set.matches(command).iter().next() {
            Some(idx) => Err(SandboxError::CommandBlocked {
                reason: self.reasons[idx].clone(),
            }),
            None => Ok(()),
        }
    }
}
