//! Shell command screening: pattern matching against destructive idioms.
//!
//! Two layers, checked in order:
//! 1. An exact blocklist of commands that are never acceptable (fork bomb,
//!    `rm -rf /` variants), matched as substrings of the normalized input.
//! 2. An ordered table of (regex, description) pairs covering destructive
//!    filesystem operations, privilege escalation, resource exhaustion,
//!    sensitive-file reads, and remote-code-execution idioms.
//!
//! The first match wins and its human-readable description is returned so
//! the refusal shown to the model explains what was wrong.

use regex::RegexBuilder;
use std::sync::LazyLock;
use tracing::debug;

/// Commands that are always blocked (substring match on the normalized
/// command).
const BLOCKED_COMMANDS: &[&str] = &[
    ":(){ :|:& };:",
    "rm -rf /",
    "rm -rf /*",
    "rm -rf ~",
    "rm -rf ~/*",
];

/// Dangerous patterns, in check order. Keep destructive filesystem
/// operations first: their descriptions are the most useful refusals.
const DANGEROUS_PATTERNS: &[(&str, &str)] = &[
    // Destructive file operations
    (r"rm\s+(-[rf]+\s+)?/", "recursive delete from root"),
    (r"rm\s+-[rf]*\s+~", "delete home directory"),
    (r"rm\s+-[rf]*\s+\*", "wildcard delete"),
    (r"mkfs\.", "format filesystem"),
    (r"dd\s+if=.+of=/dev/", "overwrite disk device"),
    (r">\s*/dev/sd[a-z]", "overwrite disk"),
    (r"chmod\s+777\s+/", "insecure permissions on root"),
    (r"chown\s+-R\s+.+\s+/", "recursive chown from root"),
    // Privilege escalation
    (r"sudo\s+rm", "sudo delete"),
    (r"sudo\s+chmod", "sudo chmod"),
    (r"sudo\s+chown", "sudo chown"),
    // Fork bomb / resource exhaustion
    (r":\(\)\s*\{\s*:\|:&\s*\}\s*;:", "fork bomb"),
    (r"while\s+true.*done", "infinite loop"),
    // Sensitive file access
    (r"cat.+/etc/shadow", "read shadow file"),
    (r"cat.+\.ssh/id_", "read SSH private key"),
    (r"cat.+\.env", "read environment file"),
    // Remote code execution
    (r"curl.+\|.*(bash|sh)", "curl pipe to shell"),
    (r"wget.+\|.*(bash|sh)", "wget pipe to shell"),
    (r"nc\s+-[e]", "netcat reverse shell"),
];

static COMPILED_PATTERNS: LazyLock<Vec<(regex::Regex, &'static str, &'static str)>> =
    LazyLock::new(|| {
        DANGEROUS_PATTERNS
            .iter()
            .map(|(pattern, description)| {
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .unwrap_or_else(|e| panic!("invalid builtin pattern {pattern:?}: {e}"));
                (re, *pattern, *description)
            })
            .collect()
    });

/// Check whether a shell command matches a known-dangerous pattern.
///
/// Returns a `Blocked: ...` refusal describing the first matching hazard,
/// or `None` if the command looks clean. Pattern-based and advisory only;
/// see the crate docs for the threat model.
pub fn check_dangerous_command(command: &str) -> Option<String> {
    let normalized = command.trim().to_lowercase();

    for blocked in BLOCKED_COMMANDS {
        if normalized.contains(blocked) {
            debug!(blocked, "Command hit the exact blocklist");
            return Some(format!("Blocked: '{blocked}' is not allowed for safety"));
        }
    }

    COMPILED_PATTERNS
        .iter()
        .find(|(re, _, _)| re.is_match(command))
        .map(|(_, pattern, description)| {
            debug!(description, "Command matched a dangerous pattern");
            format!("Blocked: {description} (pattern: {pattern})")
        })
}
