//! MG-009: Generator output classifier.
//!
//! The codec generator marks severity with ANSI colours: green for
//! progress, yellow for warnings, red for errors.

use super::directives::Directives;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::LazyLock;

pub const ANSI_GREEN: &str = "\x1b[32m";
pub const ANSI_YELLOW: &str = "\x1b[33m";
pub const ANSI_RED: &str = "\x1b[31m";
pub const ANSI_MAGENTA: &str = "\x1b[35m";
/// Default foreground; the generator emits it ahead of most lines.
pub const ANSI_RESET: &str = "\x1b[39m";

static UNRESOLVED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:unresolved|non-local) identifier:\s*([^ ]+)").unwrap()
});
static IGNORED_FIELD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r": ignored\.").unwrap());
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());

/// Classification of one generator line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    Ok,
    /// A warning that is expected given the directives in effect.
    Expected,
    Warning(String),
    Error(String),
    Unhandled(String),
}

impl LineClass {
    pub fn is_ok(&self) -> bool {
        matches!(self, LineClass::Ok | LineClass::Expected)
    }
}

/// Strip ANSI colour sequences.
pub fn strip_ansi(s: &str) -> String {
    ANSI_ESCAPE.replace_all(s, "").to_string()
}

/// Classify a line. `seen` holds the importable basenames of every type
/// the queue considered.
pub fn classify_line(line: &str, dctvs: &Directives, seen: &FxHashSet<String>) -> LineClass {
    let mut line = line.trim();
    while let Some(rest) = line.strip_prefix(ANSI_RESET) {
        line = rest;
    }
    if line.is_empty() {
        return LineClass::Ok;
    }
    if line.starts_with(&format!("{}>>> Wrote and formatted", ANSI_MAGENTA)) {
        return LineClass::Ok;
    }
    if line.starts_with(ANSI_GREEN) {
        return LineClass::Ok;
    }
    if let Some(msg) = line.strip_prefix(ANSI_YELLOW) {
        if is_expected_warning(msg, dctvs, seen) {
            return LineClass::Expected;
        }
        return LineClass::Warning(strip_ansi(msg));
    }
    if let Some(msg) = line.strip_prefix(ANSI_RED) {
        return LineClass::Error(strip_ansi(msg));
    }
    LineClass::Unhandled(line.to_string())
}

/// Fail on anything but success lines and expected warnings.
pub fn check_line(line: &str, dctvs: &Directives, seen: &FxHashSet<String>) -> Result<(), String> {
    match classify_line(line, dctvs, seen) {
        LineClass::Ok | LineClass::Expected => Ok(()),
        LineClass::Warning(msg) => Err(format!("codec generator warning: {}", msg)),
        LineClass::Error(msg) => Err(format!("codec generator failed: {}", msg)),
        LineClass::Unhandled(line) => Err(format!("unhandled generator output: '{}'", line)),
    }
}

// The generator warns about unresolved identifiers even for types that are
// ignored, shimmed or handled elsewhere in the run.
fn is_expected_warning(msg: &str, dctvs: &Directives, seen: &FxHashSet<String>) -> bool {
    if let Some(caps) = UNRESOLVED.captures(msg) {
        let name = strip_ansi(&caps[1]);
        let name = name.trim();
        return seen.contains(name)
            || dctvs.ignored_names().any(|n| n == name)
            || dctvs.intercepted_names().any(|n| n == name);
    }
    IGNORED_FIELD.is_match(msg)
}
