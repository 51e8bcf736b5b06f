//! MG-015: msgpgen.yaml parsing, validation and root type discovery.
//!
//! Validates structural constraints:
//! - Version must be "1.0"
//! - The temp dir is a single non-empty path component
//! - Output templates contain `{pkg}` and name Go files
//! - Every root type and interface parses as `full/pkg/path.Type`

use super::types::*;
use crate::packages::{find_struct_implementers, PackageSet};
use regex::Regex;
use std::io::BufRead;
use std::path::Path;
use std::sync::LazyLock;

static COLUMN_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a msgpgen.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<ProjectConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse a msgpgen.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<ProjectConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &ProjectConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut push = |message: String| errors.push(ValidationError { message });

    if config.version != "1.0" {
        push(format!("version must be \"1.0\", got \"{}\"", config.version));
    }

    if config.manifest.as_os_str().is_empty() {
        push("manifest must not be empty".to_string());
    }

    let gen = &config.generate;
    if gen.temp_dir.is_empty() {
        push("generate.temp_dir must not be empty".to_string());
    } else if gen.temp_dir.contains('/') || gen.temp_dir.contains('\\') || gen.temp_dir == ".." {
        push(format!(
            "generate.temp_dir '{}' must be a single directory name",
            gen.temp_dir
        ));
    }

    for (field, template) in [
        ("file_template", &gen.file_template),
        ("test_template", &gen.test_template),
    ] {
        if !template.contains("{pkg}") {
            push(format!("generate.{} '{}' must contain {{pkg}}", field, template));
        }
        if !template.ends_with(".go") {
            push(format!("generate.{} '{}' must end in .go", field, template));
        }
    }
    if gen.file_template == gen.test_template {
        push("generate.file_template and generate.test_template must differ".to_string());
    }
    if gen.version_file && gen.version_file_template.is_empty() {
        push("generate.version_file_template must not be empty".to_string());
    }

    for t in &config.types {
        if let Err(e) = TypeName::parse(t) {
            push(format!("types: {}", e));
        }
    }
    for t in &config.ifaces {
        if let Err(e) = TypeName::parse(t) {
            push(format!("ifaces: {}", e));
        }
    }

    if config.tools.msgp.is_empty() {
        push("tools.msgp must not be empty".to_string());
    }
    if config.tools.goimports.is_empty() {
        push("tools.goimports must not be empty".to_string());
    }

    errors
}

/// Parse a list of qualified type names.
pub fn parse_type_names(names: &[String]) -> Result<Vec<TypeName>, String> {
    names.iter().map(|n| TypeName::parse(n)).collect()
}

/// Root types: the explicit list, then every struct implementing one of
/// `ifaces`, deduplicated in first-seen order.
pub fn collect_root_types(
    tpset: &dyn PackageSet,
    types: &[TypeName],
    ifaces: &[TypeName],
) -> Result<Vec<TypeName>, String> {
    let mut roots: Vec<TypeName> = Vec::with_capacity(types.len());
    let discovered = if ifaces.is_empty() {
        Vec::new()
    } else {
        find_struct_implementers(tpset, ifaces)?
    };
    for tn in types.iter().chain(discovered.iter()) {
        if !roots.contains(tn) {
            roots.push(tn.clone());
        }
    }
    Ok(roots)
}

/// Read qualified type names from one whitespace-separated column
/// (1-indexed). Blank lines and `//` comment lines are skipped.
pub fn read_tsv_types<R: BufRead>(reader: R, col: usize) -> Result<Vec<TypeName>, String> {
    if col == 0 {
        return Err("column is 1-indexed, got 0".to_string());
    }
    let mut types = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("read error: {}", e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let field = COLUMN_SPLIT.split(line).nth(col - 1).ok_or_else(|| {
            format!("line {}: expected at least {} columns", i + 1, col)
        })?;
        types.push(TypeName::parse(field).map_err(|e| format!("line {}: {}", i + 1, e))?);
    }
    Ok(types)
}

/// Read a TSV type list from a file, or stdin when `file` is `-`.
pub fn read_tsv_file(file: &str, col: usize) -> Result<Vec<TypeName>, String> {
    if file == "-" {
        let stdin = std::io::stdin();
        return read_tsv_types(stdin.lock(), col);
    }
    let f = std::fs::File::open(file).map_err(|e| format!("cannot open {}: {}", file, e))?;
    read_tsv_types(std::io::BufReader::new(f), col)
        .map_err(|e| format!("could not read TSV {}: {}", file, e))
}

/// Starter configuration written by `msgpgen init`.
pub fn starter_config() -> &'static str {
    r#"version: "1.0"
manifest: packages.yaml
state: msgpgen-state.json
types: []
ifaces: []
event_log: msgpgen-events.jsonl
generate:
  tests: true
  io: true
  marshal: true
  version_file: false
  temp_dir: _msgpgen
  file_template: "{pkg}_msgp_gen.go"
  test_template: "{pkg}_msgp_gen_test.go"
tools:
  msgp: msgp
  goimports: goimports
"#
}
