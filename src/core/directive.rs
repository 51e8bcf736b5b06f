//! MG-002: Directive model — parse and emit `//msgp:` comment directives.
//!
//! Grammar: `//msgp:<name> [positional...] [key:value...]`. Keys match
//! `[a-z]+`, positionals and values match `[^\s:]+`.

use super::types::parse_local_name;
use crate::packages::PackageSet;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Comment prefix that marks a directive line.
pub const LINE_PREFIX: &str = "//msgp:";

static SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static KEY_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]+):([^\s:]+)$").unwrap());
static VALUE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([^\s:]+)$").unwrap());

/// How a shim converts between the type and its primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShimMode {
    /// Plain type conversion, cannot fail.
    #[default]
    Cast,
    /// Function call returning `(value, error)`.
    Convert,
}

impl fmt::Display for ShimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShimMode::Cast => write!(f, "cast"),
            ShimMode::Convert => write!(f, "convert"),
        }
    }
}

impl FromStr for ShimMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cast" => Ok(ShimMode::Cast),
            "convert" => Ok(ShimMode::Convert),
            other => Err(format!("unknown shim mode {}", other)),
        }
    }
}

/// `//msgp:shim {Type} as:{Primitive} using:{toFunc}/{fromFunc} [mode:cast|convert]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShimDirective {
    pub type_name: String,
    pub as_type: String,
    pub to_func: String,
    pub from_func: String,
    pub mode: ShimMode,
}

/// `//msgp:intercept {Type} using:{factory}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptDirective {
    pub type_name: String,
    pub using: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Ignore(Vec<String>),
    Tuple(Vec<String>),
    AllowExtra(Vec<String>),
    Shim(ShimDirective),
    Intercept(InterceptDirective),
}

impl Directive {
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Ignore(_) => "ignore",
            Directive::Tuple(_) => "tuple",
            Directive::AllowExtra(_) => "allowextra",
            Directive::Shim(_) => "shim",
            Directive::Intercept(_) => "intercept",
        }
    }

    /// Canonical textual form with every type name rewritten to be
    /// importable from `pkg`.
    pub fn build(&self, tpset: &dyn PackageSet, pkg: &str) -> Result<String, String> {
        match self {
            Directive::Ignore(types) | Directive::Tuple(types) | Directive::AllowExtra(types) => {
                let mut names = Vec::with_capacity(types.len());
                for t in types {
                    names.push(local_name(tpset, self.name(), t, pkg)?);
                }
                let line = format!("{}{} {}", LINE_PREFIX, self.name(), names.join(" "));
                Ok(line.trim_end().to_string())
            }
            Directive::Shim(s) => {
                let ln = local_name(tpset, "shim", &s.type_name, pkg)?;
                Ok(format!(
                    "{}shim {} as:{} using:{}/{} mode:{}",
                    LINE_PREFIX, ln, s.as_type, s.to_func, s.from_func, s.mode
                ))
            }
            Directive::Intercept(i) => {
                let ln = local_name(tpset, "intercept", &i.type_name, pkg)?;
                Ok(format!("{}intercept {} using:{}", LINE_PREFIX, ln, i.using))
            }
        }
    }
}

fn local_name(
    tpset: &dyn PackageSet,
    kind: &str,
    t: &str,
    pkg: &str,
) -> Result<String, String> {
    let tn = parse_local_name(t, pkg)
        .map_err(|e| format!("{} directive invalid type {}: {}", kind, t, e))?;
    tpset
        .local_import_name(&tn, pkg)
        .map_err(|e| format!("{} directive invalid rel name {}, {}: {}", kind, tn, pkg, e))
}

/// Parse a directive line. The `//msgp:` prefix is optional.
pub fn parse_directive(input: &str) -> Result<Directive, String> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix(LINE_PREFIX).unwrap_or(trimmed);
    let mut parts = SPLIT.split(body.trim());
    let name = parts.next().unwrap_or_default();
    if name.is_empty() {
        return Err("empty directive".to_string());
    }

    let mut args: Vec<String> = Vec::new();
    let mut kwargs: BTreeMap<String, String> = BTreeMap::new();
    for part in parts {
        if let Some(caps) = KEY_VALUE.captures(part) {
            kwargs.insert(caps[1].to_string(), caps[2].to_string());
        } else if VALUE.is_match(part) {
            args.push(part.to_string());
        } else {
            return Err(format!("invalid: '{}'", part));
        }
    }

    match name {
        "ignore" => Ok(Directive::Ignore(type_list("ignore", args, &kwargs)?)),
        "tuple" => Ok(Directive::Tuple(type_list("tuple", args, &kwargs)?)),
        "allowextra" => Ok(Directive::AllowExtra(type_list("allowextra", args, &kwargs)?)),
        "shim" => populate_shim(args, kwargs).map(Directive::Shim),
        "intercept" => populate_intercept(args, kwargs).map(Directive::Intercept),
        other => Err(format!("unknown directive {}", other)),
    }
}

fn type_list(
    kind: &str,
    args: Vec<String>,
    kwargs: &BTreeMap<String, String>,
) -> Result<Vec<String>, String> {
    if !kwargs.is_empty() {
        return Err(format!("invalid kwargs for {}", kind));
    }
    Ok(args)
}

fn single_arg(kind: &str, args: Vec<String>) -> Result<String, String> {
    if args.len() != 1 {
        return Err(format!(
            "invalid {} directive - expected one arg, found {}",
            kind,
            args.len()
        ));
    }
    Ok(args.into_iter().next().unwrap_or_default())
}

fn reject_leftovers(kwargs: &BTreeMap<String, String>) -> Result<(), String> {
    if kwargs.is_empty() {
        return Ok(());
    }
    let keys: Vec<&str> = kwargs.keys().map(|k| k.as_str()).collect();
    Err(format!("unknown keys: {}", keys.join(", ")))
}

fn populate_shim(
    args: Vec<String>,
    mut kwargs: BTreeMap<String, String>,
) -> Result<ShimDirective, String> {
    let type_name = single_arg("shim", args)?;
    let as_type = kwargs
        .remove("as")
        .ok_or_else(|| "missing as: in shim".to_string())?;
    let mode = match kwargs.remove("mode") {
        Some(m) => m.parse()?,
        None => ShimMode::Cast,
    };
    let using = kwargs
        .remove("using")
        .ok_or_else(|| "missing using: in shim".to_string())?;
    let methods: Vec<&str> = using.split('/').collect();
    let [to_func, from_func] = methods.as_slice() else {
        return Err(format!(
            "expected 2 using: methods; found {} ('{}')",
            methods.len(),
            using
        ));
    };
    if to_func.is_empty() || from_func.is_empty() {
        return Err(format!("empty using: method in '{}'", using));
    }
    let (to_func, from_func) = (to_func.to_string(), from_func.to_string());
    reject_leftovers(&kwargs)?;
    Ok(ShimDirective {
        type_name,
        as_type,
        to_func,
        from_func,
        mode,
    })
}

fn populate_intercept(
    args: Vec<String>,
    mut kwargs: BTreeMap<String, String>,
) -> Result<InterceptDirective, String> {
    let type_name = single_arg("intercept", args)?;
    let using = kwargs
        .remove("using")
        .ok_or_else(|| "missing using: in intercept".to_string())?;
    reject_leftovers(&kwargs)?;
    Ok(InterceptDirective { type_name, using })
}
