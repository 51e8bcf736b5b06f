//! MG-001: Core types — qualified type names, type handles, primitives, config.
//!
//! Type handles model the subset of a statically typed package graph that the
//! extractor needs: named types, basic types, and the compound constructors
//! that can appear in struct fields. `Display` produces the same canonical
//! spelling the codec generator uses (`[]byte`, `map[string]p.Foo`, `*p.Bar`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::path::PathBuf;

// ============================================================================
// Qualified type names
// ============================================================================

/// A fully qualified type name: `(package path, local name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName {
    pub package_path: String,
    pub local_name: String,
}

impl TypeName {
    pub fn new(package_path: &str, local_name: &str) -> Self {
        TypeName {
            package_path: package_path.to_string(),
            local_name: local_name.to_string(),
        }
    }

    /// Parse `full/pkg/path.Type`. The separator is the last `.` that follows
    /// the last `/`, so `gopkg.in/yaml.v2.Node` parses as `gopkg.in/yaml.v2`
    /// and `Node`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let slash = s.rfind('/').map(|i| i + 1).unwrap_or(0);
        let dot = s[slash..]
            .rfind('.')
            .map(|i| slash + i)
            .ok_or_else(|| {
                format!("could not parse '{}', expected format full/pkg/path.Type", s)
            })?;
        let (pkg, name) = (&s[..dot], &s[dot + 1..]);
        if pkg.is_empty() || name.is_empty() {
            return Err(format!(
                "could not parse '{}', expected format full/pkg/path.Type",
                s
            ));
        }
        Ok(TypeName::new(pkg, name))
    }

    /// True iff the local name begins with an uppercase letter.
    pub fn is_exported(&self) -> bool {
        self.local_name
            .chars()
            .next()
            .is_some_and(|c| c.is_uppercase())
    }

    /// Last path segment of the package path (`foo/bar` → `bar`).
    pub fn package_base(&self) -> &str {
        base_name(&self.package_path)
    }

    /// The name as written from inside `pkg`: bare when `pkg` declares the
    /// type, otherwise qualified by the package base name.
    pub fn import_name(&self, pkg: &str) -> String {
        if self.package_path == pkg {
            self.local_name.clone()
        } else {
            format!("{}.{}", self.package_base(), self.local_name)
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package_path, self.local_name)
    }
}

/// Parse a type reference as written inside `pkg`. Unqualified names belong
/// to `pkg`; qualified names are parsed as-is without resolving aliases.
pub fn parse_local_name(s: &str, pkg: &str) -> Result<TypeName, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err(format!("empty type name in package {}", pkg));
    }
    if s.contains('.') {
        TypeName::parse(s)
    } else {
        Ok(TypeName::new(pkg, s))
    }
}

/// Last `/`-separated segment of a path-like string.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Strip the origin package qualifier from a type name as seen from `origin`.
/// `example.com/p.Foo` seen from `example.com/p` is `Foo`; from elsewhere it
/// is `p.Foo`.
pub fn find_imported_name(name: &str, origin_pkg: &str) -> String {
    let name = base_name(name);
    let prefix = format!("{}.", base_name(origin_pkg));
    name.strip_prefix(&prefix).unwrap_or(name).to_string()
}

// ============================================================================
// Type handles
// ============================================================================

/// A semantic type handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Predeclared type: `int32`, `string`, `byte`, `rune`, ...
    Basic(String),
    /// Reference to a declared type; its underlying type lives in the package set.
    Named(TypeName),
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Array(u64, Box<Type>),
    Map(Box<Type>, Box<Type>),
    Chan(Box<Type>),
    Struct(Vec<Field>),
    /// Interface literal with its method names. Empty means `interface{}`.
    Interface(Vec<String>),
}

/// A struct field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub tag: String,
}

impl Type {
    pub fn named(pkg: &str, name: &str) -> Self {
        Type::Named(TypeName::new(pkg, name))
    }

    pub fn basic(name: &str) -> Self {
        Type::Basic(name.to_string())
    }

    pub fn type_name(&self) -> Option<&TypeName> {
        match self {
            Type::Named(tn) => Some(tn),
            _ => None,
        }
    }

    pub fn is_interface(&self) -> bool {
        matches!(self, Type::Interface(_))
    }

    /// Element type with one level of pointer removed.
    pub fn elide_pointer(&self) -> &Type {
        match self {
            Type::Pointer(elem) => elem,
            other => other,
        }
    }

    /// True for array, slice, map and chan constructors.
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            Type::Array(..) | Type::Slice(_) | Type::Map(..) | Type::Chan(_)
        )
    }

    /// Render the type as written inside `pkg`.
    pub fn local_string(&self, pkg: &str) -> String {
        match self {
            Type::Named(tn) => tn.import_name(pkg),
            Type::Basic(b) => b.clone(),
            Type::Pointer(e) => format!("*{}", e.local_string(pkg)),
            Type::Slice(e) => format!("[]{}", e.local_string(pkg)),
            Type::Array(n, e) => format!("[{}]{}", n, e.local_string(pkg)),
            Type::Map(k, v) => format!("map[{}]{}", k.local_string(pkg), v.local_string(pkg)),
            Type::Chan(e) => format!("chan {}", e.local_string(pkg)),
            Type::Struct(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{} {}", f.name, f.ty.local_string(pkg)))
                    .collect();
                format!("struct{{{}}}", parts.join("; "))
            }
            Type::Interface(methods) => interface_string(methods),
        }
    }
}

fn interface_string(methods: &[String]) -> String {
    if methods.is_empty() {
        return "interface{}".to_string();
    }
    let parts: Vec<String> = methods.iter().map(|m| format!("{}()", m)).collect();
    format!("interface{{{}}}", parts.join("; "))
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic(b) => write!(f, "{}", b),
            Type::Named(tn) => write!(f, "{}", tn),
            Type::Pointer(e) => write!(f, "*{}", e),
            Type::Slice(e) => write!(f, "[]{}", e),
            Type::Array(n, e) => write!(f, "[{}]{}", n, e),
            Type::Map(k, v) => write!(f, "map[{}]{}", k, v),
            Type::Chan(e) => write!(f, "chan {}", e),
            Type::Struct(fields) => {
                write!(f, "struct{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{} {}", field.name, field.ty)?;
                }
                write!(f, "}}")
            }
            Type::Interface(methods) => write!(f, "{}", interface_string(methods)),
        }
    }
}

/// A method declared on a named type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    /// Declared on `*T` rather than `T`.
    #[serde(default)]
    pub pointer: bool,
}

/// A type declaration resolved from the package set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeObject {
    pub name: TypeName,
    pub underlying: Type,
    pub methods: Vec<MethodDecl>,
}

/// Origin classification of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    User,
    Vendor,
    Stdlib,
    Unknown,
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageKind::User => write!(f, "user"),
            PackageKind::Vendor => write!(f, "vendor"),
            PackageKind::Stdlib => write!(f, "stdlib"),
            PackageKind::Unknown => write!(f, "unknown"),
        }
    }
}

// ============================================================================
// Primitives
// ============================================================================

/// Types the codec generator serializes directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Bytes,
    String,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Byte,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Bool,
    Intf,
    Time,
    Ext,
}

/// Name of the codec library's extension sentinel type.
pub const EXTENSION_TYPE: &str = "msgp.Extension";

/// Look up a type spelling in the primitive table. `rune` aliases `int32`.
pub fn primitive(name: &str) -> Option<Primitive> {
    let p = match name {
        "[]byte" => Primitive::Bytes,
        "string" => Primitive::String,
        "float32" => Primitive::Float32,
        "float64" => Primitive::Float64,
        "complex64" => Primitive::Complex64,
        "complex128" => Primitive::Complex128,
        "uint" => Primitive::Uint,
        "uint8" => Primitive::Uint8,
        "uint16" => Primitive::Uint16,
        "uint32" => Primitive::Uint32,
        "uint64" => Primitive::Uint64,
        "byte" => Primitive::Byte,
        "rune" => Primitive::Int32,
        "int" => Primitive::Int,
        "int8" => Primitive::Int8,
        "int16" => Primitive::Int16,
        "int32" => Primitive::Int32,
        "int64" => Primitive::Int64,
        "bool" => Primitive::Bool,
        "interface{}" => Primitive::Intf,
        "time.Time" => Primitive::Time,
        EXTENSION_TYPE => Primitive::Ext,
        _ => return None,
    };
    Some(p)
}

pub fn is_primitive(name: &str) -> bool {
    primitive(name).is_some()
}

impl Primitive {
    /// Suffix of the codec library's `Read*`/`Write*`/`Append*` helpers.
    pub fn codec_name(&self) -> &'static str {
        match self {
            Primitive::Bytes => "Bytes",
            Primitive::String => "String",
            Primitive::Float32 => "Float32",
            Primitive::Float64 => "Float64",
            Primitive::Complex64 => "Complex64",
            Primitive::Complex128 => "Complex128",
            Primitive::Uint => "Uint",
            Primitive::Uint8 => "Uint8",
            Primitive::Uint16 => "Uint16",
            Primitive::Uint32 => "Uint32",
            Primitive::Uint64 => "Uint64",
            Primitive::Byte => "Byte",
            Primitive::Int => "Int",
            Primitive::Int8 => "Int8",
            Primitive::Int16 => "Int16",
            Primitive::Int32 => "Int32",
            Primitive::Int64 => "Int64",
            Primitive::Bool => "Bool",
            Primitive::Intf => "Intf",
            Primitive::Time => "Time",
            Primitive::Ext => "Extension",
        }
    }
}

// ============================================================================
// Generation mode
// ============================================================================

/// Bitset of generator outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenMode(u8);

impl GenMode {
    pub const ENCODE: GenMode = GenMode(1);
    pub const DECODE: GenMode = GenMode(1 << 1);
    pub const MARSHAL: GenMode = GenMode(1 << 2);
    pub const UNMARSHAL: GenMode = GenMode(1 << 3);
    pub const SIZE: GenMode = GenMode(1 << 4);
    pub const TEST: GenMode = GenMode(1 << 5);

    pub fn contains(self, other: GenMode) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for GenMode {
    type Output = GenMode;
    fn bitor(self, rhs: GenMode) -> GenMode {
        GenMode(self.0 | rhs.0)
    }
}

impl fmt::Display for GenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (GenMode::ENCODE, "encode"),
            (GenMode::DECODE, "decode"),
            (GenMode::MARSHAL, "marshal"),
            (GenMode::UNMARSHAL, "unmarshal"),
            (GenMode::SIZE, "size"),
            (GenMode::TEST, "test"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(m, _)| self.contains(*m))
            .map(|(_, n)| *n)
            .collect();
        write!(f, "{}", set.join(","))
    }
}

// ============================================================================
// Generation events
// ============================================================================

/// Decision or side effect recorded during a run, for the JSONL event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GenEvent {
    GenerateStarted {
        types: usize,
        version: String,
    },
    ImportFailed {
        pkg: String,
        error: String,
    },
    SupportedDirectly {
        origin: String,
        name: String,
    },
    Extracted {
        pkg: String,
        name: String,
    },
    Shimmed {
        origin: String,
        name: String,
        as_type: String,
    },
    AlreadyShimmed {
        origin: String,
        name: String,
    },
    Ignored {
        pkg: String,
        name: String,
    },
    Intercepted {
        origin: String,
        name: String,
    },
    InterfaceDiscovered {
        origin: String,
        name: String,
        implementers: usize,
    },
    InterceptorEmitted {
        pkg: String,
        iface: String,
        implementers: usize,
    },
    PackageGenerated {
        pkg: String,
        synthetic: String,
    },
    FileInstalled {
        path: String,
    },
    FileUnmodified {
        path: String,
    },
    StateSaved {
        path: String,
        types: usize,
    },
}

impl fmt::Display for GenEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenEvent::GenerateStarted { types, version } => {
                write!(f, "msgpgen {}: generating {} root types", version, types)
            }
            GenEvent::ImportFailed { pkg, error } => write!(f, "import failed: {}: {}", pkg, error),
            GenEvent::SupportedDirectly { origin, name } => {
                write!(f, "{}->{}: SUPPORTED DIRECTLY", origin, name)
            }
            GenEvent::Extracted { name, .. } => write!(f, "{}: EXTRACTING", name),
            GenEvent::Shimmed { origin, name, as_type } => {
                write!(f, "{}: SHIMMING INTO {} as {}", name, origin, as_type)
            }
            GenEvent::AlreadyShimmed { name, .. } => write!(f, "{}: ALREADY SHIMMED", name),
            GenEvent::Ignored { name, .. } => write!(f, "{}: IGNORING", name),
            GenEvent::Intercepted { origin, name } => {
                write!(f, "{}: INTERCEPTED IN {}", name, origin)
            }
            GenEvent::InterfaceDiscovered { name, implementers, .. } => {
                write!(f, "{}: INTERFACE with {} implementers", name, implementers)
            }
            GenEvent::InterceptorEmitted { pkg, iface, implementers } => {
                write!(f, "{}: interceptor for {} ({} cases)", pkg, iface, implementers)
            }
            GenEvent::PackageGenerated { pkg, synthetic } => write!(f, "======= {} {}", pkg, synthetic),
            GenEvent::FileInstalled { path } => write!(f, "installed: {}", path),
            GenEvent::FileUnmodified { path } => write!(f, "unmodified: {}", path),
            GenEvent::StateSaved { path, types } => write!(f, "state: {} ({} types)", path, types),
        }
    }
}

/// An event with its ISO 8601 timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: GenEvent,
}

// ============================================================================
// msgpgen.yaml
// ============================================================================

/// Root configuration for a generation project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Package manifest describing the type graph
    pub manifest: PathBuf,

    /// Tag state file for polymorphic implementers
    #[serde(default)]
    pub state: Option<PathBuf>,

    /// Root types to generate (`full/pkg/path.Type`)
    #[serde(default)]
    pub types: Vec<String>,

    /// Interfaces whose struct implementers become root types
    #[serde(default)]
    pub ifaces: Vec<String>,

    /// Packages to import before discovery
    #[serde(default)]
    pub imports: Vec<String>,

    /// Append-only JSONL event log
    #[serde(default)]
    pub event_log: Option<PathBuf>,

    #[serde(default)]
    pub generate: GenConfig,

    #[serde(default)]
    pub tools: ToolConfig,
}

/// Orchestrator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    /// Generate tests and benchmarks
    pub tests: bool,
    /// Generate EncodeMsg/DecodeMsg
    pub io: bool,
    /// Generate MarshalMsg/UnmarshalMsg
    pub marshal: bool,
    /// Write a SHA-256 of each synthetic unit
    pub version_file: bool,
    /// Also process unexported types
    pub unexported: bool,
    /// Keep temp files used by the generator
    pub keep_temp: bool,
    /// Permit unknown fields on decode for every extracted struct
    pub allow_extra: bool,
    pub temp_dir: String,
    pub file_template: String,
    pub test_template: String,
    pub version_file_template: String,
}

impl Default for GenConfig {
    fn default() -> Self {
        GenConfig {
            tests: true,
            io: true,
            marshal: true,
            version_file: false,
            unexported: false,
            keep_temp: false,
            allow_extra: false,
            temp_dir: "_msgpgen".to_string(),
            file_template: "{pkg}_msgp_gen.go".to_string(),
            test_template: "{pkg}_msgp_gen_test.go".to_string(),
            version_file_template: "msgpver".to_string(),
        }
    }
}

impl GenConfig {
    /// Generator mode bits. Sizing is always generated.
    pub fn mode(&self) -> GenMode {
        let mut mode = GenMode::SIZE;
        if self.io {
            mode = mode | GenMode::ENCODE | GenMode::DECODE;
        }
        if self.marshal {
            mode = mode | GenMode::MARSHAL | GenMode::UNMARSHAL;
        }
        if self.tests {
            mode = mode | GenMode::TEST;
        }
        mode
    }
}

/// Substitute `{pkg}` in a filename template.
pub fn expand_template(template: &str, pkg_base: &str) -> String {
    template.replace("{pkg}", pkg_base)
}

/// External executables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub msgp: String,
    pub goimports: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        ToolConfig {
            msgp: "msgp".to_string(),
            goimports: "goimports".to_string(),
        }
    }
}
