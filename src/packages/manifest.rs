//! MG-011: YAML package manifest — a loaded, queryable package graph.
//!
//! ```yaml
//! packages:
//!   example.com/app:
//!     kind: user
//!     dir: app
//!     imports: [example.com/shapes, time]
//!     files:
//!       - name: app.go
//!         comments: ["//msgp:ignore Secret"]
//!     types:
//!       User:
//!         fields:
//!           - { name: Age, type: Age, tag: 'msg:"age"' }
//!       Age: { underlying: int32 }
//!       Shape: { interface: [Area] }
//! ```
//!
//! Type expressions are resolved at load time: bare identifiers are basic
//! types or same-package names, qualifiers resolve through `imports`.

use super::PackageSet;
use crate::core::types::{
    base_name, Field, MethodDecl, PackageKind, Type, TypeName, TypeObject,
};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const BASIC_TYPES: &[&str] = &[
    "bool", "string", "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16",
    "uint32", "uint64", "uintptr", "byte", "rune", "float32", "float64", "complex64",
    "complex128",
];

/// Named-underlying chains longer than this are reported as cycles.
const MAX_ALIAS_DEPTH: usize = 32;

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    packages: IndexMap<String, PackageSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageSpec {
    #[serde(default = "default_kind")]
    kind: PackageKind,
    dir: PathBuf,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    imports: Vec<String>,
    #[serde(default)]
    files: Vec<FileSpec>,
    #[serde(default)]
    types: IndexMap<String, TypeSpec>,
}

fn default_kind() -> PackageKind {
    PackageKind::User
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSpec {
    #[allow(dead_code)]
    name: String,
    #[serde(default)]
    comments: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeSpec {
    #[serde(default)]
    fields: Option<Vec<FieldSpec>>,
    #[serde(default)]
    underlying: Option<String>,
    #[serde(default)]
    interface: Option<Vec<String>>,
    #[serde(default)]
    methods: Vec<MethodDecl>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldSpec {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    tag: String,
}

#[derive(Debug)]
struct LoadedPackage {
    kind: PackageKind,
    dir: PathBuf,
    name: String,
    imports: Vec<String>,
    comments: Vec<String>,
    objects: IndexMap<String, TypeObject>,
    sources: HashMap<String, String>,
}

/// Package set backed by a YAML manifest.
#[derive(Debug, Default)]
pub struct ManifestPackageSet {
    packages: IndexMap<String, LoadedPackage>,
}

/// Resolution context for type expressions inside one package.
struct ExprContext<'a> {
    pkg: &'a str,
    imports: &'a [String],
    known: &'a [String],
}

impl ExprContext<'_> {
    fn qualify(&self, qualifier: &str, name: &str) -> TypeName {
        if qualifier.contains('/') || self.known.iter().any(|k| k == qualifier) {
            return TypeName::new(qualifier, name);
        }
        if let Some(imp) = self.imports.iter().find(|i| base_name(i) == qualifier) {
            return TypeName::new(imp, name);
        }
        if base_name(self.pkg) == qualifier {
            return TypeName::new(self.pkg, name);
        }
        TypeName::new(qualifier, name)
    }
}

impl ManifestPackageSet {
    /// Load a manifest file. Relative package directories resolve against
    /// the manifest's own directory.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&content, base)
    }

    pub fn from_yaml(yaml: &str, base_dir: &Path) -> Result<Self, String> {
        let file: ManifestFile = serde_yaml_ng::from_str(yaml)
            .map_err(|e| format!("manifest parse error: {}", e))?;

        let known: Vec<String> = file.packages.keys().cloned().collect();
        let mut set = ManifestPackageSet::default();

        for (path, spec) in file.packages {
            let ctx = ExprContext {
                pkg: &path,
                imports: &spec.imports,
                known: &known,
            };
            let mut objects = IndexMap::new();
            let mut sources = HashMap::new();
            for (name, tspec) in &spec.types {
                let underlying = type_spec_underlying(&path, name, tspec, &ctx)?;
                let source = tspec
                    .source
                    .clone()
                    .unwrap_or_else(|| render_source(name, &path, &underlying));
                sources.insert(name.clone(), source);
                objects.insert(
                    name.clone(),
                    TypeObject {
                        name: TypeName::new(&path, name),
                        underlying,
                        methods: tspec.methods.clone(),
                    },
                );
            }

            let dir = if spec.dir.is_absolute() {
                spec.dir.clone()
            } else {
                base_dir.join(&spec.dir)
            };
            let loaded = LoadedPackage {
                kind: spec.kind,
                dir,
                name: spec
                    .name
                    .clone()
                    .unwrap_or_else(|| base_name(&path).to_string()),
                imports: spec.imports.clone(),
                comments: spec.files.into_iter().flat_map(|f| f.comments).collect(),
                objects,
                sources,
            };
            set.packages.insert(path, loaded);
        }

        set.resolve_named_underlying()?;
        Ok(set)
    }

    /// `type Foo Bar` takes Bar's underlying type when Bar is in the manifest.
    fn resolve_named_underlying(&mut self) -> Result<(), String> {
        let mut updates: Vec<(String, String, Type)> = Vec::new();
        for (pkg, loaded) in &self.packages {
            for (name, obj) in &loaded.objects {
                let mut current = obj.underlying.clone();
                let mut depth = 0;
                while let Type::Named(tn) = &current {
                    let Some(next) = self.find_object(tn) else {
                        break;
                    };
                    depth += 1;
                    if depth > MAX_ALIAS_DEPTH {
                        return Err(format!("cyclic type definition for {}.{}", pkg, name));
                    }
                    current = next.underlying.clone();
                }
                if current != obj.underlying {
                    updates.push((pkg.clone(), name.clone(), current));
                }
            }
        }
        for (pkg, name, underlying) in updates {
            if let Some(obj) = self
                .packages
                .get_mut(&pkg)
                .and_then(|p| p.objects.get_mut(&name))
            {
                obj.underlying = underlying;
            }
        }
        Ok(())
    }
}

fn type_spec_underlying(
    pkg: &str,
    name: &str,
    spec: &TypeSpec,
    ctx: &ExprContext,
) -> Result<Type, String> {
    match (&spec.fields, &spec.underlying, &spec.interface) {
        (Some(fields), None, None) => {
            let mut out = Vec::with_capacity(fields.len());
            for f in fields {
                let ty = parse_type_expr(&f.ty, ctx)
                    .map_err(|e| format!("{}.{} field {}: {}", pkg, name, f.name, e))?;
                out.push(Field {
                    name: f.name.clone(),
                    ty,
                    tag: f.tag.clone(),
                });
            }
            Ok(Type::Struct(out))
        }
        (None, Some(expr), None) => {
            parse_type_expr(expr, ctx).map_err(|e| format!("{}.{}: {}", pkg, name, e))
        }
        (None, None, Some(methods)) => Ok(Type::Interface(methods.clone())),
        _ => Err(format!(
            "{}.{}: exactly one of fields, underlying or interface is required",
            pkg, name
        )),
    }
}

/// Parse a type expression as written inside a package.
fn parse_type_expr(s: &str, ctx: &ExprContext) -> Result<Type, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty type expression".to_string());
    }
    if let Some(rest) = s.strip_prefix('*') {
        return Ok(Type::Pointer(Box::new(parse_type_expr(rest, ctx)?)));
    }
    if let Some(rest) = s.strip_prefix("[]") {
        return Ok(Type::Slice(Box::new(parse_type_expr(rest, ctx)?)));
    }
    if let Some(rest) = s.strip_prefix('[') {
        let close = rest
            .find(']')
            .ok_or_else(|| format!("unclosed array length in '{}'", s))?;
        let len: u64 = rest[..close]
            .trim()
            .parse()
            .map_err(|_| format!("invalid array length in '{}'", s))?;
        return Ok(Type::Array(len, Box::new(parse_type_expr(&rest[close + 1..], ctx)?)));
    }
    if let Some(rest) = s.strip_prefix("map[") {
        let mut depth = 1usize;
        let mut close = None;
        for (i, c) in rest.char_indices() {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let close = close.ok_or_else(|| format!("unclosed map key in '{}'", s))?;
        let key = parse_type_expr(&rest[..close], ctx)?;
        let value = parse_type_expr(&rest[close + 1..], ctx)?;
        return Ok(Type::Map(Box::new(key), Box::new(value)));
    }
    if let Some(rest) = s.strip_prefix("chan ") {
        return Ok(Type::Chan(Box::new(parse_type_expr(rest, ctx)?)));
    }
    if s == "interface{}" || s == "any" {
        return Ok(Type::Interface(Vec::new()));
    }
    if s.contains(|c: char| c.is_whitespace() || c == '{' || c == '(') {
        return Err(format!("unsupported type expression '{}'", s));
    }
    if let Some((qualifier, name)) = s.rsplit_once('.') {
        if qualifier.is_empty() || name.is_empty() {
            return Err(format!("invalid qualified name '{}'", s));
        }
        return Ok(Type::Named(ctx.qualify(qualifier, name)));
    }
    if BASIC_TYPES.contains(&s) {
        return Ok(Type::Basic(s.to_string()));
    }
    Ok(Type::Named(TypeName::new(ctx.pkg, s)))
}

/// Render a declaration the way it reads in source, minus `type `.
fn render_source(name: &str, pkg: &str, underlying: &Type) -> String {
    match underlying {
        Type::Struct(fields) => {
            let mut lines = vec![format!("{} struct {{", name)];
            for f in fields {
                if f.tag.is_empty() {
                    lines.push(format!("\t{} {}", f.name, f.ty.local_string(pkg)));
                } else {
                    lines.push(format!("\t{} {} `{}`", f.name, f.ty.local_string(pkg), f.tag));
                }
            }
            lines.push("}".to_string());
            lines.join("\n")
        }
        Type::Interface(methods) if !methods.is_empty() => {
            let mut lines = vec![format!("{} interface {{", name)];
            for m in methods {
                lines.push(format!("\t{}()", m));
            }
            lines.push("}".to_string());
            lines.join("\n")
        }
        other => format!("{} {}", name, other.local_string(pkg)),
    }
}

impl PackageSet for ManifestPackageSet {
    fn import(&self, path: &str) -> Result<(), String> {
        if self.packages.contains_key(path) {
            Ok(())
        } else {
            Err(format!("cannot import {}: package not in manifest", path))
        }
    }

    fn packages(&self) -> Vec<String> {
        let mut out: Vec<String> = self.packages.keys().cloned().collect();
        out.sort();
        out
    }

    fn kind(&self, pkg: &str) -> PackageKind {
        self.packages
            .get(pkg)
            .map(|p| p.kind)
            .unwrap_or(PackageKind::Unknown)
    }

    fn package_name(&self, pkg: &str) -> String {
        self.packages
            .get(pkg)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| base_name(pkg).to_string())
    }

    fn package_dir(&self, pkg: &str) -> Result<PathBuf, String> {
        self.packages
            .get(pkg)
            .map(|p| p.dir.clone())
            .ok_or_else(|| format!("could not find ast package {}", pkg))
    }

    fn comments(&self, pkg: &str) -> Result<Vec<String>, String> {
        self.packages
            .get(pkg)
            .map(|p| p.comments.clone())
            .ok_or_else(|| format!("could not find ast package {}", pkg))
    }

    fn objects(&self, pkg: &str) -> Vec<&TypeObject> {
        self.packages
            .get(pkg)
            .map(|p| p.objects.values().collect())
            .unwrap_or_default()
    }

    fn find_object(&self, tn: &TypeName) -> Option<&TypeObject> {
        self.packages
            .get(&tn.package_path)
            .and_then(|p| p.objects.get(&tn.local_name))
    }

    fn find_import_path(&self, pkg: &str, local: &str) -> Result<TypeName, String> {
        let local = local.trim();
        if local.is_empty() {
            return Err(format!("empty type name in package {}", pkg));
        }
        let Some((qualifier, name)) = local.rsplit_once('.') else {
            return Ok(TypeName::new(pkg, local));
        };
        if qualifier.is_empty() || name.is_empty() {
            return Err(format!("could not resolve '{}' from package {}", local, pkg));
        }
        let known: Vec<String> = self.packages.keys().cloned().collect();
        let imports = self
            .packages
            .get(pkg)
            .map(|p| p.imports.as_slice())
            .unwrap_or(&[]);
        let ctx = ExprContext {
            pkg,
            imports,
            known: &known,
        };
        Ok(ctx.qualify(qualifier, name))
    }

    fn extract_source(&self, tn: &TypeName) -> Result<String, String> {
        self.packages
            .get(&tn.package_path)
            .and_then(|p| p.sources.get(&tn.local_name))
            .cloned()
            .ok_or_else(|| format!("could not extract source for {}", tn))
    }

    fn find_implementers(&self, iface: &TypeName) -> Result<IndexMap<TypeName, Type>, String> {
        let obj = self
            .find_object(iface)
            .ok_or_else(|| format!("could not find interface {}", iface))?;
        let Type::Interface(required) = &obj.underlying else {
            return Err(format!("{} is not an interface", iface));
        };

        let mut found: Vec<(TypeName, Type)> = Vec::new();
        for loaded in self.packages.values() {
            for cand in loaded.objects.values() {
                if cand.name == *iface || cand.underlying.is_interface() {
                    continue;
                }
                let has_value = |m: &String| {
                    cand.methods.iter().any(|d| d.name == *m && !d.pointer)
                };
                let has_any = |m: &String| cand.methods.iter().any(|d| d.name == *m);
                let named = Type::Named(cand.name.clone());
                if required.iter().all(has_value) {
                    found.push((cand.name.clone(), named));
                } else if required.iter().all(has_any) {
                    found.push((cand.name.clone(), Type::Pointer(Box::new(named))));
                }
            }
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found.into_iter().collect())
    }
}
