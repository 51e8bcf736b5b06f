//! MG-011: Type package set — the typed view of the source package graph.
//!
//! The extractor consumes packages only through [`PackageSet`]. The crate
//! ships [`manifest::ManifestPackageSet`], which loads the graph from a YAML
//! package manifest.

pub mod manifest;

use crate::core::types::{base_name, PackageKind, Type, TypeName, TypeObject};
use indexmap::IndexMap;
use std::path::PathBuf;

/// Read-only access to imported packages, their declarations and comments.
pub trait PackageSet {
    /// Ensure a package is loaded.
    fn import(&self, path: &str) -> Result<(), String>;

    /// Import paths of all loaded packages, sorted.
    fn packages(&self) -> Vec<String>;

    /// Origin classification of a package; `Unknown` if not loaded.
    fn kind(&self, pkg: &str) -> PackageKind;

    /// Declared package clause name (`main` for commands).
    fn package_name(&self, pkg: &str) -> String {
        base_name(pkg).to_string()
    }

    /// Source directory of a package.
    fn package_dir(&self, pkg: &str) -> Result<PathBuf, String>;

    /// Every comment line of every built file of a package, in file order.
    fn comments(&self, pkg: &str) -> Result<Vec<String>, String>;

    /// Declarations of a package, in declaration order.
    fn objects(&self, pkg: &str) -> Vec<&TypeObject>;

    fn find_object(&self, tn: &TypeName) -> Option<&TypeObject>;

    fn object_by_name(&self, name: &str) -> Option<&TypeObject> {
        TypeName::parse(name)
            .ok()
            .and_then(|tn| self.find_object(&tn))
    }

    /// Resolve a type reference as written inside `pkg` (`Foo`, `bar.Foo`,
    /// `full/path/bar.Foo`) to its fully qualified name.
    fn find_import_path(&self, pkg: &str, local: &str) -> Result<TypeName, String>;

    /// Name under which `tn` is importable from `pkg`.
    fn local_import_name(&self, tn: &TypeName, pkg: &str) -> Result<String, String> {
        Ok(tn.import_name(pkg))
    }

    /// Source text of a declaration without the leading `type ` keyword.
    fn extract_source(&self, tn: &TypeName) -> Result<String, String>;

    /// All named types implementing an interface, keyed by name. The value is
    /// `Named` for value-receiver implementers and `Pointer(Named)` when the
    /// pointer type is required.
    fn find_implementers(&self, iface: &TypeName) -> Result<IndexMap<TypeName, Type>, String>;
}

/// Named struct types that implement any of `ifaces`, sorted and deduplicated.
pub fn find_struct_implementers(
    tpset: &dyn PackageSet,
    ifaces: &[TypeName],
) -> Result<Vec<TypeName>, String> {
    let mut found = Vec::new();
    for iface in ifaces {
        let obj = tpset
            .find_object(iface)
            .ok_or_else(|| format!("interface {} not found in imported packages", iface))?;
        match &obj.underlying {
            Type::Interface(methods) if methods.is_empty() => {
                return Err(format!(
                    "interface {} has no methods, every struct would implement it",
                    iface
                ));
            }
            Type::Interface(_) => {}
            _ => return Err(format!("interface {} not found in imported packages", iface)),
        }
        for tn in tpset.find_implementers(iface)?.keys() {
            let is_struct = tpset
                .find_object(tn)
                .is_some_and(|o| matches!(o.underlying, Type::Struct(_)));
            if is_struct && !found.contains(tn) {
                found.push(tn.clone());
            }
        }
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::manifest::ManifestPackageSet;
    use std::path::Path;

    /// A small graph: `example.com/app` uses shapes and ages from sibling
    /// packages, with one vendored type and one recursive type.
    pub const FIXTURE: &str = r#"
packages:
  example.com/app:
    kind: user
    dir: app
    imports: [example.com/shapes, example.com/vendor/ext, time]
    files:
      - name: app.go
        comments:
          - "// User is the root record."
          - "//msgp:ignore Secret"
    types:
      User:
        fields:
          - { name: Name, type: string }
          - { name: Age, type: Age }
          - { name: Born, type: time.Time }
          - { name: Tags, type: "[]string" }
          - { name: Shape, type: shapes.Shape, tag: 'msg:"shape"' }
          - { name: Tree, type: "*Node" }
      Age:
        underlying: int32
      Node:
        fields:
          - { name: Value, type: int }
          - { name: Children, type: "[]*Node" }
          - { name: Index, type: "map[string]Node" }
      Secret:
        fields:
          - { name: Key, type: "[]byte" }
      Holder:
        fields:
          - { name: Ext, type: ext.Thing }
  example.com/shapes:
    kind: user
    dir: shapes
    types:
      Shape:
        interface: [Area]
      Circle:
        fields:
          - { name: Radius, type: float64 }
        methods: [{ name: Area }]
      Square:
        fields:
          - { name: Side, type: float64 }
        methods: [{ name: Area, pointer: true }]
      Point:
        underlying: float64
        methods: [{ name: Area }]
      hidden:
        fields:
          - { name: X, type: int }
        methods: [{ name: Area }]
  example.com/vendor/ext:
    kind: vendor
    dir: vendor/ext
    types:
      Thing:
        fields:
          - { name: X, type: int }
"#;

    pub fn fixture(dir: &Path) -> ManifestPackageSet {
        ManifestPackageSet::from_yaml(FIXTURE, dir).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_mg011_find_struct_implementers() {
        let set = testutil::fixture(Path::new("/src"));
        let found =
            find_struct_implementers(&set, &[TypeName::new("example.com/shapes", "Shape")])
                .unwrap();
        let names: Vec<String> = found.iter().map(|t| t.to_string()).collect();
        // Point is a named float64, not a struct
        assert_eq!(
            names,
            vec![
                "example.com/shapes.Circle",
                "example.com/shapes.Square",
                "example.com/shapes.hidden"
            ]
        );
    }

    #[test]
    fn test_mg011_unknown_interface() {
        let set = testutil::fixture(Path::new("/src"));
        let err = find_struct_implementers(&set, &[TypeName::new("example.com/shapes", "Nope")])
            .unwrap_err();
        assert!(err.contains("not found"));
        let err = find_struct_implementers(&set, &[TypeName::new("example.com/shapes", "Circle")])
            .unwrap_err();
        assert!(err.contains("not found"));
    }

    #[test]
    fn test_mg011_empty_interface_discovery_rejected() {
        let yaml = r#"
packages:
  example.com/a:
    dir: a
    types:
      Any: { interface: [] }
      S: { fields: [] }
"#;
        let set = manifest::ManifestPackageSet::from_yaml(yaml, Path::new("/")).unwrap();
        let err = find_struct_implementers(&set, &[TypeName::new("example.com/a", "Any")])
            .unwrap_err();
        assert_eq!(
            err,
            "interface example.com/a.Any has no methods, every struct would implement it"
        );
    }

    #[test]
    fn test_mg011_object_by_name() {
        let set = testutil::fixture(Path::new("/src"));
        assert!(set.object_by_name("example.com/app.User").is_some());
        assert!(set.object_by_name("example.com/app.Missing").is_none());
        assert!(set.object_by_name("garbage").is_none());
    }
}
