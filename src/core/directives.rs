//! MG-003: Per-package directive registry and lazy cache.
//!
//! `ignore`, `tuple` and `allowextra` are authoritative in the declaring
//! package; `shim` and `intercept` in the referring package.

use super::directive::{parse_directive, Directive, ShimDirective, LINE_PREFIX};
use super::types::{PackageKind, TypeName};
use crate::packages::PackageSet;
use indexmap::IndexMap;
use std::collections::BTreeMap;

/// Directives of one package: those found in its comments plus those
/// synthesized during extraction.
#[derive(Debug, Clone, Default)]
pub struct Directives {
    pkg: String,
    directives: Vec<Directive>,
    // fully qualified name -> name as written in the directive
    ignore: IndexMap<TypeName, String>,
    intercepted: IndexMap<TypeName, String>,
    tuple: IndexMap<TypeName, String>,
    allow_extra: IndexMap<TypeName, String>,
    shim: IndexMap<TypeName, ShimDirective>,
}

impl Directives {
    pub fn new(pkg: &str) -> Self {
        Directives {
            pkg: pkg.to_string(),
            ..Directives::default()
        }
    }

    /// Scan every comment of `pkg` for directive lines.
    pub fn load(tpset: &dyn PackageSet, pkg: &str) -> Result<Self, String> {
        let mut d = Directives::new(pkg);
        for line in tpset.comments(pkg)? {
            let line = line.trim();
            if let Some(body) = line.strip_prefix(LINE_PREFIX) {
                let dir = parse_directive(body).map_err(|e| format!("{}: {}", pkg, e))?;
                d.add(tpset, dir)?;
            }
        }
        Ok(d)
    }

    /// Index a directive, then append it to the ordered list. Nothing is
    /// recorded if any type name fails to resolve.
    pub fn add(&mut self, tpset: &dyn PackageSet, dir: Directive) -> Result<(), String> {
        let resolve = |t: &str| tpset.find_import_path(&self.pkg, t);
        match &dir {
            Directive::Shim(s) => {
                let tn = resolve(&s.type_name)?;
                self.shim.insert(tn, s.clone());
            }
            Directive::Intercept(i) => {
                let tn = resolve(&i.type_name)?;
                self.intercepted.insert(tn, i.type_name.clone());
            }
            Directive::Ignore(types) | Directive::Tuple(types) | Directive::AllowExtra(types) => {
                let mut resolved = Vec::with_capacity(types.len());
                for t in types {
                    resolved.push((resolve(t)?, t.clone()));
                }
                let index = match &dir {
                    Directive::Ignore(_) => &mut self.ignore,
                    Directive::Tuple(_) => &mut self.tuple,
                    _ => &mut self.allow_extra,
                };
                index.extend(resolved);
            }
        }
        self.directives.push(dir);
        Ok(())
    }

    pub fn pkg(&self) -> &str {
        &self.pkg
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn is_ignored(&self, tn: &TypeName) -> bool {
        self.ignore.contains_key(tn)
    }

    pub fn is_intercepted(&self, tn: &TypeName) -> bool {
        self.intercepted.contains_key(tn)
    }

    pub fn is_tuple(&self, tn: &TypeName) -> bool {
        self.tuple.contains_key(tn)
    }

    pub fn allows_extra(&self, tn: &TypeName) -> bool {
        self.allow_extra.contains_key(tn)
    }

    pub fn shim(&self, tn: &TypeName) -> Option<&ShimDirective> {
        self.shim.get(tn)
    }

    /// Names as written in `ignore` directives.
    pub fn ignored_names(&self) -> impl Iterator<Item = &str> {
        self.ignore.values().map(|s| s.as_str())
    }

    /// Names as written in `intercept` directives.
    pub fn intercepted_names(&self) -> impl Iterator<Item = &str> {
        self.intercepted.values().map(|s| s.as_str())
    }

    /// Textual form of every directive, importable from this package.
    pub fn build_all(&self, tpset: &dyn PackageSet) -> Result<Vec<String>, String> {
        self.directives
            .iter()
            .map(|d| d.build(tpset, &self.pkg))
            .collect()
    }
}

/// Lazily loaded registries, one per package.
pub struct DirectivesCache<'a> {
    tpset: &'a dyn PackageSet,
    pkgs: BTreeMap<String, Directives>,
}

impl<'a> DirectivesCache<'a> {
    pub fn new(tpset: &'a dyn PackageSet) -> Self {
        DirectivesCache {
            tpset,
            pkgs: BTreeMap::new(),
        }
    }

    /// Registry for `pkg`, loading it on first reference.
    pub fn ensure(&mut self, pkg: &str) -> Result<&mut Directives, String> {
        if !self.pkgs.contains_key(pkg) {
            let loaded = Directives::load(self.tpset, pkg)?;
            self.pkgs.insert(pkg.to_string(), loaded);
        }
        self.pkgs
            .get_mut(pkg)
            .ok_or_else(|| format!("could not find directives for package {}", pkg))
    }

    /// Add a synthesized directive to `pkg`'s registry.
    pub fn add(&mut self, pkg: &str, dir: Directive) -> Result<(), String> {
        let tpset = self.tpset;
        self.ensure(pkg)?.add(tpset, dir)
    }

    pub fn get(&self, pkg: &str) -> Option<&Directives> {
        self.pkgs.get(pkg)
    }

    /// True if `pkg`'s registry is loaded and ignores `tn`.
    pub fn ignored(&self, pkg: &str, tn: &TypeName) -> bool {
        self.pkgs.get(pkg).is_some_and(|d| d.is_ignored(tn))
    }

    /// True if the declaring package of `tn` ignores it. Packages outside
    /// the package set have no registry and ignore nothing.
    pub fn ignored_globally(&mut self, tn: &TypeName) -> Result<bool, String> {
        if self.tpset.kind(&tn.package_path) == PackageKind::Unknown {
            return Ok(false);
        }
        Ok(self.ensure(&tn.package_path)?.is_ignored(tn))
    }

    pub fn packages(&self) -> impl Iterator<Item = &String> {
        self.pkgs.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::directive::ShimMode;
    use crate::packages::testutil;
    use std::path::Path;

    #[test]
    fn test_mg003_load_from_comments() {
        let set = testutil::fixture(Path::new("/src"));
        let d = Directives::load(&set, "example.com/app").unwrap();
        assert_eq!(d.directives().len(), 1);
        assert!(d.is_ignored(&TypeName::new("example.com/app", "Secret")));
        assert_eq!(d.ignored_names().collect::<Vec<_>>(), vec!["Secret"]);
    }

    #[test]
    fn test_mg003_load_unknown_package() {
        let set = testutil::fixture(Path::new("/src"));
        let err = Directives::load(&set, "example.com/nope").unwrap_err();
        assert!(err.contains("could not find ast package"));
    }

    #[test]
    fn test_mg003_load_reports_bad_directive() {
        let yaml = r#"
packages:
  example.com/a:
    dir: a
    files:
      - name: a.go
        comments: ["//msgp:frobnicate X"]
"#;
        let set =
            crate::packages::manifest::ManifestPackageSet::from_yaml(yaml, Path::new("/")).unwrap();
        let err = Directives::load(&set, "example.com/a").unwrap_err();
        assert_eq!(err, "example.com/a: unknown directive frobnicate");
    }

    #[test]
    fn test_mg003_add_indexes_by_resolved_name() {
        let set = testutil::fixture(Path::new("/src"));
        let mut d = Directives::new("example.com/app");
        d.add(
            &set,
            Directive::Shim(ShimDirective {
                type_name: "shapes.Point".to_string(),
                as_type: "float64".to_string(),
                to_func: "float64".to_string(),
                from_func: "shapes.Point".to_string(),
                mode: ShimMode::Cast,
            }),
        )
        .unwrap();
        d.add(&set, Directive::Tuple(vec!["User".to_string()])).unwrap();
        d.add(&set, Directive::AllowExtra(vec!["User".to_string()])).unwrap();
        d.add(
            &set,
            Directive::Intercept(crate::core::directive::InterceptDirective {
                type_name: "shapes.Shape".to_string(),
                using: "shapeInterceptor".to_string(),
            }),
        )
        .unwrap();

        assert!(d.shim(&TypeName::new("example.com/shapes", "Point")).is_some());
        assert!(d.is_tuple(&TypeName::new("example.com/app", "User")));
        assert!(d.allows_extra(&TypeName::new("example.com/app", "User")));
        assert!(d.is_intercepted(&TypeName::new("example.com/shapes", "Shape")));
        assert_eq!(d.intercepted_names().collect::<Vec<_>>(), vec!["shapes.Shape"]);
        assert_eq!(d.directives().len(), 4);
    }

    #[test]
    fn test_mg003_build_all() {
        let set = testutil::fixture(Path::new("/src"));
        let mut d = Directives::load(&set, "example.com/app").unwrap();
        d.add(&set, Directive::Tuple(vec!["User".to_string()])).unwrap();
        let built = d.build_all(&set).unwrap();
        assert_eq!(built, vec!["//msgp:ignore Secret", "//msgp:tuple User"]);
    }

    #[test]
    fn test_mg003_cache_ensure_memoizes() {
        let set = testutil::fixture(Path::new("/src"));
        let mut cache = DirectivesCache::new(&set);
        cache
            .add("example.com/app", Directive::Tuple(vec!["User".to_string()]))
            .unwrap();
        // second ensure must not reload and drop the synthesized directive
        let d = cache.ensure("example.com/app").unwrap();
        assert_eq!(d.directives().len(), 2);
        assert_eq!(cache.packages().count(), 1);
    }

    #[test]
    fn test_mg003_ignored_lookups() {
        let set = testutil::fixture(Path::new("/src"));
        let mut cache = DirectivesCache::new(&set);
        let secret = TypeName::new("example.com/app", "Secret");
        assert!(!cache.ignored("example.com/app", &secret));
        assert!(cache.ignored_globally(&secret).unwrap());
        assert!(cache.ignored("example.com/app", &secret));
        assert!(!cache
            .ignored_globally(&TypeName::new("example.com/app", "User"))
            .unwrap());
        assert!(!cache
            .ignored_globally(&TypeName::new("elsewhere", "Thing"))
            .unwrap());
    }
}
