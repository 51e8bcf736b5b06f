//! MG-010: Orchestrator — synthetic units, codec generation, install.
//!
//! For every package with output: write a synthetic source unit into a temp
//! directory beside the package, run the codec generator over it, check its
//! diagnostics, append interceptor code, and finally move each generated file
//! into the package only if its bytes changed.

use super::extractor::Extractor;
use super::output::check_line;
use super::state::State;
use super::types::{base_name, expand_template, GenConfig, GenEvent, TypeName};
use crate::packages::PackageSet;
use crate::provenance::hasher::hash_bytes;
use crate::tools::{run_generator, CodecGenerator, ImportTidier};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

const SHIM_PREFIX: &str = "//msgp:shim ";

/// Shim directives sort ahead of everything else.
pub fn output_priority(part: &str) -> u8 {
    if part.trim().starts_with(SHIM_PREFIX) {
        1
    } else {
        2
    }
}

/// Deterministic part order: by priority, then lexicographically.
pub fn sort_output(parts: &mut [String]) {
    parts.sort_by(|a, b| {
        output_priority(a)
            .cmp(&output_priority(b))
            .then_with(|| a.cmp(b))
    });
}

/// The synthetic unit handed to the codec generator. It is excluded from
/// normal builds so it never collides with the real declarations.
pub fn render_synthetic_unit(package_name: &str, parts: &[String]) -> String {
    let mut out = format!("// +build ignore\n\npackage {}\n\n", package_name);
    for part in parts {
        out.push_str(part);
        out.push_str("\n\n");
    }
    out.push('\n');
    out
}

/// Test file the generator writes beside `target` (`x_gen.go` → `x_gen_test.go`).
pub fn test_file_name(target: &str) -> String {
    let stem = target.strip_suffix(".go").unwrap_or(target);
    format!("{}_test.go", stem)
}

/// Temp paths removed in reverse order of registration.
#[derive(Debug, Default)]
pub struct Cleanup {
    paths: Vec<PathBuf>,
}

impl Cleanup {
    pub fn new() -> Self {
        Cleanup::default()
    }

    pub fn push(&mut self, path: &Path) {
        self.paths.push(path.to_path_buf());
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Remove every registered path, newest first. Paths already gone are
    /// skipped. Returns the first failure after attempting all removals.
    pub fn run(&mut self) -> Result<(), String> {
        let mut first_err = None;
        while let Some(path) = self.paths.pop() {
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            match result {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(format!("cannot remove {}: {}", path.display(), e));
                    }
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Clean up after `primary`. Cleanup errors surface only when the
    /// primary operation succeeded.
    pub fn finish<T>(mut self, primary: Result<T, String>) -> Result<T, String> {
        let cleaned = self.run();
        match primary {
            Ok(v) => cleaned.map(|()| v),
            Err(e) => Err(e),
        }
    }
}

/// What a generation run did.
#[derive(Debug, Default)]
pub struct GenerateReport {
    pub packages: Vec<String>,
    pub installed: Vec<PathBuf>,
    pub unmodified: Vec<PathBuf>,
    pub events: Vec<GenEvent>,
    pub state: Option<State>,
}

pub struct Generator<'g> {
    tpset: &'g dyn PackageSet,
    config: GenConfig,
    codec: &'g dyn CodecGenerator,
    tidier: &'g dyn ImportTidier,
}

impl<'g> Generator<'g> {
    pub fn new(
        tpset: &'g dyn PackageSet,
        config: GenConfig,
        codec: &'g dyn CodecGenerator,
        tidier: &'g dyn ImportTidier,
    ) -> Self {
        Generator {
            tpset,
            config,
            codec,
            tidier,
        }
    }

    /// Extract from `roots`, generate every package with output and install
    /// the results. The (possibly extended) state is handed back in the
    /// report; persisting it is the caller's job.
    pub fn run(&self, roots: &[TypeName], state: Option<State>) -> Result<GenerateReport, String> {
        let mut report = GenerateReport::default();
        report.events.push(GenEvent::GenerateStarted {
            types: roots.len(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        });

        for root in roots {
            if let Err(e) = self.tpset.import(&root.package_path) {
                report.events.push(GenEvent::ImportFailed {
                    pkg: root.package_path.clone(),
                    error: e,
                });
            }
        }

        let mut ex = Extractor::new(self.tpset, state).with_allow_extra(self.config.allow_extra);
        for root in roots {
            ex.add_root(root)?;
        }
        ex.extract()?;
        report.events.extend(ex.take_events());

        let mut cleanup = Cleanup::new();
        let result = self.generate_all(&mut ex, &mut cleanup, &mut report);
        let result = if self.config.keep_temp {
            result
        } else {
            cleanup.finish(result)
        };
        result?;

        report.state = ex.into_state();
        Ok(report)
    }

    fn generate_all(
        &self,
        ex: &mut Extractor<'_>,
        cleanup: &mut Cleanup,
        report: &mut GenerateReport,
    ) -> Result<(), String> {
        let pkgs: BTreeSet<String> = ex
            .temp_output()
            .keys()
            .chain(ex.extra_output().keys())
            .cloned()
            .collect();

        // temp file -> destination
        let mut files: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
        for pkg in &pkgs {
            self.generate_package(ex, pkg, cleanup, &mut files, &mut report.events)?;
            report.packages.push(pkg.clone());
        }

        for (src, dest) in &files {
            // the generator writes nothing for units without identities
            if !src.exists() {
                continue;
            }
            if install_if_changed(src, dest)? {
                report.events.push(GenEvent::FileInstalled {
                    path: dest.display().to_string(),
                });
                report.installed.push(dest.clone());
            } else {
                report.events.push(GenEvent::FileUnmodified {
                    path: dest.display().to_string(),
                });
                report.unmodified.push(dest.clone());
            }
        }
        Ok(())
    }

    fn generate_package(
        &self,
        ex: &mut Extractor<'_>,
        pkg: &str,
        cleanup: &mut Cleanup,
        files: &mut BTreeMap<PathBuf, PathBuf>,
        events: &mut Vec<GenEvent>,
    ) -> Result<(), String> {
        let tpset = self.tpset;
        let lpkg = base_name(pkg).to_string();
        let package_name = tpset.package_name(pkg);
        let pkg_dir = tpset.package_dir(pkg)?;

        let temp_dir = pkg_dir.join(&self.config.temp_dir);
        if !temp_dir.exists() {
            std::fs::create_dir_all(&temp_dir)
                .map_err(|e| format!("cannot create dir {}: {}", temp_dir.display(), e))?;
            cleanup.push(&temp_dir);
        }

        let seen = ex.queue().seen_basenames();
        let mut parts = ex.temp_output().get(pkg).cloned().unwrap_or_default();
        let mut extra = ex.extra_output().get(pkg).cloned().unwrap_or_default();
        let dctvs = ex.directives_mut().ensure(pkg)?;
        parts.extend(dctvs.build_all(tpset)?);
        sort_output(&mut parts);

        let synthetic = render_synthetic_unit(&package_name, &parts);
        let temp_file = temp_dir.join(format!("{}.go", lpkg));
        write_file(&temp_file, synthetic.as_bytes())?;
        cleanup.push(&temp_file);
        events.push(GenEvent::PackageGenerated {
            pkg: pkg.to_string(),
            synthetic: temp_file.display().to_string(),
        });

        if self.config.version_file {
            let vfn = expand_template(&self.config.version_file_template, &lpkg);
            let vfp = temp_dir.join(&vfn);
            write_file(&vfp, hash_bytes(synthetic.as_bytes()).as_bytes())?;
            cleanup.push(&vfp);
            files.insert(vfp, pkg_dir.join(vfn));
        }

        let target_name = expand_template(&self.config.file_template, &lpkg);
        let target = temp_dir.join(&target_name);
        cleanup.push(&target);
        if self.config.tests {
            let temp_test = temp_dir.join(test_file_name(&target_name));
            cleanup.push(&temp_test);
            files.insert(
                temp_test,
                pkg_dir.join(expand_template(&self.config.test_template, &lpkg)),
            );
        }
        files.insert(target.clone(), pkg_dir.join(&target_name));

        let out = run_generator(
            self.codec,
            &temp_file,
            &target,
            self.config.mode(),
            self.config.unexported,
        )
        .map_err(|e| format!("codec generator run failed: {}", e))?;
        if !out.stderr.is_empty() {
            return Err(format!(
                "codec generator stderr contained output: {}",
                out.stderr
            ));
        }
        for line in out.stdout.lines() {
            check_line(line, dctvs, &seen)?;
        }

        if !extra.is_empty() {
            sort_output(&mut extra);
            let mut src = if target.exists() {
                std::fs::read(&target)
                    .map_err(|e| format!("cannot read {}: {}", target.display(), e))?
            } else {
                format!("package {}\n", package_name).into_bytes()
            };
            for part in &extra {
                src.extend_from_slice(part.as_bytes());
            }
            let tidied = self.tidier.tidy(&target, &src)?;
            write_file(&target, &tidied)?;
        }
        Ok(())
    }
}

fn write_file(path: &Path, content: &[u8]) -> Result<(), String> {
    std::fs::write(path, content).map_err(|e| format!("cannot write {}: {}", path.display(), e))
}

/// Move `src` to `dest` unless `dest` already holds the same bytes, in which
/// case `src` is removed. Returns true if `dest` was written.
pub fn install_if_changed(src: &Path, dest: &Path) -> Result<bool, String> {
    let changed = match std::fs::read(dest) {
        Ok(existing) => {
            let fresh =
                std::fs::read(src).map_err(|e| format!("cannot read {}: {}", src.display(), e))?;
            fresh != existing
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => return Err(format!("cannot read {}: {}", dest.display(), e)),
    };

    if changed {
        std::fs::rename(src, dest).map_err(|e| {
            format!("cannot rename {} → {}: {}", src.display(), dest.display(), e)
        })?;
    } else {
        std::fs::remove_file(src)
            .map_err(|e| format!("cannot remove {}: {}", src.display(), e))?;
    }
    Ok(changed)
}
