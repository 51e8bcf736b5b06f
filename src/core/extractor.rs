//! MG-007: Extractor — per-type classification over the type queue.
//!
//! Each dequeued type is extracted (struct source copied into the synthetic
//! unit), shimmed (named primitive), intercepted (interface) or skipped.
//! Shim and intercept lookups use the origin package's registry; ignore
//! lookups use the declaring package's.

use super::directive::{Directive, ShimDirective, ShimMode};
use super::directives::DirectivesCache;
use super::intercept::{render_interceptor, Iface};
use super::queue::{TypeQueue, TypeQueueItem};
use super::state::State;
use super::types::{find_imported_name, is_primitive, GenEvent, PackageKind, Type, TypeName};
use super::walker::StructWalker;
use crate::packages::PackageSet;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

/// True if the codec generator serializes `ty` without help.
pub fn is_primitive_type(ty: &Type) -> bool {
    match ty {
        // named sentinels are matched by their importable spelling
        Type::Named(tn) => {
            is_primitive(&tn.to_string())
                || is_primitive(&format!("{}.{}", tn.package_base(), tn.local_name))
        }
        other => is_primitive(&other.to_string()),
    }
}

pub struct Extractor<'a> {
    tpset: &'a dyn PackageSet,
    queue: TypeQueue<'a>,
    directives: DirectivesCache<'a>,
    state: Option<State>,
    ifaces: IndexMap<TypeName, Iface>,
    // synthetic unit parts per package, joined by blank lines
    temp_output: BTreeMap<String, Vec<String>>,
    // appended to the generator's output per package
    extra_output: BTreeMap<String, Vec<String>>,
    // struct names and origin/name shim keys already rendered
    temp_rendered: FxHashSet<String>,
    allow_extra: bool,
    events: Vec<GenEvent>,
}

impl<'a> Extractor<'a> {
    pub fn new(tpset: &'a dyn PackageSet, state: Option<State>) -> Self {
        Extractor {
            tpset,
            queue: TypeQueue::new(tpset),
            directives: DirectivesCache::new(tpset),
            state,
            ifaces: IndexMap::new(),
            temp_output: BTreeMap::new(),
            extra_output: BTreeMap::new(),
            temp_rendered: FxHashSet::default(),
            allow_extra: false,
            events: Vec::new(),
        }
    }

    /// Also mark every extracted struct `allowextra`.
    pub fn with_allow_extra(mut self, allow_extra: bool) -> Self {
        self.allow_extra = allow_extra;
        self
    }

    /// Queue a root type under its own package.
    pub fn add_root(&mut self, tn: &TypeName) -> Result<(), String> {
        let obj = self
            .tpset
            .find_object(tn)
            .ok_or_else(|| format!("could not find type {}", tn))?;
        self.queue.add_obj(&tn.package_path, obj, &[]);
        Ok(())
    }

    /// Drain the queue, then emit interceptors for every discovered interface.
    pub fn extract(&mut self) -> Result<(), String> {
        while let Some(tqi) = self.queue.dequeue() {
            if is_primitive_type(&tqi.ty) {
                self.events.push(GenEvent::SupportedDirectly {
                    origin: tqi.origin_pkg.clone(),
                    name: tqi.name.clone(),
                });
                continue;
            }
            match &tqi.ty {
                Type::Named(tn) => self.extract_named(&tqi, tn)?,
                Type::Basic(b) => {
                    return Err(format!(
                        "unsupported basic type: {}, parents: {}",
                        b,
                        tqi.parents_string()
                    ))
                }
                other => {
                    return Err(format!(
                        "unsupported type: {}, parents: {}",
                        other,
                        tqi.parents_string()
                    ))
                }
            }
        }
        self.emit_interceptors()
    }

    fn extract_named(&mut self, tqi: &TypeQueueItem, tn: &TypeName) -> Result<(), String> {
        let tpset = self.tpset;
        let obj = tpset.find_object(tn).ok_or_else(|| {
            format!(
                "could not find type {}, originating '{}', parents: {}",
                tn,
                tqi.origin_pkg,
                tqi.parents_string()
            )
        })?;
        let declaring = tn.package_path.as_str();

        // shims belong to the package that uses the type
        if self.directives.ensure(&tqi.origin_pkg)?.shim(tn).is_some() {
            self.events.push(GenEvent::AlreadyShimmed {
                origin: tqi.origin_pkg.clone(),
                name: tqi.name.clone(),
            });
            return Ok(());
        }
        // ignores belong to the package that declares it
        if self.directives.ensure(declaring)?.is_ignored(tn) {
            self.events.push(GenEvent::Ignored {
                pkg: declaring.to_string(),
                name: tqi.name.clone(),
            });
            return Ok(());
        }

        let intercepted = self
            .directives
            .get(&tqi.origin_pkg)
            .is_some_and(|d| d.is_intercepted(tn));

        match &obj.underlying {
            Type::Struct(_) => self.extract_struct(tqi, tn, &obj.underlying),
            _ if intercepted => {
                self.events.push(GenEvent::Intercepted {
                    origin: tqi.origin_pkg.clone(),
                    name: tqi.name.clone(),
                });
                Ok(())
            }
            u if !u.is_interface() && is_primitive_type(u) => self.extract_shimmed(tqi, tn, u),
            u if u.is_compound() => Ok(()),
            Type::Interface(_) => self.extract_interface(tqi, tn),
            u => Err(format!(
                "named unsupported type '{}', underlying '{}', originating '{}'",
                tn, u, tqi.origin_pkg
            )),
        }
    }

    fn extract_struct(
        &mut self,
        tqi: &TypeQueueItem,
        tn: &TypeName,
        underlying: &Type,
    ) -> Result<(), String> {
        if !self.temp_rendered.insert(tqi.name.clone()) {
            return Ok(());
        }
        let declaring = tn.package_path.as_str();
        let kind = self.tpset.kind(declaring);
        if kind != PackageKind::User {
            return Err(format!(
                "{}: type '{}' in {} package cannot be extracted - use a shim instead or write your own serialisation",
                tqi.origin_pkg, tn, kind
            ));
        }

        StructWalker::new(&mut self.queue, self.tpset).walk(tn, underlying, tqi)?;

        let source = self.tpset.extract_source(tn)?;
        let local = find_imported_name(&tqi.name, declaring);
        self.directives
            .add(declaring, Directive::Tuple(vec![local.clone()]))?;
        if self.allow_extra {
            self.directives
                .add(declaring, Directive::AllowExtra(vec![local]))?;
        }
        self.temp_output
            .entry(declaring.to_string())
            .or_default()
            .push(format!("type {}", source));
        self.events.push(GenEvent::Extracted {
            pkg: declaring.to_string(),
            name: tqi.name.clone(),
        });
        Ok(())
    }

    // Named primitives are cast to and from their underlying type. The shim
    // goes into the origin package; only the declaration itself stays home.
    fn extract_shimmed(
        &mut self,
        tqi: &TypeQueueItem,
        tn: &TypeName,
        underlying: &Type,
    ) -> Result<(), String> {
        let origin = tqi.origin_pkg.as_str();
        if !self.temp_rendered.insert(format!("{}/{}", origin, tn)) {
            return Ok(());
        }

        let as_type = underlying.to_string();
        let shim = ShimDirective {
            type_name: tn.to_string(),
            as_type: as_type.clone(),
            to_func: as_type.clone(),
            from_func: find_imported_name(&tn.to_string(), origin),
            mode: ShimMode::Cast,
        };
        self.directives.add(origin, Directive::Shim(shim))?;

        if tn.package_path == origin && self.tpset.kind(origin) == PackageKind::User {
            let source = self.tpset.extract_source(tn)?;
            self.temp_output
                .entry(origin.to_string())
                .or_default()
                .push(format!("type {}", source));
        }
        self.events.push(GenEvent::Shimmed {
            origin: origin.to_string(),
            name: tqi.name.clone(),
            as_type,
        });
        Ok(())
    }

    fn extract_interface(&mut self, tqi: &TypeQueueItem, tn: &TypeName) -> Result<(), String> {
        let Some(state) = self.state.as_mut() else {
            return Err(format!(
                "tried to extract interface {} without a state file",
                tn
            ));
        };

        if !self.ifaces.contains_key(tn) {
            let types = self.tpset.find_implementers(tn)?;
            let mut parents = tqi.parents.clone();
            parents.push(Type::Named(tn.clone()));
            for (ctn, ct) in &types {
                if !ctn.is_exported() {
                    continue;
                }
                state.ensure_type(ctn)?;
                self.queue.add_type(
                    &tqi.origin_pkg,
                    &ctn.to_string(),
                    ct.elide_pointer().clone(),
                    &parents,
                );
            }
            self.events.push(GenEvent::InterfaceDiscovered {
                origin: tqi.origin_pkg.clone(),
                name: tn.to_string(),
                implementers: types.len(),
            });
            self.ifaces.insert(tn.clone(), Iface::new(tn.clone(), types));
        }

        if let Some(iface) = self.ifaces.get_mut(tn) {
            iface.add_package(&tqi.origin_pkg);
        }
        Ok(())
    }

    fn emit_interceptors(&mut self) -> Result<(), String> {
        let Some(state) = self.state.as_ref() else {
            return Ok(());
        };
        for iface in self.ifaces.values() {
            for pkg in &iface.in_packages {
                let dctvs = self
                    .directives
                    .get(pkg)
                    .ok_or_else(|| format!("could not find directives for package {}", pkg))?;
                let rendered = render_interceptor(self.tpset, pkg, dctvs, state, iface)?;
                self.directives.add(pkg, rendered.directive)?;
                self.extra_output
                    .entry(pkg.clone())
                    .or_default()
                    .push(rendered.source);
                self.events.push(GenEvent::InterceptorEmitted {
                    pkg: pkg.clone(),
                    iface: iface.name.to_string(),
                    implementers: rendered.cases,
                });
            }
        }
        Ok(())
    }

    /// Synthetic unit parts, keyed by package path.
    pub fn temp_output(&self) -> &BTreeMap<String, Vec<String>> {
        &self.temp_output
    }

    /// Interceptor sources, keyed by package path.
    pub fn extra_output(&self) -> &BTreeMap<String, Vec<String>> {
        &self.extra_output
    }

    pub fn directives(&self) -> &DirectivesCache<'a> {
        &self.directives
    }

    pub fn directives_mut(&mut self) -> &mut DirectivesCache<'a> {
        &mut self.directives
    }

    pub fn queue(&self) -> &TypeQueue<'a> {
        &self.queue
    }

    pub fn ifaces(&self) -> &IndexMap<TypeName, Iface> {
        &self.ifaces
    }

    pub fn state(&self) -> Option<&State> {
        self.state.as_ref()
    }

    pub fn take_events(&mut self) -> Vec<GenEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn into_state(self) -> Option<State> {
        self.state
    }
}
