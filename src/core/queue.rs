//! MG-004: Type queue — deduplicated FIFO of types awaiting classification.

use super::types::{base_name, Type, TypeName, TypeObject};
use crate::packages::PackageSet;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// A unit of extraction work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeQueueItem {
    /// Package whose serialization work brought us here.
    pub origin_pkg: String,
    /// Fully qualified name (`Type` display form).
    pub name: String,
    pub ty: Type,
    /// Declaration, when the name resolves to one.
    pub obj: Option<TypeName>,
    /// Field path that reached this type, outermost first.
    pub parents: Vec<Type>,
}

impl TypeQueueItem {
    pub fn key(&self) -> String {
        item_key(&self.origin_pkg, &self.name)
    }

    pub fn parent(&self) -> Option<&Type> {
        self.parents.last()
    }

    pub fn parents_string(&self) -> String {
        let parts: Vec<String> = self.parents.iter().map(|p| p.to_string()).collect();
        parts.join(" -> ")
    }
}

fn item_key(origin: &str, name: &str) -> String {
    format!("{}:{}", origin, name)
}

pub struct TypeQueue<'a> {
    tpset: &'a dyn PackageSet,
    contents: VecDeque<TypeQueueItem>,
    // (origin, name) keys ever enqueued
    seen_items: FxHashSet<String>,
    // names ever offered, regardless of origin
    seen_types: FxHashSet<String>,
}

impl<'a> TypeQueue<'a> {
    pub fn new(tpset: &'a dyn PackageSet) -> Self {
        TypeQueue {
            tpset,
            contents: VecDeque::new(),
            seen_items: FxHashSet::default(),
            seen_types: FxHashSet::default(),
        }
    }

    /// Offer a type. Returns true if it was enqueued, false if the same
    /// `(origin, name)` was seen before.
    pub fn add(
        &mut self,
        origin_pkg: &str,
        name: &str,
        obj: Option<TypeName>,
        ty: Type,
        parents: &[Type],
    ) -> bool {
        let obj = obj.or_else(|| self.tpset.object_by_name(name).map(|o| o.name.clone()));
        self.seen_types.insert(name.to_string());
        if !self.seen_items.insert(item_key(origin_pkg, name)) {
            return false;
        }
        self.contents.push_back(TypeQueueItem {
            origin_pkg: origin_pkg.to_string(),
            name: name.to_string(),
            ty,
            obj,
            parents: parents.to_vec(),
        });
        true
    }

    pub fn add_obj(&mut self, origin_pkg: &str, obj: &TypeObject, parents: &[Type]) -> bool {
        self.add(
            origin_pkg,
            &obj.name.to_string(),
            Some(obj.name.clone()),
            Type::Named(obj.name.clone()),
            parents,
        )
    }

    pub fn add_type(&mut self, origin_pkg: &str, name: &str, ty: Type, parents: &[Type]) -> bool {
        self.add(origin_pkg, name, None, ty, parents)
    }

    pub fn dequeue(&mut self) -> Option<TypeQueueItem> {
        self.contents.pop_front()
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn seen_types(&self) -> &FxHashSet<String> {
        &self.seen_types
    }

    /// Seen names reduced to their importable form (`a/b/thing.Foo` →
    /// `thing.Foo`), for matching generator diagnostics.
    pub fn seen_basenames(&self) -> FxHashSet<String> {
        self.seen_types
            .iter()
            .map(|n| base_name(n).to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::testutil;
    use proptest::prelude::*;
    use std::path::Path;

    #[test]
    fn test_mg004_fifo_order() {
        let set = testutil::fixture(Path::new("/src"));
        let mut q = TypeQueue::new(&set);
        assert!(q.add_type("p", "a", Type::basic("int"), &[]));
        assert!(q.add_type("p", "b", Type::basic("int"), &[]));
        assert_eq!(q.len(), 2);
        assert_eq!(q.dequeue().unwrap().name, "a");
        assert_eq!(q.dequeue().unwrap().name, "b");
        assert!(q.dequeue().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn test_mg004_dedup_by_origin_and_name() {
        let set = testutil::fixture(Path::new("/src"));
        let mut q = TypeQueue::new(&set);
        assert!(q.add_type("p", "x.Foo", Type::named("x", "Foo"), &[]));
        assert!(!q.add_type("p", "x.Foo", Type::named("x", "Foo"), &[]));
        assert!(q.add_type("q", "x.Foo", Type::named("x", "Foo"), &[]));
        assert_eq!(q.len(), 2);
        assert_eq!(q.seen_types().len(), 1);
    }

    #[test]
    fn test_mg004_resolves_obj() {
        let set = testutil::fixture(Path::new("/src"));
        let mut q = TypeQueue::new(&set);
        q.add_type(
            "example.com/app",
            "example.com/app.User",
            Type::named("example.com/app", "User"),
            &[],
        );
        q.add_type("example.com/app", "string", Type::basic("string"), &[]);
        let user = q.dequeue().unwrap();
        assert_eq!(user.obj, Some(TypeName::new("example.com/app", "User")));
        let s = q.dequeue().unwrap();
        assert_eq!(s.obj, None);
    }

    #[test]
    fn test_mg004_parents() {
        let set = testutil::fixture(Path::new("/src"));
        let mut q = TypeQueue::new(&set);
        let parents = vec![Type::named("a", "User"), Type::named("b", "Shape")];
        q.add_type("a", "b.Circle", Type::named("b", "Circle"), &parents);
        let item = q.dequeue().unwrap();
        assert_eq!(item.parent(), Some(&Type::named("b", "Shape")));
        assert_eq!(item.parents_string(), "a.User -> b.Shape");
        assert_eq!(item.key(), "a:b.Circle");
    }

    #[test]
    fn test_mg004_seen_basenames() {
        let set = testutil::fixture(Path::new("/src"));
        let mut q = TypeQueue::new(&set);
        q.add_type("p", "example.com/thing.Foo", Type::named("example.com/thing", "Foo"), &[]);
        q.add_type("p", "string", Type::basic("string"), &[]);
        let seen = q.seen_basenames();
        assert!(seen.contains("thing.Foo"));
        assert!(seen.contains("string"));
    }

    proptest! {
        #[test]
        fn test_mg004_dequeue_yields_each_key_once(
            adds in prop::collection::vec(("[pq]", "[a-e]"), 0..60)
        ) {
            let set = testutil::fixture(Path::new("/src"));
            let mut q = TypeQueue::new(&set);
            for (origin, name) in &adds {
                q.add_type(origin, name, Type::basic("int"), &[]);
            }
            let mut keys = FxHashSet::default();
            while let Some(item) = q.dequeue() {
                prop_assert!(keys.insert(item.key()));
            }
            let distinct: FxHashSet<String> =
                adds.iter().map(|(o, n)| format!("{}:{}", o, n)).collect();
            prop_assert_eq!(keys, distinct);
        }
    }
}
