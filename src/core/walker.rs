//! MG-005: Struct walker — visit a type's field graph and queue what it references.

use super::queue::{TypeQueue, TypeQueueItem};
use super::types::{Field, Type, TypeName};
use crate::packages::PackageSet;

/// Callbacks for [`walk`]. Every method defaults to a no-op.
pub trait TypeVisitor {
    fn enter_struct(&mut self, _root: &TypeName, _fields: &[Field]) -> Result<(), String> {
        Ok(())
    }

    fn leave_struct(&mut self, _root: &TypeName, _fields: &[Field]) -> Result<(), String> {
        Ok(())
    }

    fn enter_field(&mut self, _root: &TypeName, _field: &Field) -> Result<(), String> {
        Ok(())
    }

    fn leave_field(&mut self, _root: &TypeName, _field: &Field) -> Result<(), String> {
        Ok(())
    }

    /// Basic types and interface literals.
    fn visit_basic(&mut self, _root: &TypeName, _ty: &Type) -> Result<(), String> {
        Ok(())
    }

    /// Named types. The walk does not descend into them.
    fn visit_named(&mut self, _root: &TypeName, _tn: &TypeName) -> Result<(), String> {
        Ok(())
    }
}

/// Depth-first walk of `underlying`, the underlying type of `root`.
pub fn walk(root: &TypeName, underlying: &Type, visitor: &mut dyn TypeVisitor) -> Result<(), String> {
    match underlying {
        Type::Basic(_) | Type::Interface(_) => visitor.visit_basic(root, underlying),
        Type::Named(tn) => visitor.visit_named(root, tn),
        Type::Pointer(elem) | Type::Slice(elem) | Type::Array(_, elem) | Type::Chan(elem) => {
            walk(root, elem, visitor)
        }
        Type::Map(key, value) => {
            walk(root, key, visitor)?;
            walk(root, value, visitor)
        }
        Type::Struct(fields) => {
            visitor.enter_struct(root, fields)?;
            for field in fields {
                visitor.enter_field(root, field)?;
                walk(root, &field.ty, visitor)?;
                visitor.leave_field(root, field)?;
            }
            visitor.leave_struct(root, fields)
        }
    }
}

/// Enqueues every basic and named type reachable from a struct, under the
/// struct's declaring package.
pub struct StructWalker<'q, 'a> {
    queue: &'q mut TypeQueue<'a>,
    tpset: &'a dyn PackageSet,
    current_pkg: String,
    parents: Vec<Type>,
}

impl<'q, 'a> StructWalker<'q, 'a> {
    pub fn new(queue: &'q mut TypeQueue<'a>, tpset: &'a dyn PackageSet) -> Self {
        StructWalker {
            queue,
            tpset,
            current_pkg: String::new(),
            parents: Vec::new(),
        }
    }

    /// Walk the struct `name` reached through `tqi`.
    pub fn walk(&mut self, name: &TypeName, underlying: &Type, tqi: &TypeQueueItem) -> Result<(), String> {
        self.current_pkg = name.package_path.clone();
        self.parents = tqi.parents.clone();
        self.parents.push(Type::Named(name.clone()));
        let result = walk(name, underlying, self);
        self.current_pkg.clear();
        self.parents.clear();
        result
    }
}

impl TypeVisitor for StructWalker<'_, '_> {
    fn visit_basic(&mut self, _root: &TypeName, ty: &Type) -> Result<(), String> {
        self.queue
            .add_type(&self.current_pkg, &ty.to_string(), ty.clone(), &self.parents);
        Ok(())
    }

    fn visit_named(&mut self, _root: &TypeName, tn: &TypeName) -> Result<(), String> {
        let added = self.queue.add_type(
            &self.current_pkg,
            &tn.to_string(),
            Type::Named(tn.clone()),
            &self.parents,
        );
        // Named compounds (`type Foos []Foo`) are walked for their elements,
        // once per package.
        let tpset = self.tpset;
        if added {
            if let Some(obj) = tpset.find_object(tn) {
                if obj.underlying.is_compound() {
                    return walk(tn, &obj.underlying, self);
                }
            }
        }
        Ok(())
    }
}
