//! Semantic types for PL0.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Canonical type representation used by the checker and the code generator.
///
/// `Named` is the deferred form left behind by the parser; `resolve_scope`
/// grounds every entry type except pointer targets, which stay `Named` so
/// recursive records remain representable and are looked up again on use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    Int,
    Bool,
    Subrange {
        lo: i64,
        hi: i64,
        base: Box<Type>,
    },
    /// An L-value holding a `T`; every assignable location has this type.
    Reference(Box<Type>),
    Function {
        arg: Box<Type>,
        result: Box<Type>,
    },
    /// Type of an argument list.
    Product(Vec<Type>),
    /// Ordered named fields, unique within the record.
    Record(Vec<(String, Type)>),
    Pointer(Box<Type>),
    Named(String),
    /// Ordered signatures of an overloaded operator; members are `Function`s
    /// and declaration order decides overload selection.
    Intersection(Vec<Type>),
    /// Absorbing element: suppresses cascading diagnostics.
    Error,
}

impl Type {
    pub fn subrange(lo: i64, hi: i64, base: Type) -> Type {
        Type::Subrange {
            lo,
            hi,
            base: Box::new(base),
        }
    }

    pub fn reference(referenced: Type) -> Type {
        Type::Reference(Box::new(referenced))
    }

    pub fn pointer(target: Type) -> Type {
        Type::Pointer(Box::new(target))
    }

    pub fn function(arg: Type, result: Type) -> Type {
        Type::Function {
            arg: Box::new(arg),
            result: Box::new(result),
        }
    }

    /// Space in stack-machine words a value of this type occupies.
    pub fn size(&self) -> i64 {
        match self {
            Type::Int | Type::Bool | Type::Subrange { .. } => 1,
            Type::Pointer(_) | Type::Reference(_) => 1,
            Type::Record(fields) => fields.iter().map(|(_, ty)| ty.size()).sum(),
            Type::Function { .. }
            | Type::Product(_)
            | Type::Named(_)
            | Type::Intersection(_)
            | Type::Error => 0,
        }
    }

    /// The referenced type of an L-value, or the type itself. Used where the
    /// context accepts either a value or an L-value.
    pub fn opt_dereference(&self) -> &Type {
        match self {
            Type::Reference(referenced) => referenced,
            other => other,
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Bool => f.write_str("boolean"),
            Type::Subrange { lo, hi, .. } => write!(f, "{lo}..{hi}"),
            Type::Reference(referenced) => write!(f, "ref({referenced})"),
            Type::Function { arg, result } => write!(f, "{arg} -> {result}"),
            Type::Product(elements) => {
                let elements = elements
                    .iter()
                    .map(Type::to_string)
                    .collect::<Vec<_>>()
                    .join(" * ");
                write!(f, "({elements})")
            }
            Type::Record(fields) => {
                let fields = fields
                    .iter()
                    .map(|(name, ty)| format!("{name}: {ty}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "record {fields} end")
            }
            Type::Pointer(target) => write!(f, "^{target}"),
            Type::Named(name) => f.write_str(name),
            Type::Intersection(members) => {
                let members = members
                    .iter()
                    .map(Type::to_string)
                    .collect::<Vec<_>>()
                    .join(" & ");
                f.write_str(&members)
            }
            Type::Error => f.write_str("<error>"),
        }
    }
}

/// Word offset of a field within a record, together with its type.
pub fn field_offset(fields: &[(String, Type)], field: &str) -> Option<(i64, Type)> {
    let mut offset = 0;
    for (name, ty) in fields {
        if name == field {
            return Some((offset, ty.clone()));
        }
        offset += ty.size();
    }
    None
}
