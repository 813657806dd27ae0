use crate::ast::Location;
use crate::types::Type;

use super::ScopeId;

/// A named declaration owned by some scope (or, for operators, by the
/// operator namespace).
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub location: Location,
    pub kind: SymEntry,
}

#[derive(Debug, Clone)]
pub enum SymEntry {
    Constant {
        ty: Type,
        value: i64,
    },
    /// `level` is the static nesting level of the declaring scope, `offset`
    /// the word offset within that frame (laid out by `resolve_scope`).
    Variable {
        ty: Type,
        level: i32,
        offset: i64,
    },
    Procedure {
        local_scope: ScopeId,
        level: i32,
    },
    TypeAlias {
        ty: Type,
    },
    /// Type is a `Function` or an `Intersection` of `Function`s.
    Operator {
        ty: Type,
    },
}
