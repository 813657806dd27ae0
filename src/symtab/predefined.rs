//! Predefined environment seeded into every fresh symbol table: the scalar
//! types, the boolean constants and the operator namespace.

use once_cell::sync::Lazy;

use crate::types::Type;

use super::{SymEntry, SymbolTable};

fn arithmetic() -> Type {
    Type::function(Type::Product(vec![Type::Int, Type::Int]), Type::Int)
}

fn relational() -> Type {
    Type::function(Type::Product(vec![Type::Int, Type::Int]), Type::Bool)
}

fn equality() -> Type {
    Type::Intersection(vec![
        Type::function(Type::Product(vec![Type::Int, Type::Int]), Type::Bool),
        Type::function(Type::Product(vec![Type::Bool, Type::Bool]), Type::Bool),
    ])
}

/// Operator signatures in declaration order. The order is load-bearing:
/// intersection members are probed first to last during overload selection.
static OPERATORS: Lazy<Vec<(&'static str, Type)>> = Lazy::new(|| {
    vec![
        ("+", arithmetic()),
        ("-", arithmetic()),
        ("*", arithmetic()),
        ("/", arithmetic()),
        ("-_", Type::function(Type::Int, Type::Int)),
        ("=", equality()),
        ("<>", equality()),
        ("<", relational()),
        ("<=", relational()),
        (">", relational()),
        (">=", relational()),
    ]
});

pub(super) fn seed(table: &mut SymbolTable) {
    let location = Default::default();
    let scalars = [("int", Type::Int), ("boolean", Type::Bool)];
    let constants = [("true", 1), ("false", 0)];

    for (name, ty) in scalars {
        table
            .define(name, location, SymEntry::TypeAlias { ty })
            .expect("predefined scope starts empty");
    }
    for (name, value) in constants {
        table
            .define(
                name,
                location,
                SymEntry::Constant {
                    ty: Type::Bool,
                    value,
                },
            )
            .expect("predefined scope starts empty");
    }
    for (name, ty) in OPERATORS.iter() {
        table.define_operator(*name, SymEntry::Operator { ty: ty.clone() });
    }
}
