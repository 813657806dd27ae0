//! Symbol table for PL0: lexically nested scopes, their entries and the
//! separate operator namespace.
//!
//! Scopes live in an arena indexed by `ScopeId`; a stack of currently open
//! scope ids tracks where declarations and lookups happen. Entries live in a
//! flat arena indexed by `EntryId`, which doubles as the stable key of the
//! procedures table.

mod entry;
mod predefined;

pub use self::entry::{Entry, SymEntry};

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;

use crate::ast::Location;
use crate::errors::ErrorSink;
use crate::types::Type;

pub type ScopeId = usize;
pub type EntryId = usize;

/// A single lexical scope. Lookup walks parents; declarations only inspect
/// the scope itself.
#[derive(Debug, Clone)]
struct Scope {
    parent: Option<ScopeId>,
    level: i32,
    names: HashMap<String, EntryId>,
    /// Entries in declaration order; variable offsets are laid out along it.
    declarations: Vec<EntryId>,
    variable_space: i64,
    resolved: bool,
}

impl Scope {
    fn new(parent: Option<ScopeId>, level: i32) -> Scope {
        Scope {
            parent,
            level,
            names: HashMap::new(),
            declarations: vec![],
            variable_space: 0,
            resolved: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationError {
    pub name: String,
}

impl Display for DeclarationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is already declared in this scope", self.name)
    }
}

impl Error for DeclarationError {}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    entries: Vec<Entry>,
    /// Operators live in their own namespace and are never shadowed by user
    /// identifiers.
    operators: HashMap<&'static str, EntryId>,
    open: Vec<ScopeId>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A fresh table whose predefined scope (level 0) holds the scalar
    /// types, `true`/`false` and the operator signatures.
    pub fn new() -> SymbolTable {
        let mut predefined = Scope::new(None, 0);
        predefined.resolved = true;
        let mut table = SymbolTable {
            scopes: vec![predefined],
            entries: vec![],
            operators: HashMap::new(),
            open: vec![0],
        };
        predefined::seed(&mut table);
        table
    }

    pub fn current_scope(&self) -> ScopeId {
        let Some(current) = self.open.last() else {
            unreachable!("the scope stack never drops the predefined scope");
        };
        *current
    }

    pub fn scope_level(&self, scope: ScopeId) -> i32 {
        self.scopes[scope].level
    }

    /// Total space allocated to the local variables of `scope`, in words.
    pub fn variable_space(&self, scope: ScopeId) -> i64 {
        self.scopes[scope].variable_space
    }

    /// Open a new scope nested in the current one.
    pub fn enter_scope(&mut self, level: i32) -> ScopeId {
        let id = self.scopes.len();
        self.scopes.push(Scope::new(Some(self.current_scope()), level));
        self.open.push(id);
        id
    }

    pub fn leave_scope(&mut self) {
        if self.open.len() > 1 {
            self.open.pop();
        }
    }

    /// Re-open an existing scope, e.g. a procedure's local scope when its
    /// body is checked or generated.
    pub fn reenter_scope(&mut self, scope: ScopeId) {
        self.open.push(scope);
    }

    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.entries[id]
    }

    /// Define `name` in the current scope. Names must be unique within a
    /// scope; variables get their level from the scope and their offset once
    /// the scope is resolved.
    pub fn define(
        &mut self,
        name: impl ToString,
        location: Location,
        kind: SymEntry,
    ) -> Result<EntryId, DeclarationError> {
        let name = name.to_string();
        let scope = self.current_scope();
        if self.scopes[scope].names.contains_key(&name) {
            return Err(DeclarationError { name });
        }
        let kind = match kind {
            SymEntry::Variable { ty, .. } => SymEntry::Variable {
                ty,
                level: self.scopes[scope].level,
                offset: 0,
            },
            other => other,
        };
        let id = self.entries.len();
        self.entries.push(Entry {
            name: name.clone(),
            location,
            kind,
        });
        self.scopes[scope].names.insert(name, id);
        self.scopes[scope].declarations.push(id);
        Ok(id)
    }

    pub fn define_variable(
        &mut self,
        name: impl ToString,
        location: Location,
        ty: Type,
    ) -> Result<EntryId, DeclarationError> {
        self.define(
            name,
            location,
            SymEntry::Variable {
                ty,
                level: 0,
                offset: 0,
            },
        )
    }

    /// Define a procedure and create its local scope one level below the
    /// current one. The local scope is not opened.
    pub fn define_procedure(
        &mut self,
        name: impl ToString,
        location: Location,
    ) -> Result<EntryId, DeclarationError> {
        let level = self.scopes[self.current_scope()].level + 1;
        let local_scope = self.scopes.len();
        self.scopes
            .push(Scope::new(Some(self.current_scope()), level));
        self.define(name, location, SymEntry::Procedure { local_scope, level })
    }

    fn define_operator(&mut self, name: &'static str, kind: SymEntry) {
        let id = self.entries.len();
        self.entries.push(Entry {
            name: name.to_string(),
            location: Location::default(),
            kind,
        });
        self.operators.insert(name, id);
    }

    /// Look up `name` starting at `scope` and walking parents.
    pub fn lookup_from(&self, scope: ScopeId, name: &str) -> Option<EntryId> {
        let mut scope = Some(scope);
        while let Some(id) = scope {
            if let Some(entry) = self.scopes[id].names.get(name) {
                return Some(*entry);
            }
            scope = self.scopes[id].parent;
        }
        None
    }

    pub fn lookup(&self, name: &str) -> Option<EntryId> {
        self.lookup_from(self.current_scope(), name)
    }

    pub fn lookup_operator(&self, name: &str) -> Option<EntryId> {
        self.operators.get(name).copied()
    }

    /// Resolved type behind a type identifier visible from the current
    /// scope, if `name` names one.
    pub fn lookup_type(&self, name: &str) -> Option<Type> {
        match &self.entry(self.lookup(name)?).kind {
            SymEntry::TypeAlias { ty } => Some(self.resolve(ty)),
            _ => None,
        }
    }

    /// Shallowly resolve `Named` through the table, looking up from `scope`.
    /// Unknown names and alias cycles ground to the error type.
    pub fn resolve_from(&self, scope: ScopeId, ty: &Type) -> Type {
        let mut ty = ty.clone();
        let mut steps = 0;
        while let Type::Named(name) = &ty {
            steps += 1;
            if steps > self.entries.len() {
                return Type::Error;
            }
            ty = match self.lookup_from(scope, name).map(|id| &self.entry(id).kind) {
                Some(SymEntry::TypeAlias { ty }) => ty.clone(),
                _ => return Type::Error,
            };
        }
        ty
    }

    pub fn resolve(&self, ty: &Type) -> Type {
        self.resolve_from(self.current_scope(), ty)
    }

    /// Fields behind `ty` if it is (a reference to) a record type.
    pub fn record_fields(&self, scope: ScopeId, ty: &Type) -> Option<Vec<(String, Type)>> {
        match self.resolve_from(scope, ty.opt_dereference()) {
            Type::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Target behind `ty` if it is (a reference to) a pointer type.
    pub fn pointer_target(&self, scope: ScopeId, ty: &Type) -> Option<Type> {
        match self.resolve_from(scope, ty.opt_dereference()) {
            Type::Pointer(target) => Some(self.resolve_from(scope, &target)),
            _ => None,
        }
    }

    /// Ground the deferred types of every entry declared in the current
    /// scope and lay out its variables. Applied once per scope before its
    /// body is checked; later applications are no-ops.
    pub fn resolve_scope(&mut self, errors: &mut ErrorSink) {
        let scope = self.current_scope();
        if self.scopes[scope].resolved {
            return;
        }
        self.scopes[scope].resolved = true;
        let declarations = self.scopes[scope].declarations.clone();
        for id in declarations {
            let location = self.entries[id].location;
            match self.entries[id].kind.clone() {
                SymEntry::Constant { ty, value } => {
                    let ty = self.resolve_entry_type(scope, &ty, &mut vec![], errors, location);
                    self.entries[id].kind = SymEntry::Constant { ty, value };
                }
                SymEntry::TypeAlias { ty } => {
                    let ty = self.resolve_entry_type(scope, &ty, &mut vec![], errors, location);
                    self.entries[id].kind = SymEntry::TypeAlias { ty };
                }
                SymEntry::Variable { ty, level, .. } => {
                    let ty = self.resolve_entry_type(scope, &ty, &mut vec![], errors, location);
                    let offset = self.scopes[scope].variable_space;
                    self.scopes[scope].variable_space += ty.size();
                    self.entries[id].kind = SymEntry::Variable { ty, level, offset };
                }
                SymEntry::Procedure { .. } | SymEntry::Operator { .. } => {}
            }
        }
    }

    /// Replace `Named` by its definition everywhere except inside pointer
    /// targets, which stay symbolic so recursive records resolve lazily.
    fn resolve_entry_type(
        &self,
        scope: ScopeId,
        ty: &Type,
        visited: &mut Vec<String>,
        errors: &mut ErrorSink,
        location: Location,
    ) -> Type {
        match ty {
            Type::Named(name) => {
                if visited.iter().any(|seen| seen == name) {
                    errors.error(format!("circular definition of type {name}"), location);
                    return Type::Error;
                }
                match self.lookup_from(scope, name).map(|id| self.entry(id)) {
                    Some(Entry {
                        kind: SymEntry::TypeAlias { ty },
                        ..
                    }) => {
                        visited.push(name.clone());
                        let ground =
                            self.resolve_entry_type(scope, &ty.clone(), visited, errors, location);
                        visited.pop();
                        ground
                    }
                    Some(_) => {
                        errors.error(format!("type identifier required: {name}"), location);
                        Type::Error
                    }
                    None => {
                        errors.error(format!("undefined type {name}"), location);
                        Type::Error
                    }
                }
            }
            Type::Subrange { lo, hi, base } => Type::Subrange {
                lo: *lo,
                hi: *hi,
                base: Box::new(self.resolve_entry_type(scope, base, visited, errors, location)),
            },
            Type::Record(fields) => Type::Record(
                fields
                    .iter()
                    .map(|(name, ty)| {
                        (
                            name.clone(),
                            self.resolve_entry_type(scope, ty, visited, errors, location),
                        )
                    })
                    .collect(),
            ),
            Type::Pointer(target) => {
                if let Type::Named(name) = target.as_ref() {
                    match self.lookup_from(scope, name).map(|id| &self.entry(id).kind) {
                        Some(SymEntry::TypeAlias { .. }) => Type::Pointer(target.clone()),
                        Some(_) => {
                            errors.error(format!("type identifier required: {name}"), location);
                            Type::Error
                        }
                        None => {
                            errors.error(format!("undefined type {name}"), location);
                            Type::Error
                        }
                    }
                } else {
                    Type::Pointer(Box::new(
                        self.resolve_entry_type(scope, target, visited, errors, location),
                    ))
                }
            }
            Type::Reference(referenced) => Type::Reference(Box::new(self.resolve_entry_type(
                scope, referenced, visited, errors, location,
            ))),
            other => other.clone(),
        }
    }
}
