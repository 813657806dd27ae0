//! Static checker for PL0.
//!
//! Transforms the raw tree from the parser into a typed tree: every
//! identifier is bound against the symbol table, every expression gets a
//! resolved type, and coercions become explicit `Dereference`,
//! `WidenSubrange` and `NarrowSubrange` nodes. The checker never aborts;
//! failures go to the error sink and the offending node is typed with the
//! absorbing error type so diagnostics do not cascade.

mod coerce;
mod expression;

use std::collections::HashSet;

use crate::ast::{
    BlockNode, CaseBranch, ExpKind, ExpNode, Location, ProcedureNode, ProgramNode, SingleAssign,
    StatementKind, StatementNode,
};
use crate::errors::ErrorSink;
use crate::symtab::{EntryId, ScopeId, SymEntry, SymbolTable};
use crate::types::Type;

/// Type information attached to every expression after checking.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    pub ty: Type,
}

impl ExpNode<TypeInfo> {
    pub fn ty(&self) -> &Type {
        &self.info.ty
    }
}

pub(crate) fn typed(location: Location, ty: Type, kind: ExpKind<TypeInfo>) -> ExpNode<TypeInfo> {
    ExpNode {
        location,
        info: TypeInfo { ty },
        kind,
    }
}

/// Check a whole program. The program is the outermost procedure at static
/// level 1; its base scope is the procedure entry's local scope.
pub fn check_program(
    program: ProgramNode<()>,
    symtab: &mut SymbolTable,
    errors: &mut ErrorSink,
) -> ProgramNode<TypeInfo> {
    StaticChecker { symtab, errors }.check_program(program)
}

pub(crate) struct StaticChecker<'c> {
    pub(crate) symtab: &'c mut SymbolTable,
    pub(crate) errors: &'c mut ErrorSink,
}

impl StaticChecker<'_> {
    fn check_program(&mut self, program: ProgramNode<()>) -> ProgramNode<TypeInfo> {
        let ProgramNode {
            location,
            entry,
            block,
        } = program;
        let local_scope = self.procedure_scope(entry);
        self.symtab.reenter_scope(local_scope);
        self.symtab.resolve_scope(self.errors);
        let block = self.check_block(block);
        self.symtab.leave_scope();
        ProgramNode {
            location,
            entry,
            block,
        }
    }

    fn procedure_scope(&self, entry: EntryId) -> ScopeId {
        match &self.symtab.entry(entry).kind {
            SymEntry::Procedure { local_scope, .. } => *local_scope,
            _ => unreachable!("program or procedure node without a procedure entry"),
        }
    }

    fn check_block(&mut self, block: BlockNode<()>) -> BlockNode<TypeInfo> {
        let BlockNode {
            location,
            procedures,
            body,
        } = block;
        let procedures = procedures
            .into_iter()
            .map(|procedure| self.check_procedure(procedure))
            .collect();
        let body = self.check_statement(body);
        BlockNode {
            location,
            procedures,
            body,
        }
    }

    fn check_procedure(&mut self, procedure: ProcedureNode<()>) -> ProcedureNode<TypeInfo> {
        let ProcedureNode {
            location,
            name,
            entry,
            block,
        } = procedure;
        self.errors.debug_message(format!("checking procedure {name}"));
        self.errors.inc_debug();
        let local_scope = self.procedure_scope(entry);
        self.symtab.reenter_scope(local_scope);
        self.symtab.resolve_scope(self.errors);
        let block = self.check_block(block);
        self.symtab.leave_scope();
        self.errors.dec_debug();
        ProcedureNode {
            location,
            name,
            entry,
            block,
        }
    }

    fn check_statement(&mut self, statement: StatementNode<()>) -> StatementNode<TypeInfo> {
        let StatementNode { location, kind } = statement;
        let kind = match kind {
            StatementKind::Error => StatementKind::Error,
            StatementKind::Assignment(assigns) => StatementKind::Assignment(
                assigns
                    .into_iter()
                    .map(|assign| self.check_single_assign(assign))
                    .collect(),
            ),
            StatementKind::Write(exp) => {
                let exp = self.check_expression(exp);
                StatementKind::Write(self.coerce_exp(&Type::Int, exp))
            }
            StatementKind::Call { name, .. } => self.check_call(name, location),
            StatementKind::List(statements) => StatementKind::List(
                statements
                    .into_iter()
                    .map(|statement| self.check_statement(statement))
                    .collect(),
            ),
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.check_condition(condition);
                let then_branch = Box::new(self.check_statement(*then_branch));
                let else_branch =
                    else_branch.map(|statement| Box::new(self.check_statement(*statement)));
                StatementKind::If {
                    condition,
                    then_branch,
                    else_branch,
                }
            }
            StatementKind::While { condition, body } => {
                let condition = self.check_condition(condition);
                let body = Box::new(self.check_statement(*body));
                StatementKind::While { condition, body }
            }
            StatementKind::Case {
                scrutinee,
                branches,
                default,
            } => {
                let scrutinee = self.check_expression(scrutinee);
                let scrutinee = self.coerce_exp(&Type::Int, scrutinee);
                let mut seen = HashSet::new();
                let branches = branches
                    .into_iter()
                    .map(|branch| {
                        if !seen.insert(branch.label) {
                            self.errors.error(
                                format!("duplicate case label {}", branch.label),
                                branch.location,
                            );
                        }
                        CaseBranch {
                            location: branch.location,
                            label: branch.label,
                            body: self.check_statement(branch.body),
                        }
                    })
                    .collect();
                let default = default.map(|statement| Box::new(self.check_statement(*statement)));
                StatementKind::Case {
                    scrutinee,
                    branches,
                    default,
                }
            }
        };
        StatementNode { location, kind }
    }

    /// One lvalue/rvalue pair of a (multi-)assignment: the left side must be
    /// an L-value and the right side is coerced to its base type.
    fn check_single_assign(&mut self, assign: SingleAssign<()>) -> SingleAssign<TypeInfo> {
        let lvalue = self.check_expression(assign.lvalue);
        let rvalue = self.check_expression(assign.rvalue);
        match lvalue.ty().clone() {
            Type::Reference(base) => {
                let rvalue = self.coerce_exp(&base, rvalue);
                SingleAssign { lvalue, rvalue }
            }
            Type::Error => SingleAssign { lvalue, rvalue },
            _ => {
                self.errors.error("variable expected", lvalue.location);
                SingleAssign { lvalue, rvalue }
            }
        }
    }

    fn check_call(&mut self, name: String, location: Location) -> StatementKind<TypeInfo> {
        match self.symtab.lookup(&name) {
            Some(entry) if matches!(self.symtab.entry(entry).kind, SymEntry::Procedure { .. }) => {
                StatementKind::Call {
                    name,
                    entry: Some(entry),
                }
            }
            Some(_) => {
                self.errors
                    .error(format!("procedure identifier required: {name}"), location);
                StatementKind::Call { name, entry: None }
            }
            None => {
                self.errors
                    .error(format!("undefined identifier {name}"), location);
                StatementKind::Call { name, entry: None }
            }
        }
    }

    fn check_condition(&mut self, condition: ExpNode<()>) -> ExpNode<TypeInfo> {
        let condition = self.check_expression(condition);
        self.coerce_exp(&Type::Bool, condition)
    }
}
