//! AST for PL0.
//!
//! The tree is generic over the information attached to its nodes: the parser
//! hands over nodes carrying `()`, the static checker consumes them and
//! returns the same shapes carrying resolved type information. Node kinds the
//! checker inserts itself (`Dereference`, `NarrowSubrange`, `WidenSubrange`)
//! only ever appear on the typed side.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::symtab::EntryId;

/// Source position attached to every node, used for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Location {
        Location { line, column }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgramNode<I> {
    pub location: Location,
    /// Procedure entry of the main program (static level 1).
    pub entry: EntryId,
    pub block: BlockNode<I>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode<I> {
    pub location: Location,
    pub procedures: Vec<ProcedureNode<I>>,
    pub body: StatementNode<I>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureNode<I> {
    pub location: Location,
    pub name: String,
    pub entry: EntryId,
    pub block: BlockNode<I>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatementNode<I> {
    pub location: Location,
    pub kind: StatementKind<I>,
}

impl<I> StatementNode<I> {
    pub fn new(location: Location, kind: StatementKind<I>) -> StatementNode<I> {
        StatementNode { location, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind<I> {
    Error,
    /// Multi-assignment: all right sides are evaluated before any store.
    Assignment(Vec<SingleAssign<I>>),
    Write(ExpNode<I>),
    Call {
        name: String,
        /// Resolved by the checker; `None` only before checking.
        entry: Option<EntryId>,
    },
    List(Vec<StatementNode<I>>),
    If {
        condition: ExpNode<I>,
        then_branch: Box<StatementNode<I>>,
        else_branch: Option<Box<StatementNode<I>>>,
    },
    While {
        condition: ExpNode<I>,
        body: Box<StatementNode<I>>,
    },
    Case {
        scrutinee: ExpNode<I>,
        branches: Vec<CaseBranch<I>>,
        default: Option<Box<StatementNode<I>>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleAssign<I> {
    pub lvalue: ExpNode<I>,
    pub rvalue: ExpNode<I>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseBranch<I> {
    pub location: Location,
    pub label: i64,
    pub body: StatementNode<I>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpNode<I> {
    pub location: Location,
    pub info: I,
    pub kind: ExpKind<I>,
}

impl ExpNode<()> {
    pub fn untyped(location: Location, kind: ExpKind<()>) -> ExpNode<()> {
        ExpNode {
            location,
            info: (),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpKind<I> {
    Error,
    Constant(i64),
    /// Unresolved name; never survives the checker.
    Identifier(String),
    /// Resolved variable reference, typed `Reference(declared type)`.
    Variable(EntryId),
    Read,
    Operator {
        op: Operator,
        arg: Box<ExpNode<I>>,
    },
    Arguments(Vec<ExpNode<I>>),
    /// Load the value out of an L-value; inserted by the checker.
    Dereference(Box<ExpNode<I>>),
    /// Runtime-checked coercion into a subrange; inserted by the checker.
    NarrowSubrange(Box<ExpNode<I>>),
    /// Free coercion out of a subrange; inserted by the checker.
    WidenSubrange(Box<ExpNode<I>>),
    FieldAccess {
        record: Box<ExpNode<I>>,
        field: String,
    },
    PointerDereference(Box<ExpNode<I>>),
    New(String),
    RecordConstructor {
        type_name: String,
        fields: Vec<ExpNode<I>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Negate,
    Equals,
    NotEquals,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

impl Operator {
    /// Name under which the operator is entered in the operator namespace.
    /// The prefix form of `-` has its own entry.
    pub fn name(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Negate => "-_",
            Operator::Equals => "=",
            Operator::NotEquals => "<>",
            Operator::Less => "<",
            Operator::LessEq => "<=",
            Operator::Greater => ">",
            Operator::GreaterEq => ">=",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
