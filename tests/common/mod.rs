//! Builders for assembling raw trees by hand, playing the part of the
//! external parser.

#![allow(dead_code)]

use pl0_lang::ast::{
    BlockNode, CaseBranch, ExpKind, ExpNode, Location, Operator, ProcedureNode, ProgramNode,
    SingleAssign, StatementKind, StatementNode,
};
use pl0_lang::symtab::{EntryId, ScopeId, SymEntry, SymbolTable};
use pl0_lang::Code;

pub fn loc(line: usize) -> Location {
    Location::new(line, 1)
}

/// The main-program procedure entry (static level 1) of a fresh table.
pub fn main_program(symtab: &mut SymbolTable) -> EntryId {
    symtab.define_procedure("main", loc(1)).expect("fresh table")
}

pub fn local_scope(symtab: &SymbolTable, entry: EntryId) -> ScopeId {
    match &symtab.entry(entry).kind {
        SymEntry::Procedure { local_scope, .. } => *local_scope,
        _ => panic!("not a procedure entry"),
    }
}

/// Open a procedure's local scope for declarations.
pub fn enter(symtab: &mut SymbolTable, entry: EntryId) {
    let scope = local_scope(symtab, entry);
    symtab.reenter_scope(scope);
}

pub fn ident(name: &str, line: usize) -> ExpNode<()> {
    ExpNode::untyped(loc(line), ExpKind::Identifier(name.into()))
}

pub fn constant(value: i64, line: usize) -> ExpNode<()> {
    ExpNode::untyped(loc(line), ExpKind::Constant(value))
}

pub fn read(line: usize) -> ExpNode<()> {
    ExpNode::untyped(loc(line), ExpKind::Read)
}

pub fn binary(op: Operator, left: ExpNode<()>, right: ExpNode<()>, line: usize) -> ExpNode<()> {
    let arg = ExpNode::untyped(loc(line), ExpKind::Arguments(vec![left, right]));
    ExpNode::untyped(
        loc(line),
        ExpKind::Operator {
            op,
            arg: Box::new(arg),
        },
    )
}

pub fn negate(exp: ExpNode<()>, line: usize) -> ExpNode<()> {
    ExpNode::untyped(
        loc(line),
        ExpKind::Operator {
            op: Operator::Negate,
            arg: Box::new(exp),
        },
    )
}

pub fn field(record: ExpNode<()>, name: &str, line: usize) -> ExpNode<()> {
    ExpNode::untyped(
        loc(line),
        ExpKind::FieldAccess {
            record: Box::new(record),
            field: name.into(),
        },
    )
}

pub fn deref_pointer(pointer: ExpNode<()>, line: usize) -> ExpNode<()> {
    ExpNode::untyped(loc(line), ExpKind::PointerDereference(Box::new(pointer)))
}

pub fn new_exp(type_name: &str, line: usize) -> ExpNode<()> {
    ExpNode::untyped(loc(line), ExpKind::New(type_name.into()))
}

pub fn record_constructor(type_name: &str, fields: Vec<ExpNode<()>>, line: usize) -> ExpNode<()> {
    ExpNode::untyped(
        loc(line),
        ExpKind::RecordConstructor {
            type_name: type_name.into(),
            fields,
        },
    )
}

pub fn assign(lvalue: ExpNode<()>, rvalue: ExpNode<()>, line: usize) -> StatementNode<()> {
    multi_assign(vec![(lvalue, rvalue)], line)
}

pub fn multi_assign(pairs: Vec<(ExpNode<()>, ExpNode<()>)>, line: usize) -> StatementNode<()> {
    StatementNode::new(
        loc(line),
        StatementKind::Assignment(
            pairs
                .into_iter()
                .map(|(lvalue, rvalue)| SingleAssign { lvalue, rvalue })
                .collect(),
        ),
    )
}

pub fn write(exp: ExpNode<()>, line: usize) -> StatementNode<()> {
    StatementNode::new(loc(line), StatementKind::Write(exp))
}

pub fn call(name: &str, line: usize) -> StatementNode<()> {
    StatementNode::new(
        loc(line),
        StatementKind::Call {
            name: name.into(),
            entry: None,
        },
    )
}

pub fn list(statements: Vec<StatementNode<()>>, line: usize) -> StatementNode<()> {
    StatementNode::new(loc(line), StatementKind::List(statements))
}

pub fn if_stmt(
    condition: ExpNode<()>,
    then_branch: StatementNode<()>,
    else_branch: Option<StatementNode<()>>,
    line: usize,
) -> StatementNode<()> {
    StatementNode::new(
        loc(line),
        StatementKind::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        },
    )
}

pub fn while_stmt(
    condition: ExpNode<()>,
    body: StatementNode<()>,
    line: usize,
) -> StatementNode<()> {
    StatementNode::new(
        loc(line),
        StatementKind::While {
            condition,
            body: Box::new(body),
        },
    )
}

pub fn case_stmt(
    scrutinee: ExpNode<()>,
    branches: Vec<(i64, StatementNode<()>)>,
    default: Option<StatementNode<()>>,
    line: usize,
) -> StatementNode<()> {
    StatementNode::new(
        loc(line),
        StatementKind::Case {
            scrutinee,
            branches: branches
                .into_iter()
                .map(|(label, body)| CaseBranch {
                    location: body.location,
                    label,
                    body,
                })
                .collect(),
            default: default.map(Box::new),
        },
    )
}

pub fn block(body: StatementNode<()>) -> BlockNode<()> {
    block_with(vec![], body)
}

pub fn block_with(procedures: Vec<ProcedureNode<()>>, body: StatementNode<()>) -> BlockNode<()> {
    BlockNode {
        location: body.location,
        procedures,
        body,
    }
}

pub fn procedure(name: &str, entry: EntryId, block: BlockNode<()>, line: usize) -> ProcedureNode<()> {
    ProcedureNode {
        location: loc(line),
        name: name.into(),
        entry,
        block,
    }
}

pub fn program(entry: EntryId, block: BlockNode<()>) -> ProgramNode<()> {
    ProgramNode {
        location: loc(1),
        entry,
        block,
    }
}

/// Word position of every instruction plus the total size, for jump-law
/// checks.
pub fn word_positions(code: &Code) -> (Vec<i64>, i64) {
    let mut positions = vec![];
    let mut address = 0;
    for instruction in code.instructions() {
        positions.push(address);
        address += instruction.size();
    }
    (positions, address)
}
