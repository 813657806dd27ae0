//! Records, record constructors, pointers and heap allocation.

mod common;

use common::*;
use pl0_lang::ast::{ExpKind, StatementKind};
use pl0_lang::symtab::SymEntry;
use pl0_lang::types::Type;
use pl0_lang::Instruction::*;
use pl0_lang::{check_program, compile, ErrorSink, SymbolTable};

fn record_type() -> Type {
    Type::Record(vec![
        ("a".into(), Type::Int),
        ("b".into(), Type::subrange(1, 10, Type::Int)),
    ])
}

fn table_with_record() -> (SymbolTable, usize) {
    let mut symtab = SymbolTable::new();
    let main = main_program(&mut symtab);
    enter(&mut symtab, main);
    symtab
        .define("R", loc(2), SymEntry::TypeAlias { ty: record_type() })
        .expect("fresh scope");
    symtab
        .define_variable("r", loc(3), Type::Named("R".into()))
        .expect("fresh scope");
    symtab.leave_scope();
    (symtab, main)
}

#[test]
fn test_record_constructor_narrows_by_position() {
    let (mut symtab, main) = table_with_record();
    let mut errors = ErrorSink::new();

    let constructor = record_constructor("R", vec![constant(1, 4), constant(3, 4)], 4);
    let typed = check_program(
        program(main, block(assign(ident("r", 4), constructor, 4))),
        &mut symtab,
        &mut errors,
    );

    assert!(!errors.had_errors(), "{}", errors.report());
    let StatementKind::Assignment(assigns) = &typed.block.body.kind else {
        panic!("assignment expected");
    };
    assert_eq!(*assigns[0].rvalue.ty(), record_type());
    let ExpKind::RecordConstructor { fields, .. } = &assigns[0].rvalue.kind else {
        panic!("constructor expected");
    };
    assert!(matches!(fields[0].kind, ExpKind::Constant(1)));
    assert!(matches!(fields[1].kind, ExpKind::NarrowSubrange(_)));
}

#[test]
fn test_record_assignment_stores_whole_record() {
    let (mut symtab, main) = table_with_record();
    let mut errors = ErrorSink::new();

    let constructor = record_constructor("R", vec![constant(1, 4), constant(3, 4)], 4);
    let procedures = compile(
        program(main, block(assign(ident("r", 4), constructor, 4))),
        &mut symtab,
        &mut errors,
    )
    .expect("clean program");

    let code = procedures.get(main).expect("main is compiled");
    assert_eq!(
        code.instructions(),
        [
            AllocStack(2),
            One,
            LoadConstant(3),
            BoundsCheck { lo: 1, hi: 10 },
            MemRef { frames: 0, offset: 0 },
            Store(2),
            Return,
        ]
    );
}

#[test]
fn test_out_of_range_constructor_compiles_and_traps_at_runtime() {
    let (mut symtab, main) = table_with_record();
    let mut errors = ErrorSink::new();

    let constructor = record_constructor("R", vec![constant(1, 4), constant(100, 4)], 4);
    let procedures = compile(
        program(main, block(assign(ident("r", 4), constructor, 4))),
        &mut symtab,
        &mut errors,
    )
    .expect("the bounds violation is a runtime matter");

    let code = procedures.get(main).expect("main is compiled");
    let instructions = code.instructions();
    let position = instructions
        .iter()
        .position(|instruction| *instruction == LoadConstant(100))
        .expect("the literal is loaded");
    assert_eq!(instructions[position + 1], BoundsCheck { lo: 1, hi: 10 });
}

#[test]
fn test_record_constructor_arity_is_checked() {
    let (mut symtab, main) = table_with_record();
    let mut errors = ErrorSink::new();

    let constructor = record_constructor("R", vec![constant(1, 4)], 4);
    check_program(
        program(main, block(assign(ident("r", 4), constructor, 4))),
        &mut symtab,
        &mut errors,
    );

    assert!(errors
        .report()
        .contains("record constructor has 1 expressions but 2 fields"));
}

#[test]
fn test_field_access_addresses_by_offset() {
    let (mut symtab, main) = table_with_record();
    let mut errors = ErrorSink::new();

    let body = list(
        vec![
            assign(field(ident("r", 4), "b", 4), constant(5, 4), 4),
            write(field(ident("r", 5), "a", 5), 5),
        ],
        4,
    );
    let procedures = compile(program(main, block(body)), &mut symtab, &mut errors)
        .expect("clean program");

    let code = procedures.get(main).expect("main is compiled");
    assert_eq!(
        code.instructions(),
        [
            AllocStack(2),
            // r.b := 5 narrows into the field's subrange
            LoadConstant(5),
            BoundsCheck { lo: 1, hi: 10 },
            MemRef { frames: 0, offset: 0 },
            One,
            Add,
            Store(1),
            // write r.a loads through the field address
            MemRef { frames: 0, offset: 0 },
            Zero,
            Add,
            Load(1),
            Write,
            Return,
        ]
    );
}

#[test]
fn test_missing_field_and_non_record_access() {
    let (mut symtab, main) = table_with_record();
    let mut errors = ErrorSink::new();
    enter(&mut symtab, main);
    symtab
        .define_variable("y", loc(4), Type::Int)
        .expect("fresh scope");
    symtab.leave_scope();

    let body = list(
        vec![
            write(field(ident("r", 5), "c", 5), 5),
            write(field(ident("y", 6), "a", 6), 6),
        ],
        5,
    );
    check_program(program(main, block(body)), &mut symtab, &mut errors);

    let report = errors.report();
    assert!(report.contains("has no field c"));
    assert!(report.contains("record type required"));
}

fn table_with_list() -> (SymbolTable, usize) {
    let mut symtab = SymbolTable::new();
    let main = main_program(&mut symtab);
    enter(&mut symtab, main);
    symtab
        .define(
            "list",
            loc(2),
            SymEntry::TypeAlias {
                ty: Type::Record(vec![
                    ("head".into(), Type::Int),
                    ("tail".into(), Type::pointer(Type::Named("list".into()))),
                ]),
            },
        )
        .expect("fresh scope");
    symtab
        .define(
            "pl",
            loc(3),
            SymEntry::TypeAlias {
                ty: Type::pointer(Type::Named("list".into())),
            },
        )
        .expect("fresh scope");
    symtab
        .define_variable("p", loc(4), Type::Named("pl".into()))
        .expect("fresh scope");
    symtab
        .define_variable("q", loc(5), Type::Named("pl".into()))
        .expect("fresh scope");
    symtab.leave_scope();
    (symtab, main)
}

#[test]
fn test_new_allocates_the_pointee() {
    let (mut symtab, main) = table_with_list();
    let mut errors = ErrorSink::new();

    let procedures = compile(
        program(main, block(assign(ident("p", 6), new_exp("pl", 6), 6))),
        &mut symtab,
        &mut errors,
    )
    .expect("clean program");

    let code = procedures.get(main).expect("main is compiled");
    assert_eq!(
        code.instructions(),
        [
            AllocStack(2),
            // a list record is two words
            LoadConstant(2),
            AllocHeap,
            MemRef { frames: 0, offset: 0 },
            Store(1),
            Return,
        ]
    );
}

#[test]
fn test_pointer_dereference_yields_lvalue() {
    let (mut symtab, main) = table_with_list();
    let mut errors = ErrorSink::new();

    let body = list(
        vec![
            assign(field(deref_pointer(ident("p", 6), 6), "head", 6), constant(7, 6), 6),
            assign(ident("q", 7), field(deref_pointer(ident("p", 7), 7), "tail", 7), 7),
        ],
        6,
    );
    let procedures = compile(program(main, block(body)), &mut symtab, &mut errors)
        .expect("clean program");

    let code = procedures.get(main).expect("main is compiled");
    assert_eq!(
        code.instructions(),
        [
            AllocStack(2),
            // p^.head := 7: the pointer value is the record address
            LoadConstant(7),
            MemRef { frames: 0, offset: 0 },
            Load(1),
            Zero,
            Add,
            Store(1),
            // q := p^.tail: load the pointer out of the field
            MemRef { frames: 0, offset: 0 },
            Load(1),
            One,
            Add,
            Load(1),
            MemRef { frames: 0, offset: 1 },
            Store(1),
            Return,
        ]
    );
}

#[test]
fn test_pointer_misuse_is_reported() {
    let (mut symtab, main) = table_with_list();
    let mut errors = ErrorSink::new();
    enter(&mut symtab, main);
    symtab
        .define_variable("y", loc(6), Type::Int)
        .expect("fresh scope");
    symtab.leave_scope();

    let body = list(
        vec![
            write(deref_pointer(ident("y", 7), 7), 7),
            assign(ident("y", 8), new_exp("int", 8), 8),
        ],
        7,
    );
    check_program(program(main, block(body)), &mut symtab, &mut errors);

    let report = errors.report();
    assert!(report.contains("pointer type required"));
    assert!(report.contains("pointer type required for new: int"));
}
