//! Code generator for PL0.
//!
//! Walks the checked tree and emits stack-machine code per procedure. The
//! machine addresses variables by static level and frame offset; procedure
//! calls chase `current level - declared level` static links. Jump offsets
//! are relative to the end of the jump instruction, so statements are
//! assembled from separately built buffers whose sizes decide the offsets.
//!
//! The generator refuses error nodes: checking must have reported them, and
//! the driver must not generate code once diagnostics exist. Meeting one
//! here is a broken invariant and aborts fatally.

mod code;
mod instruction;
mod procedures;

pub use self::code::Code;
pub use self::instruction::{Instruction, CASE_LABEL_MISSING, SIZE_JUMP_ALWAYS};
pub use self::procedures::Procedures;

use std::collections::HashMap;

use crate::ast::{
    BlockNode, CaseBranch, ExpKind, ExpNode, Location, Operator, ProgramNode, SingleAssign,
    StatementKind, StatementNode,
};
use crate::checker::TypeInfo;
use crate::errors::{ErrorSink, FatalError};
use crate::symtab::{EntryId, ScopeId, SymEntry, SymbolTable};
use crate::types::{self, Type};

/// Generate code for a checked program. Must only run when checking
/// reported no diagnostics.
pub fn generate(
    program: &ProgramNode<TypeInfo>,
    symtab: &SymbolTable,
    errors: &mut ErrorSink,
) -> Result<Procedures, FatalError> {
    let mut generator = CodeGenerator {
        symtab,
        errors,
        procedures: Procedures::new(),
        level: 1,
        scope: 0,
    };
    generator.gen_procedure(program.entry, &program.block)?;
    Ok(generator.procedures)
}

struct CodeGenerator<'g> {
    symtab: &'g SymbolTable,
    errors: &'g mut ErrorSink,
    procedures: Procedures,
    /// Static level of the procedure being generated.
    level: i32,
    /// Its local scope, for resolving symbolic pointer targets.
    scope: ScopeId,
}

impl CodeGenerator<'_> {
    fn gen_procedure(
        &mut self,
        entry: EntryId,
        block: &BlockNode<TypeInfo>,
    ) -> Result<(), FatalError> {
        let (local_scope, level) = match &self.symtab.entry(entry).kind {
            SymEntry::Procedure { local_scope, level } => (*local_scope, *level),
            _ => {
                return Err(self
                    .errors
                    .fatal("code generation on a non-procedure entry", block.location))
            }
        };
        self.errors
            .debug_message(format!("generating procedure {}", self.symtab.entry(entry).name));
        self.errors.inc_debug();
        let outer = (self.level, self.scope);
        self.level = level;
        self.scope = local_scope;

        // reserve the slot so the table stays in pre-order
        self.procedures.insert(entry, Code::new());
        let mut code = Code::new();
        code.emit(Instruction::AllocStack(self.symtab.variable_space(local_scope)));
        code.append(self.gen_statement(&block.body)?);
        code.emit(Instruction::Return);
        self.procedures.insert(entry, code);

        for procedure in &block.procedures {
            self.gen_procedure(procedure.entry, &procedure.block)?;
        }

        (self.level, self.scope) = outer;
        self.errors.dec_debug();
        Ok(())
    }

    fn gen_statement(&mut self, statement: &StatementNode<TypeInfo>) -> Result<Code, FatalError> {
        match &statement.kind {
            StatementKind::Error => Err(self.errors.fatal(
                "cannot generate code for an erroneous statement",
                statement.location,
            )),
            StatementKind::Assignment(assigns) => self.gen_assignment(assigns, statement.location),
            StatementKind::Write(exp) => {
                let mut code = self.gen_expression(exp)?;
                code.emit(Instruction::Write);
                Ok(code)
            }
            StatementKind::Call { name, entry } => {
                let Some(entry) = entry else {
                    return Err(self.errors.fatal(
                        format!("call of {name} was never resolved"),
                        statement.location,
                    ));
                };
                let level = match &self.symtab.entry(*entry).kind {
                    SymEntry::Procedure { level, .. } => *level,
                    _ => {
                        return Err(self.errors.fatal(
                            format!("call of {name} does not name a procedure"),
                            statement.location,
                        ))
                    }
                };
                let mut code = Code::new();
                code.emit_call(self.level - level, *entry);
                Ok(code)
            }
            StatementKind::List(statements) => {
                let mut code = Code::new();
                for statement in statements {
                    code.append(self.gen_statement(statement)?);
                }
                Ok(code)
            }
            StatementKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.gen_expression(condition)?;
                let then_code = self.gen_statement(then_branch)?;
                let else_code = match else_branch {
                    Some(statement) => self.gen_statement(statement)?,
                    None => Code::new(),
                };
                let mut code = condition;
                code.emit_jump_if_false(then_code.size() + SIZE_JUMP_ALWAYS);
                code.append(then_code);
                code.emit_jump_always(else_code.size());
                code.append(else_code);
                Ok(code)
            }
            StatementKind::While { condition, body } => {
                let condition = self.gen_expression(condition)?;
                let body = self.gen_statement(body)?;
                let condition_size = condition.size();
                let body_size = body.size();
                let mut code = condition;
                code.emit_jump_if_false(body_size + SIZE_JUMP_ALWAYS);
                code.append(body);
                code.emit_jump_always(-(condition_size + body_size + 2 * SIZE_JUMP_ALWAYS));
                Ok(code)
            }
            StatementKind::Case {
                scrutinee,
                branches,
                default,
            } => self.gen_case(scrutinee, branches, default.as_deref()),
        }
    }

    /// Every right side is evaluated in listed order; stores run in reverse
    /// listed order, so the first listed target receives the first evaluated
    /// value and all evaluation happens before any store.
    fn gen_assignment(
        &mut self,
        assigns: &[SingleAssign<TypeInfo>],
        location: Location,
    ) -> Result<Code, FatalError> {
        let mut code = Code::new();
        for assign in assigns {
            code.append(self.gen_expression(&assign.rvalue)?);
        }
        for assign in assigns.iter().rev() {
            let base = match assign.lvalue.ty() {
                Type::Reference(base) => base.as_ref().clone(),
                _ => {
                    return Err(self
                        .errors
                        .fatal("assignment target is not an L-value", location))
                }
            };
            code.append(self.gen_expression(&assign.lvalue)?);
            code.emit_store(&base);
        }
        Ok(code)
    }

    /// Case lowering: three separately sized regions. The entry checks the
    /// scrutinee against `min..=max` and computes a branch into the table;
    /// the table holds one unconditional jump per value in the range; the
    /// branches region holds each body (followed by a jump past the whole
    /// case) and finally the default or trap branch.
    fn gen_case(
        &mut self,
        scrutinee: &ExpNode<TypeInfo>,
        branches: &[CaseBranch<TypeInfo>],
        default: Option<&StatementNode<TypeInfo>>,
    ) -> Result<Code, FatalError> {
        let mut code = self.gen_expression(scrutinee)?;

        let trap_or_default = match default {
            Some(statement) => self.gen_statement(statement)?,
            None => {
                let mut trap = Code::new();
                trap.emit_load_constant(CASE_LABEL_MISSING);
                trap.emit(Instruction::Stop);
                trap
            }
        };

        if branches.is_empty() {
            // range < 0: no table; everything falls to the default / trap
            code.append(trap_or_default);
            return Ok(code);
        }

        let mut sorted: Vec<&CaseBranch<TypeInfo>> = branches.iter().collect();
        sorted.sort_by_key(|branch| branch.label);
        let min = sorted[0].label;
        let max = sorted[sorted.len() - 1].label;
        let range = max - min;

        let mut bodies = Vec::with_capacity(sorted.len());
        for branch in &sorted {
            bodies.push(self.gen_statement(&branch.body)?);
        }
        let bodies_total: i64 = bodies.iter().map(|body| body.size() + SIZE_JUMP_ALWAYS).sum();
        // the default / trap branch sits at the end of the branches region
        let default_offset = bodies_total;
        let branches_total = bodies_total + trap_or_default.size();

        let mut branch_offsets = HashMap::new();
        let mut branches_region = Code::new();
        for (branch, body) in sorted.iter().zip(bodies) {
            branch_offsets.insert(branch.label, branches_region.size());
            branches_region.append(body);
            // land just past the whole case block
            let past_case = branches_total - branches_region.size() - SIZE_JUMP_ALWAYS;
            branches_region.emit_jump_always(past_case);
        }
        branches_region.append(trap_or_default);

        let table_size = (range + 1) * SIZE_JUMP_ALWAYS;
        let mut table = Code::new();
        for slot in 0..=range {
            let target = branch_offsets
                .get(&(min + slot))
                .copied()
                .unwrap_or(default_offset);
            let remaining_slots = (range - slot) * SIZE_JUMP_ALWAYS;
            table.emit_jump_always(remaining_slots + target);
        }

        let mut dispatch = Code::new();
        dispatch.emit_load_constant(min);
        dispatch.emit(Instruction::Negate);
        dispatch.emit(Instruction::Add);
        dispatch.emit_load_constant(SIZE_JUMP_ALWAYS);
        dispatch.emit(Instruction::Mpy);
        dispatch.emit(Instruction::Br);

        // scrutinee <= max && min <= scrutinee, with copies for the dispatch
        code.emit(Instruction::Dup);
        code.emit(Instruction::Dup);
        code.emit_load_constant(max);
        code.emit(Instruction::LessEq);
        code.emit(Instruction::Swap);
        code.emit_load_constant(min);
        code.emit(Instruction::Swap);
        code.emit(Instruction::LessEq);
        code.emit(Instruction::And);
        code.emit_jump_if_false(dispatch.size() + table_size + default_offset);
        code.append(dispatch);
        code.append(table);
        code.append(branches_region);
        Ok(code)
    }

    fn gen_expression(&mut self, exp: &ExpNode<TypeInfo>) -> Result<Code, FatalError> {
        match &exp.kind {
            ExpKind::Error => Err(self.errors.fatal(
                "cannot generate code for an erroneous expression",
                exp.location,
            )),
            ExpKind::Identifier(name) => Err(self.errors.fatal(
                format!("unresolved identifier {name} survived checking"),
                exp.location,
            )),
            ExpKind::Constant(value) => {
                let mut code = Code::new();
                code.emit_load_constant(*value);
                Ok(code)
            }
            ExpKind::Variable(entry) => {
                let (level, offset) = match &self.symtab.entry(*entry).kind {
                    SymEntry::Variable { level, offset, .. } => (*level, *offset),
                    _ => {
                        return Err(self
                            .errors
                            .fatal("variable node without a variable entry", exp.location))
                    }
                };
                let mut code = Code::new();
                code.emit_mem_ref(self.level - level, offset);
                Ok(code)
            }
            ExpKind::Read => {
                let mut code = Code::new();
                code.emit(Instruction::Read);
                Ok(code)
            }
            ExpKind::Operator { op, arg } => self.gen_operator(*op, arg, exp.location),
            ExpKind::Arguments(args) => {
                let mut code = Code::new();
                for arg in args {
                    code.append(self.gen_expression(arg)?);
                }
                Ok(code)
            }
            ExpKind::Dereference(inner) => {
                let mut code = self.gen_expression(inner)?;
                code.emit_load(exp.ty());
                Ok(code)
            }
            ExpKind::NarrowSubrange(inner) => {
                let (lo, hi) = match exp.ty() {
                    Type::Subrange { lo, hi, .. } => (*lo, *hi),
                    _ => {
                        return Err(self
                            .errors
                            .fatal("narrowing to a non-subrange type", exp.location))
                    }
                };
                let mut code = self.gen_expression(inner)?;
                code.emit_bounds_check(lo, hi);
                Ok(code)
            }
            // the value already sits on the stack
            ExpKind::WidenSubrange(inner) => self.gen_expression(inner),
            ExpKind::FieldAccess { record, field } => {
                let Some(fields) = self.symtab.record_fields(self.scope, record.ty()) else {
                    return Err(self.errors.fatal(
                        format!("field access on non-record {}", record.ty()),
                        exp.location,
                    ));
                };
                let Some((offset, _)) = types::field_offset(&fields, field) else {
                    return Err(self
                        .errors
                        .fatal(format!("unknown record field {field}"), exp.location));
                };
                let mut code = self.gen_expression(record)?;
                code.emit_load_constant(offset);
                code.emit(Instruction::Add);
                Ok(code)
            }
            // the pointer value is the address of the target
            ExpKind::PointerDereference(pointer) => self.gen_expression(pointer),
            ExpKind::New(_) => {
                let target = match exp.ty() {
                    Type::Pointer(target) => self.symtab.resolve_from(self.scope, target),
                    _ => {
                        return Err(self
                            .errors
                            .fatal("new expression without a pointer type", exp.location))
                    }
                };
                let mut code = Code::new();
                code.emit_load_constant(target.size());
                code.emit(Instruction::AllocHeap);
                Ok(code)
            }
            ExpKind::RecordConstructor { fields, .. } => {
                let mut code = Code::new();
                for field in fields {
                    code.append(self.gen_expression(field)?);
                }
                Ok(code)
            }
        }
    }

    fn gen_operator(
        &mut self,
        op: Operator,
        arg: &ExpNode<TypeInfo>,
        location: Location,
    ) -> Result<Code, FatalError> {
        // prefix minus takes its operand directly
        if let Operator::Negate = op {
            let mut code = self.gen_expression(arg)?;
            code.emit(Instruction::Negate);
            return Ok(code);
        }
        let ExpKind::Arguments(args) = &arg.kind else {
            return Err(self.errors.fatal(
                format!("malformed argument list for operator {op}"),
                location,
            ));
        };
        let [left, right] = args.as_slice() else {
            return Err(self
                .errors
                .fatal(format!("operator {op} expects two arguments"), location));
        };
        let mut code = Code::new();
        match op {
            Operator::Add => {
                code.append(self.gen_expression(left)?);
                code.append(self.gen_expression(right)?);
                code.emit(Instruction::Add);
            }
            Operator::Subtract => {
                code.append(self.gen_expression(left)?);
                code.append(self.gen_expression(right)?);
                code.emit(Instruction::Negate);
                code.emit(Instruction::Add);
            }
            Operator::Multiply => {
                code.append(self.gen_expression(left)?);
                code.append(self.gen_expression(right)?);
                code.emit(Instruction::Mpy);
            }
            Operator::Divide => {
                code.append(self.gen_expression(left)?);
                code.append(self.gen_expression(right)?);
                code.emit(Instruction::Div);
            }
            Operator::Equals => {
                code.append(self.gen_expression(left)?);
                code.append(self.gen_expression(right)?);
                code.emit(Instruction::Equal);
            }
            Operator::NotEquals => {
                // equal, then boolean not as 1 - b
                code.append(self.gen_expression(left)?);
                code.append(self.gen_expression(right)?);
                code.emit(Instruction::Equal);
                code.emit(Instruction::One);
                code.emit(Instruction::Swap);
                code.emit(Instruction::Negate);
                code.emit(Instruction::Add);
            }
            Operator::Less => {
                code.append(self.gen_expression(left)?);
                code.append(self.gen_expression(right)?);
                code.emit(Instruction::Less);
            }
            Operator::LessEq => {
                code.append(self.gen_expression(left)?);
                code.append(self.gen_expression(right)?);
                code.emit(Instruction::LessEq);
            }
            // only < and <= exist on the machine; evaluate reversed
            Operator::Greater => {
                code.append(self.gen_expression(right)?);
                code.append(self.gen_expression(left)?);
                code.emit(Instruction::Less);
            }
            Operator::GreaterEq => {
                code.append(self.gen_expression(right)?);
                code.append(self.gen_expression(left)?);
                code.emit(Instruction::LessEq);
            }
            Operator::Negate => unreachable!("handled above"),
        }
        Ok(code)
    }
}
