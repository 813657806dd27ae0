//! Instruction set of the target stack machine.

use std::fmt::Display;

use serde::Serialize;

use crate::symtab::EntryId;

/// In-stream size of an unconditional jump. All relative-offset arithmetic
/// is measured in these self-consistent word units.
pub const SIZE_JUMP_ALWAYS: i64 = 2;

/// Reserved stop code pushed when a case scrutinee matches no label and no
/// default branch is declared. Agreed with the VM.
pub const CASE_LABEL_MISSING: i64 = 5;

/// One machine instruction: an opcode word plus its inline operand words.
/// Jump offsets are signed and relative to the end of the jump instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Instruction {
    AllocStack(i64),
    /// Pops a size, pushes the address of a fresh heap block.
    AllocHeap,
    Return,
    LoadConstant(i64),
    Zero,
    One,
    Add,
    Negate,
    Mpy,
    Div,
    Equal,
    Less,
    LessEq,
    And,
    Swap,
    Dup,
    /// Unconditional computed branch; pops its offset from the stack.
    Br,
    JumpAlways(i64),
    /// Pops the condition; jumps when it is false.
    JumpIfFalse(i64),
    Read,
    Write,
    /// Stops the machine with the error code on top of the stack.
    Stop,
    Load(i64),
    Store(i64),
    BoundsCheck { lo: i64, hi: i64 },
    /// Frame-relative address: chase `frames` static links, add `offset`.
    MemRef { frames: i32, offset: i64 },
    /// The target address is bound by the loader from the procedure entry.
    Call { frames: i32, procedure: EntryId },
}

impl Instruction {
    /// Size in words: the opcode plus one word per inline operand.
    pub fn size(&self) -> i64 {
        match self {
            Instruction::AllocStack(_)
            | Instruction::LoadConstant(_)
            | Instruction::JumpAlways(_)
            | Instruction::JumpIfFalse(_)
            | Instruction::Load(_)
            | Instruction::Store(_) => 2,
            Instruction::BoundsCheck { .. }
            | Instruction::MemRef { .. }
            | Instruction::Call { .. } => 3,
            _ => 1,
        }
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Instruction::AllocStack(space) => format!("alloc_stack \t{space}"),
            Instruction::AllocHeap => "alloc_heap".to_string(),
            Instruction::Return => "return".to_string(),
            Instruction::LoadConstant(value) => format!("load_con \t{value}"),
            Instruction::Zero => "zero".to_string(),
            Instruction::One => "one".to_string(),
            Instruction::Add => "add".to_string(),
            Instruction::Negate => "negate".to_string(),
            Instruction::Mpy => "mpy".to_string(),
            Instruction::Div => "div".to_string(),
            Instruction::Equal => "equal".to_string(),
            Instruction::Less => "less".to_string(),
            Instruction::LessEq => "lesseq".to_string(),
            Instruction::And => "and".to_string(),
            Instruction::Swap => "swap".to_string(),
            Instruction::Dup => "dup".to_string(),
            Instruction::Br => "br".to_string(),
            Instruction::JumpAlways(offset) => format!("jump \t{offset}"),
            Instruction::JumpIfFalse(offset) => format!("jump_false \t{offset}"),
            Instruction::Read => "read".to_string(),
            Instruction::Write => "write".to_string(),
            Instruction::Stop => "stop".to_string(),
            Instruction::Load(size) => format!("load \t{size}"),
            Instruction::Store(size) => format!("store \t{size}"),
            Instruction::BoundsCheck { lo, hi } => format!("bounds \t{lo}, {hi}"),
            Instruction::MemRef { frames, offset } => format!("mem_ref \t{frames}, {offset}"),
            Instruction::Call { frames, procedure } => format!("call \t{frames}, p{procedure}"),
        };
        f.write_str(&value)
    }
}
