//! Growable instruction buffer with offset-aware emission primitives.
//!
//! A `Code` is position independent: jumps are relative to their own end, so
//! buffers are built separately, sized, and composed with `append`.

use std::fmt::Display;

use serde::Serialize;

use crate::symtab::EntryId;
use crate::types::Type;

use super::instruction::Instruction;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Code {
    instructions: Vec<Instruction>,
    size: i64,
}

impl Code {
    pub fn new() -> Code {
        Code::default()
    }

    /// Size of the emitted stream in words.
    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.size += instruction.size();
        self.instructions.push(instruction);
    }

    pub fn append(&mut self, mut other: Code) {
        self.size += other.size;
        self.instructions.append(&mut other.instructions);
    }

    /// Constants 0 and 1 have dedicated short opcodes.
    pub fn emit_load_constant(&mut self, value: i64) {
        match value {
            0 => self.emit(Instruction::Zero),
            1 => self.emit(Instruction::One),
            _ => self.emit(Instruction::LoadConstant(value)),
        }
    }

    /// Load sized from the loaded type.
    pub fn emit_load(&mut self, ty: &Type) {
        self.emit(Instruction::Load(ty.size()));
    }

    pub fn emit_store(&mut self, ty: &Type) {
        self.emit(Instruction::Store(ty.size()));
    }

    /// Offsets count words from the end of the jump instruction: a forward
    /// jump encodes the size of the code to skip, a backward jump a negative
    /// value including the jump itself.
    pub fn emit_jump_always(&mut self, offset: i64) {
        self.emit(Instruction::JumpAlways(offset));
    }

    pub fn emit_jump_if_false(&mut self, offset: i64) {
        self.emit(Instruction::JumpIfFalse(offset));
    }

    pub fn emit_bounds_check(&mut self, lo: i64, hi: i64) {
        self.emit(Instruction::BoundsCheck { lo, hi });
    }

    pub fn emit_mem_ref(&mut self, frames: i32, offset: i64) {
        self.emit(Instruction::MemRef { frames, offset });
    }

    pub fn emit_call(&mut self, frames: i32, procedure: EntryId) {
        self.emit(Instruction::Call { frames, procedure });
    }
}

impl Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut address = 0;
        for instruction in &self.instructions {
            writeln!(f, "{address:4}: \t{instruction}")?;
            address += instruction.size();
        }
        Ok(())
    }
}
