//! The register file.
//!
//! Registers, grouped by purpose:
//! - R0-R3: 64-bit general registers (the ALU operands)
//! - PTR0/1, OFS0/1, IX0/1, IS0/1: pointer, offset, index and index step
//!   registers, two banks selected by the status word's pointer set bit
//! - CTR0/1, CS0/1: counter and counter step registers, two banks selected
//!   by the counter set bit
//! - PC: program counter
//! - ST: status word
//! - SB, SP: stack base and stack pointer

use serde::{Serialize, Deserialize};

use crate::register::general::{AluError, AluOp, GeneralRegister};
use crate::register::stack::{Stack, StackError};
use crate::register::status::{Register, RegisterSet, StatusWord};

/// Stack base after reset.
pub const DEFAULT_STACK_BASE: u32 = 0xFFFE_0000;

/// Stack pointer after reset.
pub const DEFAULT_STACK_POINTER: u16 = 0xFFFF;

/// The CPU register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    /// R0-R3
    pub general: [GeneralRegister; 4],

    /// PTR0, PTR1
    pub pointers: [u32; 2],
    /// OFS0, OFS1
    pub offsets: [u16; 2],
    /// IX0, IX1
    pub indexes: [u16; 2],
    /// IS0, IS1
    pub index_steps: [u16; 2],

    /// CTR0, CTR1
    pub counters: [u32; 2],
    /// CS0, CS1
    pub counter_steps: [u16; 2],

    /// PC
    pub pc: u32,

    status: StatusWord,

    /// SB
    pub stack_base: u32,
    /// SP
    pub stack_pointer: u16,
}

#[inline]
fn bank(set: RegisterSet) -> usize {
    usize::from(set.bits())
}

impl RegisterFile {
    /// A register file in its reset state.
    pub fn new() -> Self {
        Self {
            general: [GeneralRegister::default(); 4],
            pointers: [0; 2],
            offsets: [0; 2],
            indexes: [0; 2],
            index_steps: [0; 2],
            counters: [0; 2],
            counter_steps: [0; 2],
            pc: 0,
            status: StatusWord::new(),
            stack_base: DEFAULT_STACK_BASE,
            stack_pointer: DEFAULT_STACK_POINTER,
        }
    }

    /// Zero every register except SB and SP, which take their defaults.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Snapshot of the status word.
    #[inline]
    pub fn status(&self) -> StatusWord {
        self.status
    }

    /// The status word, for use with its field mutators.
    #[inline]
    pub fn status_mut(&mut self) -> &mut StatusWord {
        &mut self.status
    }

    pub fn general(&self, reg: Register) -> GeneralRegister {
        self.general[usize::from(reg.bits())]
    }

    pub fn general_mut(&mut self, reg: Register) -> &mut GeneralRegister {
        &mut self.general[usize::from(reg.bits())]
    }

    /// The general register named by the status word's register select.
    pub fn selected_general(&self) -> GeneralRegister {
        self.general(self.status.register())
    }

    pub fn selected_general_mut(&mut self) -> &mut GeneralRegister {
        let reg = self.status.register();
        self.general_mut(reg)
    }

    /// The active pointer register.
    pub fn pointer(&self) -> u32 {
        self.pointers[bank(self.status.pointer_register_set())]
    }

    pub fn pointer_mut(&mut self) -> &mut u32 {
        &mut self.pointers[bank(self.status.pointer_register_set())]
    }

    /// The active offset register (follows the pointer set).
    pub fn offset(&self) -> u16 {
        self.offsets[bank(self.status.pointer_register_set())]
    }

    /// The active index register (follows the pointer set).
    pub fn index(&self) -> u16 {
        self.indexes[bank(self.status.pointer_register_set())]
    }

    /// The active index step register (follows the pointer set).
    pub fn index_step(&self) -> u16 {
        self.index_steps[bank(self.status.pointer_register_set())]
    }

    /// The active counter register.
    pub fn counter(&self) -> u32 {
        self.counters[bank(self.status.counter_register_set())]
    }

    pub fn counter_mut(&mut self) -> &mut u32 {
        &mut self.counters[bank(self.status.counter_register_set())]
    }

    /// The active counter step register.
    pub fn counter_step(&self) -> u16 {
        self.counter_steps[bank(self.status.counter_register_set())]
    }

    /// Advance the program counter by `n`, wrapping at 32 bits.
    /// Returns the old value.
    pub fn advance_pc(&mut self, n: u32) -> u32 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(n);
        old
    }

    /// Run `op` with `dst` as the target and `src` as the operand, against
    /// this file's status word.
    ///
    /// Registers are only written if the operation succeeds. When `dst` and
    /// `src` are the same register, the value written to `dst` wins.
    pub fn execute(&mut self, op: AluOp, dst: Register, src: Register) -> Result<(), AluError> {
        let mut target = self.general(dst);
        let mut operand = self.general(src);
        log::trace!("{:?} {:?}={} {:?}={}", op, dst, target, src, operand);

        target.apply(op, &mut operand, &mut self.status)?;

        if op.writes_operand() {
            *self.general_mut(src) = operand;
        }
        *self.general_mut(dst) = target;
        Ok(())
    }

    /// A stack over `memory` starting at this file's stack pointer.
    pub fn stack<'m>(&self, memory: &'m mut [u8]) -> Result<Stack<'m>, StackError> {
        Stack::new(memory, self.stack_pointer)
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::stack::STACK_SIZE;
    use crate::register::status::OperandSize;

    #[test]
    fn test_reset_values() {
        let regs = RegisterFile::new();
        assert_eq!(regs.stack_base, 0xFFFE_0000);
        assert_eq!(regs.stack_pointer, 0xFFFF);
        assert_eq!(regs.pc, 0);
        assert_eq!(regs.status().bits(), 0);
        assert!(regs.general.iter().all(|r| r.uint64() == 0));
        assert_eq!(regs.pointers, [0; 2]);
        assert_eq!(regs.counters, [0; 2]);
        assert_eq!(regs.counter_steps, [0; 2]);
        assert_eq!(regs.offsets, [0; 2]);
        assert_eq!(regs.indexes, [0; 2]);
        assert_eq!(regs.index_steps, [0; 2]);
    }

    #[test]
    fn test_reset_clears_mutations() {
        let mut regs = RegisterFile::new();
        regs.general[2].set_uint64(42);
        regs.pc = 0x1000;
        regs.stack_pointer = 0x10;
        regs.status_mut().set_carry();
        regs.status_mut().set_user(0x55);

        regs.reset();
        assert_eq!(regs, RegisterFile::default());
    }

    #[test]
    fn test_status_snapshot_is_a_copy() {
        let mut regs = RegisterFile::new();
        let mut snapshot = regs.status();
        snapshot.set_negative();
        assert!(!regs.status().negative());

        regs.status_mut().select_operand_size(3).unwrap();
        assert_eq!(regs.status().operand_size(), OperandSize::Operand64);
        assert!(regs.status_mut().select_operand_size(4).is_err());
        assert_eq!(regs.status().operand_size(), OperandSize::Operand64);
    }

    #[test]
    fn test_bank_selection() {
        let mut regs = RegisterFile::new();
        regs.pointers = [0x100, 0x200];
        regs.offsets = [1, 2];
        regs.indexes = [3, 4];
        regs.index_steps = [5, 6];
        regs.counters = [10, 20];
        regs.counter_steps = [7, 8];

        assert_eq!(regs.pointer(), 0x100);
        assert_eq!((regs.offset(), regs.index(), regs.index_step()), (1, 3, 5));
        assert_eq!((regs.counter(), regs.counter_step()), (10, 7));

        regs.status_mut().select_pointer_register_set(RegisterSet::Set1);
        assert_eq!(regs.pointer(), 0x200);
        assert_eq!((regs.offset(), regs.index(), regs.index_step()), (2, 4, 6));
        assert_eq!(regs.counter(), 10);

        regs.status_mut().select_counter_register_set(RegisterSet::Set1);
        *regs.counter_mut() -= 1;
        assert_eq!((regs.counter(), regs.counter_step()), (19, 8));
        *regs.pointer_mut() += 4;
        assert_eq!(regs.pointers, [0x100, 0x204]);
    }

    #[test]
    fn test_selected_general() {
        let mut regs = RegisterFile::new();
        regs.status_mut().set_register(Register::R2);
        regs.selected_general_mut().set_uint8(0x80);
        assert_eq!(regs.general(Register::R2).int64(), -128);
        assert_eq!(regs.selected_general().uint8(), 0x80);
        assert_eq!(regs.general(Register::R0).uint64(), 0);
    }

    #[test]
    fn test_advance_pc() {
        let mut regs = RegisterFile::new();
        regs.pc = 10;
        assert_eq!(regs.advance_pc(4), 10);
        assert_eq!(regs.pc, 14);

        regs.pc = u32::MAX;
        regs.advance_pc(2);
        assert_eq!(regs.pc, 1);
    }

    #[test]
    fn test_execute_add() {
        let mut regs = RegisterFile::new();
        regs.general_mut(Register::R0).set_uint8(0x7F);
        regs.general_mut(Register::R1).set_uint8(0x01);

        regs.execute(AluOp::Add, Register::R0, Register::R1).unwrap();
        assert_eq!(regs.general(Register::R0).uint64(), 0xFFFF_FFFF_FFFF_FF80);
        assert_eq!(regs.general(Register::R1).uint64(), 1);
        let st = regs.status();
        assert!(!st.carry());
        assert!(st.overflow());
        assert!(st.negative());
    }

    #[test]
    fn test_execute_wide_multiply() {
        let mut regs = RegisterFile::new();
        regs.status_mut().set_operand_size(OperandSize::Operand64);
        regs.general_mut(Register::R0).set_uint64(0x0000_000B_8000_0000);
        regs.general_mut(Register::R3).set_uint64(0x0000_0002_0000_0000);

        regs.execute(AluOp::MultiplySigned, Register::R0, Register::R3).unwrap();
        assert_eq!(regs.general(Register::R0).uint64(), 0);
        assert_eq!(regs.general(Register::R3).uint64(), 0x17);
    }

    #[test]
    fn test_execute_same_register() {
        let mut regs = RegisterFile::new();
        regs.general_mut(Register::R1).set_uint8(6);
        regs.execute(AluOp::DivideSigned, Register::R1, Register::R1).unwrap();
        assert_eq!(regs.general(Register::R1).uint64(), 1);

        regs.general_mut(Register::R1).set_uint8(3);
        regs.execute(AluOp::Add, Register::R1, Register::R1).unwrap();
        assert_eq!(regs.general(Register::R1).uint64(), 6);
    }

    #[test]
    fn test_execute_division_by_zero_leaves_registers() {
        let mut regs = RegisterFile::new();
        regs.general_mut(Register::R0).set_uint8(7);
        let before = regs.clone();

        assert_eq!(
            regs.execute(AluOp::DivideSigned, Register::R0, Register::R1),
            Err(AluError::DivisionByZero)
        );
        assert_eq!(regs, before);
    }

    #[test]
    fn test_stack_at_stack_pointer() {
        let regs = RegisterFile::new();
        let mut memory = vec![0u8; STACK_SIZE];
        let mut stack = regs.stack(&mut memory).unwrap();
        assert_eq!(stack.pointer(), 0xFFFF);
        stack.push16(0xCAFE).unwrap();
        assert_eq!(stack.pointer(), 0xFFFD);
    }

    #[test]
    fn test_serde_snapshot() {
        let mut regs = RegisterFile::new();
        regs.status_mut().set_zero();
        regs.general[0].set_int64(-1);

        let json = serde_json::to_string(&regs).unwrap();
        let back: RegisterFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, regs);
        assert!(back.status().zero());
    }
}
