//! # vcpu
//!
//! Register core of a 64-bit virtual CPU.
//!
//! The crate provides the status word, the general registers with their
//! integer ALU, the hardware stack and the register file. Instruction
//! decoding and execution live outside this crate: an executor owns a
//! `RegisterFile` and a stack buffer and drives the operations here.

pub mod register;

// Re-export commonly used types
pub use register::{
    AluError, AluOp, GeneralRegister, OperandSize, Register, RegisterError, RegisterFile,
    Stack, StackError, StatusError, StatusWord,
};
