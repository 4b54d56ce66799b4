//! Register-level state of the virtual CPU.
//!
//! This module implements the pieces an instruction executor drives:
//! - `StatusWord`: flags and mode selectors packed into 32 bits
//! - `GeneralRegister`: a 64-bit cell with the integer ALU
//! - `Stack`: a descending stack over a caller-owned buffer
//! - `RegisterFile`: every CPU register, with reset values

pub mod status;
pub mod general;
pub mod stack;
pub mod file;

use thiserror::Error;

pub use status::{AddressMode, Flag, MathMode, OperandSize, Register, RegisterSet, StatusError, StatusWord};
pub use general::{AluError, AluOp, GeneralRegister};
pub use stack::{Stack, StackError, STACK_SIZE};
pub use file::{RegisterFile, DEFAULT_STACK_BASE, DEFAULT_STACK_POINTER};

/// Any error raised by the register core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("status error: {0}")]
    Status(#[from] StatusError),

    #[error("ALU error: {0}")]
    Alu(#[from] AluError),

    #[error("stack error: {0}")]
    Stack(#[from] StackError),
}

impl RegisterError {
    /// Whether the emulated program can be trapped and resumed.
    ///
    /// An illegal selector value means the executor itself decoded garbage.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RegisterError::Status(_))
    }
}
