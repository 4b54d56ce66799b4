//! General registers and the integer ALU.
//!
//! A general register is a single 64-bit cell that can be read and written
//! as a signed or unsigned 8, 16, 32 or 64-bit value. It has no width of its
//! own: every ALU operation takes the status word and works at its current
//! operand size, then reports carry, overflow, zero and negative back into
//! the same word.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::register::status::{Flag, OperandSize, StatusWord};

const SIGN_BIT_64: u64 = 0x8000_0000_0000_0000;

/// Errors raised by ALU operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AluError {
    #[error("division by zero")]
    DivisionByZero,
}

/// An ALU operation between a register and an operand register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AluOp {
    Add,
    Subtract,
    And,
    Or,
    Xor,
    Compare,
    ShiftLeft,
    ShiftRight,
    ShiftRightArithmetic,
    MultiplySigned,
    DivideSigned,
}

impl AluOp {
    pub const ALL: [AluOp; 11] = [
        AluOp::Add,
        AluOp::Subtract,
        AluOp::And,
        AluOp::Or,
        AluOp::Xor,
        AluOp::Compare,
        AluOp::ShiftLeft,
        AluOp::ShiftRight,
        AluOp::ShiftRightArithmetic,
        AluOp::MultiplySigned,
        AluOp::DivideSigned,
    ];

    /// Whether the operation may write the operand register.
    pub const fn writes_operand(self) -> bool {
        matches!(self, AluOp::MultiplySigned | AluOp::DivideSigned)
    }
}

/// Sign bit and low-bit mask for a width narrower than 64 bits.
#[inline]
const fn width_masks(size: OperandSize) -> Option<(u64, u64)> {
    match size {
        OperandSize::Operand8 => Some((0x80, 0xFF)),
        OperandSize::Operand16 => Some((0x8000, 0xFFFF)),
        OperandSize::Operand32 => Some((0x8000_0000, 0xFFFF_FFFF)),
        OperandSize::Operand64 => None,
    }
}

/// Copy `sign` upward through every bit above `mask`, or clear them.
#[inline]
const fn extend(value: u64, sign: u64, mask: u64) -> u64 {
    if value & sign != 0 {
        value | !mask
    } else {
        value & mask
    }
}

/// A 64-bit general register.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneralRegister(u64);

impl GeneralRegister {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    // ------------------------------------------------------------------
    // Narrowing reads (truncate, never consult the operand size)
    // ------------------------------------------------------------------

    #[inline]
    pub const fn uint8(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    pub const fn uint16(self) -> u16 {
        self.0 as u16
    }

    #[inline]
    pub const fn uint32(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub const fn uint64(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn int8(self) -> i8 {
        self.0 as i8
    }

    #[inline]
    pub const fn int16(self) -> i16 {
        self.0 as i16
    }

    #[inline]
    pub const fn int32(self) -> i32 {
        self.0 as i32
    }

    #[inline]
    pub const fn int64(self) -> i64 {
        self.0 as i64
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Store an 8-bit value, copying bit 7 into bits 8-63.
    pub fn set_uint8(&mut self, value: u8) {
        self.0 = extend(u64::from(value), 0x80, 0xFF);
    }

    /// Store a 16-bit value, copying bit 15 into bits 16-63.
    pub fn set_uint16(&mut self, value: u16) {
        self.0 = extend(u64::from(value), 0x8000, 0xFFFF);
    }

    /// Store a 32-bit value, copying bit 31 into bits 32-63.
    pub fn set_uint32(&mut self, value: u32) {
        self.0 = extend(u64::from(value), 0x8000_0000, 0xFFFF_FFFF);
    }

    /// Store the exact 64-bit pattern.
    pub fn set_uint64(&mut self, value: u64) {
        self.0 = value;
    }

    pub fn set_int8(&mut self, value: i8) {
        self.0 = i64::from(value) as u64;
    }

    pub fn set_int16(&mut self, value: i16) {
        self.0 = i64::from(value) as u64;
    }

    pub fn set_int32(&mut self, value: i32) {
        self.0 = i64::from(value) as u64;
    }

    pub fn set_int64(&mut self, value: i64) {
        self.0 = value as u64;
    }

    /// Bit 63 is set.
    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 & SIGN_BIT_64 != 0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Sign-extend from the operand size's sign bit to all 64 bits.
    pub fn sign_extend(&mut self, size: OperandSize) {
        if let Some((sign, mask)) = width_masks(size) {
            self.0 = extend(self.0, sign, mask);
        }
    }

    /// Clear every bit above the operand size.
    pub fn zero_higher_bits(&mut self, size: OperandSize) {
        if let Some((_, mask)) = width_masks(size) {
            self.0 &= mask;
        }
    }

    fn set_zero_negative(self, st: &mut StatusWord) {
        st.assign_flag(Flag::Zero, self.is_zero());
        st.assign_flag(Flag::Negative, self.is_negative());
    }

    // ------------------------------------------------------------------
    // ALU
    // ------------------------------------------------------------------

    /// Run `op` with `operand` as the second register.
    ///
    /// Only multiply and divide write `operand`.
    pub fn apply(
        &mut self,
        op: AluOp,
        operand: &mut GeneralRegister,
        st: &mut StatusWord,
    ) -> Result<(), AluError> {
        let value = *operand;
        match op {
            AluOp::Add => self.add(value, st),
            AluOp::Subtract => self.subtract(value, st),
            AluOp::And => self.and(value, st),
            AluOp::Or => self.or(value, st),
            AluOp::Xor => self.xor(value, st),
            AluOp::Compare => self.compare(value, st),
            AluOp::ShiftLeft => self.shift_left(value, st),
            AluOp::ShiftRight => self.shift_right(value, st),
            AluOp::ShiftRightArithmetic => self.shift_right_arithmetic(value, st),
            AluOp::MultiplySigned => self.multiply_signed(operand, st),
            AluOp::DivideSigned => return self.divide_signed(operand, st),
        }
        Ok(())
    }

    /// `self = self + op + C`.
    ///
    /// - result is sign extended to the operand size
    /// - C: the raw 64-bit sum wrapped below the original value
    /// - V: both inputs had the same sign and the result has the other
    /// - Z, N: from the result
    pub fn add(&mut self, op: GeneralRegister, st: &mut StatusWord) {
        let old = self.0;
        let old_neg = self.is_negative();
        let carry_in = u64::from(st.carry());

        let raw = old.wrapping_add(op.0).wrapping_add(carry_in);
        self.0 = raw;
        self.sign_extend(st.operand_size());
        let new_neg = self.is_negative();

        st.assign_flag(Flag::Carry, raw < old);
        st.assign_flag(Flag::Overflow, old_neg == op.is_negative() && old_neg != new_neg);
        self.set_zero_negative(st);
    }

    /// `self = self - op - C`, with C acting as a borrow.
    ///
    /// - result is sign extended to the operand size
    /// - C: a borrow occurred (the raw 64-bit difference wrapped above the original value)
    /// - V: the inputs had different signs and the result's sign differs from `self`'s
    /// - Z, N: from the result
    pub fn subtract(&mut self, op: GeneralRegister, st: &mut StatusWord) {
        let old = self.0;
        let old_neg = self.is_negative();
        let borrow_in = u64::from(st.carry());

        let raw = old.wrapping_sub(op.0).wrapping_sub(borrow_in);
        self.0 = raw;
        self.sign_extend(st.operand_size());
        let new_neg = self.is_negative();

        st.assign_flag(Flag::Carry, raw > old);
        st.assign_flag(Flag::Overflow, old_neg != op.is_negative() && old_neg != new_neg);
        self.set_zero_negative(st);
    }

    pub fn and(&mut self, op: GeneralRegister, st: &mut StatusWord) {
        self.0 &= op.0;
        self.sign_extend(st.operand_size());
        self.set_zero_negative(st);
    }

    pub fn or(&mut self, op: GeneralRegister, st: &mut StatusWord) {
        self.0 |= op.0;
        self.sign_extend(st.operand_size());
        self.set_zero_negative(st);
    }

    pub fn xor(&mut self, op: GeneralRegister, st: &mut StatusWord) {
        self.0 ^= op.0;
        self.sign_extend(st.operand_size());
        self.set_zero_negative(st);
    }

    /// Compare without modifying either register.
    ///
    /// - C: `self >= op` unsigned
    /// - V: `self >= op` signed
    /// - Z: `self == op`
    pub fn compare(&self, op: GeneralRegister, st: &mut StatusWord) {
        st.assign_flag(Flag::Carry, self.0 >= op.0);

        // Signed >= holds when self is non-negative and op negative, or when
        // both share a sign and the unsigned comparison holds.
        let self_neg = self.is_negative();
        let op_neg = op.is_negative();
        st.assign_flag(
            Flag::Overflow,
            (!self_neg && op_neg) || (self_neg == op_neg && self.0 >= op.0),
        );

        st.assign_flag(Flag::Zero, self.0 == op.0);
    }

    /// Logical shift left by `op` bits, then sign extend.
    pub fn shift_left(&mut self, op: GeneralRegister, st: &mut StatusWord) {
        self.0 = if op.0 >= 64 { 0 } else { self.0 << op.0 };
        self.sign_extend(st.operand_size());
        self.set_zero_negative(st);
    }

    /// Logical shift right by `op` bits within the operand size, then sign extend.
    pub fn shift_right(&mut self, op: GeneralRegister, st: &mut StatusWord) {
        let size = st.operand_size();
        self.zero_higher_bits(size);
        self.0 = if op.0 >= 64 { 0 } else { self.0 >> op.0 };
        self.sign_extend(size);
        self.set_zero_negative(st);
    }

    /// Arithmetic shift right by `op` bits.
    ///
    /// Works on the full 64-bit value: the sign is bit 63 regardless of the
    /// operand size, and the result is not re-extended.
    pub fn shift_right_arithmetic(&mut self, op: GeneralRegister, st: &mut StatusWord) {
        self.0 = match (self.is_negative(), op.0 >= 64) {
            (true, true) => u64::MAX,
            (true, false) => (self.int64() >> op.0) as u64,
            (false, true) => 0,
            (false, false) => self.0 >> op.0,
        };
        self.set_zero_negative(st);
    }

    /// Signed multiply.
    ///
    /// Up to 32-bit operands the product always fits in `self` and `op` is
    /// left alone. At 64 bits `self` receives the low and `op` the high half
    /// of the 128-bit product; when the product fits in 64 bits the high
    /// half is just its sign extension.
    pub fn multiply_signed(&mut self, op: &mut GeneralRegister, st: &mut StatusWord) {
        let (a, b) = (self.int64(), op.int64());

        if st.operand_size() != OperandSize::Operand64 {
            self.set_int64(a.wrapping_mul(b));
            self.set_zero_negative(st);
            return;
        }

        let product = i128::from(a) * i128::from(b);
        match i64::try_from(product) {
            Ok(narrow) => {
                self.set_int64(narrow);
                op.set_int64(if narrow < 0 { -1 } else { 0 });
                st.assign_flag(Flag::Zero, narrow == 0);
                st.assign_flag(Flag::Negative, narrow < 0);
            }
            Err(_) => {
                self.0 = product as u64;
                op.0 = (product >> 64) as u64;
                st.assign_flag(Flag::Zero, self.is_zero() && op.is_zero());
                st.assign_flag(Flag::Negative, op.is_negative());
            }
        }
    }

    /// Signed divide: `self = self / op`, `op = self % op`.
    ///
    /// - Z: quotient is zero
    /// - N: quotient is negative
    /// - V: remainder is negative
    ///
    /// Fails without touching either register or the flags if `op` is zero.
    pub fn divide_signed(
        &mut self,
        op: &mut GeneralRegister,
        st: &mut StatusWord,
    ) -> Result<(), AluError> {
        if op.is_zero() {
            log::debug!("divide {:#018X} by zero", self.0);
            return Err(AluError::DivisionByZero);
        }

        let (dividend, divisor) = (self.int64(), op.int64());
        self.set_int64(dividend.wrapping_div(divisor));
        op.set_int64(dividend.wrapping_rem(divisor));

        self.set_zero_negative(st);
        st.assign_flag(Flag::Overflow, op.is_negative());
        Ok(())
    }
}

impl From<u64> for GeneralRegister {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<GeneralRegister> for u64 {
    fn from(reg: GeneralRegister) -> Self {
        reg.0
    }
}

impl fmt::Debug for GeneralRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GeneralRegister({:#018X} = {})", self.0, self.int64())
    }
}

impl fmt::Display for GeneralRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}
