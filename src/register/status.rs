//! The status word.
//!
//! A single 32-bit value holding the condition flags and the CPU mode
//! selectors. Layout, most significant bit first:
//!
//! ```text
//! C V Z N A A A I | R R P T O O M M | S S S S S S S S | U U U U U U U U
//! ```
//!
//! - C, V, Z, N: carry, overflow, zero and negative flags
//! - AAA: address mode
//! - I: interrupt disable
//! - RR: selected general register
//! - P, T: pointer and counter register sets
//! - OO: operand size
//! - MM: math mode
//! - S: 8 bits reserved for the system
//! - U: 8 bits reserved for the user
//!
//! Every mutator clears its own field and ORs the new value in, so no
//! other field is ever disturbed.

use std::fmt;
use serde::{Serialize, Deserialize};
use thiserror::Error;

const CARRY: u32 = 0x8000_0000;
const OVERFLOW: u32 = 0x4000_0000;
const ZERO: u32 = 0x2000_0000;
const NEGATIVE: u32 = 0x1000_0000;

const ADDRESS_MASK: u32 = 0x0E00_0000;
const ADDRESS_SHIFT: u32 = 25;

const INTERRUPT_DISABLE: u32 = 0x0100_0000;

const REGISTER_MASK: u32 = 0x00C0_0000;
const REGISTER_SHIFT: u32 = 22;

const POINTER_SET: u32 = 0x0020_0000;
const COUNTER_SET: u32 = 0x0010_0000;

const OPERAND_MASK: u32 = 0x000C_0000;
const OPERAND_SHIFT: u32 = 18;

const MATH_MASK: u32 = 0x0003_0000;
const MATH_SHIFT: u32 = 16;

const SYSTEM_MASK: u32 = 0x0000_FF00;
const SYSTEM_SHIFT: u32 = 8;

const USER_MASK: u32 = 0x0000_00FF;

/// The single-bit condition flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    Carry,
    Overflow,
    Zero,
    Negative,
}

impl Flag {
    /// All condition flags, most significant first.
    pub const ALL: [Flag; 4] = [Flag::Carry, Flag::Overflow, Flag::Zero, Flag::Negative];

    const fn mask(self) -> u32 {
        match self {
            Flag::Carry => CARRY,
            Flag::Overflow => OVERFLOW,
            Flag::Zero => ZERO,
            Flag::Negative => NEGATIVE,
        }
    }
}

/// Declares a `#[repr(u8)]` selector enum with a validating `TryFrom<u8>`.
macro_rules! selector {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $name {
            /// Largest legal raw value.
            pub const MAX: u8 = [$($value),+].len() as u8 - 1;

            /// Raw field value.
            #[inline]
            pub const fn bits(self) -> u8 {
                self as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = StatusError;

            fn try_from(value: u8) -> Result<Self, StatusError> {
                match value {
                    $($value => Ok($name::$variant),)+
                    _ => Err(StatusError::InvalidField {
                        field: $field,
                        value,
                        max: Self::MAX,
                    }),
                }
            }
        }
    };
}

selector! {
    /// How an instruction's memory operand is located.
    AddressMode, "address mode" {
        Ptr = 0,
        PtrOfs = 1,
        PtrIx = 2,
        PtrIxOfs = 3,
        PtrPtr = 4,
        PtrPtrOfs = 5,
        PtrPtrIx = 6,
        PtrPtrIxOfs = 7,
    }
}

selector! {
    /// One of the four general registers.
    Register, "register" {
        R0 = 0,
        R1 = 1,
        R2 = 2,
        R3 = 3,
    }
}

selector! {
    /// Width of ALU operations.
    OperandSize, "operand size" {
        Operand8 = 0,
        Operand16 = 1,
        Operand32 = 2,
        Operand64 = 3,
    }
}

selector! {
    /// Arithmetic interpretation. Only `Integer` has ALU support.
    MathMode, "math mode" {
        Integer = 0,
        Fractional = 1,
        Fixed = 2,
        Float = 3,
    }
}

selector! {
    /// Which of the two pointer or counter register banks is active.
    RegisterSet, "register set" {
        Set0 = 0,
        Set1 = 1,
    }
}

impl OperandSize {
    /// Width in bits.
    pub const fn bits_wide(self) -> u32 {
        8 << (self as u32)
    }
}

impl Register {
    /// All general registers in index order.
    pub const ALL: [Register; 4] = [Register::R0, Register::R1, Register::R2, Register::R3];
}

/// Errors raised when writing a selector field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("{field} must be <= {max}, got {value}")]
    InvalidField {
        field: &'static str,
        value: u8,
        max: u8,
    },
}

/// The packed status word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusWord(u32);

impl StatusWord {
    /// A word with every field zero: flags clear, `Ptr` addressing,
    /// R0, set 0 banks, 8-bit operands, integer math.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Build from a raw pattern. Every 32-bit pattern is a legal word.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw 32-bit pattern.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    fn put(&mut self, mask: u32, shift: u32, value: u8) {
        self.0 = (self.0 & !mask) | ((u32::from(value) << shift) & mask);
    }

    #[inline]
    fn field(self, mask: u32, shift: u32) -> u8 {
        ((self.0 & mask) >> shift) as u8
    }

    // ------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------

    /// Whether `flag` is set.
    #[inline]
    pub const fn flag(self, flag: Flag) -> bool {
        self.0 & flag.mask() != 0
    }

    #[inline]
    pub fn set_flag(&mut self, flag: Flag) {
        self.0 |= flag.mask();
    }

    #[inline]
    pub fn clear_flag(&mut self, flag: Flag) {
        self.0 &= !flag.mask();
    }

    /// Set `flag` if `on`, clear it otherwise.
    #[inline]
    pub fn assign_flag(&mut self, flag: Flag, on: bool) {
        if on {
            self.set_flag(flag);
        } else {
            self.clear_flag(flag);
        }
    }

    pub const fn carry(self) -> bool {
        self.flag(Flag::Carry)
    }

    pub fn set_carry(&mut self) {
        self.set_flag(Flag::Carry);
    }

    pub fn clear_carry(&mut self) {
        self.clear_flag(Flag::Carry);
    }

    pub const fn overflow(self) -> bool {
        self.flag(Flag::Overflow)
    }

    pub fn set_overflow(&mut self) {
        self.set_flag(Flag::Overflow);
    }

    pub fn clear_overflow(&mut self) {
        self.clear_flag(Flag::Overflow);
    }

    pub const fn zero(self) -> bool {
        self.flag(Flag::Zero)
    }

    pub fn set_zero(&mut self) {
        self.set_flag(Flag::Zero);
    }

    pub fn clear_zero(&mut self) {
        self.clear_flag(Flag::Zero);
    }

    pub const fn negative(self) -> bool {
        self.flag(Flag::Negative)
    }

    pub fn set_negative(&mut self) {
        self.set_flag(Flag::Negative);
    }

    pub fn clear_negative(&mut self) {
        self.clear_flag(Flag::Negative);
    }

    pub const fn interrupt_disable(self) -> bool {
        self.0 & INTERRUPT_DISABLE != 0
    }

    pub fn set_interrupt_disable(&mut self) {
        self.0 |= INTERRUPT_DISABLE;
    }

    pub fn clear_interrupt_disable(&mut self) {
        self.0 &= !INTERRUPT_DISABLE;
    }

    // ------------------------------------------------------------------
    // Selectors
    // ------------------------------------------------------------------

    pub fn address_mode(self) -> AddressMode {
        match self.field(ADDRESS_MASK, ADDRESS_SHIFT) {
            0 => AddressMode::Ptr,
            1 => AddressMode::PtrOfs,
            2 => AddressMode::PtrIx,
            3 => AddressMode::PtrIxOfs,
            4 => AddressMode::PtrPtr,
            5 => AddressMode::PtrPtrOfs,
            6 => AddressMode::PtrPtrIx,
            _ => AddressMode::PtrPtrIxOfs,
        }
    }

    pub fn set_address_mode(&mut self, mode: AddressMode) {
        self.put(ADDRESS_MASK, ADDRESS_SHIFT, mode.bits());
    }

    /// Select an address mode from its raw value (0-7).
    pub fn select_address_mode(&mut self, value: u8) -> Result<(), StatusError> {
        let mode = AddressMode::try_from(value).map_err(rejected)?;
        self.set_address_mode(mode);
        Ok(())
    }

    pub fn register(self) -> Register {
        match self.field(REGISTER_MASK, REGISTER_SHIFT) {
            0 => Register::R0,
            1 => Register::R1,
            2 => Register::R2,
            _ => Register::R3,
        }
    }

    pub fn set_register(&mut self, register: Register) {
        self.put(REGISTER_MASK, REGISTER_SHIFT, register.bits());
    }

    /// Select a general register from its raw index (0-3).
    pub fn select_register(&mut self, value: u8) -> Result<(), StatusError> {
        let register = Register::try_from(value).map_err(rejected)?;
        self.set_register(register);
        Ok(())
    }

    pub fn pointer_register_set(self) -> RegisterSet {
        if self.0 & POINTER_SET == 0 { RegisterSet::Set0 } else { RegisterSet::Set1 }
    }

    /// True if pointer register set 0 is active.
    pub fn pointer_register_set0(self) -> bool {
        self.pointer_register_set() == RegisterSet::Set0
    }

    pub fn select_pointer_register_set(&mut self, set: RegisterSet) {
        self.put(POINTER_SET, 21, set.bits());
    }

    pub fn counter_register_set(self) -> RegisterSet {
        if self.0 & COUNTER_SET == 0 { RegisterSet::Set0 } else { RegisterSet::Set1 }
    }

    /// True if counter register set 0 is active.
    pub fn counter_register_set0(self) -> bool {
        self.counter_register_set() == RegisterSet::Set0
    }

    pub fn select_counter_register_set(&mut self, set: RegisterSet) {
        self.put(COUNTER_SET, 20, set.bits());
    }

    pub fn operand_size(self) -> OperandSize {
        match self.field(OPERAND_MASK, OPERAND_SHIFT) {
            0 => OperandSize::Operand8,
            1 => OperandSize::Operand16,
            2 => OperandSize::Operand32,
            _ => OperandSize::Operand64,
        }
    }

    pub fn set_operand_size(&mut self, size: OperandSize) {
        self.put(OPERAND_MASK, OPERAND_SHIFT, size.bits());
    }

    /// Select the operand size from its raw value (0-3).
    pub fn select_operand_size(&mut self, value: u8) -> Result<(), StatusError> {
        let size = OperandSize::try_from(value).map_err(rejected)?;
        self.set_operand_size(size);
        Ok(())
    }

    pub fn math_mode(self) -> MathMode {
        match self.field(MATH_MASK, MATH_SHIFT) {
            0 => MathMode::Integer,
            1 => MathMode::Fractional,
            2 => MathMode::Fixed,
            _ => MathMode::Float,
        }
    }

    pub fn set_math_mode(&mut self, mode: MathMode) {
        self.put(MATH_MASK, MATH_SHIFT, mode.bits());
    }

    /// Select the math mode from its raw value (0-3).
    pub fn select_math_mode(&mut self, value: u8) -> Result<(), StatusError> {
        let mode = MathMode::try_from(value).map_err(rejected)?;
        self.set_math_mode(mode);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Opaque bytes
    // ------------------------------------------------------------------

    pub fn system(self) -> u8 {
        self.field(SYSTEM_MASK, SYSTEM_SHIFT)
    }

    pub fn set_system(&mut self, bits: u8) {
        self.put(SYSTEM_MASK, SYSTEM_SHIFT, bits);
    }

    pub fn user(self) -> u8 {
        self.field(USER_MASK, 0)
    }

    pub fn set_user(&mut self, bits: u8) {
        self.put(USER_MASK, 0, bits);
    }
}

fn rejected(err: StatusError) -> StatusError {
    log::warn!("status word: {}", err);
    err
}

impl fmt::Debug for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |on: bool, c: char| if on { c } else { '-' };
        write!(
            f,
            "ST={:08X} [{}{}{}{}{}] {:?} {:?} {:?} {:?} P{} T{} sys={:02X} usr={:02X}",
            self.0,
            flag(self.carry(), 'C'),
            flag(self.overflow(), 'V'),
            flag(self.zero(), 'Z'),
            flag(self.negative(), 'N'),
            flag(self.interrupt_disable(), 'I'),
            self.address_mode(),
            self.register(),
            self.operand_size(),
            self.math_mode(),
            self.pointer_register_set().bits(),
            self.counter_register_set().bits(),
            self.system(),
            self.user(),
        )
    }
}
