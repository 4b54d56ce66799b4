//! The hardware stack.
//!
//! A `Stack` does not own its memory: it manages a byte buffer handed to it
//! by the caller (normally the 64 KiB block at the stack base) plus a
//! descending pointer. The pointer names the next free slot, so the first
//! push lands on the pointer's starting index and an empty-below stack has
//! pointer -1.

use std::fmt;
use thiserror::Error;

/// Size of the stack block addressed by the 16-bit stack pointer.
pub const STACK_SIZE: usize = 0x1_0000;

/// Errors raised by stack operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("stack overflow: need {needed} bytes, {available} free")]
    Overflow { needed: usize, available: usize },

    #[error("stack underflow: need {needed} bytes, {available} in use")]
    Underflow { needed: usize, available: usize },

    #[error("stack pointer {ptr:#06X} outside a {len}-byte buffer")]
    PointerOutOfRange { ptr: u16, len: usize },
}

/// A descending stack over a borrowed buffer.
pub struct Stack<'a> {
    memory: &'a mut [u8],
    ptr: i32,
    top: i32,
}

impl<'a> Stack<'a> {
    /// Manage `memory` with the pointer starting at `ptr`.
    ///
    /// `ptr` is also the top bound for pops.
    pub fn new(memory: &'a mut [u8], ptr: u16) -> Result<Self, StackError> {
        if usize::from(ptr) >= memory.len() {
            return Err(StackError::PointerOutOfRange { ptr, len: memory.len() });
        }
        Ok(Self {
            memory,
            ptr: i32::from(ptr),
            top: i32::from(ptr),
        })
    }

    /// Current pointer, in `-1..len`.
    #[inline]
    pub fn pointer(&self) -> i32 {
        self.ptr
    }

    /// The starting pointer.
    #[inline]
    pub fn top(&self) -> i32 {
        self.top
    }

    /// Bytes currently pushed.
    #[inline]
    pub fn depth(&self) -> usize {
        (self.top - self.ptr) as usize
    }

    /// Bytes that can still be pushed.
    #[inline]
    pub fn available(&self) -> usize {
        (self.ptr + 1) as usize
    }

    /// Read-only view of the managed buffer.
    pub fn memory(&self) -> &[u8] {
        &self.memory[..]
    }

    /// Write `bytes` (most significant first) into descending slots.
    fn push_bytes<const N: usize>(&mut self, bytes: [u8; N]) -> Result<(), StackError> {
        if self.available() < N {
            log::debug!("stack overflow at {}: push of {} bytes", self.ptr, N);
            return Err(StackError::Overflow { needed: N, available: self.available() });
        }

        for byte in bytes {
            self.memory[self.ptr as usize] = byte;
            self.ptr -= 1;
        }
        Ok(())
    }

    /// Undo `push_bytes`, returning the bytes most significant first.
    fn pop_bytes<const N: usize>(&mut self) -> Result<[u8; N], StackError> {
        if self.depth() < N {
            log::debug!("stack underflow at {}: pop of {} bytes", self.ptr, N);
            return Err(StackError::Underflow { needed: N, available: self.depth() });
        }

        let mut bytes = [0u8; N];
        for slot in bytes.iter_mut().rev() {
            self.ptr += 1;
            *slot = self.memory[self.ptr as usize];
        }
        Ok(bytes)
    }

    pub fn push8(&mut self, value: u8) -> Result<(), StackError> {
        self.push_bytes(value.to_be_bytes())
    }

    pub fn push16(&mut self, value: u16) -> Result<(), StackError> {
        self.push_bytes(value.to_be_bytes())
    }

    pub fn push32(&mut self, value: u32) -> Result<(), StackError> {
        self.push_bytes(value.to_be_bytes())
    }

    pub fn push64(&mut self, value: u64) -> Result<(), StackError> {
        self.push_bytes(value.to_be_bytes())
    }

    pub fn pop8(&mut self) -> Result<u8, StackError> {
        self.pop_bytes().map(u8::from_be_bytes)
    }

    pub fn pop16(&mut self) -> Result<u16, StackError> {
        self.pop_bytes().map(u16::from_be_bytes)
    }

    pub fn pop32(&mut self) -> Result<u32, StackError> {
        self.pop_bytes().map(u32::from_be_bytes)
    }

    pub fn pop64(&mut self) -> Result<u64, StackError> {
        self.pop_bytes().map(u64::from_be_bytes)
    }
}

impl fmt::Debug for Stack<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("ptr", &self.ptr)
            .field("top", &self.top)
            .field("len", &self.memory.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push8_until_overflow() {
        let mut memory = [0u8; 8];
        let mut stack = Stack::new(&mut memory, 0x0007).unwrap();

        let mut pushed = 0;
        for i in 0..8000u32 {
            let before = stack.pointer();
            match stack.push8(i as u8 + 1) {
                Ok(()) => {
                    assert_eq!(stack.pointer(), before - 1);
                    pushed += 1;
                }
                Err(e) => {
                    assert_eq!(e, StackError::Overflow { needed: 1, available: 0 });
                    assert_eq!(stack.pointer(), before);
                    break;
                }
            }
        }

        assert_eq!(pushed, 8);
        assert_eq!(stack.pointer(), -1);
        assert_eq!(stack.memory(), &[8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_push_byte_order() {
        let mut memory = [0u8; 16];
        let mut stack = Stack::new(&mut memory, 15).unwrap();

        stack.push16(0x1122).unwrap();
        stack.push32(0x3344_5566).unwrap();
        assert_eq!(stack.pointer(), 9);
        assert_eq!(stack.depth(), 6);
        assert_eq!(&stack.memory()[10..], &[0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn test_push64_exact_fit() {
        let mut memory = [0u8; 8];
        let mut stack = Stack::new(&mut memory, 7).unwrap();
        stack.push64(0x0102_0304_0506_0708).unwrap();
        assert_eq!(stack.pointer(), -1);
        assert_eq!(stack.available(), 0);
        assert_eq!(stack.memory(), &[8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_overflow_leaves_stack_untouched() {
        let mut memory = [0xAAu8; 8];
        let mut stack = Stack::new(&mut memory, 2).unwrap();

        assert_eq!(
            stack.push32(0xDEAD_BEEF),
            Err(StackError::Overflow { needed: 4, available: 3 })
        );
        assert_eq!(stack.pointer(), 2);
        assert!(stack.memory().iter().all(|&b| b == 0xAA));

        stack.push16(0xBEEF).unwrap();
        assert_eq!(stack.push16(0x1234), Err(StackError::Overflow { needed: 2, available: 1 }));
        assert_eq!(stack.pointer(), 0);
    }

    #[test]
    fn test_pop_mirrors_push() {
        let mut memory = vec![0u8; STACK_SIZE];
        let mut stack = Stack::new(&mut memory, 0xFFFF).unwrap();

        stack.push8(0x12).unwrap();
        stack.push16(0x3456).unwrap();
        stack.push32(0x789A_BCDE).unwrap();
        stack.push64(0x0123_4567_89AB_CDEF).unwrap();
        assert_eq!(stack.depth(), 15);

        assert_eq!(stack.pop64(), Ok(0x0123_4567_89AB_CDEF));
        assert_eq!(stack.pop32(), Ok(0x789A_BCDE));
        assert_eq!(stack.pop16(), Ok(0x3456));
        assert_eq!(stack.pop8(), Ok(0x12));
        assert_eq!(stack.pointer(), 0xFFFF);
    }

    #[test]
    fn test_underflow() {
        let mut memory = [0u8; 8];
        let mut stack = Stack::new(&mut memory, 7).unwrap();

        assert_eq!(stack.pop8(), Err(StackError::Underflow { needed: 1, available: 0 }));

        stack.push16(0xABCD).unwrap();
        assert_eq!(stack.pop32(), Err(StackError::Underflow { needed: 4, available: 2 }));
        assert_eq!(stack.pointer(), 5);
        assert_eq!(stack.pop16(), Ok(0xABCD));
    }

    #[test]
    fn test_pointer_out_of_range() {
        let mut memory = [0u8; 4];
        assert_eq!(
            Stack::new(&mut memory, 4).unwrap_err(),
            StackError::PointerOutOfRange { ptr: 4, len: 4 }
        );
        let mut empty: [u8; 0] = [];
        assert!(Stack::new(&mut empty, 0).is_err());
    }

    proptest! {
        #[test]
        fn prop_push_pop_inverse(values in proptest::collection::vec(any::<u64>(), 0..64)) {
            let mut memory = vec![0u8; 1024];
            let mut stack = Stack::new(&mut memory, 1023).unwrap();
            for &v in &values {
                stack.push64(v).unwrap();
            }
            for &v in values.iter().rev() {
                prop_assert_eq!(stack.pop64(), Ok(v));
            }
            prop_assert_eq!(stack.depth(), 0);
        }
    }
}
