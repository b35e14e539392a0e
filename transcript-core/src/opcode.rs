// transcript-core - Bytecode instruction definitions for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode instruction definitions.
//!
//! Code is a sequence of 16-bit words: an opcode followed by zero, one, or
//! two immediate words. Jump targets are absolute positions within the code
//! block. The static-hint immediate of the dispatch instructions uses
//! `SLOT_UNKNOWN` (all ones) to mean "no hint".

/// Sentinel slot hint meaning "no static information".
pub const SLOT_UNKNOWN: u16 = 0xffff;

/// Bytecode instructions for the TranScript VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Op {
    /// No operation.
    Nop = 0,
    /// `target`: unconditional jump.
    Jump,
    /// `target`: jump if the value register is the canonical false.
    Branch,
    /// `k`: load constant `k` into the value register.
    Value,
    /// `i`: load stack slot `base + i`.
    Bound,
    /// `i`: load captured value `i`.
    Free,
    /// `i`: load linked global box `i`.
    Global,
    /// `i`: wrap stack slot `base + i` in a fresh box, in place.
    Box,
    /// `i`: wrap stack slot `base + i` in an undefined box, in place.
    Undefine,
    /// Replace the value register with its box content; fault if undefined.
    Unbox,
    /// Pop a value into the box in the value register; fault if undefined.
    Update,
    /// Mark the box in the value register as defined.
    Define,
    /// Push the value register onto the operand stack.
    Push,
    /// `return-ip`: save the current frame with the given return address.
    Frame,
    /// `n`: move the top `n` stack entries down to base (tail calls).
    Shuffle,
    /// Pop a frame; the value register is the result.
    Return,
    /// `n`: discard the top `n` stack entries.
    Retract,
    /// `argc`: invoke the value register as a function.
    Call,
    /// `block, m`: capture the top `m` entries, the receiver, and the
    /// static class into a new closure over `block`.
    Close,
    /// `block, m`: as `Close` but without capturing the receiver (method
    /// and property bodies take it from the call site).
    CloseM,
    /// `n`: require exactly `n` arguments and set the frame base.
    Prolog,
    /// `n, m`: `n` required arguments of `m` total; missing optionals are
    /// filled with false.
    PrologOpt,
    /// `n, m`: as `PrologOpt`, but extra arguments collect into an array.
    PrologRest,
    /// Pop a skeleton, take the value-register class as ancestor, and open
    /// an anonymous class as the new static class.
    Extend,
    /// `acc`: as `Extend`, memoised per ancestor under the accessor so the
    /// same lexical class expression yields one class.
    ExtendA,
    /// `n`: consume the top `n` entries as slot values, install the class,
    /// and load its companion object.
    Finish,
    /// Allocate an instance of the value-register class, bind it as the
    /// receiver, and load its `__new__` method.
    New,
    /// `acc, hint`: property get through the accessor.
    Get,
    /// `acc, hint`: method get through the accessor (no binding).
    GetM,
    /// `acc, hint`: property set through the accessor; pops the value.
    Set,
    /// Load the receiver.
    This,
    /// Store the value register as the receiver.
    LThis,
    /// `hint`: load the ancestor's method for the hinted slot.
    Super,
    /// `file-k, line`: update the source position for error annotation.
    Source,
}

impl Op {
    /// Decode an opcode word.
    pub fn from_u16(word: u16) -> Option<Op> {
        if word > Op::Source as u16 {
            return None;
        }
        // Discriminants are contiguous from zero.
        Some(unsafe { std::mem::transmute::<u16, Op>(word) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        for word in 0..=Op::Source as u16 {
            let op = Op::from_u16(word).expect("valid opcode");
            assert_eq!(op as u16, word);
        }
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(Op::from_u16(Op::Source as u16 + 1), None);
        assert_eq!(Op::from_u16(SLOT_UNKNOWN), None);
    }
}
