//! Decoded Instruction Representation
//!
//! The result of looking a fetched byte up in a decode table.
//! This layer contains no execution semantics.

/// Decoded instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction<Op> {
    pub op: Op,
    /// Position of the matching entry in the instruction set description,
    /// used as the occurrence-histogram index
    pub category: u8,
    /// Low bits of the fetched byte left over after the prefix
    pub operand: u8,
    pub operand_bits: u8,
}

impl<Op> Instruction<Op> {
    /// Create an instruction with no operand
    pub fn new(op: Op, category: u8) -> Self {
        Instruction {
            op,
            category,
            operand: 0,
            operand_bits: 0,
        }
    }

    /// Create an instruction carrying `operand_bits` of embedded operand
    pub fn with_operand(op: Op, category: u8, operand: u8, operand_bits: u8) -> Self {
        Instruction {
            op,
            category,
            operand,
            operand_bits,
        }
    }
}
