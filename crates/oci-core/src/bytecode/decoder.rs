//! Prefix-Code Decoder
//!
//! Builds a 256-entry lookup table from a declarative instruction set: a list
//! of `("bit pattern", op)` pairs, where the pattern gives the high bits of
//! the fetched byte most-significant first. Whatever bits follow the pattern
//! are handed to the instruction as its operand.
//!
//! The description must be a complete prefix code: every byte value matches
//! exactly one pattern. Bit groupings decide which genomes decode to which
//! behaviour, so they are part of each machine's contract.

use std::fmt::Debug;

use crate::error::{OciError, OciResult};

use super::instruction::Instruction;

/// Declarative decode description
pub type InstructionSet<Op> = [(&'static str, Op)];

#[derive(Debug, Clone)]
pub struct Decoder<Op> {
    table: Vec<Instruction<Op>>,
    patterns: Vec<&'static str>,
}

impl<Op: Copy + Debug> Decoder<Op> {
    /// Build the lookup table, rejecting overlapping or incomplete codes
    pub fn build(set: &InstructionSet<Op>) -> OciResult<Self> {
        if set.len() > 256 {
            return Err(OciError::InvalidInstructionSet(format!(
                "{} entries cannot fit one byte",
                set.len()
            )));
        }

        let mut slots: Vec<Option<Instruction<Op>>> = vec![None; 256];

        for (category, &(pattern, op)) in set.iter().enumerate() {
            let (prefix, len) = parse_pattern(pattern)?;
            let operand_bits = 8 - len;
            let operand_mask = (1usize << operand_bits) - 1;

            for byte in 0..256usize {
                if byte >> operand_bits != prefix {
                    continue;
                }
                let slot = &mut slots[byte];
                if let Some(existing) = slot {
                    return Err(OciError::InvalidInstructionSet(format!(
                        "pattern {:?} ({:?}) overlaps {:?} at byte 0x{:02X}",
                        pattern,
                        op,
                        set[existing.category as usize].0,
                        byte
                    )));
                }
                *slot = Some(Instruction::with_operand(
                    op,
                    category as u8,
                    (byte & operand_mask) as u8,
                    operand_bits as u8,
                ));
            }
        }

        let mut table = Vec::with_capacity(256);
        for (byte, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(instr) => table.push(instr),
                None => {
                    return Err(OciError::InvalidInstructionSet(format!(
                        "byte 0x{:02X} matches no pattern",
                        byte
                    )))
                }
            }
        }

        Ok(Decoder {
            table,
            patterns: set.iter().map(|&(p, _)| p).collect(),
        })
    }

    #[inline(always)]
    pub fn decode(&self, byte: u8) -> Instruction<Op> {
        self.table[byte as usize]
    }

    /// Number of instruction categories (histogram length)
    pub fn categories(&self) -> usize {
        self.patterns.len()
    }

    /// Bit pattern of a category
    pub fn pattern(&self, category: u8) -> &'static str {
        self.patterns[category as usize]
    }
}

/// Turn "0110" into (0b0110, 4)
fn parse_pattern(pattern: &str) -> OciResult<(usize, usize)> {
    if pattern.len() > 8 {
        return Err(OciError::InvalidInstructionSet(format!(
            "pattern {:?} is longer than a byte",
            pattern
        )));
    }
    let mut prefix = 0usize;
    for ch in pattern.chars() {
        let bit = match ch {
            '0' => 0,
            '1' => 1,
            other => {
                return Err(OciError::InvalidInstructionSet(format!(
                    "pattern {:?} contains {:?}",
                    pattern, other
                )))
            }
        };
        prefix = (prefix << 1) | bit;
    }
    Ok((prefix, pattern.len()))
}
