pub mod decoder;
pub mod instruction;

pub use decoder::{Decoder, InstructionSet};
pub use instruction::Instruction;
