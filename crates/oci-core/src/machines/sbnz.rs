//! SBNZ one-instruction machines
//!
//! Every cell quadruple at the program counter is one
//! `SBNZ(A, B, C, D)` instruction, with operands taken from `mem[pc]` to
//! `mem[pc + 3]`:
//!
//! ```text
//! if mem[A] < mem[B] { emit_le16(mem[A] + mem[B]) }
//! mem[C] = mem[A] - mem[B]
//! if mem[C] != 0 { pc = D } else { pc += 4 }
//! ```
//!
//! The result is assigned first and the branch tests the stored value.
//! Arithmetic wraps at 16 bits. The von-Neumann variant keeps code and data
//! in one segment and can rewrite its own operands; the Harvard variant
//! reads operands from ROM and data from RAM.

use std::fmt;
use std::fmt::Write as _;

use crate::bytecode::decoder::{Decoder, InstructionSet};
use crate::bytecode::instruction::Instruction;
use crate::config::MachineConfig;
use crate::error::OciResult;
use crate::genome::{GenomeReader, GenomeWriter};
use crate::vm::interpreter::{Flow, Machine};
use crate::vm::memory::Segment;
use crate::vm::output::OutputSink;
use crate::vm::probe::Probe;

/// Largest segment a 16-bit program counter or operand can address
const MAX_SEGMENT: usize = 1 << 16;

/// Cells per instruction
const WIDTH: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbnzOp {
    Sbnz,
}

impl fmt::Display for SbnzOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sbnz")
    }
}

/// Single instruction: no opcode bits, nothing to fetch
const SBNZ_SET: &InstructionSet<SbnzOp> = &[("", SbnzOp::Sbnz)];

/// Subtract and store, emitting the sum first when the subtraction
/// underflows. Returns the stored difference.
#[inline(always)]
fn subtract(x: u16, y: u16, out: &mut OutputSink) -> u16 {
    if x < y {
        out.emit_word(x.wrapping_add(y));
    }
    x.wrapping_sub(y)
}

fn listing(code: &[u16]) -> String {
    let mut text = String::new();
    for (addr, quad) in code.chunks(WIDTH as usize).enumerate() {
        let _ = write!(text, "{:04X}: {}", addr * WIDTH as usize, SbnzOp::Sbnz);
        for (i, operand) in quad.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            let _ = write!(text, "{}{}", sep, operand);
        }
        text.push('\n');
    }
    text
}

/// SBNZ machine with one shared code/data segment
#[derive(Debug)]
pub struct SbnzVonNeumann<P: Probe> {
    pc: u16,
    ram: Segment<u16, P>,
}

impl<P: Probe> SbnzVonNeumann<P> {
    pub fn ram(&self) -> &Segment<u16, P> {
        &self.ram
    }
}

impl<P: Probe> Machine for SbnzVonNeumann<P> {
    type Op = SbnzOp;
    type Probe = P;

    const NAME: &'static str = "sbnz-von-neumann";
    const INSTRUCTION_SET: &'static InstructionSet<SbnzOp> = SBNZ_SET;

    fn with_config(config: &MachineConfig) -> OciResult<Self> {
        let size = MachineConfig::validate_segment("ram_size", config.ram_size, MAX_SEGMENT)?;
        Ok(SbnzVonNeumann {
            pc: 0,
            ram: Segment::new(size),
        })
    }

    fn genetic_string_size(&self) -> usize {
        2 + self.ram.genome_bytes()
    }

    fn load(&mut self, genome: &mut GenomeReader<'_>) -> OciResult<()> {
        self.pc = genome.read_u16()?;
        self.ram.load(genome)
    }

    fn save(&self, genome: &mut GenomeWriter) {
        genome.write_u16(self.pc);
        self.ram.save(genome);
    }

    fn pc(&self) -> usize {
        self.pc as usize
    }

    #[inline(always)]
    fn fetch(&mut self) -> u8 {
        0
    }

    #[inline(always)]
    fn execute(&mut self, _instr: Instruction<SbnzOp>, out: &mut OutputSink) -> Flow {
        let pc = self.pc as usize;
        let a = self.ram.read(pc) as usize;
        let b = self.ram.read(pc + 1) as usize;
        let c = self.ram.read(pc + 2) as usize;

        let x = self.ram.read(a);
        let y = self.ram.read(b);
        let result = subtract(x, y, out);
        self.ram.write(c, result);

        // the store may have rewritten the jump operand
        self.pc = if result != 0 {
            self.ram.read(pc + 3)
        } else {
            self.pc.wrapping_add(WIDTH)
        };
        Flow::Continue
    }

    fn reset_touches(&mut self) {
        self.ram.reset_touches();
    }

    fn disassemble(&self, _decoder: &Decoder<SbnzOp>) -> String {
        listing(self.ram.cells())
    }
}

/// SBNZ machine with separate program (ROM) and data (RAM) segments
#[derive(Debug)]
pub struct SbnzHarvard<P: Probe> {
    pc: u16,
    ram: Segment<u16, P>,
    rom: Segment<u16, P>,
}

impl<P: Probe> SbnzHarvard<P> {
    pub fn ram(&self) -> &Segment<u16, P> {
        &self.ram
    }

    pub fn rom(&self) -> &Segment<u16, P> {
        &self.rom
    }
}

impl<P: Probe> Machine for SbnzHarvard<P> {
    type Op = SbnzOp;
    type Probe = P;

    const NAME: &'static str = "sbnz-harvard";
    const INSTRUCTION_SET: &'static InstructionSet<SbnzOp> = SBNZ_SET;

    fn with_config(config: &MachineConfig) -> OciResult<Self> {
        let ram = MachineConfig::validate_segment("ram_size", config.ram_size, MAX_SEGMENT)?;
        let rom = MachineConfig::validate_segment("rom_size", config.rom_size, MAX_SEGMENT)?;
        Ok(SbnzHarvard {
            pc: 0,
            ram: Segment::new(ram),
            rom: Segment::new(rom),
        })
    }

    fn genetic_string_size(&self) -> usize {
        2 + self.ram.genome_bytes() + self.rom.genome_bytes()
    }

    fn load(&mut self, genome: &mut GenomeReader<'_>) -> OciResult<()> {
        self.pc = genome.read_u16()?;
        self.ram.load(genome)?;
        self.rom.load(genome)
    }

    fn save(&self, genome: &mut GenomeWriter) {
        genome.write_u16(self.pc);
        self.ram.save(genome);
        self.rom.save(genome);
    }

    fn pc(&self) -> usize {
        self.pc as usize
    }

    #[inline(always)]
    fn fetch(&mut self) -> u8 {
        0
    }

    #[inline(always)]
    fn execute(&mut self, _instr: Instruction<SbnzOp>, out: &mut OutputSink) -> Flow {
        let pc = self.pc as usize;
        let a = self.rom.read(pc) as usize;
        let b = self.rom.read(pc + 1) as usize;
        let c = self.rom.read(pc + 2) as usize;

        let x = self.ram.read(a);
        let y = self.ram.read(b);
        let result = subtract(x, y, out);
        self.ram.write(c, result);

        self.pc = if result != 0 {
            self.rom.read(pc + 3)
        } else {
            self.pc.wrapping_add(WIDTH)
        };
        Flow::Continue
    }

    fn reset_touches(&mut self) {
        self.ram.reset_touches();
        self.rom.reset_touches();
    }

    fn disassemble(&self, _decoder: &Decoder<SbnzOp>) -> String {
        listing(self.rom.cells())
    }
}
