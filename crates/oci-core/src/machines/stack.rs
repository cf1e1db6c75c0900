//! Stack machine
//!
//! A single 16-bit segment holds code and the data stack. The top three bits
//! of the low byte of `mem[pc]` select the instruction; the program counter
//! advances by one cell before the instruction runs, so `jpos` overrides it.
//! `sp` indexes the top of stack; all stack addresses wrap.

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

const MAX_SEGMENT: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOp {
    Dup,
    One,
    Zero,
    Load,
    Pop,
    Sub,
    Jpos,
    Out,
}

impl fmt::Display for StackOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StackOp::Dup => "dup",
            StackOp::One => "one",
            StackOp::Zero => "zero",
            StackOp::Load => "load",
            StackOp::Pop => "pop",
            StackOp::Sub => "sub",
            StackOp::Jpos => "jpos",
            StackOp::Out => "out",
        };
        f.write_str(name)
    }
}

const STACK_SET: &InstructionSet<StackOp> = &[
    ("000", StackOp::Dup),
    ("001", StackOp::One),
    ("010", StackOp::Zero),
    ("011", StackOp::Load),
    ("100", StackOp::Pop),
    ("101", StackOp::Sub),
    ("110", StackOp::Jpos),
    ("111", StackOp::Out),
];

#[derive(Debug)]
pub struct StackMachine<P: Probe> {
    pc: u16,
    sp: u16,
    mem: Segment<u16, P>,
}

impl<P: Probe> StackMachine<P> {
    pub fn sp(&self) -> usize {
        self.sp as usize
    }

    pub fn memory(&self) -> &Segment<u16, P> {
        &self.mem
    }

    #[inline(always)]
    fn at(&self, offset: u16) -> usize {
        self.sp.wrapping_add(offset) as usize
    }

    #[inline(always)]
    fn below(&self, offset: u16) -> usize {
        self.sp.wrapping_sub(offset) as usize
    }
}

impl<P: Probe> Machine for StackMachine<P> {
    type Op = StackOp;
    type Probe = P;

    const NAME: &'static str = "stack";
    const INSTRUCTION_SET: &'static InstructionSet<StackOp> = STACK_SET;

    fn with_config(config: &MachineConfig) -> OciResult<Self> {
        let size = MachineConfig::validate_segment("ram_size", config.ram_size, MAX_SEGMENT)?;
        Ok(StackMachine {
            pc: 0,
            sp: 0,
            mem: Segment::new(size),
        })
    }

    fn genetic_string_size(&self) -> usize {
        4 + self.mem.genome_bytes()
    }

    fn load(&mut self, genome: &mut GenomeReader<'_>) -> OciResult<()> {
        self.pc = genome.read_u16()?;
        self.sp = genome.read_u16()?;
        self.mem.load(genome)
    }

    fn save(&self, genome: &mut GenomeWriter) {
        genome.write_u16(self.pc);
        genome.write_u16(self.sp);
        self.mem.save(genome);
    }

    fn pc(&self) -> usize {
        self.pc as usize
    }

    #[inline(always)]
    fn fetch(&mut self) -> u8 {
        let word = self.mem.read(self.pc as usize);
        self.pc = self.pc.wrapping_add(1);
        word as u8
    }

    #[inline(always)]
    fn execute(&mut self, instr: Instruction<StackOp>, out: &mut OutputSink) -> Flow {
        match instr.op {
            StackOp::Dup => {
                let v = self.mem.read(self.at(0));
                self.mem.write(self.at(1), v);
                self.sp = self.sp.wrapping_add(1);
            }
            StackOp::One => {
                self.sp = self.sp.wrapping_add(1);
                self.mem.write(self.at(0), 1);
            }
            StackOp::Zero => {
                self.sp = self.sp.wrapping_add(1);
                self.mem.write(self.at(0), 0);
            }
            StackOp::Load => {
                let addr = self.mem.read(self.at(0)) as usize;
                let v = self.mem.read(addr);
                self.mem.write(self.at(0), v);
            }
            StackOp::Pop => {
                let v = self.mem.read(self.at(0));
                let addr = self.mem.read(self.below(1)) as usize;
                self.mem.write(addr, v);
                self.sp = self.sp.wrapping_sub(2);
            }
            StackOp::Sub => {
                let rhs = self.mem.read(self.at(0));
                let lhs = self.mem.read(self.below(1));
                self.mem.write(self.below(1), lhs.wrapping_sub(rhs));
                self.sp = self.sp.wrapping_sub(1);
            }
            StackOp::Jpos => {
                let target = self.mem.read(self.at(0));
                let cond = self.mem.read(self.below(1)) as i16;
                if cond >= 0 {
                    self.pc = target;
                }
                self.sp = self.sp.wrapping_sub(2);
            }
            StackOp::Out => {
                let bytes = self.mem.len() * 2;
                out.emit_masked(self.mem.cells(), self.at(0) * 2, 2, bytes - 1);
                self.sp = self.sp.wrapping_sub(1);
            }
        }
        Flow::Continue
    }

    fn reset_touches(&mut self) {
        self.mem.reset_touches();
    }

    fn disassemble(&self, decoder: &Decoder<StackOp>) -> String {
        let mut text = String::new();
        for (addr, &word) in self.mem.cells().iter().enumerate() {
            let instr = decoder.decode(word as u8);
            let marker = if addr == self.pc() & (self.mem.len() - 1) { '>' } else { ' ' };
            let _ = writeln!(text, "{}{:04X}: {:04X}  {}", marker, addr, word, instr.op);
        }
        text
    }
}
