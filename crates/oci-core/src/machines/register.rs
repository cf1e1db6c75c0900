//! Register/accumulator test machine
//!
//! Harvard layout: a fixed 16-byte ROM holds the program, a byte RAM is
//! written through the data pointer. Its decode tree uses prefixes of two to
//! five bits, some carrying a register index, which makes it the reference
//! exercise for the decoder rather than a practically useful one.
//!
//! ```text
//! 00iiiiii  ldi  acc = i
//! 010iiiii  jnz  if acc != 0 { pc = i }
//! 01100rrr  sta  reg[r] = acc
//! 01101rrr  lda  acc = reg[r]
//! 0111xrrr  add  acc += reg[r]
//! 10xxxxxx  stm  ram[dp] = acc; dp += 1
//! 110xxxxx  out  emit acc
//! 111xxxxx  halt
//! ```

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

/// General-purpose registers, addressed by a 3-bit operand
pub const NUM_REGISTERS: usize = 8;

/// Program memory in bytes
pub const ROM_SIZE: usize = 16;

/// Largest RAM the 16-bit data pointer can address
const MAX_RAM: usize = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOp {
    Ldi,
    Jnz,
    Sta,
    Lda,
    Add,
    Stm,
    Out,
    Halt,
}

impl fmt::Display for RegisterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegisterOp::Ldi => "ldi",
            RegisterOp::Jnz => "jnz",
            RegisterOp::Sta => "sta",
            RegisterOp::Lda => "lda",
            RegisterOp::Add => "add",
            RegisterOp::Stm => "stm",
            RegisterOp::Out => "out",
            RegisterOp::Halt => "halt",
        };
        f.write_str(name)
    }
}

const REGISTER_SET: &InstructionSet<RegisterOp> = &[
    ("00", RegisterOp::Ldi),
    ("010", RegisterOp::Jnz),
    ("01100", RegisterOp::Sta),
    ("01101", RegisterOp::Lda),
    ("0111", RegisterOp::Add),
    ("10", RegisterOp::Stm),
    ("110", RegisterOp::Out),
    ("111", RegisterOp::Halt),
];

#[derive(Debug)]
pub struct RegisterMachine<P: Probe> {
    pc: u8,
    registers: [u8; NUM_REGISTERS],
    acc: u8,
    dp: u16,
    ram: Segment<u8, P>,
    rom: Segment<u8, P>,
}

impl<P: Probe> RegisterMachine<P> {
    pub fn registers(&self) -> &[u8; NUM_REGISTERS] {
        &self.registers
    }

    pub fn accumulator(&self) -> u8 {
        self.acc
    }

    pub fn data_pointer(&self) -> u16 {
        self.dp
    }

    pub fn ram(&self) -> &Segment<u8, P> {
        &self.ram
    }

    pub fn rom(&self) -> &Segment<u8, P> {
        &self.rom
    }

    #[inline(always)]
    fn register(operand: u8) -> usize {
        operand as usize & (NUM_REGISTERS - 1)
    }
}

impl<P: Probe> Machine for RegisterMachine<P> {
    type Op = RegisterOp;
    type Probe = P;

    const NAME: &'static str = "register";
    const INSTRUCTION_SET: &'static InstructionSet<RegisterOp> = REGISTER_SET;

    fn with_config(config: &MachineConfig) -> OciResult<Self> {
        let ram = MachineConfig::validate_segment("ram_size", config.ram_size, MAX_RAM)?;
        Ok(RegisterMachine {
            pc: 0,
            registers: [0; NUM_REGISTERS],
            acc: 0,
            dp: 0,
            ram: Segment::new(ram),
            rom: Segment::new(ROM_SIZE),
        })
    }

    fn genetic_string_size(&self) -> usize {
        1 + NUM_REGISTERS + 1 + 2 + self.ram.genome_bytes() + self.rom.genome_bytes()
    }

    fn load(&mut self, genome: &mut GenomeReader<'_>) -> OciResult<()> {
        self.pc = genome.read_u8()?;
        for r in self.registers.iter_mut() {
            *r = genome.read_u8()?;
        }
        self.acc = genome.read_u8()?;
        self.dp = genome.read_u16()?;
        self.ram.load(genome)?;
        self.rom.load(genome)
    }

    fn save(&self, genome: &mut GenomeWriter) {
        genome.write_u8(self.pc);
        for &r in self.registers.iter() {
            genome.write_u8(r);
        }
        genome.write_u8(self.acc);
        genome.write_u16(self.dp);
        self.ram.save(genome);
        self.rom.save(genome);
    }

    fn pc(&self) -> usize {
        self.pc as usize
    }

    #[inline(always)]
    fn fetch(&mut self) -> u8 {
        let byte = self.rom.read(self.pc as usize);
        self.pc = self.pc.wrapping_add(1);
        byte
    }

    #[inline(always)]
    fn execute(&mut self, instr: Instruction<RegisterOp>, out: &mut OutputSink) -> Flow {
        match instr.op {
            RegisterOp::Ldi => self.acc = instr.operand,
            RegisterOp::Jnz => {
                if self.acc != 0 {
                    self.pc = instr.operand;
                }
            }
            RegisterOp::Sta => self.registers[Self::register(instr.operand)] = self.acc,
            RegisterOp::Lda => self.acc = self.registers[Self::register(instr.operand)],
            RegisterOp::Add => {
                self.acc = self
                    .acc
                    .wrapping_add(self.registers[Self::register(instr.operand)]);
            }
            RegisterOp::Stm => {
                self.ram.write(self.dp as usize, self.acc);
                self.dp = self.dp.wrapping_add(1);
            }
            RegisterOp::Out => out.emit(self.acc),
            RegisterOp::Halt => return Flow::Halt,
        }
        Flow::Continue
    }

    fn reset_touches(&mut self) {
        self.ram.reset_touches();
        self.rom.reset_touches();
    }

    fn disassemble(&self, decoder: &Decoder<RegisterOp>) -> String {
        let mut text = String::new();
        for (addr, &byte) in self.rom.cells().iter().enumerate() {
            let instr = decoder.decode(byte);
            let _ = write!(text, "{:02X}: {:02X}  {}", addr, byte, instr.op);
            match instr.op {
                RegisterOp::Ldi | RegisterOp::Jnz => {
                    let _ = write!(text, " {}", instr.operand);
                }
                RegisterOp::Sta | RegisterOp::Lda | RegisterOp::Add => {
                    let _ = write!(text, " r{}", Self::register(instr.operand));
                }
                RegisterOp::Stm | RegisterOp::Out | RegisterOp::Halt => {}
            }
            text.push('\n');
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::interpreter::{Interpreter, StopReason};
    use crate::vm::probe::{NoProbe, TouchCounter};

    const fn ldi(v: u8) -> u8 {
        v & 0x3F
    }
    const fn jnz(t: u8) -> u8 {
        0b0100_0000 | (t & 0x1F)
    }
    const fn sta(r: u8) -> u8 {
        0b0110_0000 | r
    }
    const fn lda(r: u8) -> u8 {
        0b0110_1000 | r
    }
    const fn add(r: u8) -> u8 {
        0b0111_0000 | r
    }
    const STM: u8 = 0b1000_0000;
    const OUT: u8 = 0b1100_0000;
    const HALT: u8 = 0b1110_0000;

    struct Genome {
        pc: u8,
        registers: [u8; NUM_REGISTERS],
        acc: u8,
        dp: u16,
        ram: Vec<u8>,
        rom: [u8; ROM_SIZE],
    }

    impl Genome {
        fn program(rom: &[u8]) -> Self {
            let mut g = Genome {
                pc: 0,
                registers: [0; NUM_REGISTERS],
                acc: 0,
                dp: 0,
                ram: vec![0; 8],
                rom: [HALT; ROM_SIZE],
            };
            g.rom[..rom.len()].copy_from_slice(rom);
            g
        }

        fn bytes(&self) -> Vec<u8> {
            let mut b = vec![self.pc];
            b.extend_from_slice(&self.registers);
            b.push(self.acc);
            b.extend_from_slice(&self.dp.to_le_bytes());
            b.extend_from_slice(&self.ram);
            b.extend_from_slice(&self.rom);
            b
        }
    }

    fn machine(cfg: MachineConfig) -> Interpreter<RegisterMachine<NoProbe>> {
        Interpreter::new(cfg.with_ram_size(8)).unwrap()
    }

    #[test]
    fn genome_size_matches_layout() {
        let vm = machine(MachineConfig::new());
        assert_eq!(vm.genetic_string_size(), 1 + 8 + 1 + 2 + 8 + 16);
    }

    #[test]
    fn decode_tree_prefix_lengths() {
        let vm = machine(MachineConfig::new());
        let d = vm.decoder();
        let cases = [
            (0b0010_1010u8, RegisterOp::Ldi, 6u8, 0b10_1010u8),
            (0b0101_0011, RegisterOp::Jnz, 5, 0b1_0011),
            (0b0110_0101, RegisterOp::Sta, 3, 5),
            (0b0110_1110, RegisterOp::Lda, 3, 6),
            (0b0111_1011, RegisterOp::Add, 4, 0b1011),
            (0b1011_1111, RegisterOp::Stm, 6, 0b11_1111),
            (0b1101_0000, RegisterOp::Out, 5, 0b1_0000),
            (0b1111_1111, RegisterOp::Halt, 5, 0b1_1111),
        ];
        for (byte, op, bits, operand) in cases {
            let i = d.decode(byte);
            assert_eq!((i.op, i.operand_bits, i.operand), (op, bits, operand), "byte {:08b}", byte);
        }
    }

    #[test]
    fn add_ignores_fourth_operand_bit() {
        let mut g = Genome::program(&[lda(1), add(0b1010), OUT, HALT]);
        g.registers[1] = 5;
        g.registers[2] = 7;
        let mut vm = machine(MachineConfig::new());
        vm.set_from_genetic_string(&g.bytes()).unwrap();
        let run = vm.interpret();
        assert_eq!(run.reason, StopReason::Halted);
        assert_eq!(vm.output(), &[12]);
    }

    #[test]
    fn countdown_loop_emits_and_halts() {
        // r1 = 0xFF acts as -1: out, add r1, jnz back to out
        let mut g = Genome::program(&[ldi(3), OUT, add(1), jnz(1), HALT]);
        g.registers[1] = 0xFF;
        let mut vm = machine(MachineConfig::new());
        vm.set_from_genetic_string(&g.bytes()).unwrap();
        let run = vm.interpret();
        assert_eq!(vm.output(), &[3, 2, 1]);
        assert_eq!(run.reason, StopReason::Halted);
        // ldi + 3 * (out, add, jnz) + halt
        assert_eq!(run.commands, 1 + 9 + 1);
        assert!(vm.halted());
    }

    #[test]
    fn stm_writes_through_wrapping_data_pointer() {
        let mut g = Genome::program(&[ldi(9), STM, ldi(4), STM, HALT]);
        g.dp = 7;
        let mut vm = machine(MachineConfig::new());
        vm.set_from_genetic_string(&g.bytes()).unwrap();
        vm.interpret();
        let m = vm.machine();
        assert_eq!(m.ram().peek(7), 9);
        assert_eq!(m.ram().peek(0), 4);
        assert_eq!(m.data_pointer(), 9);
    }

    #[test]
    fn pc_wraps_within_rom() {
        // pc 15 holds ldi, pc 16 masks to 0 which halts
        let mut g = Genome::program(&[HALT]);
        g.rom[15] = ldi(1);
        g.pc = 15;
        let mut vm = machine(MachineConfig::new());
        vm.set_from_genetic_string(&g.bytes()).unwrap();
        let run = vm.interpret();
        assert_eq!(run.commands, 2);
        assert_eq!(vm.machine().accumulator(), 1);
        assert_eq!(vm.pc(), 17);
    }

    #[test]
    fn halt_ignored_when_not_allowed() {
        let g = Genome::program(&[HALT]);
        let mut vm = machine(MachineConfig::new().with_allow_halt(false).with_max_commands(20));
        vm.set_from_genetic_string(&g.bytes()).unwrap();
        let run = vm.interpret();
        assert_eq!(run.reason, StopReason::CommandBudget);
        assert_eq!(run.commands, 20);
        assert!(vm.halted());
    }

    #[test]
    fn halted_flag_cleared_each_run() {
        let g = Genome::program(&[ldi(0), HALT]);
        let mut vm = machine(MachineConfig::new().with_max_commands(1));
        vm.set_from_genetic_string(&g.bytes()).unwrap();
        vm.interpret_n(2);
        assert!(vm.halted());
        vm.set_from_genetic_string(&g.bytes()).unwrap();
        vm.interpret();
        assert!(!vm.halted());
    }

    #[test]
    fn occurrence_histogram_counts_categories() {
        let g = Genome::program(&[ldi(2), OUT, OUT, sta(3), HALT]);
        let cfg = MachineConfig::new().with_ram_size(8);
        let mut vm: Interpreter<RegisterMachine<TouchCounter>> = Interpreter::new(cfg).unwrap();
        vm.set_from_genetic_string(&g.bytes()).unwrap();
        vm.interpret();
        // ldi, jnz, sta, lda, add, stm, out, halt
        assert_eq!(vm.occurrences(), &[1, 0, 1, 0, 0, 0, 2, 1]);
        assert_eq!(vm.machine().rom().touches()[..6], [1, 1, 1, 1, 1, 0]);
        assert_eq!(vm.machine().rom().distinct_touched(), 5);

        // counters restart on the next run
        vm.set_from_genetic_string(&g.bytes()).unwrap();
        vm.interpret();
        assert_eq!(vm.occurrences(), &[1, 0, 1, 0, 0, 0, 2, 1]);
    }

    #[test]
    fn disassembly_shows_operands() {
        let g = Genome::program(&[ldi(5), sta(2), add(0b1011), jnz(3), OUT]);
        let mut vm = machine(MachineConfig::new());
        vm.set_from_genetic_string(&g.bytes()).unwrap();
        let text = vm.disassemble();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "00: 05  ldi 5");
        assert_eq!(lines[1], "01: 62  sta r2");
        assert_eq!(lines[2], "02: 7B  add r3");
        assert_eq!(lines[3], "03: 43  jnz 3");
        assert_eq!(lines[4], "04: C0  out");
        assert_eq!(lines[5], "05: E0  halt");
    }
}
