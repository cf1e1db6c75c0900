//! Interpreter Core
//!
//! One execution loop shared by every machine variant. A variant supplies
//! its state, genome layout, fetch step and instruction handlers through the
//! [`Machine`] trait; the interpreter owns the decode table, the output sink,
//! the halt flag and the occurrence histogram, and applies the halting policy.

use std::fmt::{Debug, Display};

use tracing::{debug, trace};

use crate::bytecode::decoder::{Decoder, InstructionSet};
use crate::bytecode::instruction::Instruction;
use crate::config::MachineConfig;
use crate::error::OciResult;
use crate::genome::{GenomeReader, GenomeWriter};

use super::output::OutputSink;
use super::probe::Probe;

/// What the loop does after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The instruction asked the machine to stop
    Halt,
}

/// Why `interpret` returned. All three are normal terminations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Halted,
    CommandBudget,
    OutputBudget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub commands: u64,
    pub reason: StopReason,
}

/// A machine variant: state, genome layout and instruction semantics
pub trait Machine: Sized + Send {
    type Op: Copy + Debug + Display + Send + Sync + 'static;

    /// Probe used for the occurrence histogram, matching the one the
    /// machine's segments use for touch counts
    type Probe: Probe;

    const NAME: &'static str;

    /// Decode description, see [`Decoder::build`]
    const INSTRUCTION_SET: &'static InstructionSet<Self::Op>;

    /// Allocate zeroed state sized by `config`
    fn with_config(config: &MachineConfig) -> OciResult<Self>;

    fn genetic_string_size(&self) -> usize;

    /// Overwrite pc, registers and memory in layout order
    fn load(&mut self, genome: &mut GenomeReader<'_>) -> OciResult<()>;

    fn save(&self, genome: &mut GenomeWriter);

    fn pc(&self) -> usize;

    /// Read the opcode byte at the program counter and advance past it
    fn fetch(&mut self) -> u8;

    fn execute(&mut self, instr: Instruction<Self::Op>, out: &mut OutputSink) -> Flow;

    fn reset_touches(&mut self);

    /// Human-readable listing of the program segment
    fn disassemble(&self, decoder: &Decoder<Self::Op>) -> String;
}

/// Op-code interpreter for machine variant `M`
#[derive(Debug)]
pub struct Interpreter<M: Machine> {
    config: MachineConfig,
    machine: M,
    decoder: Decoder<M::Op>,
    output: OutputSink,
    occurrences: M::Probe,
    halted: bool,
}

impl<M: Machine> Interpreter<M> {
    /// Create an interpreter with zeroed machine state
    pub fn new(config: MachineConfig) -> OciResult<Self> {
        let machine = M::with_config(&config)?;
        let decoder = Decoder::build(M::INSTRUCTION_SET)?;
        debug!(
            machine = M::NAME,
            genome_bytes = machine.genetic_string_size(),
            max_commands = config.max_commands,
            max_output_bytes = config.max_output_bytes,
            allow_halt = config.allow_halt,
            instrumented = <M::Probe as Probe>::ENABLED,
            "interpreter created"
        );
        Ok(Interpreter {
            occurrences: <M::Probe as Probe>::with_len(decoder.categories()),
            decoder,
            machine,
            output: OutputSink::new(),
            halted: false,
            config,
        })
    }

    /// Exact number of bytes `set_from_genetic_string` consumes
    pub fn genetic_string_size(&self) -> usize {
        self.machine.genetic_string_size()
    }

    /// Replace pc, registers and memory with the contents of `genome`.
    /// A genome shorter than required is rejected and nothing is changed.
    pub fn set_from_genetic_string(&mut self, genome: &[u8]) -> OciResult<()> {
        let mut reader = GenomeReader::new(genome, self.genetic_string_size())?;
        self.machine.load(&mut reader)?;
        debug!(machine = M::NAME, pc = self.machine.pc(), "genome loaded");
        if reader.trailing() > 0 {
            debug!(
                machine = M::NAME,
                trailing = reader.trailing(),
                "ignoring bytes past the genome layout"
            );
        }
        Ok(())
    }

    /// Serialize the current state in genome layout
    pub fn to_genetic_string(&self) -> Vec<u8> {
        let mut writer = GenomeWriter::with_capacity(self.genetic_string_size());
        self.machine.save(&mut writer);
        writer.finish()
    }

    /// Run until halted (when allowed), the command budget is spent, or the
    /// output budget is reached
    pub fn interpret(&mut self) -> RunSummary {
        self.begin_run();

        let mut commands = 0u64;
        let reason = loop {
            if commands >= self.config.max_commands {
                break StopReason::CommandBudget;
            }
            if self.output.len() >= self.config.max_output_bytes {
                break StopReason::OutputBudget;
            }
            let flow = self.step();
            commands += 1;
            if flow == Flow::Halt {
                self.halted = true;
                if self.config.allow_halt {
                    break StopReason::Halted;
                }
            }
        };

        let summary = RunSummary { commands, reason };
        self.finish_run(&summary);
        summary
    }

    /// Run exactly `n` instructions, ignoring every halting condition
    pub fn interpret_n(&mut self, n: u64) {
        self.begin_run();
        for _ in 0..n {
            if self.step() == Flow::Halt {
                self.halted = true;
            }
        }
        self.finish_run(&RunSummary {
            commands: n,
            reason: StopReason::CommandBudget,
        });
    }

    #[inline(always)]
    fn step(&mut self) -> Flow {
        let byte = self.machine.fetch();
        let instr = self.decoder.decode(byte);
        self.occurrences.hit(instr.category as usize);
        self.machine.execute(instr, &mut self.output)
    }

    fn begin_run(&mut self) {
        self.halted = false;
        self.output.clear();
        if <M::Probe as Probe>::ENABLED {
            self.occurrences.reset();
            self.machine.reset_touches();
        }
    }

    fn finish_run(&self, summary: &RunSummary) {
        debug!(
            machine = M::NAME,
            commands = summary.commands,
            reason = ?summary.reason,
            output_bytes = self.output.len(),
            halted = self.halted,
            "run finished"
        );
        if <M::Probe as Probe>::ENABLED {
            trace!(
                machine = M::NAME,
                occurrences = ?self.occurrences.counts(),
                "instruction histogram"
            );
        }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn decoder(&self) -> &Decoder<M::Op> {
        &self.decoder
    }

    pub fn pc(&self) -> usize {
        self.machine.pc()
    }

    /// Bytes written by the last run
    pub fn output(&self) -> &[u8] {
        self.output.as_slice()
    }

    pub fn output_len(&self) -> usize {
        self.output.len()
    }

    pub fn output_capacity(&self) -> usize {
        self.output.capacity()
    }

    /// Whether a halt instruction executed during the last run
    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Executions per instruction category in the last run; empty when
    /// uninstrumented
    pub fn occurrences(&self) -> &[u64] {
        self.occurrences.counts()
    }

    pub fn disassemble(&self) -> String {
        self.machine.disassemble(&self.decoder)
    }
}

/// Object-safe runtime surface of an interpreter, for callers that pick the
/// machine variant at run time
pub trait Oci: Send {
    fn name(&self) -> &'static str;
    fn genetic_string_size(&self) -> usize;
    fn set_from_genetic_string(&mut self, genome: &[u8]) -> OciResult<()>;
    fn to_genetic_string(&self) -> Vec<u8>;
    fn interpret(&mut self) -> RunSummary;
    fn interpret_n(&mut self, n: u64);
    fn pc(&self) -> usize;
    fn output(&self) -> &[u8];
    fn halted(&self) -> bool;
    fn occurrences(&self) -> &[u64];
    fn disassemble(&self) -> String;
}

impl<M: Machine> Oci for Interpreter<M> {
    fn name(&self) -> &'static str {
        M::NAME
    }

    fn genetic_string_size(&self) -> usize {
        Interpreter::genetic_string_size(self)
    }

    fn set_from_genetic_string(&mut self, genome: &[u8]) -> OciResult<()> {
        Interpreter::set_from_genetic_string(self, genome)
    }

    fn to_genetic_string(&self) -> Vec<u8> {
        Interpreter::to_genetic_string(self)
    }

    fn interpret(&mut self) -> RunSummary {
        Interpreter::interpret(self)
    }

    fn interpret_n(&mut self, n: u64) {
        Interpreter::interpret_n(self, n)
    }

    fn pc(&self) -> usize {
        Interpreter::pc(self)
    }

    fn output(&self) -> &[u8] {
        Interpreter::output(self)
    }

    fn halted(&self) -> bool {
        Interpreter::halted(self)
    }

    fn occurrences(&self) -> &[u64] {
        Interpreter::occurrences(self)
    }

    fn disassemble(&self) -> String {
        Interpreter::disassemble(self)
    }
}
