//! Machine variants and a run-time factory over them

use std::fmt;
use std::str::FromStr;

use crate::config::MachineConfig;
use crate::error::{OciError, OciResult};
use crate::vm::interpreter::{Interpreter, Oci};
use crate::vm::probe::{NoProbe, TouchCounter};

pub mod register;
pub mod sbnz;
pub mod stack;

pub use register::{RegisterMachine, RegisterOp};
pub use sbnz::{SbnzHarvard, SbnzOp, SbnzVonNeumann};
pub use stack::{StackMachine, StackOp};

pub type VonNeumannOci = Interpreter<SbnzVonNeumann<NoProbe>>;
pub type HarvardOci = Interpreter<SbnzHarvard<NoProbe>>;
pub type StackOci = Interpreter<StackMachine<NoProbe>>;
pub type RegisterOci = Interpreter<RegisterMachine<NoProbe>>;

pub type TracedVonNeumannOci = Interpreter<SbnzVonNeumann<TouchCounter>>;
pub type TracedHarvardOci = Interpreter<SbnzHarvard<TouchCounter>>;
pub type TracedStackOci = Interpreter<StackMachine<TouchCounter>>;
pub type TracedRegisterOci = Interpreter<RegisterMachine<TouchCounter>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineKind {
    VonNeumann,
    Harvard,
    Stack,
    Register,
}

impl MachineKind {
    pub const ALL: [MachineKind; 4] = [
        MachineKind::VonNeumann,
        MachineKind::Harvard,
        MachineKind::Stack,
        MachineKind::Register,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MachineKind::VonNeumann => "von-neumann",
            MachineKind::Harvard => "harvard",
            MachineKind::Stack => "stack",
            MachineKind::Register => "register",
        }
    }
}

impl fmt::Display for MachineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MachineKind {
    type Err = OciError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MachineKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| OciError::config("machine", format!("unknown machine kind {:?}", s)))
    }
}

/// Whether touch counters and the occurrence histogram are compiled in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Instrumentation {
    #[default]
    Off,
    On,
}

/// Build an interpreter for a variant chosen at run time
pub fn build(
    kind: MachineKind,
    config: MachineConfig,
    instrumentation: Instrumentation,
) -> OciResult<Box<dyn Oci>> {
    let oci: Box<dyn Oci> = match (kind, instrumentation) {
        (MachineKind::VonNeumann, Instrumentation::Off) => Box::new(VonNeumannOci::new(config)?),
        (MachineKind::VonNeumann, Instrumentation::On) => {
            Box::new(TracedVonNeumannOci::new(config)?)
        }
        (MachineKind::Harvard, Instrumentation::Off) => Box::new(HarvardOci::new(config)?),
        (MachineKind::Harvard, Instrumentation::On) => Box::new(TracedHarvardOci::new(config)?),
        (MachineKind::Stack, Instrumentation::Off) => Box::new(StackOci::new(config)?),
        (MachineKind::Stack, Instrumentation::On) => Box::new(TracedStackOci::new(config)?),
        (MachineKind::Register, Instrumentation::Off) => Box::new(RegisterOci::new(config)?),
        (MachineKind::Register, Instrumentation::On) => Box::new(TracedRegisterOci::new(config)?),
    };
    Ok(oci)
}
