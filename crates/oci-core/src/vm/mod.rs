pub mod interpreter;
pub mod memory;
pub mod output;
pub mod probe;

pub use interpreter::{Flow, Interpreter, Machine, Oci, RunSummary, StopReason};
pub use memory::{Segment, Word};
pub use output::OutputSink;
pub use probe::{NoProbe, Probe, TouchCounter};
