//! OCI Configuration
//!
//! Defines segment sizes and run budgets for an op-code interpreter.
//! Configuration specifies constraints only; enforcement is handled by the
//! machine (segment sizes) and the execution loop (budgets).

use crate::error::{OciError, OciResult};

/// Machine configuration, fixed for the lifetime of an interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    /// Data memory size in words. Also the combined segment of the
    /// von-Neumann machine and the stack machine's only segment.
    pub ram_size: usize,

    /// Program memory size in words (Harvard machine only)
    pub rom_size: usize,

    /// Instructions executed by `interpret` before it stops
    pub max_commands: u64,

    /// Output bytes after which `interpret` stops
    pub max_output_bytes: usize,

    /// Whether an executed halt instruction ends the run
    pub allow_halt: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            ram_size: 256,
            rom_size: 256,
            max_commands: 10_000,
            max_output_bytes: 4096,
            allow_halt: true,
        }
    }
}

impl MachineConfig {
    /// Create a new configuration with default sizes and budgets
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ram_size(mut self, words: usize) -> Self {
        self.ram_size = words;
        self
    }

    pub fn with_rom_size(mut self, words: usize) -> Self {
        self.rom_size = words;
        self
    }

    pub fn with_max_commands(mut self, commands: u64) -> Self {
        self.max_commands = commands;
        self
    }

    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    pub fn with_allow_halt(mut self, allow: bool) -> Self {
        self.allow_halt = allow;
        self
    }

    /// Check a segment size against the masking scheme and the width of the
    /// pointer that addresses it.
    pub fn validate_segment(field: &'static str, size: usize, max: usize) -> OciResult<usize> {
        if size == 0 {
            return Err(OciError::config(field, "segment size must be non-zero"));
        }
        if !size.is_power_of_two() {
            return Err(OciError::config(
                field,
                format!("segment size {} is not a power of two", size),
            ));
        }
        if size > max {
            return Err(OciError::config(
                field,
                format!("segment size {} exceeds the addressable {}", size, max),
            ));
        }
        Ok(size)
    }
}
