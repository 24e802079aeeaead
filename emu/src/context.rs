use std::fmt;
use std::io::Write;

use crate::error::Fault;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub cycles: u64,
    /// MACC-family instructions
    pub ops: u64,
    /// Sequencer steps
    pub steps: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_steps: u64,
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_steps: 100_000_000,
            max_depth: 1024,
        }
    }
}

/// Per-run bookkeeping passed to every execution call.
#[derive(Default)]
pub struct Context<'a> {
    pub stats: Stats,
    pub limits: Limits,
    trace: Option<&'a mut dyn Write>,
}

impl<'a> Context<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_trace(mut self, sink: &'a mut dyn Write) -> Self {
        self.trace = Some(sink);
        self
    }

    /// Write one trace line: the instruction, `//`, and its effect.
    pub fn trace(&mut self, insn: impl fmt::Display, effect: fmt::Arguments) -> Result<(), Fault> {
        match self.trace.as_mut() {
            Some(sink) => writeln!(sink, "{} // {}", insn, effect).map_err(Fault::Trace),
            None => Ok(()),
        }
    }
}
