use mlarch::OpCode;
use thiserror::Error;

/// Contract violation by the simulated program.
#[derive(Error, Debug)]
pub enum Fault {
    #[error(transparent)]
    Decode(#[from] mlarch::Error),

    #[error("PC 0x{0:x} is outside of the image")]
    PcOutOfRange(u32),

    #[error("Misaligned {0} address 0x{1:05x}")]
    Misaligned(&'static str, u32),

    #[error("Shift amount {0} is not less than 32")]
    ShiftTooLarge(u32),

    #[error("Count {0} exceeds the cache size")]
    CountTooLarge(u32),

    #[error("ContinueLoad without a preceding load")]
    StrayContinueLoad,

    #[error("{0} cannot be executed from the code cache")]
    NotDatapath(OpCode),

    #[error("Step limit of {0} reached")]
    StepLimit(u64),

    #[error("Call depth limit of {0} reached")]
    DepthLimit(usize),

    #[error("Failed to write trace")]
    Trace(#[source] std::io::Error),

    #[error("at 0x{pc:05x}: {source}")]
    At { pc: u32, source: Box<Fault> },
}

impl Fault {
    /// The fault without its location.
    pub fn root(&self) -> &Fault {
        match self {
            Fault::At { source, .. } => source.root(),
            fault => fault,
        }
    }
}

/// Failure of the command line tool.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to write file: {0}")]
    FileWrite(String, #[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Config(String, #[source] serde_yaml::Error),

    #[error(transparent)]
    Image(#[from] mlarch::Error),

    #[error(transparent)]
    Fault(#[from] Fault),
}
