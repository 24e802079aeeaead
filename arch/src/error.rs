use thiserror::Error;

use crate::op::{Field, OpCode};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown opcode: {0}")]
    UnknownOpcode(u8),

    #[error("{0}: {1} field must be zero but is 0x{2:x}")]
    NonZeroField(OpCode, Field, u32),

    #[error("Address 0x{0:x} is outside of the image")]
    OutOfRange(usize),

    #[error("Image of {0} bytes does not fit into the 128 KiB image")]
    TooLarge(usize),

    #[error("Hex syntax error in line {0}: `{1}`")]
    HexSyntax(usize, String),
}
