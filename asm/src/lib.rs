pub mod assembler;
pub mod error;
pub mod expr;
pub mod listing;
pub mod symbol;

pub use assembler::{Assembler, Insn, Program, State};
pub use error::Error;
pub use symbol::{Action, Symbol, Symbols};

use mlarch::Image;

/// Assemble a listing into a memory image.
pub fn assemble(listing: &str) -> Result<Image, Error> {
    Ok(Program::assemble(listing)?.image)
}
