pub mod error;
pub mod image;
pub mod inst;
pub mod op;

pub use error::Error;
pub use image::{HexStyle, Image, MEM_SIZE};
pub use inst::Op;
pub use op::{Field, Format, OpCode};
