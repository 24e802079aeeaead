use color_print::cprintln;
use mlarch::OpCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown operation: `{0}`")]
    UnknownOperation(String),

    #[error("`{0}` takes {1} operand(s) but {2} were given")]
    Arity(OpCode, usize, usize),

    #[error("Syntax Error: {0}")]
    SyntaxError(String),

    #[error("Cannot parse `{0}` as a byte (0 to 255)")]
    ByteLiteral(String),

    #[error("Data row has {0} bytes, which is not a multiple of 4")]
    DataRow(usize),

    #[error("Cursor cannot move backward from 0x{0:05x} to {1}")]
    Backward(usize, i64),

    #[error("Section address 0x{0:x} is not word aligned")]
    Misaligned(i64),

    #[error("Re-defined symbol: `{0}` (first defined in line {1})")]
    RedefinedSymbol(String, usize),

    #[error("Symbol `{0}` used but not defined")]
    UndefinedSymbol(String),

    #[error("Value {1} of `{0}` is not a multiple of divisor {2}")]
    NotMultiple(String, i64, i64),

    #[error(transparent)]
    Image(#[from] mlarch::Error),

    #[error("line {0}: {1}")]
    Line(usize, Box<Error>),

    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to read file: {0}")]
    FileRead(String, #[source] std::io::Error),

    #[error("Failed to write file: {0}")]
    FileWrite(String, #[source] std::io::Error),
}

impl Error {
    /// Attach a 1-based source line.
    pub fn at(self, line: usize) -> Self {
        match self {
            err @ Error::Line(..) => err,
            err => Error::Line(line, Box::new(err)),
        }
    }

    /// Print error with diagnostic information showing file location and line content
    pub fn print_diag(&self, file: &str, lines: &[&str]) {
        let Error::Line(line_num, inner) = self else {
            cprintln!("<red,bold>error</>: {}", self);
            return;
        };

        cprintln!("<red,bold>error</>: {}", inner);
        cprintln!("     <blue>--></> <underline>{}:{}</>", file, line_num);
        cprintln!("      <blue>|</>");
        let line_content = lines.get(line_num.wrapping_sub(1)).copied().unwrap_or("");
        cprintln!(" <blue>{:>4} |</> {}", line_num, line_content);
        cprintln!("      <blue>|</>");
    }
}
