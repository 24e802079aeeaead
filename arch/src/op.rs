use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumIter, EnumString};

/// Opcode numbers of the accelerator. The variant name is the assembler
/// mnemonic.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    TryFromPrimitive,
    IntoPrimitive,
    EnumString,
    Display,
    EnumIter,
)]
#[repr(u8)]
pub enum OpCode {
    // Sequencer
    Sync = 0,
    Call = 1,
    Return = 2,
    Execute = 3,
    LoadCode = 4,
    LoadCoeff0 = 5,
    LoadCoeff1 = 6,
    ContinueLoad = 7,

    // Base pointers
    SetVBP = 8,
    AddVBP = 9,
    SetLBP = 10,
    AddLBP = 11,
    SetSBP = 12,
    AddSBP = 13,
    SetCBP = 14,
    AddCBP = 15,

    // Accumulator output
    Store = 16,
    Store0 = 17,
    Store1 = 18,
    ReLU = 20,
    ReLU0 = 21,
    ReLU1 = 22,
    Save = 24,
    Save0 = 25,
    Save1 = 26,

    // Accumulator input
    LdSet = 28,
    LdSet0 = 29,
    LdSet1 = 30,
    LdAdd = 32,
    LdAdd0 = 33,
    LdAdd1 = 34,
    LdMax = 36,
    LdMax0 = 37,
    LdMax1 = 38,

    // Compute
    MACC = 40,
    MMAX = 41,
    MACCZ = 42,
    MMAXZ = 43,
    MMAXN = 45,
}

impl OpCode {
    /// Look up a mnemonic. Mnemonics are case sensitive.
    pub fn parse(s: &str) -> Option<Self> {
        s.parse::<Self>().ok()
    }

    pub fn format(self) -> Format {
        use OpCode::*;
        match self {
            Sync | Return => Format::A,
            Call | ContinueLoad => Format::M,
            Execute => Format::CM,
            LoadCode | LoadCoeff0 | LoadCoeff1 => Format::MC,
            SetVBP | AddVBP | SetLBP | AddLBP | SetSBP | AddSBP => Format::M,
            SetCBP | AddCBP => Format::C,
            Store | Store0 | Store1 | ReLU | ReLU0 | ReLU1 => Format::MC,
            Save | Save0 | Save1 => Format::M,
            LdSet | LdSet0 | LdSet1 | LdAdd | LdAdd0 | LdAdd1 | LdMax | LdMax0 | LdMax1 => {
                Format::M
            }
            MACC | MMAX | MACCZ | MMAXZ | MMAXN => Format::MC,
        }
    }

    /// Sequencer instructions cannot be placed in the code cache.
    pub fn is_sequencer(self) -> bool {
        (self as u8) < 8
    }
}

/// Instruction word field an operand is added into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Field {
    #[strum(serialize = "maddr")]
    Maddr,
    #[strum(serialize = "caddr")]
    Caddr,
}

/// Operand layout of a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// No operand
    A,
    /// Memory address
    M,
    /// Coefficient address
    C,
    /// Memory address, coefficient address
    MC,
    /// Cache index, count
    CM,
}

impl Format {
    /// Fields the operands land in, in source order.
    pub fn fields(self) -> &'static [Field] {
        match self {
            Format::A => &[],
            Format::M => &[Field::Maddr],
            Format::C => &[Field::Caddr],
            Format::MC => &[Field::Maddr, Field::Caddr],
            Format::CM => &[Field::Caddr, Field::Maddr],
        }
    }

    pub fn arity(self) -> usize {
        self.fields().len()
    }
}
