use std::fmt;

use color_print::cformat;
use strum::Display;

use crate::error::Error;
use crate::op::{Field, OpCode};

// ----------------------------------------------------------------------------
// Instruction word
//
//  31             15 14       6 5      0
// +-----------------+----------+--------+
// |      maddr      |  caddr   | opcode |
// +-----------------+----------+--------+

pub const OPCODE_MASK: u32 = 0x3f;
pub const CADDR_SHIFT: u32 = 6;
pub const CADDR_MASK: u32 = 0x1ff;
pub const MADDR_SHIFT: u32 = 15;
pub const MADDR_MASK: u32 = 0x1ffff;

/// Number of entries of the code and coefficient caches.
pub const CACHE_SIZE: usize = 512;

/// Pack the three fields. Each field is truncated to its width.
pub fn enc_format(opcode: u8, maddr: u32, caddr: u32) -> u32 {
    ((maddr & MADDR_MASK) << MADDR_SHIFT)
        | ((caddr & CADDR_MASK) << CADDR_SHIFT)
        | (opcode as u32 & OPCODE_MASK)
}

/// Split a word into `(opcode, maddr, caddr)`.
pub fn dec_format(bin: u32) -> (u8, u32, u32) {
    let opcode = (bin & OPCODE_MASK) as u8;
    let caddr = (bin >> CADDR_SHIFT) & CADDR_MASK;
    let maddr = (bin >> MADDR_SHIFT) & MADDR_MASK;
    (opcode, maddr, caddr)
}

// ----------------------------------------------------------------------------
// Operand kinds

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Base {
    VBP,
    LBP,
    SBP,
    CBP,
}

impl Base {
    pub fn mask(self) -> u32 {
        match self {
            Base::CBP => CADDR_MASK,
            _ => MADDR_MASK,
        }
    }
}

/// Destination of a `LoadCode`/`LoadCoeff` transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cache {
    Code,
    Coeff0,
    Coeff1,
}

impl Cache {
    /// Bytes moved per cache entry.
    pub fn stride(self) -> u32 {
        match self {
            Cache::Code => 4,
            Cache::Coeff0 | Cache::Coeff1 => 8,
        }
    }
}

/// Accumulator lanes touched by an instruction (no suffix, `0` or `1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lanes {
    Both,
    Lane0,
    Lane1,
}

impl Lanes {
    pub fn lane0(self) -> bool {
        matches!(self, Lanes::Both | Lanes::Lane0)
    }

    pub fn lane1(self) -> bool {
        matches!(self, Lanes::Both | Lanes::Lane1)
    }
}

/// How a loaded word is combined with an accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    Set,
    Add,
    Max,
}

/// Accumulator state before a MACC/MMAX reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seed {
    Keep,
    Zero,
    Min,
}

/// Reduction of a MACC-family instruction. Only MMAX may start from the
/// `Seed::Min` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    Sum { zero: bool },
    Max(Seed),
}

impl Reduce {
    pub fn seed(self) -> Seed {
        match self {
            Reduce::Sum { zero: false } => Seed::Keep,
            Reduce::Sum { zero: true } => Seed::Zero,
            Reduce::Max(seed) => seed,
        }
    }
}

// ----------------------------------------------------------------------------
// Decoded instruction

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Sync,
    Call(u32),
    Return,
    Execute { slot: u32, len: u32 },
    Load { cache: Cache, src: u32, slot: u32 },
    ContinueLoad(u32),
    SetBase(Base, u32),
    AddBase(Base, u32),
    Store { lanes: Lanes, relu: bool, addr: u32, shift: u32 },
    Save { lanes: Lanes, addr: u32 },
    Fetch { combine: Combine, lanes: Lanes, addr: u32 },
    Macc { reduce: Reduce, addr: u32, slot: u32 },
}

impl Op {
    pub fn opcode(&self) -> OpCode {
        use OpCode::*;
        match *self {
            Op::Sync => Sync,
            Op::Call(_) => Call,
            Op::Return => Return,
            Op::Execute { .. } => Execute,
            Op::Load { cache, .. } => match cache {
                Cache::Code => LoadCode,
                Cache::Coeff0 => LoadCoeff0,
                Cache::Coeff1 => LoadCoeff1,
            },
            Op::ContinueLoad(_) => ContinueLoad,
            Op::SetBase(base, _) => match base {
                Base::VBP => SetVBP,
                Base::LBP => SetLBP,
                Base::SBP => SetSBP,
                Base::CBP => SetCBP,
            },
            Op::AddBase(base, _) => match base {
                Base::VBP => AddVBP,
                Base::LBP => AddLBP,
                Base::SBP => AddSBP,
                Base::CBP => AddCBP,
            },
            Op::Store { lanes, relu, .. } => match (relu, lanes) {
                (false, Lanes::Both) => Store,
                (false, Lanes::Lane0) => Store0,
                (false, Lanes::Lane1) => Store1,
                (true, Lanes::Both) => ReLU,
                (true, Lanes::Lane0) => ReLU0,
                (true, Lanes::Lane1) => ReLU1,
            },
            Op::Save { lanes, .. } => match lanes {
                Lanes::Both => Save,
                Lanes::Lane0 => Save0,
                Lanes::Lane1 => Save1,
            },
            Op::Fetch { combine, lanes, .. } => match (combine, lanes) {
                (Combine::Set, Lanes::Both) => LdSet,
                (Combine::Set, Lanes::Lane0) => LdSet0,
                (Combine::Set, Lanes::Lane1) => LdSet1,
                (Combine::Add, Lanes::Both) => LdAdd,
                (Combine::Add, Lanes::Lane0) => LdAdd0,
                (Combine::Add, Lanes::Lane1) => LdAdd1,
                (Combine::Max, Lanes::Both) => LdMax,
                (Combine::Max, Lanes::Lane0) => LdMax0,
                (Combine::Max, Lanes::Lane1) => LdMax1,
            },
            Op::Macc { reduce, .. } => match reduce {
                Reduce::Sum { zero: false } => MACC,
                Reduce::Sum { zero: true } => MACCZ,
                Reduce::Max(Seed::Keep) => MMAX,
                Reduce::Max(Seed::Zero) => MMAXZ,
                Reduce::Max(Seed::Min) => MMAXN,
            },
        }
    }

    /// Encoded `(maddr, caddr)` fields.
    pub fn fields(&self) -> (u32, u32) {
        match *self {
            Op::Sync | Op::Return => (0, 0),
            Op::Call(addr) => (addr, 0),
            Op::Execute { slot, len } => (len, slot),
            Op::Load { src, slot, .. } => (src, slot),
            Op::ContinueLoad(len) => (len, 0),
            Op::SetBase(Base::CBP, v) | Op::AddBase(Base::CBP, v) => (0, v),
            Op::SetBase(_, v) | Op::AddBase(_, v) => (v, 0),
            Op::Store { addr, shift, .. } => (addr, shift),
            Op::Save { addr, .. } | Op::Fetch { addr, .. } => (addr, 0),
            Op::Macc { addr, slot, .. } => (addr, slot),
        }
    }

    pub fn to_bin(&self) -> u32 {
        let (maddr, caddr) = self.fields();
        enc_format(self.opcode().into(), maddr, caddr)
    }

    /// Decode an instruction word. Fields the instruction does not use must
    /// be zero, so that every decoded `Op` encodes back to the same word.
    pub fn from_bin(bin: u32) -> Result<Op, Error> {
        use OpCode::*;
        let (opcode, maddr, caddr) = dec_format(bin);
        let code = OpCode::try_from(opcode).map_err(|_| Error::UnknownOpcode(opcode))?;

        let store = |lanes, relu| Op::Store {
            lanes,
            relu,
            addr: maddr,
            shift: caddr,
        };
        let fetch = |combine, lanes| Op::Fetch {
            combine,
            lanes,
            addr: maddr,
        };
        let macc = |reduce| Op::Macc {
            reduce,
            addr: maddr,
            slot: caddr,
        };
        let load = |cache| Op::Load {
            cache,
            src: maddr,
            slot: caddr,
        };

        let op = match code {
            Sync => Op::Sync,
            Call => Op::Call(maddr),
            Return => Op::Return,
            Execute => Op::Execute {
                slot: caddr,
                len: maddr,
            },
            LoadCode => load(Cache::Code),
            LoadCoeff0 => load(Cache::Coeff0),
            LoadCoeff1 => load(Cache::Coeff1),
            ContinueLoad => Op::ContinueLoad(maddr),
            SetVBP => Op::SetBase(Base::VBP, maddr),
            AddVBP => Op::AddBase(Base::VBP, maddr),
            SetLBP => Op::SetBase(Base::LBP, maddr),
            AddLBP => Op::AddBase(Base::LBP, maddr),
            SetSBP => Op::SetBase(Base::SBP, maddr),
            AddSBP => Op::AddBase(Base::SBP, maddr),
            SetCBP => Op::SetBase(Base::CBP, caddr),
            AddCBP => Op::AddBase(Base::CBP, caddr),
            Store => store(Lanes::Both, false),
            Store0 => store(Lanes::Lane0, false),
            Store1 => store(Lanes::Lane1, false),
            ReLU => store(Lanes::Both, true),
            ReLU0 => store(Lanes::Lane0, true),
            ReLU1 => store(Lanes::Lane1, true),
            Save => Op::Save {
                lanes: Lanes::Both,
                addr: maddr,
            },
            Save0 => Op::Save {
                lanes: Lanes::Lane0,
                addr: maddr,
            },
            Save1 => Op::Save {
                lanes: Lanes::Lane1,
                addr: maddr,
            },
            LdSet => fetch(Combine::Set, Lanes::Both),
            LdSet0 => fetch(Combine::Set, Lanes::Lane0),
            LdSet1 => fetch(Combine::Set, Lanes::Lane1),
            LdAdd => fetch(Combine::Add, Lanes::Both),
            LdAdd0 => fetch(Combine::Add, Lanes::Lane0),
            LdAdd1 => fetch(Combine::Add, Lanes::Lane1),
            LdMax => fetch(Combine::Max, Lanes::Both),
            LdMax0 => fetch(Combine::Max, Lanes::Lane0),
            LdMax1 => fetch(Combine::Max, Lanes::Lane1),
            MACC => macc(Reduce::Sum { zero: false }),
            MMAX => macc(Reduce::Max(Seed::Keep)),
            MACCZ => macc(Reduce::Sum { zero: true }),
            MMAXZ => macc(Reduce::Max(Seed::Zero)),
            MMAXN => macc(Reduce::Max(Seed::Min)),
        };

        let (used_maddr, used_caddr) = op.fields();
        if used_maddr != maddr {
            return Err(Error::NonZeroField(code, Field::Maddr, maddr));
        }
        if used_caddr != caddr {
            return Err(Error::NonZeroField(code, Field::Caddr, caddr));
        }
        Ok(op)
    }

    /// Operands in assembler order, formatted as hex literals.
    fn operands(&self) -> Vec<String> {
        let (maddr, caddr) = self.fields();
        self.opcode()
            .format()
            .fields()
            .iter()
            .map(|field| match field {
                Field::Maddr => format!("0x{:05x}", maddr),
                Field::Caddr => format!("0x{:03x}", caddr),
            })
            .collect()
    }

    pub fn cformat(&self) -> String {
        cformat!(
            "<r>{:<13}</><y>{}</>",
            self.opcode().to_string(),
            self.operands().join(", ")
        )
    }
}

/// Prints the instruction in assembler syntax.
impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operands = self.operands();
        if operands.is_empty() {
            write!(f, "{}", self.opcode())
        } else {
            write!(f, "{} {}", self.opcode(), operands.join(", "))
        }
    }
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_fields() {
        for (opcode, maddr, caddr) in [(0, 0, 0), (0x3f, 0x1ffff, 0x1ff), (40, 0x200, 0x11)] {
            let bin = enc_format(opcode, maddr, caddr);
            assert_eq!(dec_format(bin), (opcode, maddr, caddr));
        }
        assert_eq!(enc_format(45, 1, 1), 0x0000_806d);
        assert_eq!(enc_format(1, 0x20000, 0x200), 1);
    }

    macro_rules! test_op {
        ($name:ident, $op:expr) => {
            #[test]
            fn $name() {
                let op = $op;
                let bin = op.to_bin();
                let decoded_op = Op::from_bin(bin).unwrap();
                assert_eq!(op, decoded_op, "op: {:?}, bin: {:08x}", op, bin);
            }
        };
    }

    test_op!(test_call, Op::Call(0x100));
    test_op!(test_execute, Op::Execute { slot: 3, len: 17 });
    test_op!(
        test_load_coeff1,
        Op::Load {
            cache: Cache::Coeff1,
            src: 0x1f008,
            slot: 0x1ff
        }
    );
    test_op!(test_set_cbp, Op::SetBase(Base::CBP, 0x40));
    test_op!(test_add_sbp, Op::AddBase(Base::SBP, 0x1234));
    test_op!(
        test_relu1,
        Op::Store {
            lanes: Lanes::Lane1,
            relu: true,
            addr: 0x300,
            shift: 7
        }
    );
    test_op!(
        test_ldmax0,
        Op::Fetch {
            combine: Combine::Max,
            lanes: Lanes::Lane0,
            addr: 0x80
        }
    );
    test_op!(
        test_mmaxn,
        Op::Macc {
            reduce: Reduce::Max(Seed::Min),
            addr: 0x200,
            slot: 5
        }
    );

    #[test]
    fn macc_family() {
        let family = [
            (OpCode::MACC, Reduce::Sum { zero: false }, Seed::Keep),
            (OpCode::MACCZ, Reduce::Sum { zero: true }, Seed::Zero),
            (OpCode::MMAX, Reduce::Max(Seed::Keep), Seed::Keep),
            (OpCode::MMAXZ, Reduce::Max(Seed::Zero), Seed::Zero),
            (OpCode::MMAXN, Reduce::Max(Seed::Min), Seed::Min),
        ];
        for (code, reduce, seed) in family {
            let op = Op::from_bin(enc_format(code.into(), 0x200, 1)).unwrap();
            assert_eq!(
                op,
                Op::Macc {
                    reduce,
                    addr: 0x200,
                    slot: 1
                }
            );
            assert_eq!(op.opcode(), code);
            assert_eq!(reduce.seed(), seed);
        }
    }

    #[test]
    fn unknown_opcode() {
        assert!(matches!(Op::from_bin(19), Err(Error::UnknownOpcode(19))));
        assert!(matches!(Op::from_bin(63), Err(Error::UnknownOpcode(63))));
    }

    #[test]
    fn unused_field_must_be_zero() {
        // Call with caddr = 1
        let bin = enc_format(OpCode::Call.into(), 0x100, 1);
        assert!(matches!(
            Op::from_bin(bin),
            Err(Error::NonZeroField(OpCode::Call, Field::Caddr, 1))
        ));
        // Return with maddr = 4
        let bin = enc_format(OpCode::Return.into(), 4, 0);
        assert!(matches!(
            Op::from_bin(bin),
            Err(Error::NonZeroField(OpCode::Return, Field::Maddr, 4))
        ));
        // SetCBP with maddr = 8
        let bin = enc_format(OpCode::SetCBP.into(), 8, 0);
        assert!(Op::from_bin(bin).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(Op::Return.to_string(), "Return");
        assert_eq!(Op::Call(0x40).to_string(), "Call 0x00040");
        assert_eq!(
            Op::Execute { slot: 2, len: 9 }.to_string(),
            "Execute 0x002, 0x00009"
        );
        assert_eq!(Op::SetBase(Base::CBP, 3).to_string(), "SetCBP 0x003");
        assert_eq!(
            Op::Macc {
                reduce: Reduce::Sum { zero: true },
                addr: 0x200,
                slot: 0
            }
            .to_string(),
            "MACCZ 0x00200, 0x000"
        );
    }
}
