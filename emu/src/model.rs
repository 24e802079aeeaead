use mlarch::inst::{Base, CACHE_SIZE};
use mlarch::Image;

/// Architectural state of the accelerator.
#[derive(Debug, Clone)]
pub struct Sim {
    pub(crate) pc: u32,
    pub(crate) vbp: u32,
    pub(crate) lbp: u32,
    pub(crate) sbp: u32,
    pub(crate) cbp: u32,
    pub(crate) acc0: i32,
    pub(crate) acc1: i32,
    pub(crate) code: Vec<u32>,
    pub(crate) coeff0: Vec<u64>,
    pub(crate) coeff1: Vec<u64>,
    pub(crate) mem: Image,
    pub(crate) stack: Vec<u32>,
}

impl Sim {
    pub fn new(mem: Image) -> Self {
        Sim {
            pc: 0,
            vbp: 0,
            lbp: 0,
            sbp: 0,
            cbp: 0,
            acc0: 0,
            acc1: 0,
            code: vec![0; CACHE_SIZE],
            coeff0: vec![0; CACHE_SIZE],
            coeff1: vec![0; CACHE_SIZE],
            mem,
            stack: vec![],
        }
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn base(&self, base: Base) -> u32 {
        match base {
            Base::VBP => self.vbp,
            Base::LBP => self.lbp,
            Base::SBP => self.sbp,
            Base::CBP => self.cbp,
        }
    }

    pub(crate) fn base_mut(&mut self, base: Base) -> &mut u32 {
        match base {
            Base::VBP => &mut self.vbp,
            Base::LBP => &mut self.lbp,
            Base::SBP => &mut self.sbp,
            Base::CBP => &mut self.cbp,
        }
    }

    pub fn acc(&self) -> (i32, i32) {
        (self.acc0, self.acc1)
    }

    pub fn set_acc(&mut self, acc0: i32, acc1: i32) {
        self.acc0 = acc0;
        self.acc1 = acc1;
    }

    pub fn code(&self, slot: usize) -> u32 {
        self.code[slot % CACHE_SIZE]
    }

    pub fn coeff(&self, slot: usize) -> (u64, u64) {
        (self.coeff0[slot % CACHE_SIZE], self.coeff1[slot % CACHE_SIZE])
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn mem(&self) -> &Image {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut Image {
        &mut self.mem
    }

    pub fn into_image(self) -> Image {
        self.mem
    }
}
