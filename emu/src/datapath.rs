use mlarch::image::ADDR_MASK;
use mlarch::inst::{Combine, Reduce, Seed, CADDR_MASK};
use mlarch::Op;

use crate::context::Context;
use crate::error::Fault;
use crate::model::Sim;

fn even(what: &'static str, addr: u32) -> Result<u32, Fault> {
    match addr & 1 {
        0 => Ok(addr),
        _ => Err(Fault::Misaligned(what, addr)),
    }
}

fn lane_bytes(word: u64) -> [i8; 8] {
    word.to_le_bytes().map(|b| b as i8)
}

impl Sim {
    /// Execute one MACC engine instruction. Costs one cycle.
    pub fn exec(&mut self, ctx: &mut Context, op: Op) -> Result<(), Fault> {
        ctx.stats.cycles += 1;
        match op {
            Op::SetBase(base, value) => {
                let reg = self.base_mut(base);
                *reg = value & base.mask();
                let reg = *reg;
                ctx.trace(op, format_args!("-> 0x{:05x}", reg))
            }
            Op::AddBase(base, value) => {
                let reg = self.base_mut(base);
                *reg = reg.wrapping_add(value) & base.mask();
                let reg = *reg;
                ctx.trace(op, format_args!("-> 0x{:05x}", reg))
            }
            Op::Store {
                lanes,
                relu,
                addr,
                shift,
            } => {
                if shift >= 32 {
                    return Err(Fault::ShiftTooLarge(shift));
                }
                let ea = self.sbp.wrapping_add(addr) & ADDR_MASK;
                let floor = if relu { 0 } else { -128 };
                let v0 = (self.acc0 >> shift).clamp(floor, 127) as u8;
                let v1 = (self.acc1 >> shift).clamp(floor, 127) as u8;
                if lanes.lane0() {
                    self.mem.set_byte(ea, v0);
                }
                if lanes.lane1() {
                    self.mem.set_byte(ea.wrapping_add(1), v1);
                }
                ctx.trace(
                    op,
                    format_args!(
                        "0x{:08x} 0x{:08x} -> 0x{:02x} 0x{:02x} @ 0x{:05x}",
                        self.acc0, self.acc1, v0, v1, ea
                    ),
                )
            }
            Op::Save { lanes, addr } => {
                let ea = even("save", self.sbp.wrapping_add(addr) & ADDR_MASK)?;
                if lanes.lane0() {
                    self.mem.set_word(ea, self.acc0 as u32);
                }
                if lanes.lane1() {
                    self.mem.set_word(ea.wrapping_add(4), self.acc1 as u32);
                }
                ctx.trace(
                    op,
                    format_args!("0x{:08x} 0x{:08x} @ 0x{:05x}", self.acc0, self.acc1, ea),
                )
            }
            Op::Fetch {
                combine,
                lanes,
                addr,
            } => {
                let ea = even("load", self.lbp.wrapping_add(addr) & ADDR_MASK)?;
                let v0 = self.mem.word(ea) as i32;
                let v1 = self.mem.word(ea.wrapping_add(4)) as i32;
                let apply = |acc: i32, v: i32| match combine {
                    Combine::Set => v,
                    Combine::Add => acc.wrapping_add(v),
                    Combine::Max => acc.max(v),
                };
                if lanes.lane0() {
                    self.acc0 = apply(self.acc0, v0);
                }
                if lanes.lane1() {
                    self.acc1 = apply(self.acc1, v1);
                }
                ctx.trace(
                    op,
                    format_args!("-> 0x{:08x} 0x{:08x}", self.acc0, self.acc1),
                )
            }
            Op::Macc {
                reduce,
                addr,
                slot,
            } => {
                let ea = even("vector", self.vbp.wrapping_add(addr) & ADDR_MASK)?;
                let ci = (self.cbp.wrapping_add(slot) & CADDR_MASK) as usize;
                match reduce.seed() {
                    Seed::Keep => {}
                    Seed::Zero => self.set_acc(0, 0),
                    Seed::Min => self.set_acc(i32::MIN, 0),
                }

                let data = self.mem.dword(ea);
                let c0 = lane_bytes(self.coeff0[ci]);
                let c1 = lane_bytes(self.coeff1[ci]);
                for (i, &m) in lane_bytes(data).iter().enumerate() {
                    let p0 = c0[i] as i32 * m as i32;
                    let p1 = c1[i] as i32 * m as i32;
                    match reduce {
                        Reduce::Sum { .. } => self.acc0 = self.acc0.wrapping_add(p0),
                        // zero coefficient masks the term out of the max
                        Reduce::Max(_) if c0[i] != 0 => self.acc0 = self.acc0.max(p0),
                        Reduce::Max(_) => {}
                    }
                    self.acc1 = self.acc1.wrapping_add(p1);
                }
                ctx.stats.ops += 1;

                ctx.trace(
                    op,
                    format_args!(
                        "0x{:016x} @ 0x{:05x}, 0x{:016x} 0x{:016x} @ 0x{:03x} -> 0x{:08x} 0x{:08x}",
                        data, ea, self.coeff0[ci], self.coeff1[ci], ci, self.acc0, self.acc1
                    ),
                )
            }
            _ => Err(Fault::NotDatapath(op.opcode())),
        }
    }
}
