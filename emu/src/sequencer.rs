use mlarch::image::MEM_SIZE;
use mlarch::inst::{dec_format, Cache, CACHE_SIZE, CADDR_MASK};
use mlarch::{Op, OpCode};
use tracing::{debug, trace};

use crate::context::Context;
use crate::error::Fault;
use crate::model::Sim;

enum Flow {
    Next,
    Halt,
}

impl Sim {
    /// Run from `start` until a `Return` with an empty call stack.
    pub fn run(&mut self, ctx: &mut Context, start: u32) -> Result<(), Fault> {
        check_pc(start)?;
        self.pc = start;
        debug!("run from 0x{:05x}", start);
        loop {
            if ctx.stats.steps >= ctx.limits.max_steps {
                return Err(Fault::At {
                    pc: self.pc,
                    source: Box::new(Fault::StepLimit(ctx.limits.max_steps)),
                });
            }
            ctx.stats.steps += 1;
            let pc = self.pc;
            match self.step(ctx) {
                Ok(Flow::Next) => {}
                Ok(Flow::Halt) => break,
                Err(fault) => {
                    return Err(Fault::At {
                        pc,
                        source: Box::new(fault),
                    })
                }
            }
        }
        debug!(
            "halted after {} steps, {} cycles, {} ops",
            ctx.stats.steps, ctx.stats.cycles, ctx.stats.ops
        );
        Ok(())
    }

    fn step(&mut self, ctx: &mut Context) -> Result<Flow, Fault> {
        let pc = self.pc;
        check_pc(pc)?;
        let op = Op::from_bin(self.mem.word(pc))?;
        trace!("0x{:05x}: {}", pc, op);

        match op {
            Op::Sync => {
                ctx.stats.cycles += 8;
                let cycles = ctx.stats.cycles;
                ctx.trace(op, format_args!("{} cycles", cycles))?;
                self.pc = pc + 4;
            }
            Op::Call(target) => {
                if self.stack.len() >= ctx.limits.max_depth {
                    return Err(Fault::DepthLimit(ctx.limits.max_depth));
                }
                self.stack.push(pc + 4);
                ctx.trace(op, format_args!("depth {}", self.stack.len()))?;
                self.pc = target;
            }
            Op::Return => {
                ctx.trace(op, format_args!("depth {}", self.stack.len()))?;
                match self.stack.pop() {
                    Some(ret) => self.pc = ret,
                    None => return Ok(Flow::Halt),
                }
            }
            Op::Execute { slot, len } => {
                if len as usize > CACHE_SIZE {
                    return Err(Fault::CountTooLarge(len));
                }
                ctx.trace(op, format_args!("{} micro-ops", len))?;
                for i in 0..len {
                    let word = self.code[(slot.wrapping_add(i) & CADDR_MASK) as usize];
                    let micro = Op::from_bin(word)?;
                    if micro.opcode().is_sequencer() {
                        return Err(Fault::NotDatapath(micro.opcode()));
                    }
                    self.exec(ctx, micro)?;
                }
                self.pc = pc + 4;
            }
            Op::Load { cache, src, slot } => {
                self.load(cache, src, slot);
                ctx.stats.cycles += 1;

                // A ContinueLoad right behind the load repeats it
                let next = self.mem.word(pc + 4);
                let repeat = if dec_format(next).0 == u8::from(OpCode::ContinueLoad) {
                    match Op::from_bin(next)? {
                        Op::ContinueLoad(len) => Some(len),
                        _ => None,
                    }
                } else {
                    None
                };
                match repeat {
                    Some(len) => {
                        if len as usize >= CACHE_SIZE {
                            return Err(Fault::CountTooLarge(len));
                        }
                        for i in 1..=len {
                            let src = src.wrapping_add(i * cache.stride());
                            self.load(cache, src, slot.wrapping_add(i));
                        }
                        ctx.stats.cycles += len as u64;
                        ctx.trace(op, format_args!("{} entries", len + 1))?;
                        self.pc = pc + 8;
                    }
                    None => {
                        ctx.trace(op, format_args!("1 entry"))?;
                        self.pc = pc + 4;
                    }
                }
            }
            Op::ContinueLoad(_) => return Err(Fault::StrayContinueLoad),
            _ => {
                self.exec(ctx, op)?;
                self.pc = pc + 4;
            }
        }
        Ok(Flow::Next)
    }

    fn load(&mut self, cache: Cache, src: u32, slot: u32) {
        let slot = (slot & CADDR_MASK) as usize;
        match cache {
            Cache::Code => self.code[slot] = self.mem.word(src),
            Cache::Coeff0 => self.coeff0[slot] = self.mem.dword(src),
            Cache::Coeff1 => self.coeff1[slot] = self.mem.dword(src),
        }
    }
}

fn check_pc(pc: u32) -> Result<(), Fault> {
    if pc as usize >= MEM_SIZE {
        return Err(Fault::PcOutOfRange(pc));
    }
    if pc % 4 != 0 {
        return Err(Fault::Misaligned("pc", pc));
    }
    Ok(())
}
