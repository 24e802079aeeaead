use color_print::cformat;
use mlarch::image::{ADDR_MASK, MEM_SIZE};
use mlarch::inst::Base;

use crate::config::Region;
use crate::context::Stats;
use crate::model::Sim;

pub fn print_state(sim: &Sim, stats: &Stats) {
    let (acc0, acc1) = sim.acc();
    println!(" +-------------+-------------+------------------------+");
    println!(
        " | VBP: {:05x}  | LBP: {:05x}  | acc0: {:08x} {:>11} |",
        sim.base(Base::VBP),
        sim.base(Base::LBP),
        acc0,
        acc0
    );
    println!(
        " | SBP: {:05x}  | CBP:   {:03x}  | acc1: {:08x} {:>11} |",
        sim.base(Base::SBP),
        sim.base(Base::CBP),
        acc1,
        acc1
    );
    println!(" +-------------+-------------+------------------------+");
    println!(
        " | cycles: {:<12} ops: {:<12} steps: {:<9}|",
        stats.cycles, stats.ops, stats.steps
    );
    println!(" +----------------------------------------------------+");
}

pub fn print_region(sim: &Sim, region: &Region) {
    for line in region_lines(sim, region) {
        println!(" | {}", line);
    }
    println!(" +----------------------------------------------------+");
}

/// Rows of 16 bytes or 4 words. Bytes never written print as `--`.
/// The region is cut to the size of memory.
pub fn region_lines(sim: &Sim, region: &Region) -> Vec<String> {
    let mem = sim.mem();
    let step = if region.words { 4 } else { 1 };
    let len = region.len.min(MEM_SIZE as u32);
    let mut lines = vec![];
    let mut offset = 0;
    while offset < len {
        let row = region.addr.wrapping_add(offset);
        let mut cells = vec![];
        for i in (0..16).step_by(step) {
            if offset + i as u32 >= len {
                break;
            }
            let addr = row.wrapping_add(i as u32);
            let cell = match (region.words, mem.is_defined(addr)) {
                (true, true) => format!("{:08x}", mem.word(addr)),
                (true, false) => cformat!("<dim>{:08x}</>", mem.word(addr)),
                (false, true) => format!("{:02x}", mem.byte(addr)),
                (false, false) => "--".to_string(),
            };
            cells.push(cell);
        }
        lines.push(format!("{:05x} : {}", row & ADDR_MASK, cells.join(" ")));
        offset += 16;
    }
    lines
}
