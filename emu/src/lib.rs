pub mod config;
pub mod context;
pub mod datapath;
pub mod dump;
pub mod error;
pub mod model;
pub mod sequencer;

pub use config::{Config, Region};
pub use context::{Context, Limits, Stats};
pub use error::{Error, Fault};
pub use model::Sim;

use mlarch::Image;

/// Execute `image` from `start` with default limits and return the final
/// memory.
pub fn run(image: Image, start: u32) -> Result<Image, Fault> {
    let mut sim = Sim::new(image);
    sim.run(&mut Context::new(), start)?;
    Ok(sim.into_image())
}
