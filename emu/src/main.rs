use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use color_print::cprintln;
use mlarch::{HexStyle, Image};
use mlsim::{dump, Config, Context, Error, Sim};

#[derive(Parser, Debug)]
#[clap(version, about)]
struct Args {
    /// Memory image (`.hex` sparse hex, anything else flat binary)
    input: PathBuf,

    /// Run configuration (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start address, overrides the config
    #[arg(short, long, value_parser = parse_addr)]
    start: Option<u32>,

    /// Step ceiling, overrides the config
    #[arg(long)]
    max_steps: Option<u64>,

    /// Write the final memory as sparse hex
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the final memory as a 128 KiB binary
    #[arg(short, long)]
    bin: Option<PathBuf>,

    /// Write an instruction trace
    #[arg(short, long)]
    trace: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value_t = tracing::Level::WARN)]
    log_level: tracing::Level,
}

fn parse_addr(s: &str) -> Result<u32, String> {
    match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|e| e.to_string())
}

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    if let Err(err) = simulate(&args) {
        cprintln!("<red,bold>error</>: {}", err);
        std::process::exit(1);
    }
}

fn simulate(args: &Args) -> Result<(), Error> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(start) = args.start {
        config.start = start;
    }
    if let Some(max_steps) = args.max_steps {
        config.max_steps = max_steps;
    }

    cprintln!("<bold>MACC simulator</>: {}", args.input.display());
    let image = read_image(&args.input)?;
    let mut sim = Sim::new(image);

    let mut trace = match &args.trace {
        Some(path) => Some(BufWriter::new(create(path)?)),
        None => None,
    };
    let mut ctx = Context::new().with_limits(config.limits());
    if let Some(trace) = trace.as_mut() {
        ctx = ctx.with_trace(trace);
    }
    let result = sim.run(&mut ctx, config.start);
    let stats = ctx.stats;
    drop(ctx);
    if let (Some(trace), Some(path)) = (trace.as_mut(), &args.trace) {
        trace
            .flush()
            .map_err(|e| Error::FileWrite(path.display().to_string(), e))?;
    }

    dump::print_state(&sim, &stats);
    for region in &config.dump {
        dump::print_region(&sim, region);
    }
    result?;

    if let Some(path) = &args.output {
        write(path, sim.mem().to_hex(HexStyle::Bytes).as_bytes())?;
    }
    if let Some(path) = &args.bin {
        write(path, &sim.mem().to_bin(false))?;
    }
    Ok(())
}

fn read_image(path: &Path) -> Result<Image, Error> {
    let name = path.display().to_string();
    if path.extension().is_some_and(|ext| ext == "hex") {
        let text = std::fs::read_to_string(path).map_err(|e| Error::FileOpen(name, e))?;
        let mut image = Image::from_hex(&text)?;
        image.clear_defined();
        Ok(image)
    } else {
        let data = std::fs::read(path).map_err(|e| Error::FileOpen(name, e))?;
        let mut image = Image::new();
        image.load_bin(&data)?;
        Ok(image)
    }
}

fn create(path: &Path) -> Result<File, Error> {
    File::create(path).map_err(|e| Error::FileWrite(path.display().to_string(), e))
}

fn write(path: &Path, data: &[u8]) -> Result<(), Error> {
    std::fs::write(path, data).map_err(|e| Error::FileWrite(path.display().to_string(), e))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}
