use std::io::{self, Read};
use std::path::PathBuf;

use clap::Parser;
use color_print::cprintln;
use mlarch::HexStyle;
use mlasm::{listing, Error, Program};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Input listing (stdin when omitted)
    input: Option<PathBuf>,

    /// Output sparse hex file
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Output flat binary file
    #[clap(short, long)]
    bin: Option<PathBuf>,

    /// Print the assembly listing
    #[clap(short, long)]
    dump: bool,

    /// Log level
    #[clap(short, long, default_value_t = tracing::Level::WARN)]
    log_level: tracing::Level,
}

fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(io::stderr)
        .init();

    let file = args
        .input
        .as_ref()
        .map_or("<stdin>".to_string(), |p| p.display().to_string());
    let source = match read_source(args.input.as_ref()) {
        Ok(source) => source,
        Err(err) => {
            cprintln!("<red,bold>error</>: {}", err);
            std::process::exit(1);
        }
    };

    let program = match Program::assemble(&source) {
        Ok(program) => program,
        Err(err) => {
            let lines: Vec<&str> = source.lines().collect();
            err.print_diag(&file, &lines);
            std::process::exit(1);
        }
    };

    if args.dump {
        print!("{}", listing::dump(&file, &source, &program));
    }

    if let Err(err) = write_outputs(&args, &program) {
        cprintln!("<red,bold>error</>: {}", err);
        std::process::exit(1);
    }
}

fn read_source(path: Option<&PathBuf>) -> Result<String, Error> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| Error::FileOpen(path.display().to_string(), e)),
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .map_err(|e| Error::FileRead("<stdin>".to_string(), e))?;
            Ok(source)
        }
    }
}

fn write_outputs(args: &Args, program: &Program) -> Result<(), Error> {
    if let Some(path) = &args.output {
        std::fs::write(path, program.image.to_hex(HexStyle::Words))
            .map_err(|e| Error::FileWrite(path.display().to_string(), e))?;
        tracing::info!("wrote {}", path.display());
    }
    if let Some(path) = &args.bin {
        std::fs::write(path, program.image.to_bin(true))
            .map_err(|e| Error::FileWrite(path.display().to_string(), e))?;
        tracing::info!("wrote {}", path.display());
    }
    if args.output.is_none() && args.bin.is_none() {
        print!("{}", program.image.to_hex(HexStyle::Words));
    }
    Ok(())
}
