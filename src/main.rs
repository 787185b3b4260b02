use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::LevelFilter;

use rasm::Failure;

#[derive(Parser)]
#[command(name = "rasm")]
#[command(about = "A two-pass MOS 6502 assembler emitting Commodore-64 .prg images")]
struct Cli {
    /// Entry assembly source file
    #[arg(required = true)]
    input: PathBuf,

    /// Output .prg path
    #[arg(long, default_value = "a.prg")]
    out: PathBuf,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Explicit log level, overriding -v/--verbose and RUST_LOG
    #[arg(long)]
    log_level: Option<LevelFilter>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_level);

    match rasm::assemble_file(&cli.input) {
        Ok(bytes) => match fs::write(&cli.out, &bytes) {
            Ok(()) => {
                println!("{} bytes written to {}", bytes.len(), cli.out.display());
            }
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        },
        Err(Failure::Parse(errors)) => {
            for e in &errors {
                eprintln!("{e}");
            }
            process::exit(1);
        }
        Err(Failure::Assembly(e)) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8, log_level: Option<LevelFilter>) {
    let level = log_level.unwrap_or(match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    });
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
}
