use std::process::ExitCode;

use clap::Parser;
use color_print::cprintln;

use emu::vga::PaletteSink;
use emu::{Cpu, RunExit};

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, Parser)]
#[clap(
    name = "vx16",
    version,
    about = "Assemble a VX16 program and run it on the virtual CPU",
    help_template = HELP_TEMPLATE
)]
struct Args {
    /// Assembly source file
    input: String,

    /// Stop after at most N instructions
    #[clap(short, long)]
    tmax: Option<u64>,

    /// Dump the final CPU state
    #[clap(short, long)]
    dump: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let source = match std::fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(err) => {
            cprintln!("<red,bold>error</>: cannot read {}: {}", args.input, err);
            return ExitCode::FAILURE;
        }
    };

    let image = match asm::assemble(&source) {
        Ok(image) => image,
        Err(err) => {
            cprintln!("<red,bold>error</>: {}", err);
            cprintln!("  <blue>--></> {}", args.input);
            return ExitCode::FAILURE;
        }
    };

    let mut cpu = Cpu::new();
    cpu.set_sink(Box::new(PaletteSink::new(cpu.vga())));
    cpu.load_image(&image);

    let result = match args.tmax {
        Some(max) => cpu.run_for(max),
        None => cpu.run(),
    };

    match result {
        Ok(RunExit::Halted) => {
            if args.dump {
                println!("{}", cpu);
            }
            ExitCode::SUCCESS
        }
        Ok(RunExit::Stopped) => {
            println!("stopped by host");
            ExitCode::SUCCESS
        }
        Ok(RunExit::Limit) => {
            if args.dump {
                println!("{}", cpu);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            cprintln!("<red,bold>error</>: {}", err);
            ExitCode::FAILURE
        }
    }
}
