use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process;

use structopt::StructOpt;

/// JIT-compiles a Brainfuck program and runs it.
#[derive(StructOpt)]
#[structopt(name = "bfjit")]
struct Opt {
    /// Path to the Brainfuck source file.
    #[structopt(parse(from_os_str))]
    program: PathBuf,
}

fn main() {
    let opt = Opt::from_args();

    if let Err(err) = run(&opt) {
        eprintln!("bfjit: {}", err);
        process::exit(1);
    }
}

fn run(opt: &Opt) -> Result<(), Box<dyn Error>> {
    let source = fs::read(&opt.program)?;
    let program = bfjit_core::jit_compile(&source)?;
    program.run();

    Ok(())
}
