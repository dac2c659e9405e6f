// badaclang: C subset to LLVM IR compiler

use badaclang::driver::{self, CompileOptions};
use badaclang::logger::{self, LogLevel};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

/// Compile a C source file to textual LLVM IR
#[derive(Parser, Debug)]
#[command(name = "badaclang")]
#[command(version, about, long_about = None)]
struct Args {
    /// C source file to compile
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output path for the IR (defaults to INPUT with a `.ll` extension)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logger::init_with_level(LogLevel::from_verbosity(args.verbose));

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| driver::default_output(&args.input));
    let module_name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    match driver::compile_file(&args.input, &output, &CompileOptions::new(module_name)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", driver::render_diagnostic(&args.input, &err));
            ExitCode::FAILURE
        }
    }
}
