//! tapec command line tool.
//!
//! Usage: `tapec [OPTIONS] <INPUT>`

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use bumpalo::Bump;
use clap::Parser;

use tapec::core::{CompilationSession, CompileError};
use tapec::driver::{build, Artifact, CompileOptions, EmitKind};
use tapec::link::DEFAULT_LINKER;

#[derive(Parser, Debug)]
#[command(name = "tapec", version)]
#[command(about = "Compile tape-language programs to native executables")]
struct Args {
    /// Source file
    input: PathBuf,

    /// Write output to <FILE>
    #[arg(short = 'o', long = "output-file", value_name = "FILE")]
    output_file: Option<PathBuf>,

    /// Artifact to produce
    #[arg(long, value_enum, default_value_t = EmitKind::Exe)]
    emit: EmitKind,

    /// Interpret the program instead of compiling it
    #[arg(long, conflicts_with = "emit")]
    run: bool,

    /// Keep the object file next to the executable
    #[arg(long)]
    keep_object: bool,

    /// Linker driver
    #[arg(long, value_name = "PROGRAM", default_value = DEFAULT_LINKER)]
    linker: PathBuf,

    /// Print compilation statistics to stderr
    #[arg(long)]
    stats: bool,
}

impl Args {
    fn options(&self) -> CompileOptions {
        CompileOptions {
            input: self.input.clone(),
            output: self.output_file.clone(),
            emit: self.emit,
            keep_object: self.keep_object,
            linker: self.linker.clone(),
            run: self.run,
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let source = match fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Could not read {}: {e}", args.input.display());
            process::exit(1);
        }
    };

    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    let result = build(&session, &args.options(), &source);

    if args.stats {
        eprint!("{}", session.stats());
    }

    match result {
        Ok(Artifact::Listing(text)) => {
            let mut stdout = io::stdout().lock();
            if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
                eprintln!("{e}");
                process::exit(1);
            }
        }
        Ok(Artifact::Written(path)) => println!("Generated {}", path.display()),
        Ok(Artifact::Executed(status)) => process::exit(status),
        Err(e @ CompileError::Parse(_)) => {
            eprintln!("{e}");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
