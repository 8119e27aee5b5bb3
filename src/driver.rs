// This module holds the option handling behind the tapec command line tool. CompileOptions
// collects what the flags select: the input file, the output path, which artifact to stop at,
// whether to keep the intermediate object, the linker driver, and whether to interpret instead.
// build runs one compilation inside a CompilationSession: it filters and lowers the source,
// then either renders the intermediate listing, writes the ELF object, links an executable
// through crate::link, or interprets the program with the VM on the process's standard streams.
// Structural errors surface as CompileError::Parse before any file is written.

//! Command line compilation flow.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::compiler::Compiler;
use crate::core::error::CompileResult;
use crate::core::session::CompilationSession;
use crate::link::{Linker, DEFAULT_LINKER};
use crate::vm::Machine;
use crate::x64::NativeBackend;

/// Artifact a compilation stops at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum EmitKind {
    /// Intermediate program listing.
    Ir,
    /// ELF relocatable object.
    Obj,
    /// Linked executable.
    #[default]
    Exe,
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub input: PathBuf,
    /// Explicit output path.
    pub output: Option<PathBuf>,
    pub emit: EmitKind,
    /// Keep the object produced on the way to an executable.
    pub keep_object: bool,
    pub linker: PathBuf,
    /// Interpret instead of producing an artifact.
    pub run: bool,
}

impl CompileOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            emit: EmitKind::default(),
            keep_object: false,
            linker: PathBuf::from(DEFAULT_LINKER),
            run: false,
        }
    }

    /// Where the selected artifact is written, `None` for a listing on stdout.
    pub fn output_path(&self) -> Option<PathBuf> {
        if let Some(output) = &self.output {
            return Some(output.clone());
        }
        match self.emit {
            EmitKind::Ir => None,
            EmitKind::Obj => Some(self.input.with_extension("o")),
            EmitKind::Exe => Some(default_executable_path(&self.input)),
        }
    }

    /// Module name: the input's file stem.
    pub fn module_name(&self) -> String {
        self.input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main".to_string())
    }
}

/// Input path with its extension removed.
///
/// An input without an extension gets `.out` appended instead of being
/// overwritten.
pub fn default_executable_path(input: &Path) -> PathBuf {
    let stripped = input.with_extension("");
    if stripped == input {
        with_suffix(input, ".out")
    } else {
        stripped
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Outcome of [`build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Listing destined for standard output.
    Listing(String),
    /// A file was written.
    Written(PathBuf),
    /// The program was interpreted and exited with this status.
    Executed(i32),
}

/// Compile `source` as described by `options`.
pub fn build(session: &CompilationSession<'_>, options: &CompileOptions, source: &str) -> CompileResult<Artifact> {
    let compiler = Compiler::new(session);
    let name = options.module_name();
    let module = compiler.lower(&name, session.parse_program(source))?;

    if options.run {
        let mut machine = Machine::new(io::stdin().lock(), io::stdout().lock(), io::stderr().lock());
        let status = compiler.compile_with(&module, &mut machine)?;
        return Ok(Artifact::Executed(status));
    }

    let Some(output) = options.output_path() else {
        return Ok(Artifact::Listing(module.to_string()));
    };
    if options.emit == EmitKind::Ir {
        fs::write(&output, module.to_string())?;
        return Ok(Artifact::Written(output));
    }

    let source_name = options.input.display().to_string();
    let mut backend = NativeBackend::new().with_source_name(source_name);
    let object = compiler.compile_with(&module, &mut backend)?;
    session.record_code_size(object.code_size);

    if options.emit == EmitKind::Obj {
        fs::write(&output, &object.bytes)?;
        return Ok(Artifact::Written(output));
    }

    let object_path = with_suffix(&output, ".o");
    fs::write(&object_path, &object.bytes)?;
    let linked = Linker::new(&options.linker).link(&object_path, &output);
    if !options.keep_object {
        if let Err(e) = fs::remove_file(&object_path) {
            log::warn!("could not remove {}: {e}", object_path.display());
        }
    }
    linked?;
    Ok(Artifact::Written(output))
}
