//! protoc-gen-lamina - generate typed accessor overlays and value converters
//! from protobuf schemas
//!
//! This binary is a `protoc` plugin: it reads one serialized
//! `CodeGeneratorRequest` from stdin, runs the selected backend over every
//! schema file in the batch, and writes one serialized
//! `CodeGeneratorResponse` to stdout. All diagnostics go to stderr because
//! stdout carries the encoded response.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lamina_core::{plugin, Backend};
use prost::Message;
use prost_types::compiler::CodeGeneratorRequest;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

/// Generate accessor overlays and value converters from protobuf schemas
#[derive(Parser, Debug)]
#[command(name = "protoc-gen-lamina")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Generator backend; inferred from the program name when omitted
    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Read an encoded request from a file instead of stdin (debugging aid)
    #[arg(long)]
    request: Option<PathBuf>,

    /// Write generated files into a directory instead of encoding a
    /// response (debugging aid)
    #[arg(long)]
    dump: Option<PathBuf>,
}

/// CLI-facing backend selector
#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    /// Typed structs with presence-tracked accessors
    Overlay,
    /// Bidirectional struct/value conversion routines
    Converter,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Overlay => Backend::Overlay,
            BackendArg::Converter => Backend::Converter,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stderr only, stdout is the protocol channel
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let backend = cli
        .backend
        .map(Backend::from)
        .unwrap_or_else(|| backend_from_program_name(std::env::args().next().as_deref()));
    debug!("selected backend '{}'", backend.as_str());

    if let Some(ref dump_dir) = cli.dump {
        dump_generated(&cli, backend, dump_dir)
    } else {
        run_protocol(&cli, backend)
    }
}

/// Infers the backend from the executable name, so a `protoc-gen-*-converter`
/// symlink selects the converter without arguments (protoc passes none)
fn backend_from_program_name(argv0: Option<&str>) -> Backend {
    let name = argv0
        .map(|p| {
            Path::new(p)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_ascii_lowercase()
        })
        .unwrap_or_default();

    if name.ends_with("converter") {
        Backend::Converter
    } else {
        Backend::Overlay
    }
}

/// Standard plugin mode: one request in, one response out
fn run_protocol(cli: &Cli, backend: Backend) -> Result<()> {
    let mut output = io::stdout().lock();

    match cli.request {
        Some(ref path) => {
            let mut input = fs::File::open(path)
                .with_context(|| format!("failed to open request file: {}", path.display()))?;
            plugin::run(backend, &mut input, &mut output)
        }
        None => plugin::run(backend, &mut io::stdin().lock(), &mut output),
    }
    .context("generation failed")?;

    output.flush().context("failed to flush response")?;
    Ok(())
}

/// Debugging mode: decode the request, write each generated file to disk,
/// and print reported errors to stderr
fn dump_generated(cli: &Cli, backend: Backend, dump_dir: &Path) -> Result<()> {
    let encoded = match cli.request {
        Some(ref path) => fs::read(path)
            .with_context(|| format!("failed to read request file: {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .context("failed to read request from stdin")?;
            buf
        }
    };

    let request = CodeGeneratorRequest::decode(encoded.as_slice())
        .context("failed to decode code generator request")?;
    let response = plugin::generate(backend, &request);

    for file in &response.file {
        let path = dump_dir.join(file.name());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }
        fs::write(&path, file.content())
            .with_context(|| format!("failed to write file: {}", path.display()))?;
        info!("wrote {}", path.display());
    }

    if let Some(error) = response.error {
        eprintln!("{}", error);
    }

    Ok(())
}
