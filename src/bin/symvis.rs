// Export header generator
//
//  Copyright (C) 2014-2022 Ryan Specialty Group, LLC.
//
//  This file is part of SYMVIS.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! This is the export header generator.
//!
//! `symvis` reads a build configuration
//!   (see [`symvis::config`])
//!   and writes one export header per module into an output directory,
//!     or prints the preprocessor definitions that a module's translation
//!     units must be compiled with.

extern crate symvis;

use fxhash::FxHashSet;
use getopts::{Fail, Options};
use std::{
    env,
    error::Error,
    fmt::{self, Display},
    fs, io,
    path::{Path, PathBuf},
};
use symvis::{
    config::{BuildConfig, ConfigError},
    emit::{self, Header},
    graph::GraphError,
    platform::{PlatformError, PlatformProfile},
    resolve::{EffectiveMode, ResolveError, Resolver},
};

/// Options common to every command.
#[derive(Debug, PartialEq, Eq)]
struct Job {
    config: String,
    platform: Option<String>,
    dual: Option<EffectiveMode>,
}

/// Types of commands
#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Write headers into the given directory.
    Emit(Job, String),

    /// Print compile definitions for the given module.
    Defines(Job, String),

    Usage,
}

/// Load the configuration for `job` and select its target platform.
fn load(job: &Job) -> Result<(BuildConfig, PlatformProfile), SymvisError> {
    let src = fs::read_to_string(&job.config)
        .map_err(|e| SymvisError::Input(job.config.clone(), e))?;

    let mut config = BuildConfig::parse(&src)?;

    let profile = match job.platform.as_deref().or(config.platform()) {
        Some(name) => PlatformProfile::by_name(name)?,
        None => PlatformProfile::host(),
    };

    if let Some(mode) = job.dual {
        let pending: Vec<String> = config
            .modules()
            .iter()
            .filter(|m| !m.link_mode().is_concrete())
            .filter(|m| !config.overrides().has_build(m.name()))
            .map(|m| m.name().to_string())
            .collect();

        for name in pending {
            config.overrides_mut().set_build(name, mode);
        }
    }

    Ok((config, profile))
}

/// Resolve every module and write its headers into `dest_dir`.
///
/// Nothing is written unless every header resolves.
fn emit_headers(job: &Job, dest_dir: &str) -> Result<(), SymvisError> {
    let (config, profile) = load(job)?;
    let (graph, overrides) = config.into_graph()?;
    let resolver = Resolver::new(&graph, &overrides);

    let headers = emit::emit_all(&resolver, &profile)?;
    let stems: Vec<String> = graph.modules().map(|m| m.stem()).collect();

    let dest = Path::new(dest_dir);
    fs::create_dir_all(dest)?;

    write_headers(dest, &headers)?;
    remove_stale_headers(dest, &headers, &stems)?;

    Ok(())
}

/// Write `headers` into `dest`.
///
/// Every header is first staged as a hidden temporary file beside its
///   destination;
///     only once all of them have been written are they renamed into
///     place.
/// If staging fails,
///   the staged files are removed and existing headers are untouched.
fn write_headers(dest: &Path, headers: &[Header]) -> io::Result<()> {
    let staged: Vec<(PathBuf, PathBuf)> = headers
        .iter()
        .map(|header| {
            (
                dest.join(format!(".{}.tmp", header.file_name())),
                dest.join(header.file_name()),
            )
        })
        .collect();

    let result = staged
        .iter()
        .zip(headers)
        .try_for_each(|((tmp, _), header)| fs::write(tmp, header.text()));

    if let Err(e) = result {
        for (tmp, _) in &staged {
            let _ = fs::remove_file(tmp);
        }

        return Err(e);
    }

    staged
        .iter()
        .try_for_each(|(tmp, path)| fs::rename(tmp, path))
}

/// Remove headers of the modules named by `stems` that were left in
///   `dest` by a previous run but are no longer produced.
///
/// This happens when a dual-use module goes from per-consumer headers to
///   a single header or loses a consumer.
/// Files not named like a generated header are never touched.
fn remove_stale_headers(
    dest: &Path,
    headers: &[Header],
    stems: &[String],
) -> io::Result<()> {
    let current: FxHashSet<&str> =
        headers.iter().map(Header::file_name).collect();

    for entry in fs::read_dir(dest)? {
        let entry = entry?;
        let file_name = entry.file_name();

        let name = match file_name.to_str() {
            Some(name) if !current.contains(name) => name,
            _ => continue,
        };

        if stems.iter().any(|stem| is_header_of(name, stem)) {
            fs::remove_file(entry.path())?;
        }
    }

    Ok(())
}

/// Whether `name` is a header file generated for the module of `stem`,
///   either `<stem>_export.h` or `<stem>_export.<consumer-stem>.h`.
fn is_header_of(name: &str, stem: &str) -> bool {
    let rest = match name
        .strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix("_export."))
    {
        Some(rest) => rest,
        None => return false,
    };

    if rest == "h" {
        return true;
    }

    match rest.strip_suffix(".h") {
        Some(consumer) if !consumer.is_empty() => consumer.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
        }),
        _ => false,
    }
}

/// Print compile definitions for `module`,
///   one per line.
fn print_defines(job: &Job, module: &str) -> Result<(), SymvisError> {
    let (config, profile) = load(job)?;
    let (graph, overrides) = config.into_graph()?;
    let resolver = Resolver::new(&graph, &overrides);

    for define in resolver.compile_defines(module, &profile)? {
        println!("{}", define);
    }

    Ok(())
}

/// Entrypoint for the header generator
pub fn main() {
    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = get_opts();
    let usage = opts.usage(&format!("Usage: {} [OPTIONS] CONFIG", program));

    let (result, config) = match parse_options(opts, args) {
        Ok(Command::Emit(job, dest_dir)) => {
            (emit_headers(&job, &dest_dir), job.config)
        }
        Ok(Command::Defines(job, module)) => {
            (print_defines(&job, &module), job.config)
        }
        Ok(Command::Usage) => {
            println!("{}", usage);
            std::process::exit(exitcode::OK);
        }
        Err(e) => {
            eprintln!("{}", e);
            println!("{}", usage);
            std::process::exit(exitcode::USAGE);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        eprintln!("fatal: failed to process `{}`", config);

        std::process::exit(e.exit_code());
    }
}

/// Get 'Options'
fn get_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt("o", "output", "set output directory", "DIR");
    opts.optopt("p", "platform", "set target platform", "NAME");
    opts.optopt(
        "",
        "dual",
        "link dual-use modules lacking an override",
        "static|shared",
    );
    opts.optopt(
        "",
        "defines",
        "print compile definitions for a module",
        "MODULE",
    );
    opts.optflag("h", "help", "print this help menu");

    opts
}

/// Option parser
fn parse_options(opts: Options, args: Vec<String>) -> Result<Command, Fail> {
    let matches = opts.parse(&args[1..])?;

    if matches.opt_present("h") {
        return Ok(Command::Usage);
    }

    let config = match matches.free.len() {
        0 => return Err(Fail::OptionMissing(String::from("CONFIG"))),
        1 => matches.free[0].clone(),
        _ => return Err(Fail::UnrecognizedOption(matches.free[1].clone())),
    };

    let dual = match matches.opt_str("dual") {
        Some(m) => match EffectiveMode::from_config(&m) {
            Some(mode) => Some(mode),
            None => {
                return Err(Fail::ArgumentMissing(String::from(
                    "--dual static|shared",
                )))
            }
        },
        None => None,
    };

    let job = Job {
        config,
        platform: matches.opt_str("p"),
        dual,
    };

    if let Some(module) = matches.opt_str("defines") {
        return Ok(Command::Defines(job, module));
    }

    match matches.opt_str("o") {
        Some(dest_dir) => Ok(Command::Emit(job, dest_dir)),
        None => Err(Fail::OptionMissing(String::from("-o DIR"))),
    }
}

/// Generator (`symvis`) error.
///
/// This represents the aggregation of all possible errors that can occur
///   while loading a configuration and resolving its modules.
#[derive(Debug)]
pub enum SymvisError {
    /// The configuration file could not be read.
    Input(String, io::Error),
    Io(io::Error),
    Config(ConfigError),
    Graph(GraphError),
    Platform(PlatformError),
    Resolve(ResolveError),
}

impl SymvisError {
    /// Process exit code for this error.
    fn exit_code(&self) -> exitcode::ExitCode {
        match self {
            Self::Input(..) => exitcode::NOINPUT,
            Self::Io(_) => exitcode::IOERR,
            Self::Config(_)
            | Self::Graph(_)
            | Self::Platform(_)
            | Self::Resolve(_) => exitcode::DATAERR,
        }
    }
}

impl From<io::Error> for SymvisError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ConfigError> for SymvisError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<GraphError> for SymvisError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<PlatformError> for SymvisError {
    fn from(e: PlatformError) -> Self {
        Self::Platform(e)
    }
}

impl From<ResolveError> for SymvisError {
    fn from(e: ResolveError) -> Self {
        Self::Resolve(e)
    }
}

impl Display for SymvisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(path, e) => write!(f, "cannot read `{}`: {}", path, e),
            Self::Io(e) => Display::fmt(e, f),
            Self::Config(e) => Display::fmt(e, f),
            Self::Graph(e) => Display::fmt(e, f),
            Self::Platform(e) => Display::fmt(e, f),
            Self::Resolve(e) => Display::fmt(e, f),
        }
    }
}

impl Error for SymvisError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Input(_, e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Graph(e) => Some(e),
            Self::Platform(e) => Some(e),
            Self::Resolve(e) => Some(e),
        }
    }
}
