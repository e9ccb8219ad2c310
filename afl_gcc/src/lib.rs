//! Compiler wrapper that turns `gcc`, `g++`, `gcj` and `clang` invocations into
//! instrumented builds.
//!
//! The wrapper is installed in place of the C/C++ compiler. On each call it
//! finds the directory holding the `afl-as` assembler wrapper, picks the real
//! compiler from its own invocation name, rewrites the command line so that the
//! assembler stage goes through `afl-as`, injects hardening, sanitizer and
//! optimization flags according to the `AFL_*` environment, and finally replaces
//! itself with the real compiler.
//!
//! ```no_run
//! use afl_gcc::{find_as, CompilerWrapper, EnvPolicy, GccWrapper};
//!
//! let args: Vec<_> = std::env::args_os().collect();
//! let policy = EnvPolicy::from_env().unwrap();
//! let as_path = find_as(&args[0].to_string_lossy(), &policy).unwrap();
//! GccWrapper::new(as_path, policy)
//!     .parse_args(&args)
//!     .unwrap()
//!     .run()
//!     .unwrap();
//! ```
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]
#![cfg_attr(not(test), warn(
    missing_debug_implementations,
    missing_docs,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
))]
#![cfg_attr(test, deny(
    missing_debug_implementations,
    missing_docs,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_must_use,
))]

use std::{
    ffi::{NulError, OsStr},
    fmt,
};

pub mod command;
pub use command::CompilerCommand;

pub mod env_policy;
pub use env_policy::EnvPolicy;

pub mod gcc;
pub use gcc::{GccWrapper, ParsedArgs};

pub mod locate;
pub use locate::{find_as, find_as_in};

pub mod toolchain;
pub use toolchain::{Family, Platform, Toolchain};

/// Directory searched for the `as` wrapper when nothing else matches.
pub const AFL_PATH: &str = match option_env!("AFL_GCC_HELPER_PATH") {
    Some(path) => path,
    None => "/usr/local/lib/afl",
};

/// Directory the wrapper binaries are installed to, only used in the help text.
pub const BIN_PATH: &str = match option_env!("AFL_GCC_BIN_PATH") {
    Some(path) => path,
    None => "/usr/local/bin",
};

/// Exported to the compiler when running in clang mode, read by `afl-as`.
pub const CLANG_ENV_VAR: &str = "__AFL_CLANG_MODE";

/// Exported to the compiler when the command line already asks for a sanitizer.
pub const ASAN_ENV_VAR: &str = "AFL_USE_ASAN";

/// Errors raised while rewriting a compiler invocation.
///
/// Every variant is fatal: the wrapper never launches the compiler after one
/// of these.
#[derive(Debug)]
pub enum Error {
    /// The `as` wrapper could not be found in any of the search locations
    AssemblerNotFound(String),
    /// The selected compiler family has no usable default on this platform
    CompilerRequired(String),
    /// Two settings that cannot be combined were requested together
    MutuallyExclusive(String),
    /// The real compiler could not be launched
    Exec(String),
    /// The arguments passed to the wrapper are not usable
    InvalidArguments(String),
    /// The wrapper was used out of order
    IllegalState(String),
    /// The environment holds a value that cannot be used
    Config(String),
}

impl Error {
    /// The `as` wrapper could not be found
    #[must_use]
    pub fn assembler_not_found<S>(arg: S) -> Self
    where
        S: Into<String>,
    {
        Error::AssemblerNotFound(arg.into())
    }

    /// A compiler override is required on this platform
    #[must_use]
    pub fn compiler_required<S>(arg: S) -> Self
    where
        S: Into<String>,
    {
        Error::CompilerRequired(arg.into())
    }

    /// Two settings conflict
    #[must_use]
    pub fn mutually_exclusive<S>(arg: S) -> Self
    where
        S: Into<String>,
    {
        Error::MutuallyExclusive(arg.into())
    }

    /// Launching the compiler failed
    #[must_use]
    pub fn exec<S>(arg: S) -> Self
    where
        S: Into<String>,
    {
        Error::Exec(arg.into())
    }

    /// The arguments are not usable
    #[must_use]
    pub fn invalid_arguments<S>(arg: S) -> Self
    where
        S: Into<String>,
    {
        Error::InvalidArguments(arg.into())
    }

    /// You're holding it wrong
    #[must_use]
    pub fn illegal_state<S>(arg: S) -> Self
    where
        S: Into<String>,
    {
        Error::IllegalState(arg.into())
    }

    /// Bad environment value
    #[must_use]
    pub fn config<S>(arg: S) -> Self
    where
        S: Into<String>,
    {
        Error::Config(arg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AssemblerNotFound(s)
            | Self::CompilerRequired(s)
            | Self::MutuallyExclusive(s)
            | Self::Exec(s) => write!(f, "{s}"),
            Self::InvalidArguments(s) => write!(f, "Invalid arguments: {s}"),
            Self::IllegalState(s) => write!(f, "Illegal state: {s}"),
            Self::Config(s) => write!(f, "Invalid configuration: {s}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<NulError> for Error {
    fn from(err: NulError) -> Self {
        Self::invalid_arguments(format!("Argument contains a NUL byte: {err}"))
    }
}

#[cfg(unix)]
impl From<nix::Error> for Error {
    fn from(err: nix::Error) -> Self {
        Self::exec(format!("Unix error: {err}"))
    }
}

/// Wrap a compiler hijacking its arguments
pub trait CompilerWrapper {
    /// Set the wrapper arguments parsing a command line set of arguments.
    /// `args[0]` is the name the wrapper was invoked as. Arguments are OS
    /// strings and are passed on byte for byte.
    fn parse_args<S>(&mut self, args: &[S]) -> Result<&'_ mut Self, Error>
    where
        S: AsRef<OsStr>;

    /// Command to run the compiler
    fn command(&self) -> Result<CompilerCommand, Error>;

    /// Silences warnings printed while rewriting the arguments
    fn silence(&mut self, value: bool) -> &'_ mut Self;

    /// Returns `true` if `silence` was called with `true`
    fn is_silent(&self) -> bool;

    /// Run the compiler.
    ///
    /// On Unix the current process is replaced and this only returns on
    /// failure. Elsewhere the compiler runs as a child and its exit code is
    /// returned, `None` if it has none.
    fn run(&mut self) -> Result<Option<i32>, Error> {
        let command = self.command()?;
        log::debug!("{command}");
        command.exec()
    }
}
