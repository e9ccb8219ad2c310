//! The rewritten compiler command and the hand-off to the real compiler

use std::{
    ffi::{OsStr, OsString},
    fmt,
};

use crate::Error;

/// A fully rewritten compiler invocation.
///
/// `argv()[0]` is the compiler to run. The environment variables are set for
/// the compiler only, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerCommand {
    argv: Vec<OsString>,
    envs: Vec<(String, String)>,
}

impl CompilerCommand {
    /// Creates a new command, `argv` must hold at least the compiler
    #[must_use]
    pub fn new(argv: Vec<OsString>, envs: Vec<(String, String)>) -> Self {
        Self { argv, envs }
    }

    /// The compiler to run
    #[must_use]
    pub fn program(&self) -> &OsStr {
        self.argv.first().map_or(OsStr::new(""), OsString::as_os_str)
    }

    /// Arguments for the compiler, without `argv[0]`
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        self.argv.get(1..).unwrap_or_default()
    }

    /// The full argument vector, compiler included
    #[must_use]
    pub fn argv(&self) -> &[OsString] {
        &self.argv
    }

    /// Environment variables exported to the compiler
    #[must_use]
    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Replaces the current process with the compiler.
    ///
    /// Only returns on failure.
    #[cfg(unix)]
    pub fn exec(&self) -> Result<Option<i32>, Error> {
        use std::{env, ffi::CString, os::unix::ffi::OsStrExt};

        use nix::unistd::execvp;

        if self.argv.is_empty() {
            return Err(Error::invalid_arguments("The number of arguments cannot be 0"));
        }

        let cargs = self
            .argv
            .iter()
            .map(|arg| CString::new(arg.as_bytes()))
            .collect::<Result<Vec<CString>, _>>()?;

        for (key, value) in &self.envs {
            env::set_var(key, value);
        }

        // execvp NULL-terminates the vector for us
        match execvp(&cargs[0], &cargs) {
            Ok(never) => match never {},
            Err(errno) => Err(Error::exec(format!(
                "Oops, failed to execute '{}' - check your PATH ({errno})",
                self.program().to_string_lossy()
            ))),
        }
    }

    /// Runs the compiler as a child with inherited stdio and returns its exit code.
    #[cfg(not(unix))]
    pub fn exec(&self) -> Result<Option<i32>, Error> {
        use std::process::Command;

        if self.argv.is_empty() {
            return Err(Error::invalid_arguments("The number of arguments cannot be 0"));
        }

        let status = Command::new(self.program())
            .args(self.args())
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .status()
            .map_err(|err| {
                Error::exec(format!(
                    "Oops, failed to execute '{}' - check your PATH ({err})",
                    self.program().to_string_lossy()
                ))
            })?;
        Ok(status.code())
    }
}

impl fmt::Display for CompilerCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (key, value) in &self.envs {
            write!(f, "{key}={value} ")?;
        }
        let argv: Vec<_> = self.argv.iter().map(|arg| arg.to_string_lossy()).collect();
        write!(f, "{}", argv.join(" "))
    }
}
