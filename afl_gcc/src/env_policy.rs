//! Snapshot of the `AFL_*` environment variables driving the rewrite.

use std::{
    collections::HashMap,
    env::{self, VarError},
    ffi::{OsStr, OsString},
};

use crate::Error;

/// Directory holding the `as` wrapper
pub const AFL_PATH_VAR: &str = "AFL_PATH";
/// C compiler override, also used for `afl-clang`
pub const AFL_CC_VAR: &str = "AFL_CC";
/// C++ compiler override, also used for `afl-clang++`
pub const AFL_CXX_VAR: &str = "AFL_CXX";
/// Java compiler override
pub const AFL_GCJ_VAR: &str = "AFL_GCJ";
/// Enables stack protector and source fortification
pub const AFL_HARDEN_VAR: &str = "AFL_HARDEN";
/// Builds with address sanitizer
pub const AFL_USE_ASAN_VAR: &str = "AFL_USE_ASAN";
/// Builds with memory sanitizer
pub const AFL_USE_MSAN_VAR: &str = "AFL_USE_MSAN";
/// Skips `-g -O3 -funroll-loops` and the fuzzing defines
pub const AFL_DONT_OPTIMIZE_VAR: &str = "AFL_DONT_OPTIMIZE";
/// Disables the string comparison builtins
pub const AFL_NO_BUILTIN_VAR: &str = "AFL_NO_BUILTIN";
/// Silences the banner and warnings
pub const AFL_QUIET_VAR: &str = "AFL_QUIET";

/// Everything the wrapper reads from the environment, captured once.
///
/// A switch is on as soon as its variable exists, whatever the value, so
/// `AFL_HARDEN=` and `AFL_HARDEN=0` both enable hardening.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvPolicy {
    /// `AFL_PATH`
    pub afl_path: Option<String>,
    /// `AFL_CC`
    pub cc: Option<String>,
    /// `AFL_CXX`
    pub cxx: Option<String>,
    /// `AFL_GCJ`
    pub gcj: Option<String>,
    /// `AFL_HARDEN`
    pub harden: bool,
    /// `AFL_USE_ASAN`
    pub use_asan: bool,
    /// `AFL_USE_MSAN`
    pub use_msan: bool,
    /// `AFL_DONT_OPTIMIZE`
    pub dont_optimize: bool,
    /// `AFL_NO_BUILTIN`
    pub no_builtin: bool,
    /// `AFL_QUIET`
    pub quiet: bool,
}

impl EnvPolicy {
    /// Reads the policy from the environment of the current process
    pub fn from_env() -> Result<Self, Error> {
        Self::from_vars(env::vars_os())
    }

    /// Builds the policy from arbitrary key/value pairs.
    ///
    /// Keys that are not valid UTF-8 are ignored. Values of the path and
    /// compiler variables must be valid UTF-8, switches only need to exist.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        let vars: HashMap<String, OsString> = vars
            .into_iter()
            .filter_map(|(k, v)| {
                k.as_ref()
                    .to_str()
                    .map(|k| (k.to_string(), v.as_ref().to_os_string()))
            })
            .collect();

        let string = |name: &str| -> Result<Option<String>, Error> {
            match vars.get(name) {
                None => Ok(None),
                Some(value) => value.clone().into_string().map(Some).map_err(|value| {
                    Error::config(format!(
                        "{name}: {}",
                        VarError::NotUnicode(value)
                    ))
                }),
            }
        };
        let switch = |name: &str| vars.contains_key(name);

        Ok(Self {
            afl_path: string(AFL_PATH_VAR)?,
            cc: string(AFL_CC_VAR)?,
            cxx: string(AFL_CXX_VAR)?,
            gcj: string(AFL_GCJ_VAR)?,
            harden: switch(AFL_HARDEN_VAR),
            use_asan: switch(AFL_USE_ASAN_VAR),
            use_msan: switch(AFL_USE_MSAN_VAR),
            dont_optimize: switch(AFL_DONT_OPTIMIZE_VAR),
            no_builtin: switch(AFL_NO_BUILTIN_VAR),
            quiet: switch(AFL_QUIET_VAR),
        })
    }
}
