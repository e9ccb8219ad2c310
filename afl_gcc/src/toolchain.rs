//! Picks the real compiler from the name the wrapper was invoked as.

use crate::{EnvPolicy, Error};

/// Host quirks that change the rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `gcc` is usually a front for clang here, so plain gcc needs an explicit `AFL_CC`
    Apple,
    /// `clang -g -m32` is broken on 64-bit `FreeBSD`
    FreeBsdX86_64,
    /// Everything else
    Other,
}

impl Platform {
    /// The platform this crate was compiled for
    #[must_use]
    pub const fn host() -> Self {
        if cfg!(target_vendor = "apple") {
            Platform::Apple
        } else if cfg!(all(target_os = "freebsd", target_arch = "x86_64")) {
            Platform::FreeBsdX86_64
        } else {
            Platform::Other
        }
    }
}

/// The compiler family requested by the wrapper name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// `afl-clang` and every other `afl-clang*` name except `afl-clang++`
    Clang,
    /// `afl-clang++`
    ClangCxx,
    /// `afl-g++`
    Cxx,
    /// `afl-gcj`
    Gcj,
    /// `afl-gcc` and anything unrecognized
    Cc,
}

impl Family {
    /// Classifies a wrapper by the file name part of `argv0`
    #[must_use]
    pub fn from_name(argv0: &str) -> Self {
        let name = argv0.rsplit_once('/').map_or(argv0, |(_, name)| name);
        if name.starts_with("afl-clang") {
            if name == "afl-clang++" {
                Family::ClangCxx
            } else {
                Family::Clang
            }
        } else {
            match name {
                "afl-g++" => Family::Cxx,
                "afl-gcj" => Family::Gcj,
                _ => Family::Cc,
            }
        }
    }

    /// Returns `true` for the clang based families
    #[must_use]
    pub fn is_clang(self) -> bool {
        matches!(self, Family::Clang | Family::ClangCxx)
    }

    /// Name of the override variable for this family
    #[must_use]
    pub fn override_var(self) -> &'static str {
        match self {
            Family::Clang | Family::Cc => crate::env_policy::AFL_CC_VAR,
            Family::ClangCxx | Family::Cxx => crate::env_policy::AFL_CXX_VAR,
            Family::Gcj => crate::env_policy::AFL_GCJ_VAR,
        }
    }

    /// Compiler used when no override is set
    #[must_use]
    pub fn default_compiler(self) -> &'static str {
        match self {
            Family::Clang => "clang",
            Family::ClangCxx => "clang++",
            Family::Cxx => "g++",
            Family::Gcj => "gcj",
            Family::Cc => "gcc",
        }
    }

    fn overridden(self, policy: &EnvPolicy) -> Option<&str> {
        match self {
            Family::Clang | Family::Cc => policy.cc.as_deref(),
            Family::ClangCxx | Family::Cxx => policy.cxx.as_deref(),
            Family::Gcj => policy.gcj.as_deref(),
        }
    }
}

/// The compiler the wrapper will hand off to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    family: Family,
    compiler: String,
}

impl Toolchain {
    /// Selects the compiler for a wrapper invoked as `argv0`
    pub fn select(argv0: &str, policy: &EnvPolicy, platform: Platform) -> Result<Self, Error> {
        let family = Family::from_name(argv0);

        let compiler = match family.overridden(policy) {
            Some(compiler) => compiler.to_string(),
            None if platform == Platform::Apple && !family.is_clang() => {
                return Err(Error::compiler_required(format!(
                    "On Apple systems, 'gcc' is usually just a wrapper for clang. Please use the\n    \
                     'afl-clang' utility instead of 'afl-gcc'. If you really have GCC installed,\n    \
                     set AFL_CC or AFL_CXX to specify the correct path to that compiler.\n\
                     {} required on MacOS X",
                    family.override_var()
                )));
            }
            None => family.default_compiler().to_string(),
        };

        log::debug!("Selected {compiler} for {argv0} ({family:?})");
        Ok(Self { family, compiler })
    }

    /// The family picked from the wrapper name
    #[must_use]
    pub fn family(&self) -> Family {
        self.family
    }

    /// The compiler executable, looked up through `PATH` if it has no slash
    #[must_use]
    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    /// Returns `true` if the wrapper runs in clang mode
    #[must_use]
    pub fn is_clang(&self) -> bool {
        self.family.is_clang()
    }
}
