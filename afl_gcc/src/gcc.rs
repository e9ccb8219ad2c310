//! GCC/clang wrapper routing the assembler through `afl-as`

use std::ffi::{OsStr, OsString};

use crate::{
    CompilerCommand, CompilerWrapper, EnvPolicy, Error, Platform, Toolchain, ASAN_ENV_VAR,
    CLANG_ENV_VAR,
};

/// Builtins that would let the compiler inline string compares past the hooks
const NO_BUILTIN_ARGS: [&str; 7] = [
    "-fno-builtin-strcmp",
    "-fno-builtin-strncmp",
    "-fno-builtin-strcasecmp",
    "-fno-builtin-strncasecmp",
    "-fno-builtin-memcmp",
    "-fno-builtin-strstr",
    "-fno-builtin-strcasestr",
];

/// The user arguments after filtering, and what was seen in them.
///
/// Arguments are kept as raw OS strings, file names do not have to be UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    /// Arguments kept, in the order given
    pub args: Vec<OsString>,
    /// `-m32` was passed (only tracked on 64-bit `FreeBSD`)
    pub m32_set: bool,
    /// `-fsanitize=address` or `-fsanitize=memory` was passed
    pub asan_set: bool,
    /// Something mentioning `FORTIFY_SOURCE` was passed
    pub fortify_set: bool,
    /// How many `-B` arguments were dropped
    pub b_dropped: usize,
}

impl ParsedArgs {
    /// Filters the user arguments, `args` must not contain `argv[0]`
    #[must_use]
    pub fn parse<S>(args: &[S], platform: Platform) -> Self
    where
        S: AsRef<OsStr>,
    {
        let mut parsed = Self::default();

        let mut iter = args.iter().map(S::as_ref);
        while let Some(arg) = iter.next() {
            let bytes = arg.as_encoded_bytes();

            if bytes.starts_with(b"-B") {
                parsed.b_dropped += 1;
                if bytes == b"-B" {
                    // the directory comes separately
                    iter.next();
                }
                continue;
            }

            match bytes {
                b"-integrated-as" | b"-pipe" => continue,
                b"-m32" if platform == Platform::FreeBsdX86_64 => parsed.m32_set = true,
                b"-fsanitize=address" | b"-fsanitize=memory" => parsed.asan_set = true,
                _ => (),
            }

            if contains(bytes, b"FORTIFY_SOURCE") {
                parsed.fortify_set = true;
            }

            parsed.args.push(arg.to_os_string());
        }

        parsed
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Wrap gcc, g++, gcj or clang
#[derive(Debug)]
pub struct GccWrapper {
    is_silent: bool,
    as_path: String,
    policy: EnvPolicy,
    platform: Platform,

    parse_args_called: bool,
    toolchain: Option<Toolchain>,
    parsed: ParsedArgs,
}

impl CompilerWrapper for GccWrapper {
    fn parse_args<S>(&mut self, args: &[S]) -> Result<&'_ mut Self, Error>
    where
        S: AsRef<OsStr>,
    {
        if args.is_empty() {
            return Err(Error::invalid_arguments("The number of arguments cannot be 0"));
        }

        if self.parse_args_called {
            return Err(Error::illegal_state(
                "CompilerWrapper::parse_args cannot be called twice on the same instance",
            ));
        }
        self.parse_args_called = true;

        // only the file name is matched, a lossy view is enough
        let argv0 = args[0].as_ref().to_string_lossy();
        self.toolchain = Some(Toolchain::select(&argv0, &self.policy, self.platform)?);

        self.parsed = ParsedArgs::parse(&args[1..], self.platform);
        if !self.is_silent {
            for _ in 0..self.parsed.b_dropped {
                log::warn!("-B is already set, overriding");
            }
        }

        Ok(self)
    }

    fn command(&self) -> Result<CompilerCommand, Error> {
        let Some(toolchain) = &self.toolchain else {
            return Err(Error::illegal_state(
                "CompilerWrapper::parse_args must be called before CompilerWrapper::command",
            ));
        };
        let parsed = &self.parsed;
        let policy = &self.policy;

        let mut args = vec![OsString::from(toolchain.compiler())];
        let mut envs = vec![];

        args.extend(parsed.args.iter().cloned());

        args.push("-B".into());
        args.push(self.as_path.clone().into());

        if toolchain.is_clang() {
            envs.push((CLANG_ENV_VAR.to_string(), "1".to_string()));
            args.push("-no-integrated-as".into());
        }

        if policy.harden {
            args.push("-fstack-protector-all".into());
            if !parsed.fortify_set {
                args.push("-D_FORTIFY_SOURCE=2".into());
            }
        }

        if parsed.asan_set {
            // also taken for -fsanitize=memory, afl-as only knows about ASAN
            envs.push((ASAN_ENV_VAR.to_string(), "1".to_string()));
        } else if policy.use_asan {
            if policy.use_msan {
                return Err(Error::mutually_exclusive("ASAN and MSAN are mutually exclusive"));
            }
            if policy.harden {
                return Err(Error::mutually_exclusive(
                    "ASAN and AFL_HARDEN are mutually exclusive",
                ));
            }
            args.push("-U_FORTIFY_SOURCE".into());
            args.push("-fsanitize=address".into());
        } else if policy.use_msan {
            if policy.use_asan {
                return Err(Error::mutually_exclusive("ASAN and MSAN are mutually exclusive"));
            }
            if policy.harden {
                return Err(Error::mutually_exclusive(
                    "MSAN and AFL_HARDEN are mutually exclusive",
                ));
            }
            args.push("-U_FORTIFY_SOURCE".into());
            args.push("-fsanitize=memory".into());
        }

        if !policy.dont_optimize {
            let broken_debug_info = self.platform == Platform::FreeBsdX86_64
                && toolchain.is_clang()
                && parsed.m32_set;
            if !broken_debug_info {
                args.push("-g".into());
            }

            args.push("-O3".into());
            args.push("-funroll-loops".into());

            // One AFL specific, one shared with libfuzzer
            args.push("-D__AFL_COMPILER=1".into());
            args.push("-DFUZZING_BUILD_MODE_UNSAFE_FOR_PRODUCTION=1".into());
        }

        if policy.no_builtin {
            args.extend(NO_BUILTIN_ARGS.into_iter().map(OsString::from));
        }

        Ok(CompilerCommand::new(args, envs))
    }

    fn silence(&mut self, value: bool) -> &'_ mut Self {
        self.is_silent = value;
        self
    }

    fn is_silent(&self) -> bool {
        self.is_silent
    }
}

impl GccWrapper {
    /// Create a new wrapper pointing `-B` at `as_path`
    #[must_use]
    pub fn new<S>(as_path: S, policy: EnvPolicy) -> Self
    where
        S: Into<String>,
    {
        Self {
            is_silent: policy.quiet,
            as_path: as_path.into(),
            policy,
            platform: Platform::host(),
            parse_args_called: false,
            toolchain: None,
            parsed: ParsedArgs::default(),
        }
    }

    /// Overrides the host platform quirks
    pub fn platform(&mut self, platform: Platform) -> &'_ mut Self {
        self.platform = platform;
        self
    }

    /// The selected compiler, once `parse_args` succeeded
    #[must_use]
    pub fn toolchain(&self) -> Option<&Toolchain> {
        self.toolchain.as_ref()
    }

    /// The filtered user arguments
    #[must_use]
    pub fn parsed(&self) -> &ParsedArgs {
        &self.parsed
    }
}
