//! `afl-gcc`, also installed as `afl-g++`, `afl-gcj`, `afl-clang` and `afl-clang++`

use std::{
    env,
    ffi::OsString,
    io::{self, IsTerminal},
    process,
};

use afl_gcc::{find_as, CompilerWrapper, EnvPolicy, Error, GccWrapper, BIN_PATH};

fn usage() -> ! {
    println!(
        "\n\
         This is a helper application for afl-fuzz. It serves as a drop-in replacement\n\
         for gcc or clang, letting you recompile third-party code with the required\n\
         runtime instrumentation. A common use pattern would be one of the following:\n\n  \
         CC={BIN_PATH}/afl-gcc ./configure\n  \
         CXX={BIN_PATH}/afl-g++ ./configure\n\n\
         You can specify custom next-stage toolchain via AFL_CC, AFL_CXX, and AFL_AS.\n\
         Setting AFL_HARDEN enables hardening optimizations in the compiled code.\n"
    );
    process::exit(1);
}

fn fatal(err: &Error) -> ! {
    eprintln!("[-] PROGRAM ABORT : {err}");
    process::exit(1);
}

fn wrap(args: &[OsString], policy: EnvPolicy, silent: bool) -> Result<Option<i32>, Error> {
    let as_path = find_as(&args[0].to_string_lossy(), &policy)?;
    GccWrapper::new(as_path, policy)
        .silence(silent)
        .parse_args(args)?
        .run()
}

fn main() {
    let policy = EnvPolicy::from_env().unwrap_or_else(|err| fatal(&err));

    let silent = policy.quiet || !io::stderr().is_terminal();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if !silent {
        println!("afl-cc {}", env!("CARGO_PKG_VERSION"));
    }

    // raw bytes, file names are not required to be UTF-8
    let args: Vec<OsString> = env::args_os().collect();

    if args.len() < 2 {
        usage();
    }

    match wrap(&args, policy, silent) {
        Ok(Some(code)) => process::exit(code),
        Ok(None) => process::exit(1),
        Err(err) => fatal(&err),
    }
}
