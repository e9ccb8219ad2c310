//! The `afl-gcc` binary: usage, fatal errors and the final hand-off.

use std::process::{Command, Output};

const AFL_GCC: &str = env!("CARGO_BIN_EXE_afl-gcc");

const AFL_VARS: [&str; 10] = [
    "AFL_PATH",
    "AFL_CC",
    "AFL_CXX",
    "AFL_GCJ",
    "AFL_HARDEN",
    "AFL_USE_ASAN",
    "AFL_USE_MSAN",
    "AFL_DONT_OPTIMIZE",
    "AFL_NO_BUILTIN",
    "AFL_QUIET",
];

/// The binary with a clean `AFL_*` environment
fn afl_gcc() -> Command {
    let mut cmd = Command::new(AFL_GCC);
    for var in AFL_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[cfg(unix)]
mod scratch {
    use std::{env, fs, os::unix::fs::PermissionsExt, path::PathBuf};

    /// Directory holding an executable `as`, removed on drop
    pub struct AsDir(pub PathBuf);

    impl AsDir {
        pub fn new(name: &str) -> Self {
            let dir = env::temp_dir().join(format!(
                "afl_gcc_front_end_{name}_{}",
                std::process::id()
            ));
            let _ = fs::remove_dir_all(&dir);
            fs::create_dir_all(&dir).unwrap();
            let afl_as = dir.join("as");
            fs::write(&afl_as, "#!/bin/sh\n").unwrap();
            fs::set_permissions(&afl_as, fs::Permissions::from_mode(0o755)).unwrap();
            Self(dir)
        }
    }

    impl Drop for AsDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }
}

#[cfg(unix)]
fn abort_message(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn usage_without_arguments() {
    let out = afl_gcc().output().unwrap();
    assert_eq!(out.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("drop-in replacement"), "{stdout}");
    assert!(stdout.contains("AFL_HARDEN"), "{stdout}");
}

#[test]
#[cfg(unix)]
fn conflicting_sanitizers_abort() {
    let dir = scratch::AsDir::new("sanitizers");
    let out = afl_gcc()
        .env("AFL_PATH", &dir.0)
        .env("AFL_USE_ASAN", "1")
        .env("AFL_USE_MSAN", "1")
        .arg("a.c")
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    let stderr = abort_message(&out);
    assert!(
        stderr.contains("[-] PROGRAM ABORT : ASAN and MSAN are mutually exclusive"),
        "{stderr}"
    );
}

#[test]
#[cfg(unix)]
fn non_utf8_file_name_reaches_the_compiler() {
    use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

    let dir = scratch::AsDir::new("non_utf8");
    let out = afl_gcc()
        .env("AFL_PATH", &dir.0)
        .env("AFL_CC", "echo")
        .env("AFL_DONT_OPTIMIZE", "1")
        .arg(OsStr::from_bytes(b"caf\xe9.c"))
        .output()
        .unwrap();

    assert_eq!(out.status.code(), Some(0), "{}", abort_message(&out));

    let mut expected = b"caf\xe9.c -B ".to_vec();
    expected.extend_from_slice(dir.0.as_os_str().as_bytes());
    expected.push(b'\n');
    assert_eq!(out.stdout, expected);
}
