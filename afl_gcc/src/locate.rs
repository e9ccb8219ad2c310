//! Finds the directory holding the `as` wrapper that `-B` will point at.

use std::path::Path;

use crate::{EnvPolicy, Error, AFL_PATH};

/// Finds the `as` wrapper for a wrapper invoked as `argv0`.
///
/// The lookup order is `$AFL_PATH/as`, then `afl-as` next to `argv0`, then
/// `as` in the compiled-in [`AFL_PATH`]. The first executable hit wins and its
/// directory is returned.
pub fn find_as(argv0: &str, policy: &EnvPolicy) -> Result<String, Error> {
    find_as_in(argv0, policy.afl_path.as_deref(), AFL_PATH)
}

/// [`find_as`] with an explicit override and fallback directory
pub fn find_as_in(
    argv0: &str,
    afl_path: Option<&str>,
    default_path: &str,
) -> Result<String, Error> {
    if let Some(afl_path) = afl_path {
        if is_executable(&format!("{afl_path}/as")) {
            log::debug!("Using as wrapper from AFL_PATH: {afl_path}");
            return Ok(afl_path.to_string());
        }
    }

    // No slash means we were found through $PATH, nothing to look next to.
    if let Some((dir, _)) = argv0.rsplit_once('/') {
        if is_executable(&format!("{dir}/afl-as")) {
            log::debug!("Using afl-as next to the wrapper: {dir}");
            return Ok(dir.to_string());
        }
    }

    if is_executable(&format!("{default_path}/as")) {
        log::debug!("Using as wrapper from {default_path}");
        return Ok(default_path.to_string());
    }

    Err(Error::assembler_not_found(
        "Unable to find AFL wrapper binary for 'as'. Please set AFL_PATH",
    ))
}

#[cfg(unix)]
fn is_executable(path: &str) -> bool {
    use nix::unistd::{access, AccessFlags};

    access(Path::new(path), AccessFlags::X_OK).is_ok()
}

#[cfg(not(unix))]
fn is_executable(path: &str) -> bool {
    Path::new(path).is_file()
}

#[cfg(all(test, unix))]
mod tests {
    use std::{
        fs::{self, File},
        os::unix::fs::PermissionsExt,
        path::PathBuf,
    };

    use super::*;

    /// Fresh scratch directory, removed on drop
    struct Scratch(PathBuf);

    impl Scratch {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "afl_gcc_locate_{name}_{}",
                std::process::id()
            ));
            let _ = fs::remove_dir_all(&dir);
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn path(&self) -> &str {
            self.0.to_str().unwrap()
        }

        fn touch(&self, name: &str, mode: u32) {
            let file = self.0.join(name);
            File::create(&file).unwrap();
            fs::set_permissions(&file, fs::Permissions::from_mode(mode)).unwrap();
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn test_afl_path_wins() {
        let afl_path = Scratch::new("override");
        afl_path.touch("as", 0o755);
        let sibling = Scratch::new("override_sibling");
        sibling.touch("afl-as", 0o755);

        let argv0 = format!("{}/afl-gcc", sibling.path());
        let found = find_as_in(&argv0, Some(afl_path.path()), "/nonexistent").unwrap();
        assert_eq!(found, afl_path.path());
    }

    #[test]
    fn test_afl_path_without_as_falls_through() {
        let afl_path = Scratch::new("empty_override");
        let sibling = Scratch::new("empty_override_sibling");
        sibling.touch("afl-as", 0o755);

        let argv0 = format!("{}/afl-clang", sibling.path());
        let found = find_as_in(&argv0, Some(afl_path.path()), "/nonexistent").unwrap();
        assert_eq!(found, sibling.path());
    }

    #[test]
    fn test_sibling_looks_for_afl_as_not_as() {
        let sibling = Scratch::new("sibling_name");
        sibling.touch("as", 0o755);
        let fallback = Scratch::new("sibling_name_fallback");
        fallback.touch("as", 0o755);

        let argv0 = format!("{}/afl-gcc", sibling.path());
        let found = find_as_in(&argv0, None, fallback.path()).unwrap();
        assert_eq!(found, fallback.path());
    }

    #[test]
    fn test_bare_name_skips_sibling() {
        let fallback = Scratch::new("bare_fallback");
        fallback.touch("as", 0o755);

        let found = find_as_in("afl-gcc", None, fallback.path()).unwrap();
        assert_eq!(found, fallback.path());
    }

    #[test]
    fn test_not_executable_is_ignored() {
        let afl_path = Scratch::new("noexec");
        afl_path.touch("as", 0o644);

        let res = find_as_in("afl-gcc", Some(afl_path.path()), "/nonexistent");
        // root can execute anything with at least one x bit, 0o644 has none
        assert!(matches!(res, Err(Error::AssemblerNotFound(_))));
    }

    #[test]
    fn test_nothing_found() {
        let res = find_as_in("/nonexistent/afl-gcc", None, "/nonexistent");
        match res {
            Err(Error::AssemblerNotFound(msg)) => assert!(msg.contains("AFL_PATH")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_find_as_uses_policy_override() {
        let afl_path = Scratch::new("policy");
        afl_path.touch("as", 0o700);

        let policy = EnvPolicy {
            afl_path: Some(afl_path.path().to_string()),
            ..EnvPolicy::default()
        };
        assert_eq!(find_as("afl-gcc", &policy).unwrap(), afl_path.path());
    }
}
