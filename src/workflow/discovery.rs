// src/workflow/discovery.rs

//! Interpreter and script-root discovery for the finalize phase.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

use crate::fs::FileSystem;
use crate::types::PlatformKey;

/// Subdirectories of the target dir searched for scripts, after the target
/// dir itself.
pub const SCRIPT_DIR_CANDIDATES: [&str; 5] = ["scripts", "py-script", "python", "src", "lib"];

static PY_FILE: LazyLock<GlobMatcher> = LazyLock::new(|| {
    GlobBuilder::new("*.py")
        .case_insensitive(true)
        .build()
        .expect("script glob is valid")
        .compile_matcher()
});

/// The process environment discovery looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryEnv {
    pub path_dirs: Vec<PathBuf>,
    pub virtual_env: Option<PathBuf>,
    pub platform: Option<PlatformKey>,
}

impl DiscoveryEnv {
    pub fn from_process(platform: PlatformKey) -> Self {
        let path_dirs = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect())
            .unwrap_or_default();
        Self {
            path_dirs,
            virtual_env: std::env::var_os("VIRTUAL_ENV").map(PathBuf::from),
            platform: Some(platform),
        }
    }

    fn platform(&self) -> PlatformKey {
        self.platform.unwrap_or_else(PlatformKey::current)
    }
}

fn interpreter_names(platform: PlatformKey) -> &'static [&'static str] {
    match platform {
        PlatformKey::Windows => &["python.exe", "python3.exe"],
        _ => &["python3", "python"],
    }
}

fn well_known_interpreters(platform: PlatformKey) -> &'static [&'static str] {
    match platform {
        PlatformKey::Macos => &["/usr/local/bin/python3", "/usr/bin/python3"],
        PlatformKey::Linux => &["/usr/bin/python3", "/usr/local/bin/python3"],
        _ => &[],
    }
}

/// First existing interpreter: PATH entries × candidate names, then
/// well-known locations, then the active virtualenv.
pub fn find_interpreter(env: &DiscoveryEnv, fs: &dyn FileSystem) -> Option<PathBuf> {
    let platform = env.platform();

    let from_path = env.path_dirs.iter().flat_map(|dir| {
        interpreter_names(platform)
            .iter()
            .map(move |name| dir.join(name))
    });
    let well_known = well_known_interpreters(platform).iter().map(PathBuf::from);
    let venv = env.virtual_env.iter().map(|venv| match platform {
        PlatformKey::Windows => venv.join("Scripts").join("python.exe"),
        _ => venv.join("bin").join("python"),
    });

    let found = from_path
        .chain(well_known)
        .chain(venv)
        .find(|candidate| fs.is_file(candidate));
    debug!(?found, "interpreter discovery");
    found
}

/// Whether the file name of `path` matches `*.py`, ignoring case.
pub fn is_python_file(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| PY_FILE.is_match(Path::new(name)))
}

/// Whether `dir` directly contains at least one `*.py` file.
pub fn contains_python_files(dir: &Path, fs: &dyn FileSystem) -> bool {
    fs.read_dir(dir)
        .map(|entries| {
            entries
                .iter()
                .any(|entry| fs.is_file(entry) && is_python_file(entry))
        })
        .unwrap_or(false)
}

/// Search `target_dir` itself, then the conventional subdirectories, for a
/// directory that directly holds scripts.
pub fn find_script_root(target_dir: &Path, fs: &dyn FileSystem) -> Option<PathBuf> {
    if !fs.is_dir(target_dir) {
        return None;
    }
    std::iter::once(target_dir.to_path_buf())
        .chain(SCRIPT_DIR_CANDIDATES.iter().map(|sub| target_dir.join(sub)))
        .find(|dir| fs.is_dir(dir) && contains_python_files(dir, fs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn env(platform: PlatformKey, path: &[&str], venv: Option<&str>) -> DiscoveryEnv {
        DiscoveryEnv {
            path_dirs: path.iter().map(PathBuf::from).collect(),
            virtual_env: venv.map(PathBuf::from),
            platform: Some(platform),
        }
    }

    #[test]
    fn path_entries_win_in_order() {
        let fs = MockFileSystem::new();
        fs.add_file("/opt/b/python", b"".to_vec());
        fs.add_file("/opt/c/python3", b"".to_vec());
        fs.add_file("/usr/bin/python3", b"".to_vec());

        let e = env(PlatformKey::Linux, &["/opt/a", "/opt/b", "/opt/c"], None);
        assert_eq!(find_interpreter(&e, &fs), Some(PathBuf::from("/opt/b/python")));
    }

    #[test]
    fn well_known_order_depends_on_platform() {
        let fs = MockFileSystem::new();
        fs.add_file("/usr/bin/python3", b"".to_vec());
        fs.add_file("/usr/local/bin/python3", b"".to_vec());

        assert_eq!(
            find_interpreter(&env(PlatformKey::Linux, &[], None), &fs),
            Some(PathBuf::from("/usr/bin/python3"))
        );
        assert_eq!(
            find_interpreter(&env(PlatformKey::Macos, &[], None), &fs),
            Some(PathBuf::from("/usr/local/bin/python3"))
        );
        assert_eq!(find_interpreter(&env(PlatformKey::Windows, &[], None), &fs), None);
    }

    #[test]
    fn virtualenv_is_the_last_resort() {
        let fs = MockFileSystem::new();
        fs.add_file("/venv/bin/python", b"".to_vec());
        fs.add_file("/wvenv/Scripts/python.exe", b"".to_vec());

        assert_eq!(
            find_interpreter(&env(PlatformKey::Linux, &["/empty"], Some("/venv")), &fs),
            Some(PathBuf::from("/venv/bin/python"))
        );
        assert_eq!(
            find_interpreter(&env(PlatformKey::Windows, &[], Some("/wvenv")), &fs),
            Some(PathBuf::from("/wvenv/Scripts/python.exe"))
        );
        assert_eq!(find_interpreter(&env(PlatformKey::Linux, &[], None), &fs), None);
    }

    #[test]
    fn script_root_prefers_target_then_candidates() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/readme.md", b"".to_vec());
        fs.add_file("/t/src/tool.py", b"".to_vec());
        fs.add_file("/t/scripts/notes.txt", b"".to_vec());
        assert_eq!(find_script_root(Path::new("/t"), &fs), Some(PathBuf::from("/t/src")));

        fs.add_file("/t/Main.PY", b"".to_vec());
        assert_eq!(find_script_root(Path::new("/t"), &fs), Some(PathBuf::from("/t")));
    }

    #[test]
    fn script_root_requires_direct_children() {
        let fs = MockFileSystem::new();
        fs.add_file("/t/lib/deep/nested.py", b"".to_vec());
        assert_eq!(find_script_root(Path::new("/t"), &fs), None);
        assert_eq!(find_script_root(Path::new("/missing"), &fs), None);
    }
}
