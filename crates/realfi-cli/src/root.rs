use realfi_core::paths;
use std::path::{Path, PathBuf};

fn find_upward(start: &Path, found: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if found(&dir) {
            return Some(dir);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return None,
        }
    }
}

/// Resolve the project root directory.
///
/// Priority:
/// 1. `--root` flag / `REALFI_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `realfi.yaml`
/// 3. Walk upward from `cwd` looking for `deployed-addresses.json`
/// 4. Walk upward from `cwd` looking for `.git/`
/// 5. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_from(&cwd)
}

fn resolve_from(cwd: &Path) -> PathBuf {
    find_upward(cwd, |d| d.join(paths::CONFIG_FILE).is_file())
        .or_else(|| find_upward(cwd, |d| d.join(paths::ADDRESSES_FILE).is_file()))
        .or_else(|| find_upward(cwd, |d| d.join(".git").is_dir()))
        .unwrap_or_else(|| cwd.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_root(Some(dir.path())), dir.path());
    }

    #[test]
    fn config_file_beats_git_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let project = dir.path().join("realfi");
        std::fs::create_dir_all(project.join("cli/src")).unwrap();
        std::fs::write(project.join(paths::CONFIG_FILE), "version: 1\n").unwrap();

        assert_eq!(resolve_from(&project.join("cli/src")), project);
    }

    #[test]
    fn address_record_marks_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(paths::ADDRESSES_FILE), "{}").unwrap();
        let deep = dir.path().join("cli");
        std::fs::create_dir_all(&deep).unwrap();
        assert_eq!(resolve_from(&deep), dir.path());
    }
}
