//! Path resolution rules.
//!
//! Two rules exist and must not be mixed up:
//!
//! - Paths coming from configuration (cache directory, log directory,
//!   protected paths) are home-relative: `~/x` and plain `x` both resolve
//!   under the user's home directory.
//! - Paths given as delete targets are resolved against the current working
//!   directory, like any other command-line tool would.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve a configuration path against the user's home directory.
///
/// Falls back to the literal input when the home directory is unknown.
pub fn expand_config_path(path: &Path) -> PathBuf {
    expand_config_path_with(path, dirs::home_dir().as_deref())
}

/// Same as [`expand_config_path`] with an explicit home directory.
pub fn expand_config_path_with(path: &Path, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return path.to_path_buf();
    };

    if let Ok(rest) = path.strip_prefix("~") {
        if rest.as_os_str().is_empty() {
            return home.to_path_buf();
        }
        return normalize(&home.join(rest));
    }

    if path.is_relative() {
        return normalize(&home.join(path));
    }

    normalize(path)
}

/// Make a delete target absolute against the process working directory.
pub fn absolutize_target(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    let cwd = std::env::current_dir()?;
    Ok(absolutize_target_in(path, &cwd))
}

/// Same as [`absolutize_target`] with an explicit working directory.
pub fn absolutize_target_in(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&cwd.join(path))
    }
}

/// Lexically clean a path: drop `.` segments and fold `..` into its parent.
///
/// Symlinks are not resolved, the target of a delete is the link itself.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = match out.components().next_back() {
                    Some(Component::Normal(_)) => out.pop(),
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => true,
                    _ => false,
                };
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_tilde() {
        let home = Path::new("/home/alice");
        assert_eq!(
            expand_config_path_with(Path::new("~/.cache/vanish"), Some(home)),
            PathBuf::from("/home/alice/.cache/vanish")
        );
        assert_eq!(
            expand_config_path_with(Path::new("~"), Some(home)),
            PathBuf::from("/home/alice")
        );
    }

    #[test]
    fn test_config_path_relative_is_home_relative() {
        let home = Path::new("/home/alice");
        assert_eq!(
            expand_config_path_with(Path::new(".cache/vanish"), Some(home)),
            PathBuf::from("/home/alice/.cache/vanish")
        );
    }

    #[test]
    fn test_config_path_absolute_untouched() {
        let home = Path::new("/home/alice");
        assert_eq!(
            expand_config_path_with(Path::new("/var/cache/vanish"), Some(home)),
            PathBuf::from("/var/cache/vanish")
        );
    }

    #[test]
    fn test_config_path_without_home() {
        assert_eq!(
            expand_config_path_with(Path::new("~/x"), None),
            PathBuf::from("~/x")
        );
    }

    #[test]
    fn test_target_is_cwd_relative() {
        let cwd = Path::new("/work/project");
        assert_eq!(
            absolutize_target_in(Path::new("build/out.o"), cwd),
            PathBuf::from("/work/project/build/out.o")
        );
        assert_eq!(
            absolutize_target_in(Path::new("../other/./a.txt"), cwd),
            PathBuf::from("/work/other/a.txt")
        );
        assert_eq!(
            absolutize_target_in(Path::new("/etc/hosts"), cwd),
            PathBuf::from("/etc/hosts")
        );
    }

    #[test]
    fn test_normalize_does_not_escape_root() {
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("./")), PathBuf::from("."));
    }
}
