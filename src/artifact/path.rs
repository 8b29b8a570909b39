//! Platform-independent artifact path strings
//!
//! All artifact keys and all exclusion matching use the forms produced here,
//! so the OS path handling stays behind this one function.

use std::path::{Component, Path};

/// Render a filesystem path as a forward-slash string.
///
/// `.` components and trailing separators are dropped, `..` is kept. An
/// empty relative path renders as `"."`.
pub fn normalize(path: &Path) -> String {
    let mut prefix = String::new();
    let mut absolute = false;
    let mut parts: Vec<String> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => prefix = p.as_os_str().to_string_lossy().into_owned(),
            Component::RootDir => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => parts.push("..".to_string()),
            Component::Normal(name) => parts.push(name.to_string_lossy().into_owned()),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("{}/{}", prefix, joined)
    } else if prefix.is_empty() && joined.is_empty() {
        ".".to_string()
    } else {
        format!("{}{}", prefix, joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths() {
        assert_eq!(normalize(Path::new("src/main.rs")), "src/main.rs");
        assert_eq!(normalize(Path::new("./src/./main.rs")), "src/main.rs");
        assert_eq!(normalize(Path::new("src/")), "src");
        assert_eq!(normalize(Path::new("../up/file")), "../up/file");
    }

    #[test]
    fn test_current_dir() {
        assert_eq!(normalize(Path::new(".")), ".");
        assert_eq!(normalize(Path::new("")), ".");
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_path() {
        assert_eq!(normalize(Path::new("/tmp/x/y")), "/tmp/x/y");
        assert_eq!(normalize(Path::new("/")), "/");
    }

    #[cfg(windows)]
    #[test]
    fn test_windows_separators() {
        assert_eq!(normalize(Path::new(r"src\gen\b.go")), "src/gen/b.go");
        assert_eq!(normalize(Path::new(r"C:\work\a.txt")), "C:/work/a.txt");
    }
}
