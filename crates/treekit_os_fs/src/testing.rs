//! Shared fixtures for the in-module test suites.

use std::path::{Path, PathBuf};

/// Relative entries of the reference tree; `Some(content)` marks a file.
pub(crate) fn scenario_entries() -> &'static [(&'static str, Option<&'static str>)] {
    &[
        ("1.test", Some("test1")),
        ("test1", None),
        ("test1/2.test", Some("test2")),
        ("test1/test2a", None),
        ("test1/test2a/3.test", Some("test3")),
        ("test1/test2b", None),
        ("test3", None),
    ]
}

/// Build the reference tree under `path_base/folder` and return its root.
pub(crate) fn create_scenario_tree(path_base: &Path, folder: &str) -> PathBuf {
    let root = path_base.join(folder);
    for (rel, content) in scenario_entries() {
        let path = root.join(rel);
        match content {
            Some(txt) => write_text(&path, txt),
            None => std::fs::create_dir_all(&path).expect("create dir"),
        }
    }
    root
}

pub(crate) fn write_text(path: &Path, txt: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, txt).expect("write text");
}

#[cfg(unix)]
pub(crate) fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::MetadataExt;
    std::fs::symlink_metadata(path).expect("lstat").mode() & 0o7777
}
