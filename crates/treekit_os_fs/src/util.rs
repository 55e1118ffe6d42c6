use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::spec::{EnumPatternMode, FsTreeError};

/// Mode requested for directories created by copy (umask still applies).
pub(crate) const C_MODE_DIR_DEFAULT: u32 = 0o777;
/// Permission portion of a raw `st_mode`, special bits included.
pub(crate) const C_MODE_PERMISSION_MASK: u32 = 0o7777;

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypePatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypePatternSeq {
    pub(crate) fn compile(
        patterns: Option<&[String]>,
        rule_pattern: EnumPatternMode,
    ) -> Result<Option<Self>, FsTreeError> {
        let Some(patterns) = patterns else {
            return Ok(None);
        };
        if patterns.is_empty() {
            return Ok(None);
        }

        match rule_pattern {
            EnumPatternMode::Literal => Ok(Some(Self::Literal(patterns.to_vec()))),
            EnumPatternMode::Glob => {
                let mut l_glob = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    let matcher = Glob::new(pattern)
                        .map_err(|e| FsTreeError::InvalidPattern(format!("{pattern:?}: {e}")))?
                        .compile_matcher();
                    l_glob.push(matcher);
                }
                Ok(Some(Self::Glob(l_glob)))
            }
            EnumPatternMode::Regex => {
                let mut l_regex = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    let regex = Regex::new(pattern)
                        .map_err(|e| FsTreeError::InvalidPattern(format!("{pattern:?}: {e}")))?;
                    l_regex.push(regex);
                }
                Ok(Some(Self::Regex(l_regex)))
            }
        }
    }

    pub(crate) fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

pub(crate) fn absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Canonicalize the deepest existing ancestor and re-append the rest.
fn _normalize_path(path: &Path) -> PathBuf {
    let path_abs = absolutize_path(path);
    for path_ancestor in path_abs.ancestors() {
        if let Ok(resolved) = fs::canonicalize(path_ancestor) {
            let path_rest = path_abs.strip_prefix(path_ancestor).unwrap_or(Path::new(""));
            return resolved.join(path_rest);
        }
    }
    path_abs
}

/// `true` when one directory contains the other (or they are the same).
pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = _normalize_path(src);
    let dst_resolved = _normalize_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

/// Like [`_normalize_path`] but leaves the final component unresolved, so a
/// symlink is named by itself rather than by its target.
fn _normalize_entry_path(path: &Path) -> PathBuf {
    let path_abs = absolutize_path(path);
    match (path_abs.parent(), path_abs.file_name()) {
        (Some(path_parent), Some(name)) => _normalize_path(path_parent).join(name),
        _ => _normalize_path(&path_abs),
    }
}

/// `true` when writing `dst` would replace `src` itself.
///
/// With `if_follow_src` the source is compared by what it resolves to.
pub(crate) fn is_same_entry(src: &Path, dst: &Path, if_follow_src: bool) -> bool {
    let src_resolved = if if_follow_src {
        _normalize_path(src)
    } else {
        _normalize_entry_path(src)
    };
    src_resolved == _normalize_entry_path(dst)
}

/// `lstat` that maps a missing path to `Ok(None)`.
pub(crate) fn symlink_metadata_opt(path: &Path) -> Result<Option<fs::Metadata>, FsTreeError> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FsTreeError::from_io(path, e)),
    }
}

/// `lstat` that fails with [`FsTreeError::NotFound`] on a missing path.
pub(crate) fn require_exists(path: &Path) -> Result<fs::Metadata, FsTreeError> {
    symlink_metadata_opt(path)?.ok_or_else(|| FsTreeError::NotFound {
        path: path.to_path_buf(),
    })
}

pub(crate) fn from_walk_error(err: walkdir::Error, path_root: &Path) -> FsTreeError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| path_root.to_path_buf());
    if let Some(path_ancestor) = err.loop_ancestor() {
        return FsTreeError::Io {
            source: io::Error::other(format!(
                "Filesystem loop back to {}",
                path_ancestor.display()
            )),
            path,
        };
    }
    match err.into_io_error() {
        Some(e) => FsTreeError::from_io(path, e),
        None => FsTreeError::Io {
            path,
            source: io::Error::other("Directory walk failed"),
        },
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region EntryWriters

/// Create `path_dir` (and missing parents) with [`C_MODE_DIR_DEFAULT`].
pub(crate) fn create_dir_default(path_dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(C_MODE_DIR_DEFAULT);
    }
    builder.create(path_dir)
}

/// Recreate the symlink at `path_src` as `path_dst` with the same target path.
pub(crate) fn copy_symbolic_link(path_src: &Path, path_dst: &Path) -> io::Result<()> {
    let target = fs::read_link(path_src)?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&target, path_dst)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        if path_src.is_dir() {
            symlink_dir(&target, path_dst)
        } else {
            symlink_file(&target, path_dst)
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (target, path_dst);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Symbolic links are unsupported on this platform",
        ))
    }
}

/// Duplicate the bytes of `path_file_src` into a fresh `path_file_dst`.
pub(crate) fn copy_file_bytes(
    path_file_src: &Path,
    path_file_dst: &Path,
    if_preserve_metadata: bool,
) -> io::Result<()> {
    fs::copy(path_file_src, path_file_dst)?;
    if if_preserve_metadata {
        apply_file_metadata(path_file_src, path_file_dst)?;
    }
    Ok(())
}

fn apply_file_metadata(path_file_src: &Path, path_file_dst: &Path) -> io::Result<()> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    #[cfg(target_os = "linux")]
    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(path = %path_file_src.display(), "xattr listing unavailable: {e}");
            return;
        }
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            tracing::debug!(
                path = %path_file_dst.display(),
                "xattr {} not copied: {e}",
                name.to_string_lossy()
            );
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
