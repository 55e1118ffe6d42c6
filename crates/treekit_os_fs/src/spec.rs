//! Option models, enums and the crate error type.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Filesystem entry classification as reported by `lstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFileKind {
    File,
    Directory,
    Symlink,
    /// FIFO, socket, block or character device.
    Other,
}

/// What a tree operation does when one entry fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumTreeErrorPolicy {
    /// Stop on the first failing entry and return its error.
    #[default]
    Abort,
    /// Record the failure in the report and keep going.
    Continue,
}

/// Symlink handling policy for copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopySymlinkStrategy {
    /// Follow the link and copy the target bytes/entries.
    Dereference,
    /// Create a symbolic link at destination pointing at the same target path.
    CopySymlinks,
    /// Ignore symlink entries.
    SkipSymlinks,
}

/// Existing destination file conflict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopyFileConflictStrategy {
    /// Keep destination file and skip current source file.
    Skip,
    /// Replace destination file with source file.
    Overwrite,
    /// Fail on the existing destination file.
    Error,
}

/// Pattern matching mode for exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

/// Identity namespace used in [`FsTreeError::UnknownIdentity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumIdentityNamespace {
    User,
    Group,
}

impl fmt::Display for EnumIdentityNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Group => write!(f, "group"),
        }
    }
}

/// Coarse error classification shared by every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumFsTreeErrorKind {
    NotFound,
    UnknownIdentity,
    PermissionDenied,
    IoFailure,
    InvalidArgument,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Traversal options for [`crate::PathScanner`].
#[derive(Debug, Clone)]
pub struct SpecScanOptions {
    /// Exclude patterns applied to entry basenames. Excluded directories are
    /// not descended into. The scan root is never excluded.
    pub patterns_exclude: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumPatternMode,
    /// Maximum depth below the root (root is depth 0).
    pub depth_limit: Option<usize>,
    /// Follow symbolic links while descending.
    pub if_follow_links: bool,
}

impl Default for SpecScanOptions {
    fn default() -> Self {
        Self {
            patterns_exclude: None,
            rule_pattern: EnumPatternMode::Glob,
            depth_limit: None,
            if_follow_links: false,
        }
    }
}

/// Options shared by chmod and chown.
#[derive(Debug, Clone, Default)]
pub struct SpecTreeOptions {
    /// Per-entry failure policy.
    pub rule_on_error: EnumTreeErrorPolicy,
    /// Traversal options.
    pub spec_scan: SpecScanOptions,
}

/// Input options for [`crate::copy_with_options`].
#[derive(Debug, Clone)]
pub struct SpecCopyOptions {
    /// Per-entry failure policy.
    pub rule_on_error: EnumTreeErrorPolicy,
    /// Exclude patterns, pattern mode and depth limit. `if_follow_links` is
    /// derived from `rule_symlink` and ignored here.
    pub spec_scan: SpecScanOptions,
    /// Symlink handling behavior.
    pub rule_symlink: EnumCopySymlinkStrategy,
    /// Conflict behavior for destination files.
    pub rule_conflict_file: EnumCopyFileConflictStrategy,
    /// Carry permissions, timestamps and extended attributes over to
    /// copied files.
    pub if_preserve_metadata: bool,
}

impl Default for SpecCopyOptions {
    fn default() -> Self {
        Self {
            rule_on_error: EnumTreeErrorPolicy::Abort,
            spec_scan: SpecScanOptions::default(),
            rule_symlink: EnumCopySymlinkStrategy::CopySymlinks,
            rule_conflict_file: EnumCopyFileConflictStrategy::Overwrite,
            if_preserve_metadata: false,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Error returned by every tree operation and credential lookup.
#[derive(Debug, Error)]
pub enum FsTreeError {
    /// A path that must exist does not.
    #[error("Path not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// A user/group name or numeric id has no entry in the identity database.
    #[error("Unknown {namespace}: {name}")]
    UnknownIdentity {
        namespace: EnumIdentityNamespace,
        name: String,
    },

    /// The caller lacks the privilege for the requested mutation.
    #[error("Permission denied: {} ({source})", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other read/write/stat failure.
    #[error("IO failure at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid exclude pattern.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// Source and destination overlap (one contains the other).
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        .path_source.display(),
        .path_destination.display()
    )]
    SourceDestinationOverlap {
        path_source: PathBuf,
        path_destination: PathBuf,
    },
}

impl FsTreeError {
    /// Classify an `io::Error` raised while touching `path`.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::Io { path, source },
        }
    }

    /// Coarse category for callers that branch on the failure class.
    pub fn kind(&self) -> EnumFsTreeErrorKind {
        match self {
            Self::NotFound { .. } => EnumFsTreeErrorKind::NotFound,
            Self::UnknownIdentity { .. } => EnumFsTreeErrorKind::UnknownIdentity,
            Self::PermissionDenied { .. } => EnumFsTreeErrorKind::PermissionDenied,
            Self::Io { .. } => EnumFsTreeErrorKind::IoFailure,
            Self::InvalidPattern(_) | Self::SourceDestinationOverlap { .. } => {
                EnumFsTreeErrorKind::InvalidArgument
            }
        }
    }

    /// Offending path, when the error is tied to one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path } | Self::PermissionDenied { path, .. } | Self::Io { path, .. } => {
                Some(path)
            }
            Self::SourceDestinationOverlap {
                path_destination, ..
            } => Some(path_destination),
            Self::UnknownIdentity { .. } | Self::InvalidPattern(_) => None,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::Path;

    use super::{EnumFsTreeErrorKind, EnumIdentityNamespace, FsTreeError};

    #[test]
    fn from_io_classifies_by_error_kind() {
        let err = FsTreeError::from_io("/a", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.kind(), EnumFsTreeErrorKind::NotFound);
        assert_eq!(err.path(), Some(Path::new("/a")));

        let err = FsTreeError::from_io("/b", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.kind(), EnumFsTreeErrorKind::PermissionDenied);

        let err = FsTreeError::from_io("/c", io::Error::other("disk on fire"));
        assert_eq!(err.kind(), EnumFsTreeErrorKind::IoFailure);
        assert!(err.to_string().contains("/c"));
        assert!(err.to_string().contains("disk on fire"));
    }

    #[test]
    fn unknown_identity_message_names_namespace() {
        let err = FsTreeError::UnknownIdentity {
            namespace: EnumIdentityNamespace::Group,
            name: "nogroup_x".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown group: nogroup_x");
        assert_eq!(err.kind(), EnumFsTreeErrorKind::UnknownIdentity);
        assert!(err.path().is_none());
    }
}
