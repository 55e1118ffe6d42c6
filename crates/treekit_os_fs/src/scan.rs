//! Depth-first subtree traversal yielding [`FileNode`]s.
//!
//! The root comes first, every directory precedes its descendants, and
//! siblings are ordered by file name. A failing stat or listing is yielded
//! as an `Err` item in place of the node; consumers decide whether to stop.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::spec::{EnumFileKind, FsTreeError, SpecScanOptions};
use crate::util::{TypePatternSeq, absolutize_path, from_walk_error, require_exists};

/// One traversal-visited entry, as reported by the filesystem at visit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Path relative to the scan root (empty for the root itself).
    pub path_rel: PathBuf,
    /// Distance from the scan root (root is 0).
    pub depth: usize,
    pub kind: EnumFileKind,
    /// Permission bits (`st_mode & 0o7777`); 0 where unsupported.
    pub mode: u32,
    /// Owner id; 0 where unsupported.
    pub uid: u32,
    /// Group id; 0 where unsupported.
    pub gid: u32,
}

impl FileNode {
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    fn from_dir_entry(entry: &DirEntry, path_root: &Path) -> Result<Self, FsTreeError> {
        let path = entry.path().to_path_buf();
        let meta = entry.metadata().map_err(|e| from_walk_error(e, path_root))?;
        let path_rel = path
            .strip_prefix(path_root)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let (mode, uid, gid) = _access_bits(&meta);

        Ok(Self {
            path,
            path_rel,
            depth: entry.depth(),
            kind: kind_of(&meta.file_type()),
            mode,
            uid,
            gid,
        })
    }
}

pub(crate) fn kind_of(file_type: &fs::FileType) -> EnumFileKind {
    if file_type.is_symlink() {
        EnumFileKind::Symlink
    } else if file_type.is_dir() {
        EnumFileKind::Directory
    } else if file_type.is_file() {
        EnumFileKind::File
    } else {
        EnumFileKind::Other
    }
}

#[cfg(unix)]
fn _access_bits(meta: &fs::Metadata) -> (u32, u32, u32) {
    use std::os::unix::fs::MetadataExt;

    use crate::util::C_MODE_PERMISSION_MASK;
    (meta.mode() & C_MODE_PERMISSION_MASK, meta.uid(), meta.gid())
}

#[cfg(not(unix))]
fn _access_bits(_meta: &fs::Metadata) -> (u32, u32, u32) {
    (0, 0, 0)
}

/// Subtree scanner configured with [`SpecScanOptions`].
#[derive(Debug, Clone)]
pub struct PathScanner {
    path_root: PathBuf,
    spec_scan_options: SpecScanOptions,
}

impl PathScanner {
    /// Scanner over `path_root` with default options.
    pub fn new<P: AsRef<Path>>(path_root: P) -> Self {
        Self::with_options(path_root, SpecScanOptions::default())
    }

    /// Scanner over `path_root`; a relative root is taken from the current directory.
    pub fn with_options<P: AsRef<Path>>(path_root: P, spec_scan_options: SpecScanOptions) -> Self {
        Self {
            path_root: absolutize_path(path_root.as_ref()),
            spec_scan_options,
        }
    }

    /// Absolute scan root.
    pub fn root(&self) -> &Path {
        &self.path_root
    }

    /// Start the traversal.
    ///
    /// Fails up-front with [`FsTreeError::NotFound`] when the root is absent
    /// and with [`FsTreeError::InvalidPattern`] when an exclude pattern does
    /// not compile. Nothing is read beyond the root until the iterator is
    /// advanced. A symlink root is yielded as a link and not descended
    /// unless links are followed.
    pub fn scan(&self) -> Result<IterFileNodes, FsTreeError> {
        require_exists(&self.path_root)?;
        let patterns_exclude = TypePatternSeq::compile(
            self.spec_scan_options.patterns_exclude.as_deref(),
            self.spec_scan_options.rule_pattern,
        )?;

        let mut walk_dir = WalkDir::new(&self.path_root)
            .follow_links(self.spec_scan_options.if_follow_links)
            .follow_root_links(self.spec_scan_options.if_follow_links)
            .sort_by_file_name();
        if let Some(depth_limit) = self.spec_scan_options.depth_limit {
            walk_dir = walk_dir.max_depth(depth_limit);
        }

        let fn_keep: FnKeepEntry = match patterns_exclude {
            None => Box::new(|_: &DirEntry| true),
            Some(patterns) => Box::new(move |entry: &DirEntry| {
                entry.depth() == 0 || !patterns.is_match(&entry.file_name().to_string_lossy())
            }),
        };

        Ok(IterFileNodes {
            path_root: self.path_root.clone(),
            iter_walk: walk_dir.into_iter().filter_entry(fn_keep),
        })
    }
}

type FnKeepEntry = Box<dyn FnMut(&DirEntry) -> bool + Send>;

/// Lazy node sequence returned by [`PathScanner::scan`].
pub struct IterFileNodes {
    path_root: PathBuf,
    iter_walk: walkdir::FilterEntry<walkdir::IntoIter, FnKeepEntry>,
}

impl Iterator for IterFileNodes {
    type Item = Result<FileNode, FsTreeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let res_entry = self.iter_walk.next()?;
        Some(match res_entry {
            Ok(entry) => FileNode::from_dir_entry(&entry, &self.path_root),
            Err(e) => Err(from_walk_error(e, &self.path_root)),
        })
    }
}
