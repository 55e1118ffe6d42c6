//! Forceful recursive removal.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::report::{ReportTree, ReportTreeBuilder};
use crate::spec::{EnumTreeErrorPolicy, FsTreeError};
use crate::util::{absolutize_path, symlink_metadata_opt};

/// Delete `root` and everything below it.
///
/// A missing `root` is success, so repeated calls are fine. Directories whose
/// mode blocks listing or unlinking get owner `rwx` first. Links are unlinked,
/// never followed. Deletions done before a failure are not undone.
pub fn remove<P: AsRef<Path>>(root: P) -> Result<(), FsTreeError> {
    remove_with_policy(root, EnumTreeErrorPolicy::Abort).map(|_| ())
}

/// [`remove`] with a configurable failure policy. In continue mode every
/// deletable entry is removed and the rest are listed in the report.
pub fn remove_with_policy<P: AsRef<Path>>(
    root: P,
    rule_on_error: EnumTreeErrorPolicy,
) -> Result<ReportTree, FsTreeError> {
    let path_root = absolutize_path(root.as_ref());
    let mut builder_report = ReportTreeBuilder::new(rule_on_error);

    if symlink_metadata_opt(&path_root)?.is_none() {
        tracing::debug!(root = %path_root.display(), "remove: nothing to do");
        return Ok(builder_report.build());
    }

    tracing::debug!(root = %path_root.display(), "remove started");
    remove_entry(&path_root, &mut builder_report)?;

    let report = builder_report.build();
    tracing::debug!("{}", report.format("[REMOVE]"));
    Ok(report)
}

fn remove_entry(path: &Path, builder_report: &mut ReportTreeBuilder) -> Result<(), FsTreeError> {
    let meta = match symlink_metadata_opt(path) {
        Ok(Some(v)) => v,
        // Vanished underneath us: already gone is what we wanted.
        Ok(None) => return Ok(()),
        Err(err) => return builder_report.record_error(err),
    };
    builder_report.add_scanned();

    if !meta.is_dir() {
        return _finish(fs::remove_file(path), path, builder_report);
    }

    _make_dir_writable(path, &meta);
    let l_children = match _list_dir(path) {
        Ok(v) => v,
        Err(e) => return builder_report.record_error(FsTreeError::from_io(path, e)),
    };
    for path_child in l_children {
        remove_entry(&path_child, builder_report)?;
    }
    _finish(fs::remove_dir(path), path, builder_report)
}

/// Directory listing with the handle closed before returning.
fn _list_dir(path: &Path) -> io::Result<Vec<PathBuf>> {
    fs::read_dir(path)?
        .map(|res_entry| res_entry.map(|entry| entry.path()))
        .collect()
}

fn _finish(
    res_remove: io::Result<()>,
    path: &Path,
    builder_report: &mut ReportTreeBuilder,
) -> Result<(), FsTreeError> {
    match res_remove {
        Ok(()) => {
            tracing::trace!(path = %path.display(), "removed");
            builder_report.add_applied();
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => builder_report.record_error(FsTreeError::from_io(path, e)),
    }
}

#[cfg(unix)]
fn _make_dir_writable(path: &Path, meta: &fs::Metadata) {
    use std::os::unix::fs::PermissionsExt;

    let mode = meta.permissions().mode();
    if mode & 0o700 == 0o700 {
        return;
    }
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o700)) {
        // Not fatal: the listing or unlink that follows reports the real failure.
        tracing::debug!(path = %path.display(), "could not force owner rwx: {e}");
    }
}

#[cfg(not(unix))]
fn _make_dir_writable(path: &Path, meta: &fs::Metadata) {
    let mut permissions = meta.permissions();
    if permissions.readonly() {
        permissions.set_readonly(false);
        let _ = fs::set_permissions(path, permissions);
    }
}
