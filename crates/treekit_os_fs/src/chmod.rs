//! Recursive permission change.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::report::{ReportTree, ReportTreeBuilder};
use crate::scan::PathScanner;
use crate::spec::{EnumFileKind, FsTreeError, SpecTreeOptions};
use crate::util::C_MODE_PERMISSION_MASK;

/// Set the permission bits of `root` and every entry below it to `mode`.
///
/// Only `mode & 0o7777` is used. Symlinks are skipped: their own bits are
/// fixed on Linux and `chmod(2)` on a link changes its target. Directories
/// are changed after their descendants, so a mode without `x`/`r` does not
/// cut the walk short.
pub fn chmod<P: AsRef<Path>>(root: P, mode: u32) -> Result<(), FsTreeError> {
    chmod_with_options(root, mode, SpecTreeOptions::default()).map(|_| ())
}

pub fn chmod_with_options<P: AsRef<Path>>(
    root: P,
    mode: u32,
    spec_tree_options: SpecTreeOptions,
) -> Result<ReportTree, FsTreeError> {
    let mode = mode & C_MODE_PERMISSION_MASK;
    let scanner = PathScanner::with_options(root, spec_tree_options.spec_scan);
    let iter_nodes = scanner.scan()?;
    tracing::debug!(root = %scanner.root().display(), "chmod {mode:o} started");

    let mut builder_report = ReportTreeBuilder::new(spec_tree_options.rule_on_error);
    let mut l_dirs_pending: Vec<PathBuf> = Vec::new();

    for res_node in iter_nodes {
        let node = match res_node {
            Ok(v) => v,
            Err(err) => {
                builder_report.record_error(err)?;
                continue;
            }
        };
        builder_report.add_scanned();

        match node.kind {
            EnumFileKind::Symlink => builder_report.add_skipped(),
            EnumFileKind::Directory => l_dirs_pending.push(node.path),
            EnumFileKind::File | EnumFileKind::Other => {
                apply_mode(&node.path, mode, &mut builder_report)?;
            }
        }
    }

    // Pre-order reversed: every directory after all of its descendants.
    for path_dir in l_dirs_pending.iter().rev() {
        apply_mode(path_dir, mode, &mut builder_report)?;
    }

    let report = builder_report.build();
    tracing::debug!("{}", report.format("[CHMOD]"));
    Ok(report)
}

fn apply_mode(
    path: &Path,
    mode: u32,
    builder_report: &mut ReportTreeBuilder,
) -> Result<(), FsTreeError> {
    match fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        Ok(()) => {
            tracing::trace!(path = %path.display(), "mode {mode:o}");
            builder_report.add_applied();
            Ok(())
        }
        Err(e) => builder_report.record_error(FsTreeError::from_io(path, e)),
    }
}
