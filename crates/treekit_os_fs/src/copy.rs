//! Subtree copy: topology and file bytes duplicated under a new root.

use std::fs;
use std::io;
use std::path::Path;

use crate::report::{ReportTree, ReportTreeBuilder};
use crate::scan::{PathScanner, kind_of};
use crate::spec::{
    EnumCopyFileConflictStrategy, EnumCopySymlinkStrategy, EnumFileKind, FsTreeError,
    SpecCopyOptions, SpecScanOptions,
};
use crate::util::{
    absolutize_path, copy_file_bytes, copy_symbolic_link, create_dir_default, is_overlap,
    is_same_entry, require_exists, symlink_metadata_opt,
};

#[derive(Debug)]
struct SpecCopyContext<'a> {
    spec_cp_options: &'a SpecCopyOptions,
    builder_report: ReportTreeBuilder,
}

/// Copy `source` to `destination` with default options.
///
/// Directories are recreated with mode `0o777` (minus umask), file bytes are
/// duplicated, symlinks are recreated with the same target path, and existing
/// destination files are overwritten. Stops at the first failure; whatever was
/// written before it stays.
pub fn copy<P, Q>(destination: P, source: Q) -> Result<(), FsTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    copy_with_options(destination, source, SpecCopyOptions::default()).map(|_| ())
}

/// Copy `source` to `destination` as configured by [`SpecCopyOptions`].
///
/// `source` may be a directory (copied recursively), a regular file or a
/// symlink (copied as a single entry). Returns [`FsTreeError::NotFound`] when
/// `source` is absent and [`FsTreeError::SourceDestinationOverlap`] when one
/// directory contains the other or a single-entry source would be replaced
/// by its own copy.
pub fn copy_with_options<P, Q>(
    destination: P,
    source: Q,
    spec_cp_options: SpecCopyOptions,
) -> Result<ReportTree, FsTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dst = absolutize_path(destination.as_ref());
    let path_src = absolutize_path(source.as_ref());
    let meta_src = require_exists(&path_src)?;

    tracing::debug!(
        source = %path_src.display(),
        destination = %path_dst.display(),
        "copy started"
    );

    let mut spec_cp_ctx = SpecCopyContext {
        spec_cp_options: &spec_cp_options,
        builder_report: ReportTreeBuilder::new(spec_cp_options.rule_on_error),
    };

    let meta_src = if meta_src.file_type().is_symlink()
        && spec_cp_options.rule_symlink == EnumCopySymlinkStrategy::Dereference
    {
        fs::metadata(&path_src).map_err(|e| FsTreeError::from_io(&path_src, e))?
    } else {
        meta_src
    };

    if meta_src.is_dir() {
        if is_overlap(&path_src, &path_dst) {
            return Err(FsTreeError::SourceDestinationOverlap {
                path_source: path_src,
                path_destination: path_dst,
            });
        }
        copy_tree(&path_src, &path_dst, &mut spec_cp_ctx)?;
    } else {
        let if_follow_src = spec_cp_options.rule_symlink == EnumCopySymlinkStrategy::Dereference;
        if is_same_entry(&path_src, &path_dst, if_follow_src) {
            return Err(FsTreeError::SourceDestinationOverlap {
                path_source: path_src,
                path_destination: path_dst,
            });
        }
        spec_cp_ctx.builder_report.add_scanned();
        if let Some(path_parent) = path_dst.parent() {
            create_dir_default(path_parent).map_err(|e| FsTreeError::from_io(path_parent, e))?;
        }
        let enum_kind = kind_of(&meta_src.file_type());
        if let Err(err) = copy_entry(&path_src, &path_dst, enum_kind, &mut spec_cp_ctx) {
            spec_cp_ctx.builder_report.record_error(err)?;
        }
    }

    let report = spec_cp_ctx.builder_report.build();
    tracing::debug!("{}", report.format("[COPY]"));
    Ok(report)
}

fn copy_tree(
    path_src: &Path,
    path_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext<'_>,
) -> Result<(), FsTreeError> {
    let spec_scan_options = SpecScanOptions {
        if_follow_links: spec_cp_ctx.spec_cp_options.rule_symlink
            == EnumCopySymlinkStrategy::Dereference,
        ..spec_cp_ctx.spec_cp_options.spec_scan.clone()
    };

    for res_node in PathScanner::with_options(path_src, spec_scan_options).scan()? {
        let node = match res_node {
            Ok(v) => v,
            Err(err) => {
                spec_cp_ctx.builder_report.record_error(err)?;
                continue;
            }
        };
        spec_cp_ctx.builder_report.add_scanned();

        let path_entry_dst = if node.is_root() {
            path_dst.to_path_buf()
        } else {
            path_dst.join(&node.path_rel)
        };
        if let Err(err) = copy_entry(&node.path, &path_entry_dst, node.kind, spec_cp_ctx) {
            spec_cp_ctx.builder_report.record_error(err)?;
        }
    }
    Ok(())
}

fn copy_entry(
    path_src: &Path,
    path_dst: &Path,
    enum_kind: EnumFileKind,
    spec_cp_ctx: &mut SpecCopyContext<'_>,
) -> Result<(), FsTreeError> {
    match enum_kind {
        EnumFileKind::Directory => {
            if let Some(meta_dst) = symlink_metadata_opt(path_dst)?
                && !meta_dst.is_dir()
            {
                return Err(FsTreeError::Io {
                    path: path_dst.to_path_buf(),
                    source: io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "Destination exists and is not a directory",
                    ),
                });
            }
            create_dir_default(path_dst).map_err(|e| FsTreeError::from_io(path_dst, e))?;
            spec_cp_ctx.builder_report.add_applied();
        }
        EnumFileKind::File => {
            if !prepare_file_destination(path_dst, spec_cp_ctx)? {
                return Ok(());
            }
            copy_file_bytes(
                path_src,
                path_dst,
                spec_cp_ctx.spec_cp_options.if_preserve_metadata,
            )
            .map_err(|e| FsTreeError::from_io(path_dst, e))?;
            spec_cp_ctx.builder_report.add_applied();
        }
        EnumFileKind::Symlink => match spec_cp_ctx.spec_cp_options.rule_symlink {
            EnumCopySymlinkStrategy::SkipSymlinks => {
                spec_cp_ctx.builder_report.add_skipped();
            }
            EnumCopySymlinkStrategy::Dereference => {
                // Dangling link; live ones arrive with their target's kind.
                return Err(FsTreeError::NotFound {
                    path: path_src.to_path_buf(),
                });
            }
            EnumCopySymlinkStrategy::CopySymlinks => {
                if !prepare_file_destination(path_dst, spec_cp_ctx)? {
                    return Ok(());
                }
                copy_symbolic_link(path_src, path_dst)
                    .map_err(|e| FsTreeError::from_io(path_dst, e))?;
                spec_cp_ctx.builder_report.add_applied();
            }
        },
        EnumFileKind::Other => {
            spec_cp_ctx
                .builder_report
                .add_warning(format!("Special file skipped: {}", path_src.display()));
            spec_cp_ctx.builder_report.add_skipped();
        }
    }
    tracing::trace!(path = %path_dst.display(), "copied");
    Ok(())
}

/// Apply the file conflict rule to `path_dst`.
///
/// Returns `false` when the entry must be skipped. An existing destination
/// file or symlink is unlinked before overwrite, so a destination symlink is
/// replaced instead of written through.
fn prepare_file_destination(
    path_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext<'_>,
) -> Result<bool, FsTreeError> {
    let Some(meta_dst) = symlink_metadata_opt(path_dst)? else {
        return Ok(true);
    };
    if meta_dst.is_dir() {
        return Err(FsTreeError::Io {
            path: path_dst.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "Destination is a directory",
            ),
        });
    }

    match spec_cp_ctx.spec_cp_options.rule_conflict_file {
        EnumCopyFileConflictStrategy::Skip => {
            spec_cp_ctx.builder_report.add_skipped();
            Ok(false)
        }
        EnumCopyFileConflictStrategy::Error => Err(FsTreeError::Io {
            path: path_dst.to_path_buf(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "Destination exists"),
        }),
        EnumCopyFileConflictStrategy::Overwrite => {
            fs::remove_file(path_dst).map_err(|e| FsTreeError::from_io(path_dst, e))?;
            Ok(true)
        }
    }
}
