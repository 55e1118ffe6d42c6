//! `treekit_os_fs` v1:
//! Tree-level filesystem operations.
//!
//! Module layout:
//! - `scan`       : depth-first subtree traversal
//! - `copy`       : subtree duplication
//! - `chmod`      : recursive permission change
//! - `chown`      : recursive ownership change by name
//! - `remove`     : forceful recursive removal
//! - `credential` : user/group name <-> id resolution
//! - `spec`       : enums/options/errors
//! - `report`     : per-run report model
//! - `util`       : shared helper functions

#[cfg(unix)]
pub mod chmod;
#[cfg(unix)]
pub mod chown;
pub mod copy;
#[cfg(unix)]
pub mod credential;
pub mod remove;
pub mod report;
pub mod scan;
pub mod spec;
mod util;

#[cfg(test)]
mod testing;

#[cfg(unix)]
pub use chmod::{chmod, chmod_with_options};
#[cfg(unix)]
pub use chown::{chown, chown_with_options};
pub use copy::{copy, copy_with_options};
#[cfg(unix)]
pub use credential::{
    Credential, get_current_credential, get_file_credential, get_file_credentials,
    lookup_group_id, lookup_group_name, lookup_user_id, lookup_user_name,
};
pub use remove::{remove, remove_with_policy};
pub use report::{ReportTree, SpecTreeError};
pub use scan::{FileNode, IterFileNodes, PathScanner};
pub use spec::{
    EnumCopyFileConflictStrategy, EnumCopySymlinkStrategy, EnumFileKind, EnumFsTreeErrorKind,
    EnumIdentityNamespace, EnumPatternMode, EnumTreeErrorPolicy, FsTreeError, SpecCopyOptions,
    SpecScanOptions, SpecTreeOptions,
};
