//! User/group name resolution against the host identity database.
//!
//! Every lookup hits the database directly (`getpwnam_r` and friends via
//! `uzers`); nothing is cached between calls.

use std::fs;
use std::path::Path;

use uzers::{get_effective_gid, get_effective_uid, get_group_by_gid, get_group_by_name};
use uzers::{get_user_by_name, get_user_by_uid};

use crate::spec::{EnumIdentityNamespace, FsTreeError};

/// A resolved identity pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub uid: u32,
    pub gid: u32,
    pub username: String,
    pub groupname: String,
}

fn _unknown(namespace: EnumIdentityNamespace, name: impl Into<String>) -> FsTreeError {
    FsTreeError::UnknownIdentity {
        namespace,
        name: name.into(),
    }
}

/// Numeric id of user `username`.
pub fn lookup_user_id(username: &str) -> Result<u32, FsTreeError> {
    if username.is_empty() {
        return Err(_unknown(EnumIdentityNamespace::User, username));
    }
    get_user_by_name(username)
        .map(|user| user.uid())
        .ok_or_else(|| _unknown(EnumIdentityNamespace::User, username))
}

/// Numeric id of group `groupname`.
pub fn lookup_group_id(groupname: &str) -> Result<u32, FsTreeError> {
    if groupname.is_empty() {
        return Err(_unknown(EnumIdentityNamespace::Group, groupname));
    }
    get_group_by_name(groupname)
        .map(|group| group.gid())
        .ok_or_else(|| _unknown(EnumIdentityNamespace::Group, groupname))
}

/// Symbolic name of `uid`.
pub fn lookup_user_name(uid: u32) -> Result<String, FsTreeError> {
    get_user_by_uid(uid)
        .map(|user| user.name().to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| _unknown(EnumIdentityNamespace::User, uid.to_string()))
}

/// Symbolic name of `gid`.
pub fn lookup_group_name(gid: u32) -> Result<String, FsTreeError> {
    get_group_by_gid(gid)
        .map(|group| group.name().to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| _unknown(EnumIdentityNamespace::Group, gid.to_string()))
}

fn _resolve(uid: u32, gid: u32) -> Result<Credential, FsTreeError> {
    Ok(Credential {
        uid,
        gid,
        username: lookup_user_name(uid)?,
        groupname: lookup_group_name(gid)?,
    })
}

/// Owner and group of `path` with their names resolved.
///
/// The path is `lstat`ed, so a symlink reports its own ownership, which is
/// what [`crate::chown`] sets.
pub fn get_file_credential<P: AsRef<Path>>(path: P) -> Result<Credential, FsTreeError> {
    use std::os::unix::fs::MetadataExt;

    let path = path.as_ref();
    let meta = fs::symlink_metadata(path).map_err(|e| FsTreeError::from_io(path, e))?;
    _resolve(meta.uid(), meta.gid())
}

/// `(username, groupname)` owning `path`.
pub fn get_file_credentials<P: AsRef<Path>>(path: P) -> Result<(String, String), FsTreeError> {
    let credential = get_file_credential(path)?;
    Ok((credential.username, credential.groupname))
}

/// Effective identity of the calling process.
pub fn get_current_credential() -> Result<Credential, FsTreeError> {
    _resolve(get_effective_uid(), get_effective_gid())
}
