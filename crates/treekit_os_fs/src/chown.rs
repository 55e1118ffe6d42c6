//! Recursive ownership change by user/group name.

use std::os::unix::fs::lchown;
use std::path::Path;

use crate::credential::{lookup_group_id, lookup_user_id};
use crate::report::{ReportTree, ReportTreeBuilder};
use crate::scan::PathScanner;
use crate::spec::{FsTreeError, SpecTreeOptions};

/// Give `root` and every entry below it to `username:groupname`.
///
/// Both names are resolved before anything is touched, so an unknown name
/// fails with [`FsTreeError::UnknownIdentity`] and no mutation. Links are
/// changed themselves (`lchown`), never their targets. Entries changed
/// before a failure keep their new owner.
pub fn chown<P: AsRef<Path>>(root: P, username: &str, groupname: &str) -> Result<(), FsTreeError> {
    chown_with_options(root, username, groupname, SpecTreeOptions::default()).map(|_| ())
}

pub fn chown_with_options<P: AsRef<Path>>(
    root: P,
    username: &str,
    groupname: &str,
    spec_tree_options: SpecTreeOptions,
) -> Result<ReportTree, FsTreeError> {
    let uid = lookup_user_id(username)?;
    let gid = lookup_group_id(groupname)?;

    let scanner = PathScanner::with_options(root, spec_tree_options.spec_scan);
    let iter_nodes = scanner.scan()?;
    tracing::debug!(
        root = %scanner.root().display(),
        "chown {username}({uid}):{groupname}({gid}) started"
    );

    let mut builder_report = ReportTreeBuilder::new(spec_tree_options.rule_on_error);
    for res_node in iter_nodes {
        let node = match res_node {
            Ok(v) => v,
            Err(err) => {
                builder_report.record_error(err)?;
                continue;
            }
        };
        builder_report.add_scanned();

        match lchown(&node.path, Some(uid), Some(gid)) {
            Ok(()) => {
                tracing::trace!(path = %node.path.display(), "owner {uid}:{gid}");
                builder_report.add_applied();
            }
            Err(e) => builder_report.record_error(FsTreeError::from_io(&node.path, e))?,
        }
    }

    let report = builder_report.build();
    tracing::debug!("{}", report.format("[CHOWN]"));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use uzers::get_effective_uid;

    use super::{chown, chown_with_options};
    use crate::credential::{
        get_current_credential, get_file_credential, get_file_credentials, lookup_group_name,
        lookup_user_id,
    };
    use crate::scan::PathScanner;
    use crate::spec::{EnumFsTreeErrorKind, EnumTreeErrorPolicy, SpecTreeOptions};
    use crate::testing::create_scenario_tree;

    fn snapshot_owners(root: &std::path::Path) -> Vec<(u32, u32)> {
        PathScanner::new(root)
            .scan()
            .expect("scan")
            .map(|res| {
                let node = res.expect("node");
                (node.uid, node.gid)
            })
            .collect()
    }

    #[test]
    fn chown_to_current_identity_round_trips() {
        let Ok(credential) = get_current_credential() else {
            return; // ### return, running as an unnamed uid ###
        };

        let tmp = tempfile::tempdir().expect("tempdir");
        let root = create_scenario_tree(tmp.path(), "chown_self");
        std::os::unix::fs::symlink("1.test", root.join("link")).expect("symlink");

        chown(&root, &credential.username, &credential.groupname).expect("chown");

        for res_node in PathScanner::new(&root).scan().expect("scan") {
            let node = res_node.expect("node");
            let (username, groupname) = get_file_credentials(&node.path).expect("credentials");
            assert_eq!(username, credential.username);
            assert_eq!(groupname, credential.groupname);
        }
    }

    #[test]
    fn chown_to_nobody_as_root() {
        if get_effective_uid() != 0 {
            return; // ### return, only root can chown without restrictions ###
        }
        let Ok(uid_nobody) = lookup_user_id("nobody") else {
            return; // ### return, no nobody account on this host ###
        };
        let Some(gid_nobody) = uzers::get_user_by_uid(uid_nobody).map(|u| u.primary_group_id())
        else {
            return;
        };
        let Ok(groupname) = lookup_group_name(gid_nobody) else {
            return;
        };

        let tmp = tempfile::tempdir().expect("tempdir");
        let root = create_scenario_tree(tmp.path(), "chown");

        chown(&root, "nobody", &groupname).expect("chown");

        for res_node in PathScanner::new(&root).scan().expect("scan") {
            let node = res_node.expect("node");
            let (username, group) = get_file_credentials(&node.path).expect("credentials");
            assert_eq!(username, "nobody");
            assert_eq!(group, groupname);
        }
    }

    #[test]
    fn chown_without_privilege_is_permission_denied_and_changes_nothing() {
        if get_effective_uid() == 0 {
            return; // ### return, root is never denied ###
        }

        let tmp = tempfile::tempdir().expect("tempdir");
        let root = create_scenario_tree(tmp.path(), "chown_denied");
        let Ok(groupname_root) = lookup_group_name(0) else {
            return;
        };
        let l_owners_before = snapshot_owners(&root);

        let err = chown(&root, "root", &groupname_root).expect_err("must be denied");
        assert_eq!(err.kind(), EnumFsTreeErrorKind::PermissionDenied);
        assert_eq!(err.path(), Some(root.as_path()));
        assert_eq!(snapshot_owners(&root), l_owners_before);
    }

    #[test]
    fn chown_continue_mode_reports_every_denied_entry() {
        if get_effective_uid() == 0 {
            return; // ### return, root is never denied ###
        }
        let Ok(groupname_root) = lookup_group_name(0) else {
            return;
        };

        let tmp = tempfile::tempdir().expect("tempdir");
        let root = create_scenario_tree(tmp.path(), "chown_continue");

        let report = chown_with_options(
            &root,
            "root",
            &groupname_root,
            SpecTreeOptions {
                rule_on_error: EnumTreeErrorPolicy::Continue,
                ..SpecTreeOptions::default()
            },
        )
        .expect("continue mode returns report");
        assert_eq!(report.error_count() as u64, report.cnt_scanned);
        assert_eq!(report.cnt_applied, 0);
    }

    #[test]
    fn chown_symlink_root_changes_only_the_link() {
        let Ok(credential) = get_current_credential() else {
            return;
        };

        let tmp = tempfile::tempdir().expect("tempdir");
        let outside = create_scenario_tree(tmp.path(), "outside");
        let path_link = tmp.path().join("link");
        std::os::unix::fs::symlink(&outside, &path_link).expect("symlink");
        let l_owners_before = snapshot_owners(&outside);

        let report = chown_with_options(
            &path_link,
            &credential.username,
            &credential.groupname,
            SpecTreeOptions::default(),
        )
        .expect("chown link");
        assert_eq!(report.cnt_scanned, 1);
        assert_eq!(report.cnt_applied, 1);
        assert_eq!(snapshot_owners(&outside), l_owners_before);
    }

    #[test]
    fn chown_symlink_root_as_root_does_not_reach_target() {
        if get_effective_uid() != 0 {
            return; // ### return, only root can give files away ###
        }
        let Ok(uid_nobody) = lookup_user_id("nobody") else {
            return;
        };
        let Some(gid_nobody) = uzers::get_user_by_uid(uid_nobody).map(|u| u.primary_group_id())
        else {
            return;
        };
        let Ok(groupname) = lookup_group_name(gid_nobody) else {
            return;
        };

        let tmp = tempfile::tempdir().expect("tempdir");
        let outside = create_scenario_tree(tmp.path(), "outside");
        let path_link = tmp.path().join("link");
        std::os::unix::fs::symlink(&outside, &path_link).expect("symlink");
        let l_owners_before = snapshot_owners(&outside);

        chown(&path_link, "nobody", &groupname).expect("chown link");

        assert_eq!(snapshot_owners(&outside), l_owners_before);
        let credential_link = get_file_credential(&path_link).expect("link credential");
        assert_eq!(credential_link.uid, uid_nobody);
    }

    #[test]
    fn chown_unknown_user_fails_before_touching_tree() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let root = create_scenario_tree(tmp.path(), "chown_unknown");
        let credential_before = get_file_credential(&root).ok();
        let l_owners_before = snapshot_owners(&root);

        let err = chown(&root, "treekit_no_such_user_zz", "root").expect_err("unknown user");
        assert_eq!(err.kind(), EnumFsTreeErrorKind::UnknownIdentity);

        let err = chown(tmp.path().join("missing"), "treekit_no_such_user_zz", "root")
            .expect_err("unknown user wins over missing root");
        assert_eq!(err.kind(), EnumFsTreeErrorKind::UnknownIdentity);

        assert_eq!(snapshot_owners(&root), l_owners_before);
        assert_eq!(get_file_credential(&root).ok(), credential_before);
    }

    #[test]
    fn chown_missing_root_is_not_found() {
        let Ok(credential) = get_current_credential() else {
            return;
        };
        let tmp = tempfile::tempdir().expect("tempdir");
        let err = chown(
            tmp.path().join("missing"),
            &credential.username,
            &credential.groupname,
        )
        .expect_err("missing root");
        assert_eq!(err.kind(), EnumFsTreeErrorKind::NotFound);
    }
}
