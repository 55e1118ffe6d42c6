//! Tree operation report model and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::spec::{EnumTreeErrorPolicy, FsTreeError};

/// One recorded entry failure with path + error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTreeError {
    /// Failed path.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

/// Aggregate counters and diagnostics for one tree operation.
///
/// `errors` is only ever populated under [`EnumTreeErrorPolicy::Continue`];
/// in abort mode the first failure is returned as `Err` instead.
#[derive(Debug, Default, Clone)]
pub struct ReportTree {
    /// Entries yielded by the scanner (or visited by the remover).
    pub cnt_scanned: u64,
    /// Entries the operation mutated or created.
    pub cnt_applied: u64,
    /// Entries left alone by strategy (symlinks, special files, conflicts).
    pub cnt_skipped: u64,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Per-entry failures.
    pub errors: Vec<SpecTreeError>,
}

impl ReportTree {
    /// Number of collected hard errors.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_applied".to_string(), self.cnt_applied);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} scanned={} applied={} skipped={} errors={} warnings={}",
            self.cnt_scanned,
            self.cnt_applied,
            self.cnt_skipped,
            self.error_count(),
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[TREE]"))
    }
}

/// Mutable accumulator threaded through one operation.
#[derive(Debug, Clone)]
pub(crate) struct ReportTreeBuilder {
    rule_on_error: EnumTreeErrorPolicy,
    cnt_scanned: u64,
    cnt_applied: u64,
    cnt_skipped: u64,
    warnings: Vec<String>,
    errors: Vec<SpecTreeError>,
}

impl ReportTreeBuilder {
    pub(crate) fn new(rule_on_error: EnumTreeErrorPolicy) -> Self {
        Self {
            rule_on_error,
            cnt_scanned: 0,
            cnt_applied: 0,
            cnt_skipped: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn add_scanned(&mut self) {
        self.cnt_scanned += 1;
    }

    pub(crate) fn add_applied(&mut self) {
        self.cnt_applied += 1;
    }

    pub(crate) fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    pub(crate) fn add_warning(&mut self, warning: String) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Route one entry failure through the error policy.
    ///
    /// Returns `Err` in abort mode so call-sites can use `?`; in continue
    /// mode the failure is stored and `Ok(())` is returned.
    pub(crate) fn record_error(&mut self, err: FsTreeError) -> Result<(), FsTreeError> {
        match self.rule_on_error {
            EnumTreeErrorPolicy::Abort => Err(err),
            EnumTreeErrorPolicy::Continue => {
                tracing::warn!(error = %err, "entry failed, continuing");
                let path = err.path().map(PathBuf::from).unwrap_or_default();
                self.errors.push(SpecTreeError {
                    path,
                    exception: err.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Finalize builder into immutable report.
    pub(crate) fn build(self) -> ReportTree {
        ReportTree {
            cnt_scanned: self.cnt_scanned,
            cnt_applied: self.cnt_applied,
            cnt_skipped: self.cnt_skipped,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}
