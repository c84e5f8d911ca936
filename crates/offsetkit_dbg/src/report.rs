//! Collection report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use crate::spec::{EnumQueryGroup, SpecEntryError};

/// Aggregate counters and diagnostics for one query group.
#[derive(Debug, Clone)]
pub struct ReportCollect {
    pub group: EnumQueryGroup,
    /// Non-comment lines read from the list file.
    pub cnt_entries: u64,
    /// Entries dropped by include/exclude patterns.
    pub cnt_filtered: u64,
    /// Entries skipped: malformed, missing module, empty or unusable output, dry-run.
    pub cnt_skipped: u64,
    /// Debugger processes started.
    pub cnt_invoked: u64,
    /// Entries that produced a sheet or a row.
    pub cnt_recorded: u64,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
    /// Per-entry failures.
    pub errors: Vec<SpecEntryError>,
}

impl ReportCollect {
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
        dict_counts.insert("cnt_entries".to_string(), self.cnt_entries);
        dict_counts.insert("cnt_invoked".to_string(), self.cnt_invoked);
        dict_counts.insert("cnt_recorded".to_string(), self.cnt_recorded);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_filtered".to_string(), self.cnt_filtered);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} entries={} invoked={} recorded={} skipped={} filtered={} errors={} warnings={}",
            dict_counts["cnt_entries"],
            dict_counts["cnt_invoked"],
            dict_counts["cnt_recorded"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_filtered"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportCollect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(&format!("[{}]", self.group)))
    }
}

/// Mutable accumulator for collection statistics.
#[derive(Debug, Clone)]
pub struct ReportCollectBuilder {
    group: EnumQueryGroup,
    cnt_entries: u64,
    cnt_filtered: u64,
    cnt_skipped: u64,
    cnt_invoked: u64,
    cnt_recorded: u64,
    warnings: Vec<String>,
    errors: Vec<SpecEntryError>,
}

impl ReportCollectBuilder {
    pub fn new(group: EnumQueryGroup) -> Self {
        Self {
            group,
            cnt_entries: 0,
            cnt_filtered: 0,
            cnt_skipped: 0,
            cnt_invoked: 0,
            cnt_recorded: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn add_entries(&mut self, value: u64) {
        self.cnt_entries += value;
    }

    pub fn add_filtered(&mut self) {
        self.cnt_filtered += 1;
    }

    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    pub fn add_invoked(&mut self) {
        self.cnt_invoked += 1;
    }

    pub fn add_recorded(&mut self) {
        self.cnt_recorded += 1;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Add one entry-scoped error.
    pub fn add_error(&mut self, entry: String, exception: String) {
        self.errors.push(SpecEntryError { entry, exception });
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportCollect {
        ReportCollect {
            group: self.group,
            cnt_entries: self.cnt_entries,
            cnt_filtered: self.cnt_filtered,
            cnt_skipped: self.cnt_skipped,
            cnt_invoked: self.cnt_invoked,
            cnt_recorded: self.cnt_recorded,
            warnings: self.warnings,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_to_dict_and_format() {
        let mut builder = ReportCollectBuilder::new(EnumQueryGroup::KernelmodeStructs);
        builder.add_entries(5);
        builder.add_filtered();
        builder.add_skipped();
        builder.add_invoked();
        builder.add_invoked();
        builder.add_invoked();
        builder.add_recorded();
        builder.add_recorded();
        builder.add_warning("w".to_string());
        builder.add_error("nt!_X".to_string(), "boom".to_string());
        let report = builder.build();

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_entries"], 5);
        assert_eq!(dict_counts["cnt_invoked"], 3);
        assert_eq!(dict_counts["cnt_errors"], 1);

        assert_eq!(
            report.to_string(),
            "[kernelmode structs] entries=5 invoked=3 recorded=2 skipped=1 filtered=1 errors=1 warnings=1"
        );
    }
}
