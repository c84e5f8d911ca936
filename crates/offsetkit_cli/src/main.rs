//! `offsetkit`:
//! Queries `cdb`/`kd` for struct layouts and symbol offsets and saves them
//! into one `<windows-build>.xlsx` workbook.

mod cli;
mod config;
mod sheets;

use std::env;

use anyhow::{Context, Result};
use clap::Parser;
use offsetkit_dbg::{
    DebuggerRunner, ProcessRunner, ReportCollect, collect_structs, collect_variables,
};
use offsetkit_io_xlsx::XlsxWriter;
use tracing::{debug, warn};

use crate::cli::Args;
use crate::config::{SpecRunConfig, derive_build_label, discover_config_file, resolve_run_config};

fn main() -> Result<()> {
    let args = Args::parse();
    offsetkit_log::init_logging(args.debug);

    let dir_work = env::current_dir().context("failed to resolve working directory")?;
    let config = discover_config_file(args.config.as_deref(), &dir_work)?;
    let run = resolve_run_config(&args, config, &derive_build_label())?;
    debug!(?run, "resolved run configuration");

    run_groups(&ProcessRunner, &run)?;
    Ok(())
}

/// Collect every selected group in order, then save the workbook.
///
/// Returns the final sheet names.
fn run_groups<R: DebuggerRunner + ?Sized>(
    runner: &R,
    run: &SpecRunConfig,
) -> Result<Vec<String>> {
    let mut writer = XlsxWriter::with_default_formats(run.path_output.clone());
    let mut l_reports: Vec<ReportCollect> = Vec::with_capacity(run.groups.len());

    for &group in &run.groups {
        let report = if group.is_struct() {
            let collection = collect_structs(runner, group, &run.collect)
                .with_context(|| format!("failed to collect {group}"))?;
            for layout in &collection.layouts {
                sheets::write_struct_sheet(&mut writer, layout)
                    .with_context(|| format!("failed to write sheet for {}", layout.symbol))?;
            }
            collection.report
        } else {
            let collection = collect_variables(runner, group, &run.collect)
                .with_context(|| format!("failed to collect {group}"))?;
            if collection.has_entries() {
                sheets::write_variable_sheet(&mut writer, group, &collection.offsets)
                    .with_context(|| format!("failed to write sheet for {group}"))?;
            }
            collection.report
        };

        log_report(&report);
        println!("[+] Processed {group}");
        l_reports.push(report);
    }

    if run.if_summary {
        sheets::write_summary_sheet(&mut writer, &l_reports)
            .context("failed to write summary sheet")?;
    }
    for report in writer.report() {
        for warning in &report.warnings {
            debug!("{warning}");
        }
    }
    let l_sheet_names = writer.sheet_names().to_vec();
    debug!(sheets = ?l_sheet_names, "workbook sheets");

    if run.collect.if_dry_run {
        println!("[+] Dry run: {} not written", writer.file_out());
        return Ok(l_sheet_names);
    }

    writer
        .close()
        .with_context(|| format!("failed to save {}", writer.file_out()))?;
    println!("[+] Saved Excel file: {}", writer.file_out());
    Ok(l_sheet_names)
}

fn log_report(report: &ReportCollect) {
    debug!("{report}");
    for warning in &report.warnings {
        debug!(group = %report.group, "{warning}");
    }
    for err in &report.errors {
        warn!(group = %report.group, entry = %err.entry, "{}", err.exception);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use offsetkit_dbg::{
        DebuggerError, EnumQueryGroup, SpecCollectOptions, SpecDebuggerInvocation, SpecListPaths,
    };

    use super::*;

    /// Answers `dt` with one field and `x`/`lm` with a fixed pair.
    struct FakeDebugger;

    impl DebuggerRunner for FakeDebugger {
        fn run(&self, invocation: &SpecDebuggerInvocation) -> Result<String, DebuggerError> {
            let script = invocation.args.last().cloned().unwrap_or_default();
            let body = if script.contains("; dt ") {
                "   +0x000 Pcb              : _KPROCESS"
            } else {
                "fffff801`4a2b3c40 nt!PsActiveProcessHead = <no type information>\n\
                 start             end                 module name\n\
                 fffff801`4a000000 fffff801`4b046000   nt         (pdb symbols)"
            };
            Ok(format!(
                "{script}\n<<<DUMP_START>>>\n{body}\n<<<DUMP_END>>>\nquit:\n"
            ))
        }
    }

    fn run_config(dir: &Path, if_dry_run: bool) -> SpecRunConfig {
        fs::write(dir.join("kernel_mode_struct.txt"), "nt!_EPROCESS\nnt!_KTHREAD\n")
            .expect("write structs");
        fs::write(dir.join("kernel_mode_variable.txt"), "nt!PsActiveProcessHead\n")
            .expect("write variables");
        SpecRunConfig {
            collect: SpecCollectOptions {
                lists: SpecListPaths::in_dir(dir),
                if_dry_run,
                ..SpecCollectOptions::default()
            },
            groups: EnumQueryGroup::ALL.to_vec(),
            path_output: dir.join("22631.xlsx"),
            if_summary: true,
        }
    }

    #[test]
    fn full_run_saves_workbook() {
        let tmp = tempfile::tempdir().expect("tempdir");
        run_groups(&FakeDebugger, &run_config(tmp.path(), false)).expect("run");
        assert!(tmp.path().join("22631.xlsx").is_file());
    }

    #[test]
    fn apostrophe_in_type_name_does_not_abort_the_run() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let run = run_config(tmp.path(), false);
        fs::write(
            tmp.path().join("kernel_mode_struct.txt"),
            "nt!_EPROCESS\nnt!_FOO'\nnt!_KTHREAD\n",
        )
        .expect("write structs");

        let l_sheets = run_groups(&FakeDebugger, &run).expect("run");
        assert_eq!(
            &l_sheets[..3],
            ["krnl-_EPROCESS", "krnl-_FOO", "krnl-_KTHREAD"]
        );
        assert!(tmp.path().join("22631.xlsx").is_file());
    }

    #[test]
    fn dry_run_saves_nothing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        run_groups(&FakeDebugger, &run_config(tmp.path(), true)).expect("run");
        assert!(!tmp.path().join("22631.xlsx").exists());
    }

    #[test]
    fn empty_lists_still_save_a_workbook() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let run = SpecRunConfig {
            collect: SpecCollectOptions {
                lists: SpecListPaths::in_dir(tmp.path()),
                ..SpecCollectOptions::default()
            },
            groups: EnumQueryGroup::ALL.to_vec(),
            path_output: tmp.path().join("windows_build.xlsx"),
            if_summary: false,
        };
        run_groups(&FakeDebugger, &run).expect("run");
        assert!(tmp.path().join("windows_build.xlsx").is_file());
    }
}
