//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use offsetkit_dbg::{EnumPatternMode, EnumQueryGroup};

#[derive(Parser, Debug)]
#[command(name = "offsetkit")]
#[command(about = "Dump Windows struct layouts and symbol offsets into an xlsx workbook", long_about = None)]
pub struct Args {
    /// Log debugger command lines, raw output and parse results
    #[arg(long)]
    pub debug: bool,

    /// Output workbook (default: <windows-build>.xlsx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TOML config file (default: ./offsetkit.toml when present)
    #[arg(long, env = "OFFSETKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// User-mode debugger executable
    #[arg(long, env = "OFFSETKIT_CDB")]
    pub cdb: Option<PathBuf>,

    /// Kernel-mode debugger executable
    #[arg(long, env = "OFFSETKIT_KD")]
    pub kd: Option<PathBuf>,

    /// Directory holding the query list files
    #[arg(long)]
    pub lists_dir: Option<PathBuf>,

    /// Only run these groups (repeatable; default: all, in fixed order)
    #[arg(long = "group", value_enum)]
    pub groups: Vec<ArgGroup>,

    /// Only query entries whose `module!name` matches
    #[arg(long)]
    pub include: Vec<String>,

    /// Skip entries whose `module!name` matches
    #[arg(long)]
    pub exclude: Vec<String>,

    /// How --include/--exclude patterns are matched
    #[arg(long, value_enum, default_value_t = ArgPatternMode::Glob)]
    pub pattern_mode: ArgPatternMode,

    /// Print each debugger command instead of running it; nothing is saved
    #[arg(long)]
    pub dry_run: bool,

    /// Append a summary sheet with per-group counters
    #[arg(long)]
    pub summary: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgGroup {
    UsermodeStructs,
    KernelmodeStructs,
    UsermodeVariables,
    KernelmodeVariables,
}

impl From<ArgGroup> for EnumQueryGroup {
    fn from(value: ArgGroup) -> Self {
        match value {
            ArgGroup::UsermodeStructs => EnumQueryGroup::UsermodeStructs,
            ArgGroup::KernelmodeStructs => EnumQueryGroup::KernelmodeStructs,
            ArgGroup::UsermodeVariables => EnumQueryGroup::UsermodeVariables,
            ArgGroup::KernelmodeVariables => EnumQueryGroup::KernelmodeVariables,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgPatternMode {
    Glob,
    Regex,
    Literal,
}

impl From<ArgPatternMode> for EnumPatternMode {
    fn from(value: ArgPatternMode) -> Self {
        match value {
            ArgPatternMode::Glob => EnumPatternMode::Glob,
            ArgPatternMode::Regex => EnumPatternMode::Regex,
            ArgPatternMode::Literal => EnumPatternMode::Literal,
        }
    }
}

impl Args {
    /// Selected groups in run order, deduplicated.
    pub fn selected_groups(&self) -> Vec<EnumQueryGroup> {
        if self.groups.is_empty() {
            return EnumQueryGroup::ALL.to_vec();
        }
        let l_selected: Vec<EnumQueryGroup> =
            self.groups.iter().map(|g| EnumQueryGroup::from(*g)).collect();
        EnumQueryGroup::ALL
            .into_iter()
            .filter(|g| l_selected.contains(g))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_default_to_all_in_run_order() {
        let args = Args::try_parse_from(["offsetkit"]).expect("parse");
        assert_eq!(args.selected_groups(), EnumQueryGroup::ALL.to_vec());
        assert!(!args.debug);
        assert_eq!(args.pattern_mode, ArgPatternMode::Glob);
    }

    #[test]
    fn selected_groups_keep_fixed_order() {
        let args = Args::try_parse_from([
            "offsetkit",
            "--group",
            "kernelmode-variables",
            "--group",
            "usermode-structs",
            "--group",
            "usermode-structs",
        ])
        .expect("parse");
        assert_eq!(
            args.selected_groups(),
            vec![
                EnumQueryGroup::UsermodeStructs,
                EnumQueryGroup::KernelmodeVariables
            ]
        );
    }

    #[test]
    fn filters_and_flags_parse() {
        let args = Args::try_parse_from([
            "offsetkit",
            "--debug",
            "-o",
            "out.xlsx",
            "--include",
            "nt!*",
            "--exclude",
            "*thread*",
            "--pattern-mode",
            "regex",
            "--dry-run",
            "--summary",
        ])
        .expect("parse");
        assert!(args.debug && args.dry_run && args.summary);
        assert_eq!(args.output, Some(PathBuf::from("out.xlsx")));
        assert_eq!(args.include, vec!["nt!*"]);
        assert_eq!(EnumPatternMode::from(args.pattern_mode), EnumPatternMode::Regex);
    }
}
