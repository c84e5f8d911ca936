//! Run configuration: CLI flags over environment over `offsetkit.toml` over defaults.
//!
//! Environment variables are read by clap (`env = ...`), so by the time
//! [`resolve_run_config`] sees [`Args`] the first two layers are merged.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use offsetkit_dbg::conf::{
    BUILD_LABEL_FALLBACK, FILE_KERNELMODE_STRUCT, FILE_KERNELMODE_VARIABLE, FILE_USERMODE_STRUCT,
    FILE_USERMODE_VARIABLE,
};
use offsetkit_dbg::{
    EnumQueryGroup, SpecCollectOptions, SpecDebuggerPaths, SpecEntryFilter, SpecListPaths,
};
use serde::Deserialize;
use tracing::debug;

use crate::cli::Args;

/// Config file picked up from the working directory when `--config` is absent.
pub const FILE_CONFIG_DEFAULT: &str = "offsetkit.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecConfigFile {
    pub output: Option<PathBuf>,
    pub lists_dir: Option<PathBuf>,
    pub debuggers: SpecConfigDebuggers,
    pub lists: SpecConfigLists,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecConfigDebuggers {
    pub cdb: Option<PathBuf>,
    pub kd: Option<PathBuf>,
}

/// List file names, relative to `lists_dir` unless absolute.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecConfigLists {
    pub usermode_struct: Option<PathBuf>,
    pub usermode_variable: Option<PathBuf>,
    pub kernelmode_struct: Option<PathBuf>,
    pub kernelmode_variable: Option<PathBuf>,
}

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct SpecRunConfig {
    pub collect: SpecCollectOptions,
    pub groups: Vec<EnumQueryGroup>,
    pub path_output: PathBuf,
    pub if_summary: bool,
}

/// Parse one TOML config file.
pub fn load_config_file(path: &Path) -> Result<SpecConfigFile> {
    let c_text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&c_text).with_context(|| format!("invalid config {}", path.display()))
}

/// Load the explicit config, or `offsetkit.toml` under `dir_work` when present.
pub fn discover_config_file(path_config: Option<&Path>, dir_work: &Path) -> Result<SpecConfigFile> {
    if let Some(path) = path_config {
        return load_config_file(path);
    }
    let path_default = dir_work.join(FILE_CONFIG_DEFAULT);
    if path_default.is_file() {
        debug!(config = %path_default.display(), "using config from working directory");
        return load_config_file(&path_default);
    }
    Ok(SpecConfigFile::default())
}

/// Merge CLI flags and the config file into a [`SpecRunConfig`].
///
/// `build_label` names the default output workbook.
pub fn resolve_run_config(
    args: &Args,
    config: SpecConfigFile,
    build_label: &str,
) -> Result<SpecRunConfig> {
    let defaults = SpecDebuggerPaths::default();
    let debuggers = SpecDebuggerPaths {
        cdb: args
            .cdb
            .clone()
            .or(config.debuggers.cdb)
            .unwrap_or(defaults.cdb),
        kd: args
            .kd
            .clone()
            .or(config.debuggers.kd)
            .unwrap_or(defaults.kd),
    };

    let dir_lists = args
        .lists_dir
        .clone()
        .or(config.lists_dir)
        .unwrap_or_default();
    let resolve_list = |value: Option<PathBuf>, c_default: &str| {
        dir_lists.join(value.unwrap_or_else(|| PathBuf::from(c_default)))
    };
    let lists = SpecListPaths {
        usermode_struct: resolve_list(config.lists.usermode_struct, FILE_USERMODE_STRUCT),
        usermode_variable: resolve_list(config.lists.usermode_variable, FILE_USERMODE_VARIABLE),
        kernelmode_struct: resolve_list(config.lists.kernelmode_struct, FILE_KERNELMODE_STRUCT),
        kernelmode_variable: resolve_list(
            config.lists.kernelmode_variable,
            FILE_KERNELMODE_VARIABLE,
        ),
    };

    let filter = SpecEntryFilter::from_raw(
        Some(&args.include),
        Some(&args.exclude),
        args.pattern_mode.into(),
    )?;

    let path_output = args
        .output
        .clone()
        .or(config.output)
        .unwrap_or_else(|| PathBuf::from(format!("{build_label}.xlsx")));

    Ok(SpecRunConfig {
        collect: SpecCollectOptions {
            debuggers,
            lists,
            filter,
            if_dry_run: args.dry_run,
        },
        groups: args.selected_groups(),
        path_output,
        if_summary: args.summary,
    })
}

/// NT version of every Windows 10/11 build.
const C_NT_VERSION_PREFIX: &str = "10.0";

/// Windows version as `major.minor.build` (e.g. `10.0.22631`), safe for a
/// file name. Any other OS gets [`BUILD_LABEL_FALLBACK`].
pub fn derive_build_label() -> String {
    if !cfg!(windows) {
        return BUILD_LABEL_FALLBACK.to_string();
    }
    normalize_build_label(sysinfo::System::kernel_version().as_deref())
}

/// `22631` becomes `10.0.22631`; dotted versions are kept as reported.
fn normalize_build_label(raw: Option<&str>) -> String {
    let c_label: String = raw
        .unwrap_or_default()
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if c_label.is_empty() {
        return BUILD_LABEL_FALLBACK.to_string();
    }
    if c_label.chars().all(|c| c.is_ascii_digit()) {
        return format!("{C_NT_VERSION_PREFIX}.{c_label}");
    }
    c_label
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn parse(argv: &[&str]) -> Args {
        let mut l_argv = vec!["offsetkit"];
        l_argv.extend_from_slice(argv);
        Args::try_parse_from(l_argv).expect("parse")
    }

    #[test]
    fn defaults_without_config() {
        let run = resolve_run_config(&parse(&[]), SpecConfigFile::default(), "22631")
            .expect("resolve");
        assert_eq!(run.path_output, PathBuf::from("22631.xlsx"));
        assert_eq!(run.collect.debuggers, SpecDebuggerPaths::default());
        assert_eq!(run.collect.lists, SpecListPaths::default());
        assert_eq!(run.groups.len(), 4);
        assert!(!run.collect.if_dry_run);
        assert!(run.collect.filter.is_selected("nt!_EPROCESS"));
    }

    #[test]
    fn config_file_fills_what_flags_leave_open() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fs::write(
            tmp.path().join(FILE_CONFIG_DEFAULT),
            r#"
output = "from_config.xlsx"
lists_dir = "lists"

[debuggers]
cdb = 'D:\dbg\cdb.exe'
kd = 'D:\dbg\kd.exe'

[lists]
kernelmode_struct = "kstructs.txt"
"#,
        )
        .expect("write config");

        let config = discover_config_file(None, tmp.path()).expect("config");
        let run = resolve_run_config(&parse(&["--kd", "kd_cli.exe"]), config, "x")
            .expect("resolve");

        assert_eq!(run.path_output, PathBuf::from("from_config.xlsx"));
        assert_eq!(run.collect.debuggers.cdb, PathBuf::from(r"D:\dbg\cdb.exe"));
        assert_eq!(run.collect.debuggers.kd, PathBuf::from("kd_cli.exe"));
        assert_eq!(
            run.collect.lists.kernelmode_struct,
            Path::new("lists").join("kstructs.txt")
        );
        assert_eq!(
            run.collect.lists.usermode_variable,
            Path::new("lists").join(FILE_USERMODE_VARIABLE)
        );
    }

    #[test]
    fn cli_flags_beat_config() {
        let config: SpecConfigFile =
            toml::from_str("output = \"a.xlsx\"\nlists_dir = \"cfg\"").expect("toml");
        let run = resolve_run_config(
            &parse(&["-o", "b.xlsx", "--lists-dir", "cli", "--dry-run", "--summary"]),
            config,
            "x",
        )
        .expect("resolve");
        assert_eq!(run.path_output, PathBuf::from("b.xlsx"));
        assert_eq!(
            run.collect.lists.usermode_struct,
            Path::new("cli").join(FILE_USERMODE_STRUCT)
        );
        assert!(run.collect.if_dry_run);
        assert!(run.if_summary);
    }

    #[test]
    fn missing_default_config_is_empty_but_explicit_one_must_exist() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = discover_config_file(None, tmp.path()).expect("no config");
        assert!(config.output.is_none());
        assert!(discover_config_file(Some(&tmp.path().join("nope.toml")), tmp.path()).is_err());
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "[debuggers]\nwindbg = 'x'\n").expect("write");
        assert!(load_config_file(&path).is_err());
    }

    #[test]
    fn invalid_pattern_fails_resolution() {
        let args = parse(&["--include", "(", "--pattern-mode", "regex"]);
        assert!(resolve_run_config(&args, SpecConfigFile::default(), "x").is_err());
    }

    #[test]
    fn build_label_uses_dotted_windows_version() {
        assert_eq!(normalize_build_label(None), "windows_build");
        assert_eq!(normalize_build_label(Some("  ")), "windows_build");
        assert_eq!(normalize_build_label(Some("22631")), "10.0.22631");
        assert_eq!(normalize_build_label(Some("10.0.19045")), "10.0.19045");
        assert_eq!(normalize_build_label(Some("10.0 / 19045")), "10.019045");
    }

    #[cfg(not(windows))]
    #[test]
    fn build_label_off_windows_is_the_fallback() {
        assert_eq!(derive_build_label(), "windows_build");
    }
}
