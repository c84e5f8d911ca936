//! Debugger scripts and command lines.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::conf::{DUMP_END, DUMP_START, KD_SCRIPT_PREFIX, TUP_CDB_FLAGS};
use crate::spec::{EnumDebuggerMode, EnumQueryGroup, SpecDebuggerPaths, SpecQueryEntry};

/// Program and argument vector for one debugger run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDebuggerInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl fmt::Display for SpecDebuggerInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

fn wrap_in_markers(command: &str) -> String {
    format!(".echo {DUMP_START}; {command}; .echo {DUMP_END}; q")
}

/// `dt` script for a `module!type` symbol.
pub fn build_dt_script(symbol: &str) -> String {
    wrap_in_markers(&format!("dt {symbol}"))
}

/// `x` + `lm m` script for a variable.
pub fn build_symbol_script(module: &str, name: &str) -> String {
    wrap_in_markers(&format!("x {module}!{name}; lm m {module}"))
}

/// `cdb -z <module_path> <flags> -c <script>`.
pub fn build_cdb_invocation(cdb: &Path, module_path: &Path, script: &str) -> SpecDebuggerInvocation {
    let mut args = vec!["-z".to_string(), module_path.to_string_lossy().to_string()];
    args.extend(TUP_CDB_FLAGS.iter().map(|c_flag| c_flag.to_string()));
    args.push("-c".to_string());
    args.push(script.to_string());
    SpecDebuggerInvocation {
        program: cdb.to_path_buf(),
        args,
    }
}

/// `kd -kl -c .reload; <script>`.
pub fn build_kd_invocation(kd: &Path, script: &str) -> SpecDebuggerInvocation {
    SpecDebuggerInvocation {
        program: kd.to_path_buf(),
        args: vec![
            "-kl".to_string(),
            "-c".to_string(),
            format!("{KD_SCRIPT_PREFIX}{script}"),
        ],
    }
}

/// Invocation answering `entry` for `group`.
///
/// `None` for a user-mode group when the entry carries no module path.
pub fn build_query_invocation(
    group: EnumQueryGroup,
    debuggers: &SpecDebuggerPaths,
    entry: &SpecQueryEntry,
) -> Option<SpecDebuggerInvocation> {
    let script = if group.is_struct() {
        build_dt_script(&entry.symbol())
    } else {
        build_symbol_script(&entry.module, &entry.name)
    };
    match group.mode() {
        EnumDebuggerMode::UserMode => Some(build_cdb_invocation(
            &debuggers.cdb,
            entry.module_path.as_deref()?,
            &script,
        )),
        EnumDebuggerMode::KernelMode => Some(build_kd_invocation(&debuggers.kd, &script)),
    }
}
