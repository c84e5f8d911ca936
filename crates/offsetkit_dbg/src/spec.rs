//! Query specification models and error types.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::conf::{
    FILE_KERNELMODE_STRUCT, FILE_KERNELMODE_VARIABLE, FILE_USERMODE_STRUCT,
    FILE_USERMODE_VARIABLE, PATH_CDB_DEFAULT, PATH_KD_DEFAULT, SHEET_PREFIX_KERNELMODE_STRUCT,
    SHEET_PREFIX_USERMODE_STRUCT,
};
use crate::parse::format_offset_hex;
use crate::pattern::SpecEntryFilter;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Which debugger answers a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumDebuggerMode {
    /// `cdb` opened on a module image (`-z <path>`).
    UserMode,
    /// `kd` attached to the local kernel (`-kl`).
    KernelMode,
}

/// The four query groups, one list file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnumQueryGroup {
    UsermodeStructs,
    KernelmodeStructs,
    UsermodeVariables,
    KernelmodeVariables,
}

impl EnumQueryGroup {
    /// Groups in run order.
    pub const ALL: [EnumQueryGroup; 4] = [
        EnumQueryGroup::UsermodeStructs,
        EnumQueryGroup::KernelmodeStructs,
        EnumQueryGroup::UsermodeVariables,
        EnumQueryGroup::KernelmodeVariables,
    ];

    pub fn mode(&self) -> EnumDebuggerMode {
        match self {
            Self::UsermodeStructs | Self::UsermodeVariables => EnumDebuggerMode::UserMode,
            Self::KernelmodeStructs | Self::KernelmodeVariables => EnumDebuggerMode::KernelMode,
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Self::UsermodeStructs | Self::KernelmodeStructs)
    }

    /// Human-readable label, e.g. `usermode structs`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::UsermodeStructs => "usermode structs",
            Self::KernelmodeStructs => "kernelmode structs",
            Self::UsermodeVariables => "usermode variables",
            Self::KernelmodeVariables => "kernelmode variables",
        }
    }

    /// Sheet name prefix for struct groups; empty for variable groups.
    pub fn sheet_prefix(&self) -> &'static str {
        match self {
            Self::UsermodeStructs => SHEET_PREFIX_USERMODE_STRUCT,
            Self::KernelmodeStructs => SHEET_PREFIX_KERNELMODE_STRUCT,
            Self::UsermodeVariables | Self::KernelmodeVariables => "",
        }
    }
}

impl fmt::Display for EnumQueryGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pattern matching mode for include/exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    #[default]
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Debugger executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDebuggerPaths {
    pub cdb: PathBuf,
    pub kd: PathBuf,
}

impl Default for SpecDebuggerPaths {
    fn default() -> Self {
        Self {
            cdb: PathBuf::from(PATH_CDB_DEFAULT),
            kd: PathBuf::from(PATH_KD_DEFAULT),
        }
    }
}

/// Query list files, one per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecListPaths {
    pub usermode_struct: PathBuf,
    pub usermode_variable: PathBuf,
    pub kernelmode_struct: PathBuf,
    pub kernelmode_variable: PathBuf,
}

impl SpecListPaths {
    /// Default file names resolved against `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            usermode_struct: dir.join(FILE_USERMODE_STRUCT),
            usermode_variable: dir.join(FILE_USERMODE_VARIABLE),
            kernelmode_struct: dir.join(FILE_KERNELMODE_STRUCT),
            kernelmode_variable: dir.join(FILE_KERNELMODE_VARIABLE),
        }
    }

    pub fn path_for(&self, group: EnumQueryGroup) -> &Path {
        match group {
            EnumQueryGroup::UsermodeStructs => &self.usermode_struct,
            EnumQueryGroup::UsermodeVariables => &self.usermode_variable,
            EnumQueryGroup::KernelmodeStructs => &self.kernelmode_struct,
            EnumQueryGroup::KernelmodeVariables => &self.kernelmode_variable,
        }
    }
}

impl Default for SpecListPaths {
    fn default() -> Self {
        Self::in_dir(Path::new(""))
    }
}

/// Input options shared by every collection call.
#[derive(Debug, Clone, Default)]
pub struct SpecCollectOptions {
    /// Debugger executables.
    pub debuggers: SpecDebuggerPaths,
    /// Query list files.
    pub lists: SpecListPaths,
    /// Compiled include/exclude filter over `module!name`.
    pub filter: SpecEntryFilter,
    /// Log each invocation instead of running it.
    pub if_dry_run: bool,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Models

/// One parsed list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecQueryEntry {
    /// Module image on disk; user-mode entries only.
    pub module_path: Option<PathBuf>,
    /// Module name as the debugger knows it (`ntdll`, `nt`).
    pub module: String,
    /// Type or symbol name inside the module.
    pub name: String,
}

impl SpecQueryEntry {
    /// Debugger symbol, `module!name`.
    pub fn symbol(&self) -> String {
        format!("{}!{}", self.module, self.name)
    }
}

/// One `dt` field row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDtField {
    /// Offset token as printed, e.g. `+0x018`.
    pub offset: String,
    /// Rest of the line, whitespace-collapsed.
    pub field_def: String,
}

/// Struct layout scraped from one `dt` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecStructLayout {
    pub group: EnumQueryGroup,
    /// `module!type`.
    pub symbol: String,
    pub type_name: String,
    /// Parsed field rows; empty when the output had no field table.
    pub fields: Vec<SpecDtField>,
    /// Every line between the markers, kept for the no-table fallback.
    pub raw_lines: Vec<String>,
}

impl SpecStructLayout {
    /// Requested sheet name, before sanitizing and uniquing.
    pub fn sheet_name(&self) -> String {
        format!("{}{}", self.group.sheet_prefix(), self.type_name)
    }
}

/// Address, module base and their difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecSymbolOffset {
    pub address: u64,
    pub base: u64,
    pub offset: u64,
}

/// Resolved offset of one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecVariableOffset {
    pub group: EnumQueryGroup,
    /// Module image path as written in the list; user-mode only.
    pub module_path: Option<PathBuf>,
    pub module: String,
    pub symbol: String,
    pub resolved: SpecSymbolOffset,
}

impl SpecVariableOffset {
    /// Offset rendered as `0x<lowercase hex>`.
    pub fn offset_hex(&self) -> String {
        format_offset_hex(self.resolved.offset)
    }
}

/// One per-entry failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEntryError {
    /// The list entry (`module!name`) that failed.
    pub entry: String,
    /// User-facing error text.
    pub exception: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Failure to run a debugger process.
#[derive(Debug, thiserror::Error)]
pub enum DebuggerError {
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read output of {}: {source}", program.display())]
    Output {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to read a query list.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("failed to read list {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Invalid include/exclude pattern.
#[derive(Debug, thiserror::Error)]
#[error("Invalid pattern in include/exclude: {0}")]
pub struct PatternError(pub String);

/// Why a variable offset could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OffsetError {
    #[error("no symbol address in `x` output")]
    AddressNotFound,
    #[error("module {module} not found in `lm` output")]
    BaseNotFound { module: String },
    #[error("address {address:#x} is below module base {base:#x}")]
    BelowBase { address: u64, base: u64 },
}

/// "Top-level call failed" errors for a collection group.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    List(#[from] ListError),
    #[error("{group} is not a {expected} group")]
    GroupMismatch {
        group: EnumQueryGroup,
        expected: &'static str,
    },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
