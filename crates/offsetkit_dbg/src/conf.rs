//! Fixed markers, default paths and sheet naming constants.

/// Echoed before the command whose output is scraped.
pub const DUMP_START: &str = "<<<DUMP_START>>>";
/// Echoed after the command whose output is scraped.
pub const DUMP_END: &str = "<<<DUMP_END>>>";

/// Default user-mode debugger path.
pub const PATH_CDB_DEFAULT: &str = r"C:\Program Files (x86)\Windows Kits\10\Debuggers\x64\cdb.exe";
/// Default kernel-mode debugger path.
pub const PATH_KD_DEFAULT: &str = r"C:\Program Files (x86)\Windows Kits\10\Debuggers\x64\kd.exe";

/// Default list file names, resolved against the lists directory.
pub const FILE_USERMODE_STRUCT: &str = "usermode_struct.txt";
pub const FILE_USERMODE_VARIABLE: &str = "usermode_variable.txt";
pub const FILE_KERNELMODE_STRUCT: &str = "kernel_mode_struct.txt";
pub const FILE_KERNELMODE_VARIABLE: &str = "kernel_mode_variable.txt";

/// Sheet name prefix for user-mode struct layouts.
pub const SHEET_PREFIX_USERMODE_STRUCT: &str = "urm-";
/// Sheet name prefix for kernel-mode struct layouts.
pub const SHEET_PREFIX_KERNELMODE_STRUCT: &str = "krnl-";
pub const SHEET_USERMODE_VARIABLES: &str = "usermode_variables";
pub const SHEET_KERNELMODE_VARIABLES: &str = "kernelmode_variables";

/// Workbook stem used when the OS build cannot be determined.
pub const BUILD_LABEL_FALLBACK: &str = "windows_build";

/// Fixed `cdb` switches placed between the dump target and the script.
pub const TUP_CDB_FLAGS: [&str; 5] = ["-sx", "-xd", "-xn", "-xg", "-xi"];
/// Prepended to every `kd` script so kernel symbols are loaded.
pub const KD_SCRIPT_PREFIX: &str = ".reload; ";
