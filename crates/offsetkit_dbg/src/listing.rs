//! Query list files.
//!
//! User-mode lines: `<module-path> <name>` (the path may be double-quoted).
//! Kernel-mode lines: `<module>!<name>`.
//! Blank lines and `#` comments are skipped everywhere.

use std::fs;
use std::path::{Path, PathBuf};

use crate::spec::{EnumDebuggerMode, ListError, SpecQueryEntry};

/// Read trimmed, non-comment lines. A missing file is an empty list.
pub fn read_list_file(path: &Path) -> Result<Vec<String>, ListError> {
    if !path.is_file() {
        return Ok(vec![]);
    }
    let v_bytes = fs::read(path).map_err(|source| ListError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&v_bytes)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect())
}

/// Parse one list line for `mode`. `None` means the line is malformed.
pub fn parse_entry(line: &str, mode: EnumDebuggerMode) -> Option<SpecQueryEntry> {
    match mode {
        EnumDebuggerMode::UserMode => parse_usermode_entry(line),
        EnumDebuggerMode::KernelMode => parse_kernelmode_entry(line),
    }
}

/// `<module-path> <name> [ignored...]`.
pub fn parse_usermode_entry(line: &str) -> Option<SpecQueryEntry> {
    let line = line.trim();
    let (c_path, c_rest) = match line.strip_prefix('"') {
        Some(c_quoted) => {
            let (c_path, c_rest) = c_quoted.split_once('"')?;
            (c_path, c_rest)
        }
        None => line.split_once(char::is_whitespace)?,
    };
    let c_name = c_rest.split_whitespace().next()?;
    if c_path.is_empty() {
        return None;
    }

    Some(SpecQueryEntry {
        module_path: Some(PathBuf::from(c_path)),
        module: derive_module_name(c_path),
        name: c_name.to_string(),
    })
}

/// `<module>!<name>`, split on the first `!`.
pub fn parse_kernelmode_entry(line: &str) -> Option<SpecQueryEntry> {
    let (c_module, c_name) = line.trim().split_once('!')?;
    let (c_module, c_name) = (c_module.trim(), c_name.trim());
    if c_module.is_empty() || c_name.is_empty() {
        return None;
    }
    Some(SpecQueryEntry {
        module_path: None,
        module: c_module.to_string(),
        name: c_name.to_string(),
    })
}

/// Module name of an image path: basename without its last extension.
///
/// Both `\` and `/` separate components so Windows paths resolve the same
/// on every host.
pub fn derive_module_name(path: &str) -> String {
    let c_basename = path.rsplit(['\\', '/']).next().unwrap_or(path);
    match c_basename.rfind('.') {
        Some(n_idx) if c_basename[..n_idx].chars().any(|c| c != '.') => {
            c_basename[..n_idx].to_string()
        }
        _ => c_basename.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_list_skips_comments_and_blank_lines() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("kernel_mode_struct.txt");
        fs::write(&path, "# kernel types\n\n  nt!_EPROCESS  \r\n#nt!_KTHREAD\nnt!_ETHREAD\n")
            .expect("write list");

        let l_lines = read_list_file(&path).expect("read");
        assert_eq!(l_lines, vec!["nt!_EPROCESS", "nt!_ETHREAD"]);
    }

    #[test]
    fn read_list_missing_file_is_empty() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert!(read_list_file(&tmp.path().join("nope.txt")).expect("read").is_empty());
        assert!(read_list_file(tmp.path()).expect("dir is not a file").is_empty());
    }

    #[test]
    fn read_list_replaces_invalid_utf8() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("list.txt");
        fs::write(&path, b"nt!_A\xff\nnt!_B\n").expect("write list");
        let l_lines = read_list_file(&path).expect("read");
        assert_eq!(l_lines.len(), 2);
        assert!(l_lines[0].starts_with("nt!_A"));
    }

    #[test]
    fn usermode_entry_takes_two_tokens() {
        let entry = parse_usermode_entry(r"C:\Windows\System32\ntdll.dll _PEB extra")
            .expect("entry");
        assert_eq!(entry.module, "ntdll");
        assert_eq!(entry.name, "_PEB");
        assert_eq!(entry.symbol(), "ntdll!_PEB");
        assert_eq!(
            entry.module_path,
            Some(PathBuf::from(r"C:\Windows\System32\ntdll.dll"))
        );

        assert!(parse_usermode_entry(r"C:\Windows\System32\ntdll.dll").is_none());
    }

    #[test]
    fn usermode_entry_accepts_quoted_path() {
        let entry = parse_usermode_entry(r#""C:\Program Files\App\core.v2.dll" g_State"#)
            .expect("entry");
        assert_eq!(entry.module, "core.v2");
        assert_eq!(entry.name, "g_State");
        assert_eq!(
            entry.module_path,
            Some(PathBuf::from(r"C:\Program Files\App\core.v2.dll"))
        );

        assert!(parse_usermode_entry(r#""C:\unterminated _X"#).is_none());
        assert!(parse_usermode_entry(r#""" _X"#).is_none());
    }

    #[test]
    fn kernelmode_entry_splits_on_first_bang() {
        let entry = parse_kernelmode_entry("nt!_EPROCESS").expect("entry");
        assert_eq!(entry.module, "nt");
        assert_eq!(entry.name, "_EPROCESS");
        assert!(entry.module_path.is_none());

        let entry = parse_kernelmode_entry("nt!a!b").expect("entry");
        assert_eq!(entry.name, "a!b");

        assert!(parse_kernelmode_entry("_EPROCESS").is_none());
        assert!(parse_kernelmode_entry("!_EPROCESS").is_none());
    }

    #[test]
    fn module_name_strips_last_extension_only() {
        assert_eq!(derive_module_name(r"C:\x\ntdll.dll"), "ntdll");
        assert_eq!(derive_module_name("/mnt/c/x/win32k.sys"), "win32k");
        assert_eq!(derive_module_name("a.b.c"), "a.b");
        assert_eq!(derive_module_name(".hidden"), ".hidden");
        assert_eq!(derive_module_name("noext"), "noext");
    }

    #[test]
    fn parse_entry_dispatches_on_mode() {
        assert!(parse_entry("nt!_KPRCB", EnumDebuggerMode::KernelMode).is_some());
        assert!(parse_entry("nt!_KPRCB", EnumDebuggerMode::UserMode).is_none());
    }
}
