//! Stateless helper utilities used by the XLSX writer.

use std::collections::{BTreeMap, BTreeSet};

use crate::conf::{C_SHEET_NAME_FALLBACK, N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::{EnumCellValue, SpecSheetHorizontalMerge, SpecXlsxValuePolicy, XlsxWriteError};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Normalize cell value according to the missing-value policy.
pub fn convert_cell_value(
    value: &EnumCellValue,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> EnumCellValue {
    match value {
        EnumCellValue::None => {
            if if_keep_missing_values {
                EnumCellValue::String(value_policy.missing_value_str.clone())
            } else {
                EnumCellValue::None
            }
        }
        EnumCellValue::Number(n) if !n.is_finite() => {
            if if_keep_missing_values {
                EnumCellValue::String(value_policy.missing_value_str.clone())
            } else {
                EnumCellValue::None
            }
        }
        other => other.clone(),
    }
}

/// Estimate displayed width units for one normalized cell value.
pub fn estimate_width_len(value: &EnumCellValue) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64).len()
            } else {
                format!("{n}").len()
            }
        }
    }
}

fn estimate_unicode_string_width(s: &str) -> usize {
    s.lines()
        .map(|line| {
            line.chars()
                .map(|c| if (c as u32) > 0x2E80 { 2 } else { 1 })
                .sum::<usize>()
        })
        .max()
        .unwrap_or(0)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FrameLikeUtils

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), XlsxWriteError> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter(|(_, l_pos)| l_pos.len() > 1)
        .map(|(c_name, l_pos)| format!("{c_name:?} x{} at indices {:?}", l_pos.len(), l_pos))
        .collect::<Vec<_>>()
        .join("; ");

    Err(XlsxWriteError::InvalidInput(format!(
        "Duplicate column names detected: {c_msg}"
    )))
}

/// Check that every header row spans exactly `width` columns.
pub fn validate_header_grid(header_grid: &[Vec<String>], width: usize) -> Result<(), XlsxWriteError> {
    if header_grid.is_empty() {
        return Err(XlsxWriteError::InvalidInput(
            "header grid must have >= 1 row (0-row header is not allowed).".to_string(),
        ));
    }
    if let Some((n_idx, row)) = header_grid
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != width)
    {
        return Err(XlsxWriteError::InvalidInput(format!(
            "header row {n_idx} has {} cells; expected {width}.",
            row.len()
        )));
    }
    Ok(())
}

pub(crate) fn cast_row_num(value: usize) -> Result<u32, XlsxWriteError> {
    u32::try_from(value)
        .map_err(|_| XlsxWriteError::LimitExceeded(format!("row index overflow: {value}")))
}

pub(crate) fn cast_col_num(value: usize) -> Result<u16, XlsxWriteError> {
    u16::try_from(value)
        .map_err(|_| XlsxWriteError::LimitExceeded(format!("column index overflow: {value}")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
///
/// Pass an empty `replace_to` to drop the offending characters.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    let c_name: String = c_name.trim().chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect();
    let c_name = trim_sheet_name_edges(&c_name);
    if c_name.is_empty() {
        return C_SHEET_NAME_FALLBACK.to_string();
    }
    c_name.to_string()
}

/// Excel rejects names that start or end with an apostrophe.
fn trim_sheet_name_edges(name: &str) -> &str {
    name.trim_matches(|c: char| c == '\'' || c.is_whitespace())
}

/// Create suffixed sheet name (`base_1`, `base_2`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx_1based: usize) -> String {
    let c_sheet_name_suffix = format!("_{part_idx_1based}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();
    let c_sheet_name_base = match trim_sheet_name_edges(&c_sheet_name_base) {
        "" => C_SHEET_NAME_FALLBACK,
        c_trimmed => c_trimmed,
    };

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

/// Pick the first name not already taken.
///
/// `set_names_taken_lower` holds lowercase names since Excel compares sheet
/// names case-insensitively.
pub fn derive_unique_sheet_name(name: &str, set_names_taken_lower: &BTreeSet<String>) -> String {
    if !set_names_taken_lower.contains(&name.to_lowercase()) {
        return name.to_string();
    }

    let mut n_idx = 1usize;
    loop {
        let candidate = create_sheet_identifier(name, n_idx);
        if !set_names_taken_lower.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HeaderMergeUtils

/// Plan horizontal merges for repeated non-empty header text per row.
pub fn plan_horizontal_merges(
    header_grid: &[Vec<String>],
) -> BTreeMap<usize, Vec<SpecSheetHorizontalMerge>> {
    let mut dict_horizontal_merges_map = BTreeMap::new();

    for (n_idx_row, v_str_current_row) in header_grid.iter().enumerate() {
        let n_cols = v_str_current_row.len();
        let mut n_col_idx = 0;

        while n_col_idx < n_cols {
            let c_cell_val = &v_str_current_row[n_col_idx];
            if c_cell_val.is_empty() {
                n_col_idx += 1;
                continue;
            }

            let mut n_col_idx_end = n_col_idx + 1;
            while n_col_idx_end < n_cols && v_str_current_row[n_col_idx_end] == *c_cell_val {
                n_col_idx_end += 1;
            }

            if n_col_idx_end - n_col_idx > 1 {
                dict_horizontal_merges_map
                    .entry(n_idx_row)
                    .or_insert_with(Vec::new)
                    .push(SpecSheetHorizontalMerge {
                        row_idx_start: n_idx_row,
                        col_idx_start: n_col_idx,
                        col_idx_end: n_col_idx_end - 1,
                        text: c_cell_val.clone(),
                    });
            }
            n_col_idx = n_col_idx_end;
        }
    }

    dict_horizontal_merges_map
}

/// Build lookup set for cells covered by a horizontal merge (excluding anchor).
pub fn derive_horizontal_merge_tracker(
    row_horizontal_merge_mapping: &BTreeMap<usize, Vec<SpecSheetHorizontalMerge>>,
) -> BTreeSet<(usize, usize)> {
    let mut set_merged_cells = BTreeSet::new();

    for (row_idx, horizontal_merges) in row_horizontal_merge_mapping {
        for merge in horizontal_merges {
            for col_idx in (merge.col_idx_start + 1)..=merge.col_idx_end {
                set_merged_cells.insert((*row_idx, col_idx));
            }
        }
    }

    set_merged_cells
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn taken(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_lowercase()).collect()
    }

    #[test]
    fn test_sanitize_sheet_name_drops_illegal_chars() {
        assert_eq!(sanitize_sheet_name("urm-_PEB[0]", ""), "urm-_PEB0");
        assert_eq!(sanitize_sheet_name("a/b\\c:d*e?f", ""), "abcdef");
        assert_eq!(sanitize_sheet_name("a/b", "_"), "a_b");
    }

    #[test]
    fn test_sanitize_sheet_name_fallback_and_truncate() {
        assert_eq!(sanitize_sheet_name("[]:*", ""), "Sheet");
        let c_long = "krnl-_KTHREAD_WITH_A_VERY_LONG_NAME_INDEED";
        let c_name = sanitize_sheet_name(c_long, "");
        assert_eq!(c_name.chars().count(), 31);
        assert!(c_long.starts_with(&c_name));
    }

    #[test]
    fn test_sanitize_sheet_name_strips_edge_apostrophes() {
        assert_eq!(sanitize_sheet_name("krnl-_FOO'", ""), "krnl-_FOO");
        assert_eq!(sanitize_sheet_name("'quoted'", ""), "quoted");
        assert_eq!(sanitize_sheet_name("urm-_A'B", ""), "urm-_A'B");
        assert_eq!(sanitize_sheet_name("''", ""), "Sheet");

        // truncation exposes the apostrophe at position 31
        let c_long = format!("{}'tail", "k".repeat(30));
        assert_eq!(sanitize_sheet_name(&c_long, ""), "k".repeat(30));
    }

    #[test]
    fn test_sheet_identifier_never_ends_base_with_apostrophe() {
        let c_base = format!("{}'x", "k".repeat(28));
        let c_name = create_sheet_identifier(&c_base, 1);
        assert_eq!(c_name, format!("{}_1", "k".repeat(28)));
        assert_eq!(create_sheet_identifier("'", 2), "Sheet_2");
    }

    #[test]
    fn test_unique_sheet_name_appends_counter() {
        assert_eq!(derive_unique_sheet_name("urm-_PEB", &taken(&[])), "urm-_PEB");
        assert_eq!(
            derive_unique_sheet_name("urm-_PEB", &taken(&["urm-_PEB"])),
            "urm-_PEB_1"
        );
        assert_eq!(
            derive_unique_sheet_name("urm-_PEB", &taken(&["urm-_PEB", "urm-_PEB_1"])),
            "urm-_PEB_2"
        );
    }

    #[test]
    fn test_unique_sheet_name_is_case_insensitive() {
        assert_eq!(
            derive_unique_sheet_name("URM-_peb", &taken(&["urm-_PEB"])),
            "URM-_peb_1"
        );
    }

    #[test]
    fn test_unique_sheet_name_trims_base_to_fit_suffix() {
        let c_base = "x".repeat(31);
        let c_name = derive_unique_sheet_name(&c_base, &taken(&[&c_base]));
        assert_eq!(c_name, format!("{}_1", "x".repeat(29)));
        assert_eq!(c_name.chars().count(), 31);
    }

    #[test]
    fn test_plan_horizontal_merges_for_title_row() {
        let grid = vec![
            vec!["ntdll!_PEB".to_string(), "ntdll!_PEB".to_string()],
            vec!["Offset".to_string(), "Field".to_string()],
        ];
        let dict_merges = plan_horizontal_merges(&grid);
        assert_eq!(dict_merges.len(), 1);
        let merge = &dict_merges[&0][0];
        assert_eq!((merge.col_idx_start, merge.col_idx_end), (0, 1));
        assert_eq!(merge.text, "ntdll!_PEB");

        let set_tracker = derive_horizontal_merge_tracker(&dict_merges);
        assert!(set_tracker.contains(&(0, 1)));
        assert!(!set_tracker.contains(&(0, 0)));
    }

    #[test]
    fn test_validate_header_grid_width() {
        let grid = vec![vec!["a".to_string()], vec!["b".to_string(), "c".to_string()]];
        assert!(validate_header_grid(&grid, 2).is_err());
        assert!(validate_header_grid(&grid[1..], 2).is_ok());
        assert!(validate_header_grid(&[], 2).is_err());
    }

    #[test]
    fn test_validate_unique_columns_reports_duplicates() {
        let cols = vec!["Offset".to_string(), "Offset".to_string()];
        let err = validate_unique_columns(&cols).expect_err("duplicates");
        assert!(err.to_string().contains("\"Offset\" x2"));
    }

    #[test]
    fn test_convert_cell_value_missing_policy() {
        let policy = SpecXlsxValuePolicy::default();
        assert_eq!(
            convert_cell_value(&EnumCellValue::None, true, &policy),
            EnumCellValue::String("NA".to_string())
        );
        assert_eq!(
            convert_cell_value(&EnumCellValue::None, false, &policy),
            EnumCellValue::None
        );
        assert_eq!(
            convert_cell_value(&EnumCellValue::Number(3.0), false, &policy),
            EnumCellValue::Number(3.0)
        );
    }

    #[test]
    fn test_estimate_width_len() {
        assert_eq!(estimate_width_len(&EnumCellValue::None), 0);
        assert_eq!(estimate_width_len(&EnumCellValue::Number(1234.0)), 4);
        assert_eq!(
            estimate_width_len(&EnumCellValue::String("Ptr64 Void".to_string())),
            10
        );
    }
}
