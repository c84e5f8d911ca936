//! Collection results to DataFrames to workbook sheets.

use offsetkit_dbg::conf::{SHEET_KERNELMODE_VARIABLES, SHEET_USERMODE_VARIABLES};
use offsetkit_dbg::{EnumDebuggerMode, EnumQueryGroup, ReportCollect, SpecStructLayout, SpecVariableOffset};
use offsetkit_io_xlsx::{SpecXlsxSheetWriteOptions, XlsxWriteError, XlsxWriter};
use polars::prelude::{Column, DataFrame};

pub const SHEET_SUMMARY: &str = "summary";

const COL_OFFSET: &str = "Offset";
const COL_FIELD: &str = "Field";

fn to_frame(l_columns: Vec<Column>) -> Result<DataFrame, XlsxWriteError> {
    DataFrame::new(l_columns).map_err(|err| XlsxWriteError::Frame(err.to_string()))
}

/// `Offset`/`Field` rows, or the raw lines in the first column when the
/// `dt` output had no field table.
pub fn build_struct_frame(layout: &SpecStructLayout) -> Result<DataFrame, XlsxWriteError> {
    if layout.fields.is_empty() {
        let n_rows = layout.raw_lines.len();
        return to_frame(vec![
            Column::new(COL_OFFSET.into(), layout.raw_lines.clone()),
            Column::new(COL_FIELD.into(), vec![None::<String>; n_rows]),
        ]);
    }
    let (l_offsets, l_fields): (Vec<String>, Vec<String>) = layout
        .fields
        .iter()
        .map(|f| (f.offset.clone(), f.field_def.clone()))
        .unzip();
    to_frame(vec![
        Column::new(COL_OFFSET.into(), l_offsets),
        Column::new(COL_FIELD.into(), l_fields),
    ])
}

/// Title row with the symbol, merged over both columns, then the column header.
pub fn build_struct_header(layout: &SpecStructLayout) -> Vec<Vec<String>> {
    vec![
        vec![layout.symbol.clone(), layout.symbol.clone()],
        vec![COL_OFFSET.to_string(), COL_FIELD.to_string()],
    ]
}

/// One row per resolved variable; user-mode sheets lead with `ModulePath`.
pub fn build_variable_frame(
    group: EnumQueryGroup,
    offsets: &[SpecVariableOffset],
) -> Result<DataFrame, XlsxWriteError> {
    let mut l_columns = Vec::with_capacity(4);
    if group.mode() == EnumDebuggerMode::UserMode {
        let l_paths: Vec<String> = offsets
            .iter()
            .map(|v| {
                v.module_path
                    .as_deref()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_default()
            })
            .collect();
        l_columns.push(Column::new("ModulePath".into(), l_paths));
    }
    l_columns.push(Column::new(
        "Module".into(),
        offsets.iter().map(|v| v.module.clone()).collect::<Vec<_>>(),
    ));
    l_columns.push(Column::new(
        "Symbol".into(),
        offsets.iter().map(|v| v.symbol.clone()).collect::<Vec<_>>(),
    ));
    l_columns.push(Column::new(
        "OffsetHex".into(),
        offsets.iter().map(SpecVariableOffset::offset_hex).collect::<Vec<_>>(),
    ));
    to_frame(l_columns)
}

pub fn variable_sheet_name(group: EnumQueryGroup) -> &'static str {
    match group.mode() {
        EnumDebuggerMode::UserMode => SHEET_USERMODE_VARIABLES,
        EnumDebuggerMode::KernelMode => SHEET_KERNELMODE_VARIABLES,
    }
}

/// Per-group counters as integer columns.
pub fn build_summary_frame(reports: &[ReportCollect]) -> Result<DataFrame, XlsxWriteError> {
    let counter = |key: &str| -> Vec<u64> {
        reports
            .iter()
            .map(|r| r.to_dict().get(key).copied().unwrap_or(0))
            .collect()
    };
    to_frame(vec![
        Column::new(
            "Group".into(),
            reports
                .iter()
                .map(|r| r.group.label().to_string())
                .collect::<Vec<_>>(),
        ),
        Column::new("Entries".into(), counter("cnt_entries")),
        Column::new("Invoked".into(), counter("cnt_invoked")),
        Column::new("Recorded".into(), counter("cnt_recorded")),
        Column::new("Skipped".into(), counter("cnt_skipped")),
        Column::new("Filtered".into(), counter("cnt_filtered")),
        Column::new("Errors".into(), counter("cnt_errors")),
        Column::new("Warnings".into(), counter("cnt_warnings")),
    ])
}

pub fn write_struct_sheet(
    writer: &mut XlsxWriter,
    layout: &SpecStructLayout,
) -> Result<String, XlsxWriteError> {
    let df = build_struct_frame(layout)?;
    let grid = build_struct_header(layout);
    let options = SpecXlsxSheetWriteOptions {
        if_merge_header: true,
        ..Default::default()
    };
    writer.write_sheet_from_dataframe(&df, &layout.sheet_name(), Some(&grid), &options)
}

pub fn write_variable_sheet(
    writer: &mut XlsxWriter,
    group: EnumQueryGroup,
    offsets: &[SpecVariableOffset],
) -> Result<String, XlsxWriteError> {
    let df = build_variable_frame(group, offsets)?;
    writer.write_sheet_from_dataframe(
        &df,
        variable_sheet_name(group),
        None,
        &SpecXlsxSheetWriteOptions::default(),
    )
}

pub fn write_summary_sheet(
    writer: &mut XlsxWriter,
    reports: &[ReportCollect],
) -> Result<String, XlsxWriteError> {
    let df = build_summary_frame(reports)?;
    writer.write_sheet_from_dataframe(
        &df,
        SHEET_SUMMARY,
        None,
        &SpecXlsxSheetWriteOptions::default(),
    )
}
