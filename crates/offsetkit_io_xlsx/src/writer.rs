//! XLSX writer that converts in-memory DataFrames into workbook sheets.

use std::collections::BTreeSet;
use std::path::PathBuf;

use polars::prelude::{AnyValue, DataFrame};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::conf::{EnumFmtKey, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, derive_default_xlsx_formats};
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecSheetWritten, SpecXlsxReport, SpecXlsxWriteOptions, XlsxWriteError,
};
use crate::util::{
    cast_col_num, cast_row_num, convert_cell_value, derive_horizontal_merge_tracker,
    derive_unique_sheet_name, estimate_width_len, plan_horizontal_merges, sanitize_sheet_name,
    validate_header_grid, validate_unique_columns,
};

/// Per-sheet call options. Header rows are always frozen.
#[derive(Default, Debug, Clone)]
pub struct SpecXlsxSheetWriteOptions {
    /// Merge repeated header text across columns.
    pub if_merge_header: bool,
    pub policy_autofit: SpecAutofitCellsPolicy,
}

/// Stateful workbook writer.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    fmt_text: SpecCellFormat,
    fmt_integer: SpecCellFormat,
    fmt_header: SpecCellFormat,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_taken_lower: BTreeSet<String>,
    l_sheet_names: Vec<String>,
    l_reports: Vec<SpecXlsxReport>,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and format/options presets.
    ///
    /// The workbook is buffered in memory until [`Self::close`] is called.
    pub fn new(
        path_file_out: PathBuf,
        fmt_text: SpecCellFormat,
        fmt_integer: SpecCellFormat,
        fmt_header: SpecCellFormat,
        write_options: SpecXlsxWriteOptions,
    ) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            fmt_text,
            fmt_integer,
            fmt_header,
            write_options,
            set_sheet_names_taken_lower: BTreeSet::new(),
            l_sheet_names: Vec::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Create writer using the presets from [`derive_default_xlsx_formats`].
    pub fn with_default_formats(path_file_out: PathBuf) -> Self {
        let mut dict_fmt = derive_default_xlsx_formats();
        let mut take = |key: EnumFmtKey| dict_fmt.remove(key.as_str()).unwrap_or_default();
        let fmt_text = take(EnumFmtKey::Text);
        let fmt_integer = take(EnumFmtKey::Integer);
        let fmt_header = take(EnumFmtKey::Header);
        Self::new(
            path_file_out,
            fmt_text,
            fmt_integer,
            fmt_header,
            SpecXlsxWriteOptions::default(),
        )
    }

    /// Return output file path as string.
    pub fn file_out(&self) -> String {
        self.path_file_out.to_string_lossy().to_string()
    }

    /// Sheet names in creation order.
    pub fn sheet_names(&self) -> &[String] {
        &self.l_sheet_names
    }

    /// Return immutable snapshot of per-sheet write reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<(), XlsxWriteError> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook.save(&self.path_file_out)?;
        self.if_closed = true;
        Ok(())
    }

    /// Write one sheet from an in-memory dataframe and return its final name.
    ///
    /// `header_grid` replaces the default single header row (the column names);
    /// every row must be exactly as wide as `df_data`.
    pub fn write_sheet_from_dataframe(
        &mut self,
        df_data: &DataFrame,
        sheet_name: &str,
        header_grid: Option<&[Vec<String>]>,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<String, XlsxWriteError> {
        if self.if_closed {
            return Err(XlsxWriteError::Closed);
        }
        self.write_sheet(df_data, sheet_name, header_grid, options)
    }

    fn write_sheet(
        &mut self,
        df_data: &DataFrame,
        sheet_name: &str,
        header_grid: Option<&[Vec<String>]>,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<String, XlsxWriteError> {
        validate_policy_autofit(&options.policy_autofit)?;

        let if_keep_missing_values = self.write_options.keep_missing_values;
        let value_policy = self.write_options.value_policy.clone();

        let l_colnames_df: Vec<String> = df_data
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        validate_unique_columns(&l_colnames_df)?;

        let n_width_df = l_colnames_df.len();
        let n_height_df = df_data.height();

        let l_header_grid = match header_grid {
            Some(grid) => {
                validate_header_grid(grid, n_width_df)?;
                grid.to_vec()
            }
            None => vec![l_colnames_df.clone()],
        };
        let n_rows_header = l_header_grid.len();

        if n_width_df > N_NCOLS_EXCEL_MAX {
            return Err(XlsxWriteError::LimitExceeded(format!(
                "{n_width_df} columns > {N_NCOLS_EXCEL_MAX}"
            )));
        }
        if n_height_df + n_rows_header > N_NROWS_EXCEL_MAX {
            return Err(XlsxWriteError::LimitExceeded(format!(
                "{} rows > {N_NROWS_EXCEL_MAX}",
                n_height_df + n_rows_header
            )));
        }

        let set_cols_idx_integer = self.derive_integer_column_indices(df_data);
        let l_fmt_data_by_col: Vec<Format> = (0..n_width_df)
            .map(|n_idx_col| {
                let fmt_base = if set_cols_idx_integer.contains(&n_idx_col) {
                    &self.fmt_integer
                } else {
                    &self.fmt_text
                };
                derive_rust_xlsx_format(&fmt_base.merge(&self.write_options.base_format_patch))
            })
            .collect();
        let fmt_header = derive_rust_xlsx_format(&self.fmt_header);

        let sheet_name_unique = derive_unique_sheet_name(
            &sanitize_sheet_name(sheet_name, ""),
            &self.set_sheet_names_taken_lower,
        );

        let mut report = SpecXlsxReport::default();
        if sheet_name_unique != sheet_name {
            report.warn(format!(
                "sheet name {sheet_name:?} written as {sheet_name_unique:?}"
            ));
        }

        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&sheet_name_unique)?;

        write_header(worksheet, &l_header_grid, options.if_merge_header, &fmt_header)?;

        worksheet.set_freeze_panes(cast_row_num(n_rows_header)?, 0)?;

        let rule_autofit = options.policy_autofit.rule_columns;
        let mut l_width_by_col_header = vec![0usize; n_width_df];
        let mut l_width_by_col_body = vec![0usize; n_width_df];

        if matches!(
            rule_autofit,
            EnumAutofitColumnsRule::Header | EnumAutofitColumnsRule::All
        ) {
            for row in &l_header_grid {
                for (n_idx_col, c_value) in row.iter().enumerate() {
                    l_width_by_col_header[n_idx_col] = usize::max(
                        l_width_by_col_header[n_idx_col],
                        estimate_width_len(&EnumCellValue::String(c_value.clone())),
                    );
                }
            }
            // A title merged across columns does not widen any single column.
            if options.if_merge_header {
                for (n_idx_row, l_merges) in plan_horizontal_merges(&l_header_grid) {
                    for merge in l_merges {
                        for n_idx_col in merge.col_idx_start..=merge.col_idx_end {
                            l_width_by_col_header[n_idx_col] = l_header_grid
                                .iter()
                                .enumerate()
                                .filter(|(n_idx_other, _)| *n_idx_other != n_idx_row)
                                .map(|(_, row)| {
                                    estimate_width_len(&EnumCellValue::String(
                                        row[n_idx_col].clone(),
                                    ))
                                })
                                .max()
                                .unwrap_or(0);
                        }
                    }
                }
            }
        }
        let if_autofit_body = matches!(
            rule_autofit,
            EnumAutofitColumnsRule::Body | EnumAutofitColumnsRule::All
        );
        let n_rows_autofit_max = options
            .policy_autofit
            .height_body_inferred_max
            .unwrap_or(usize::MAX);

        let l_cols = df_data.get_columns();
        for n_row_local in 0..n_height_df {
            for (n_idx_col, col) in l_cols.iter().enumerate() {
                let value_raw = derive_cell_value_from_any_value(
                    col.get(n_row_local)
                        .map_err(|err| XlsxWriteError::Frame(err.to_string()))?,
                );
                let value = convert_cell_value(&value_raw, if_keep_missing_values, &value_policy);

                if if_autofit_body && n_row_local < n_rows_autofit_max {
                    l_width_by_col_body[n_idx_col] =
                        usize::max(l_width_by_col_body[n_idx_col], estimate_width_len(&value));
                }

                write_cell_with_format(
                    worksheet,
                    n_rows_header + n_row_local,
                    n_idx_col,
                    &value,
                    &l_fmt_data_by_col[n_idx_col],
                )?;
            }
        }

        if !matches!(rule_autofit, EnumAutofitColumnsRule::None) {
            let n_min = usize::max(1, options.policy_autofit.width_cell_min);
            let n_max = usize::min(
                255,
                usize::max(n_min, options.policy_autofit.width_cell_max),
            );
            let n_pad = options.policy_autofit.width_cell_padding;

            for n_idx_col in 0..n_width_df {
                let n_width_recorded =
                    usize::max(l_width_by_col_header[n_idx_col], l_width_by_col_body[n_idx_col]);
                let n_width_final = usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
                worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
            }
        }

        report.sheets.push(SpecSheetWritten {
            sheet_name_requested: sheet_name.to_string(),
            sheet_name: sheet_name_unique.clone(),
            n_rows_header,
            n_rows_body: n_height_df,
            n_cols: n_width_df,
        });
        self.l_reports.push(report);
        self.set_sheet_names_taken_lower
            .insert(sheet_name_unique.to_lowercase());
        self.l_sheet_names.push(sheet_name_unique.clone());

        Ok(sheet_name_unique)
    }

    fn derive_integer_column_indices(&self, df: &DataFrame) -> BTreeSet<usize> {
        if !self.write_options.infer_integer_cols {
            return BTreeSet::new();
        }
        df.get_columns()
            .iter()
            .enumerate()
            .filter(|(_, c_col)| c_col.dtype().is_integer())
            .map(|(n_idx, _)| n_idx)
            .collect()
    }
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<(), XlsxWriteError> {
    if policy_autofit.width_cell_min == 0 {
        return Err(XlsxWriteError::InvalidInput(
            "policy_autofit.width_cell_min must be >= 1.".to_string(),
        ));
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(XlsxWriteError::InvalidInput(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        ));
    }
    Ok(())
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => {
            EnumCellValue::String(if val { "True" } else { "False" }.to_string())
        }
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

fn write_header(
    worksheet: &mut Worksheet,
    header_grid: &[Vec<String>],
    if_merge: bool,
    fmt_header: &Format,
) -> Result<(), XlsxWriteError> {
    let dict_horizontal_merges_by_row = if if_merge {
        plan_horizontal_merges(header_grid)
    } else {
        Default::default()
    };
    let set_merged_cells = derive_horizontal_merge_tracker(&dict_horizontal_merges_by_row);

    for (row_idx, row_values) in header_grid.iter().enumerate() {
        for (col_idx, cell_value) in row_values.iter().enumerate() {
            if set_merged_cells.contains(&(row_idx, col_idx)) {
                continue;
            }
            let value = if cell_value.is_empty() {
                EnumCellValue::None
            } else {
                EnumCellValue::String(cell_value.clone())
            };
            write_cell_with_format(worksheet, row_idx, col_idx, &value, fmt_header)?;
        }

        if let Some(l_merges) = dict_horizontal_merges_by_row.get(&row_idx) {
            for merge in l_merges {
                worksheet.merge_range(
                    cast_row_num(row_idx)?,
                    cast_col_num(merge.col_idx_start)?,
                    cast_row_num(row_idx)?,
                    cast_col_num(merge.col_idx_end)?,
                    &merge.text,
                    fmt_header,
                )?;
            }
        }
    }

    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), XlsxWriteError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use polars::prelude::{Column, DataFrame};

    use super::*;

    fn frame_fields() -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                "Offset".into(),
                vec!["+0x000".to_string(), "+0x002".to_string()],
            ),
            Column::new(
                "Field".into(),
                vec![
                    "InheritedAddressSpace : UChar".to_string(),
                    "BeingDebugged    : UChar".to_string(),
                ],
            ),
        ])
        .expect("frame")
    }

    #[test]
    fn write_sheet_with_title_header_and_save() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("report.xlsx");
        let mut writer = XlsxWriter::with_default_formats(path_out.clone());

        let grid = vec![
            vec!["ntdll!_PEB".to_string(), "ntdll!_PEB".to_string()],
            vec!["Offset".to_string(), "Field".to_string()],
        ];
        let options = SpecXlsxSheetWriteOptions {
            if_merge_header: true,
            ..Default::default()
        };
        let c_name = writer
            .write_sheet_from_dataframe(&frame_fields(), "urm-_PEB", Some(&grid), &options)
            .expect("write sheet");
        assert_eq!(c_name, "urm-_PEB");

        let l_reports = writer.report();
        assert_eq!(l_reports.len(), 1);
        assert_eq!(l_reports[0].sheets[0].n_rows_header, 2);
        assert_eq!(l_reports[0].sheets[0].n_rows_body, 2);

        writer.close().expect("close");
        assert!(path_out.exists());
        writer.close().expect("close is idempotent");
        assert!(matches!(
            writer.write_sheet_from_dataframe(&frame_fields(), "x", None, &options),
            Err(XlsxWriteError::Closed)
        ));
    }

    #[test]
    fn duplicate_sheet_names_are_suffixed() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut writer = XlsxWriter::with_default_formats(tmp.path().join("dup.xlsx"));
        let options = SpecXlsxSheetWriteOptions::default();

        let df = frame_fields();
        let c_first = writer
            .write_sheet_from_dataframe(&df, "krnl-_EPROCESS", None, &options)
            .expect("first");
        let c_second = writer
            .write_sheet_from_dataframe(&df, "krnl-_EPROCESS", None, &options)
            .expect("second");
        let c_third = writer
            .write_sheet_from_dataframe(&df, "KRNL-_eprocess", None, &options)
            .expect("third");

        assert_eq!(c_first, "krnl-_EPROCESS");
        assert_eq!(c_second, "krnl-_EPROCESS_1");
        assert_eq!(c_third, "KRNL-_eprocess_2");
        assert_eq!(writer.sheet_names().len(), 3);
        assert_eq!(writer.report()[1].warnings.len(), 1);
    }

    #[test]
    fn header_grid_width_mismatch_is_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut writer = XlsxWriter::with_default_formats(tmp.path().join("bad.xlsx"));
        let grid = vec![vec!["only one".to_string()]];
        let err = writer
            .write_sheet_from_dataframe(
                &frame_fields(),
                "bad",
                Some(&grid),
                &SpecXlsxSheetWriteOptions::default(),
            )
            .expect_err("width mismatch");
        assert!(matches!(err, XlsxWriteError::InvalidInput(_)));
        assert!(writer.sheet_names().is_empty());
    }

    #[test]
    fn integer_and_missing_cells_are_written() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("mixed.xlsx");
        let mut writer = XlsxWriter::with_default_formats(path_out.clone());

        let df = DataFrame::new(vec![
            Column::new("Group".into(), vec!["a".to_string(), "b".to_string()]),
            Column::new("Count".into(), vec![3u64, 0u64]),
            Column::new("Note".into(), vec![Some("x".to_string()), None]),
        ])
        .expect("frame");

        let set_idx = writer.derive_integer_column_indices(&df);
        assert_eq!(set_idx.into_iter().collect::<Vec<_>>(), vec![1]);

        writer
            .write_sheet_from_dataframe(&df, "summary", None, &SpecXlsxSheetWriteOptions::default())
            .expect("write");
        writer.close().expect("close");
        assert!(path_out.exists());
    }

    #[test]
    fn apostrophe_at_name_edge_is_stripped_and_reported() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_out = tmp.path().join("quote.xlsx");
        let mut writer = XlsxWriter::with_default_formats(path_out.clone());
        let options = SpecXlsxSheetWriteOptions::default();

        let c_name = writer
            .write_sheet_from_dataframe(&frame_fields(), "krnl-_FOO'", None, &options)
            .expect("write");
        assert_eq!(c_name, "krnl-_FOO");
        assert_eq!(writer.report()[0].warnings.len(), 1);

        writer.close().expect("close");
        assert!(path_out.is_file());
    }

    #[test]
    fn xlsx_error_does_not_repeat_its_source() {
        let xlsx_err = Worksheet::new()
            .set_name("'krnl-_FOO")
            .map(|_| ())
            .expect_err("leading apostrophe is rejected");
        let err = XlsxWriteError::from(xlsx_err);
        assert_eq!(err.to_string(), "xlsx write error");
        assert!(std::error::Error::source(&err).is_some());
    }
}
