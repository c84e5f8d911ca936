//! Cell formats, write options, reports and errors.

use rust_xlsxwriter::XlsxError;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Layered cell format. A `None` field falls through to the layer below.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    pub font_name: Option<String>,
    /// Points.
    pub font_size: Option<i64>,
    pub bold: Option<bool>,
    /// `left`, `center`, `right`, ...
    pub align: Option<String>,
    /// `top`, `vcenter`, `bottom`.
    pub valign: Option<String>,
    /// Border index as understood by [`rust_xlsxwriter::FormatBorder`], 0 for none.
    pub border: Option<i64>,
    pub num_format: Option<String>,
    /// `#RRGGBB`.
    pub bg_color: Option<String>,
}

/// Cell value after frame extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    None,
    String(String),
    Number(f64),
}

impl SpecCellFormat {
    /// `self` with every field set in `patch` replaced.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Right side wins wherever it is set.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// How null cells are rendered when they are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxValuePolicy {
    pub missing_value_str: String,
}

impl Default for SpecXlsxValuePolicy {
    fn default() -> Self {
        Self {
            missing_value_str: "NA".to_string(),
        }
    }
}

/// Which rows feed the column width estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    None,
    Header,
    Body,
    #[default]
    All,
}

/// Column autofit bounds. Widths are in characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    pub rule_columns: EnumAutofitColumnsRule,
    /// Body rows scanned; `None` scans all.
    pub height_body_inferred_max: Option<usize>,
    pub width_cell_min: usize,
    pub width_cell_max: usize,
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::All,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 100,
            width_cell_padding: 2,
        }
    }
}

/// Options fixed for the lifetime of one [`crate::writer::XlsxWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxWriteOptions {
    pub value_policy: SpecXlsxValuePolicy,
    /// Render nulls as `value_policy.missing_value_str` instead of blank cells.
    pub keep_missing_values: bool,
    /// Integer-typed columns get the integer preset without being named.
    pub infer_integer_cols: bool,
    /// Merged into every body format.
    pub base_format_patch: SpecCellFormat,
}

impl Default for SpecXlsxWriteOptions {
    fn default() -> Self {
        Self {
            value_policy: SpecXlsxValuePolicy::default(),
            keep_missing_values: false,
            infer_integer_cols: true,
            base_format_patch: SpecCellFormat::default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetFormatSpecification

/// A run of equal header cells on one row, written as one merged cell.
/// Column bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetHorizontalMerge {
    pub row_idx_start: usize,
    pub col_idx_start: usize,
    pub col_idx_end: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetWritten {
    pub sheet_name_requested: String,
    /// After sanitizing and uniquing.
    pub sheet_name: String,
    pub n_rows_header: usize,
    pub n_rows_body: usize,
    pub n_cols: usize,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportAndErrors

/// Outcome of one write call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    pub sheets: Vec<SpecSheetWritten>,
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

/// Errors raised by [`crate::writer::XlsxWriter`].
#[derive(Debug, thiserror::Error)]
pub enum XlsxWriteError {
    /// Write attempted after the workbook was saved.
    #[error("Cannot write after close().")]
    Closed,
    /// Caller supplied an inconsistent policy, header or frame.
    #[error("{0}")]
    InvalidInput(String),
    /// Sheet does not fit Excel limits.
    #[error("Excel limit exceeded: {0}")]
    LimitExceeded(String),
    /// Failed to read a value out of the source frame.
    #[error("Failed to access cell value: {0}")]
    Frame(String),
    /// Underlying workbook library error.
    #[error("xlsx write error")]
    Xlsx(#[from] XlsxError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
