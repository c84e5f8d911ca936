//! `offsetkit_io_xlsx`:
//! Workbook writer used by the offset report.
//!
//! Module layout:
//! - `conf`   : constants and default presets
//! - `spec`   : specs/models/options/errors
//! - `util`   : pure helper functions
//! - `writer` : stateful workbook writer
pub mod conf;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    EnumFmtKey, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL, derive_default_xlsx_formats,
};
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecSheetHorizontalMerge, SpecSheetWritten, SpecXlsxReport, SpecXlsxValuePolicy,
    SpecXlsxWriteOptions, XlsxWriteError,
};
pub use util::{
    create_sheet_identifier, derive_horizontal_merge_tracker, derive_unique_sheet_name,
    plan_horizontal_merges, sanitize_sheet_name,
};
pub use writer::{SpecXlsxSheetWriteOptions, XlsxWriter};
