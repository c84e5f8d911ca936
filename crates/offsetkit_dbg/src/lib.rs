//! `offsetkit_dbg`:
//! Drives `cdb`/`kd`, scrapes their output and resolves layouts and offsets.
//!
//! Module layout:
//! - `conf`    : markers, default paths and sheet naming constants
//! - `spec`    : enums/options/models/errors
//! - `listing` : query list files and entry parsing
//! - `command` : debugger scripts and command lines
//! - `runner`  : process invocation seam
//! - `parse`   : marker extraction, `dt` tables, `x`/`lm` listings
//! - `pattern` : include/exclude entry filters
//! - `report`  : per-group run report
//! - `collect` : per-group orchestration

pub mod collect;
pub mod command;
pub mod conf;
pub mod listing;
pub mod parse;
pub mod pattern;
pub mod report;
pub mod runner;
pub mod spec;

pub use collect::{SpecStructCollection, SpecVariableCollection, collect_structs, collect_variables};
pub use command::{SpecDebuggerInvocation, build_query_invocation};
pub use parse::{
    extract_marked_output, format_offset_hex, parse_address_block, parse_dt_fields,
    parse_lm_base, resolve_symbol_offset, split_symbol_listing,
};
pub use pattern::SpecEntryFilter;
pub use report::{ReportCollect, ReportCollectBuilder};
pub use runner::{DebuggerRunner, ProcessRunner};
pub use spec::{
    CollectError, DebuggerError, EnumDebuggerMode, EnumPatternMode, EnumQueryGroup, ListError,
    OffsetError, PatternError, SpecCollectOptions, SpecDebuggerPaths, SpecDtField, SpecEntryError,
    SpecListPaths, SpecQueryEntry, SpecStructLayout, SpecSymbolOffset, SpecVariableOffset,
};
