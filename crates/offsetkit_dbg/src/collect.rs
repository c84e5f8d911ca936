//! Per-group collection: list entries in, layouts or offsets out.

use tracing::{debug, info, warn};

use crate::command::{SpecDebuggerInvocation, build_query_invocation};
use crate::listing::{parse_entry, read_list_file};
use crate::parse::{extract_marked_output, parse_dt_fields, resolve_symbol_offset};
use crate::report::{ReportCollect, ReportCollectBuilder};
use crate::runner::DebuggerRunner;
use crate::spec::{
    CollectError, EnumQueryGroup, SpecCollectOptions, SpecQueryEntry, SpecStructLayout,
    SpecVariableOffset,
};

/// Struct layouts recorded for one struct group.
#[derive(Debug, Clone)]
pub struct SpecStructCollection {
    pub layouts: Vec<SpecStructLayout>,
    pub report: ReportCollect,
}

/// Variable offsets recorded for one variable group.
#[derive(Debug, Clone)]
pub struct SpecVariableCollection {
    pub offsets: Vec<SpecVariableOffset>,
    pub report: ReportCollect,
}

impl SpecVariableCollection {
    /// The list had at least one entry, so the group gets a sheet even
    /// when nothing resolved.
    pub fn has_entries(&self) -> bool {
        self.report.cnt_entries > 0
    }
}

#[derive(Debug)]
struct SpecPlannedQuery {
    entry: SpecQueryEntry,
    invocation: SpecDebuggerInvocation,
}

/// Run `dt` for every entry of a struct group.
///
/// Returns [`CollectError`] only when the list cannot be read or `group` is
/// not a struct group; per-entry problems are recorded in the report.
pub fn collect_structs<R: DebuggerRunner + ?Sized>(
    runner: &R,
    group: EnumQueryGroup,
    options: &SpecCollectOptions,
) -> Result<SpecStructCollection, CollectError> {
    if !group.is_struct() {
        return Err(CollectError::GroupMismatch {
            group,
            expected: "struct",
        });
    }

    let mut builder = ReportCollectBuilder::new(group);
    let mut layouts = Vec::new();

    for query in plan_queries(group, options, &mut builder)? {
        let symbol = query.entry.symbol();
        let Some(dt_text) = run_marked(runner, &query.invocation, &symbol, options, &mut builder)
        else {
            continue;
        };

        let fields = parse_dt_fields(&dt_text);
        debug!(%symbol, n_fields = fields.len(), "parsed dt fields");
        if fields.is_empty() {
            builder.add_warning(format!("{symbol}: no field table; keeping raw output"));
        }

        layouts.push(SpecStructLayout {
            group,
            symbol,
            type_name: query.entry.name,
            fields,
            raw_lines: dt_text.lines().map(ToString::to_string).collect(),
        });
        builder.add_recorded();
    }

    Ok(SpecStructCollection {
        layouts,
        report: builder.build(),
    })
}

/// Run `x` + `lm m` for every entry of a variable group.
pub fn collect_variables<R: DebuggerRunner + ?Sized>(
    runner: &R,
    group: EnumQueryGroup,
    options: &SpecCollectOptions,
) -> Result<SpecVariableCollection, CollectError> {
    if group.is_struct() {
        return Err(CollectError::GroupMismatch {
            group,
            expected: "variable",
        });
    }

    let mut builder = ReportCollectBuilder::new(group);
    let mut offsets = Vec::new();

    for query in plan_queries(group, options, &mut builder)? {
        let symbol = query.entry.symbol();
        let Some(inner) = run_marked(runner, &query.invocation, &symbol, options, &mut builder)
        else {
            continue;
        };

        match resolve_symbol_offset(&inner, &query.entry.module) {
            Ok(resolved) => {
                debug!(
                    %symbol,
                    address = format_args!("{:#x}", resolved.address),
                    base = format_args!("{:#x}", resolved.base),
                    "resolved offset"
                );
                offsets.push(SpecVariableOffset {
                    group,
                    module_path: query.entry.module_path,
                    module: query.entry.module,
                    symbol: query.entry.name,
                    resolved,
                });
                builder.add_recorded();
            }
            Err(err) => {
                debug!(%symbol, %err, "offset not resolved");
                builder.add_skipped();
                builder.add_warning(format!("{symbol}: {err}"));
            }
        }
    }

    Ok(SpecVariableCollection {
        offsets,
        report: builder.build(),
    })
}

fn plan_queries(
    group: EnumQueryGroup,
    options: &SpecCollectOptions,
    builder: &mut ReportCollectBuilder,
) -> Result<Vec<SpecPlannedQuery>, CollectError> {
    let path_list = options.lists.path_for(group);
    let l_lines = read_list_file(path_list)?;
    debug!(%group, list = %path_list.display(), n_entries = l_lines.len(), "list read");
    builder.add_entries(l_lines.len() as u64);

    let mut l_queries = Vec::with_capacity(l_lines.len());
    for line in l_lines {
        let Some(entry) = parse_entry(&line, group.mode()) else {
            debug!(%group, %line, "malformed list line skipped");
            builder.add_skipped();
            continue;
        };

        if !options.filter.is_selected(&entry.symbol()) {
            builder.add_filtered();
            continue;
        }

        if let Some(module_path) = &entry.module_path
            && !module_path.is_file()
        {
            debug!(module = %module_path.display(), "module file not found");
            builder.add_skipped();
            builder.add_warning(format!("module file not found: {}", module_path.display()));
            continue;
        }

        let Some(invocation) = build_query_invocation(group, &options.debuggers, &entry) else {
            builder.add_skipped();
            continue;
        };
        l_queries.push(SpecPlannedQuery { entry, invocation });
    }

    Ok(l_queries)
}

/// Run one invocation and return the non-blank marked output.
fn run_marked<R: DebuggerRunner + ?Sized>(
    runner: &R,
    invocation: &SpecDebuggerInvocation,
    symbol: &str,
    options: &SpecCollectOptions,
    builder: &mut ReportCollectBuilder,
) -> Option<String> {
    if options.if_dry_run {
        info!(%symbol, command = %invocation, "dry-run");
        builder.add_skipped();
        return None;
    }

    debug!(%symbol, command = %invocation, "invoking debugger");
    builder.add_invoked();
    let output = match runner.run(invocation) {
        Ok(output) => output,
        Err(err) => {
            warn!(%symbol, %err, "debugger invocation failed");
            builder.add_error(symbol.to_string(), err.to_string());
            return None;
        }
    };
    debug!(%symbol, "raw output begin\n{output}\nraw output end");

    let inner = extract_marked_output(&output);
    debug!(%symbol, n_len = inner.len(), "extracted marked output");
    if inner.trim().is_empty() {
        builder.add_skipped();
        builder.add_warning(format!("{symbol}: no output between markers"));
        return None;
    }
    Some(inner.to_string())
}
