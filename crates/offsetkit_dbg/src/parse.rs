//! Scraping of debugger text output.
//!
//! The debugger echoes each command line before running it, so the script
//! text (which contains both markers) shows up in the output ahead of the
//! real marker echoes. Extraction therefore anchors on the last start marker.

use crate::conf::{DUMP_END, DUMP_START};
use crate::spec::{OffsetError, SpecDtField, SpecSymbolOffset};

/// Return the text between the last [`DUMP_START`] and the next [`DUMP_END`].
///
/// Empty when either marker is missing.
pub fn extract_marked_output(all_text: &str) -> &str {
    let Some(n_idx_start) = all_text.rfind(DUMP_START) else {
        return "";
    };
    let n_idx_start = n_idx_start + DUMP_START.len();
    let Some(n_len_inner) = all_text[n_idx_start..].find(DUMP_END) else {
        return "";
    };
    &all_text[n_idx_start..n_idx_start + n_len_inner]
}

/// Parse `dt` field lines (`+0x018 Ldr : Ptr64 _PEB_LDR_DATA`).
pub fn parse_dt_fields(dt_text: &str) -> Vec<SpecDtField> {
    dt_text
        .lines()
        .map(str::trim)
        .filter(|line| line.contains("+0x"))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let offset = parts.next()?;
            if !offset.starts_with("+0x") {
                return None;
            }
            let field_def = parts.collect::<Vec<_>>().join(" ");
            if field_def.is_empty() {
                return None;
            }
            Some(SpecDtField {
                offset: offset.to_string(),
                field_def,
            })
        })
        .collect()
}

fn is_lm_header(line: &str) -> bool {
    let low = line.to_lowercase();
    low.starts_with("start") && low.contains("module name")
}

/// Split combined `x` + `lm` output at the `lm` header line.
///
/// Returns `(x_text, lm_text)`; the header line belongs to `lm_text`.
pub fn split_symbol_listing(inner: &str) -> (String, String) {
    let l_lines: Vec<&str> = inner.lines().collect();
    let n_idx_header = l_lines
        .iter()
        .position(|line| is_lm_header(line))
        .unwrap_or(l_lines.len());
    (
        l_lines[..n_idx_header].join("\n"),
        l_lines[n_idx_header..].join("\n"),
    )
}

/// Parse a debugger hex token such as `fffff801`4a2b3c40` or `0x1000`.
pub fn parse_hex_token(token: &str) -> Option<u64> {
    let c_clean = token.replace('`', "");
    let c_digits = c_clean
        .strip_prefix("0x")
        .or_else(|| c_clean.strip_prefix("0X"))
        .unwrap_or(&c_clean);
    if c_digits.is_empty() {
        return None;
    }
    u64::from_str_radix(c_digits, 16).ok()
}

/// Address from the first non-empty `x` line that starts with a hex token.
pub fn parse_address_block(x_text: &str) -> Option<u64> {
    x_text
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .find_map(parse_hex_token)
}

/// Base address of `module_name` in `lm` output (case-insensitive).
pub fn parse_lm_base(lm_text: &str, module_name: &str) -> Option<u64> {
    let c_target = module_name.to_lowercase();
    lm_text.lines().find_map(|line| {
        let l_parts: Vec<&str> = line.split_whitespace().collect();
        if l_parts.len() < 3 || l_parts[2].to_lowercase() != c_target {
            return None;
        }
        parse_hex_token(l_parts[0])
    })
}

/// Resolve `address - base` from the marked output of an `x` + `lm m` script.
pub fn resolve_symbol_offset(inner: &str, module_name: &str) -> Result<SpecSymbolOffset, OffsetError> {
    let (x_text, lm_text) = split_symbol_listing(inner);
    let address = parse_address_block(&x_text).ok_or(OffsetError::AddressNotFound)?;
    let base = parse_lm_base(&lm_text, module_name).ok_or_else(|| OffsetError::BaseNotFound {
        module: module_name.to_string(),
    })?;
    let offset = address
        .checked_sub(base)
        .ok_or(OffsetError::BelowBase { address, base })?;
    Ok(SpecSymbolOffset {
        address,
        base,
        offset,
    })
}

/// `0x` followed by lowercase hex digits.
pub fn format_offset_hex(offset: u64) -> String {
    format!("0x{offset:x}")
}
