// src/exec/summary.rs

//! Extracts the written/restored path from the executable's summary line.
//!
//! Expected formats:
//! - compress: `Wrote <path> (size: <n> bytes)`
//! - decompress: `Restored original to <path> (mode: <pattern>)`
//!
//! The whole trimmed stdout is treated as the summary line. Anything that
//! does not match is passed through unchanged.

use crate::types::Mode;

const WROTE_PREFIX: &str = "Wrote ";
const WROTE_MARKER: &str = " (size:";
const RESTORED_PREFIX: &str = "Restored original to ";
const RESTORED_MARKER: &str = " (mode:";

/// Parse the actual output path out of `stdout`.
///
/// Never fails: an unrecognised line is returned trimmed but otherwise
/// verbatim.
pub fn parse_output_path(stdout: &str, mode: Mode) -> String {
    let line = stdout.trim();
    let (prefix, marker) = match mode {
        Mode::Compress => (WROTE_PREFIX, WROTE_MARKER),
        Mode::Decompress => (RESTORED_PREFIX, RESTORED_MARKER),
    };

    extract_between(line, prefix, marker)
        .unwrap_or(line)
        .to_string()
}

fn extract_between<'a>(line: &'a str, prefix: &str, marker: &str) -> Option<&'a str> {
    if !line.starts_with(prefix) {
        return None;
    }
    let start = prefix.len();
    let end = line.rfind(marker)?;
    (end > start).then(|| &line[start..end])
}
