// src/exec/args.rs

//! Command-line argument construction for the bigzip executable.
//!
//! The ordering below is what existing `bz` builds expect; keep it stable.

use crate::types::{Mode, RunRequest};

pub const DECOMPRESS_FLAG: &str = "-uz";
pub const INPUT_FLAG: &str = "-i";
pub const OUTPUT_FLAG: &str = "-o";
pub const FACTOR_FLAG: &str = "-f";
pub const PATTERN_FLAG: &str = "-mode";
pub const FORCE_FLAG: &str = "-force";

/// Build the argument vector for one request.
pub fn build_args(request: &RunRequest) -> Vec<String> {
    let mut args = Vec::with_capacity(10);

    match request.mode {
        Mode::Decompress => {
            args.push(DECOMPRESS_FLAG.to_string());
            args.push(INPUT_FLAG.to_string());
            args.push(request.input_path.clone());
        }
        Mode::Compress => {
            args.push(INPUT_FLAG.to_string());
            args.push(request.input_path.clone());
            args.push(FACTOR_FLAG.to_string());
            args.push(request.factor.to_string());
            args.push(PATTERN_FLAG.to_string());
            args.push(request.fill_pattern.to_string());
        }
    }

    if let Some(output) = request
        .output_path
        .as_deref()
        .filter(|o| !o.trim().is_empty())
    {
        args.push(OUTPUT_FLAG.to_string());
        args.push(output.to_string());
    }

    if request.force_overwrite {
        args.push(FORCE_FLAG.to_string());
    }

    args
}
