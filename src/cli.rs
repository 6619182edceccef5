// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{ArgAction, Parser, ValueEnum};

use crate::types::{FillPattern, Mode, SizeFactor};

/// Command-line arguments for `bigzip-controller`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "bigzip-controller",
    version,
    about = "Drive the bigzip executable: inflate files into .bigzip archives and back.",
    long_about = None
)]
pub struct CliArgs {
    /// File to compress, or `.bigzip` archive to decompress.
    #[arg(short, long, value_name = "PATH")]
    pub input: String,

    /// Output path. Derived from the input when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<String>,

    /// Force decompress mode.
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "compress")]
    pub decompress: bool,

    /// Force compress mode.
    #[arg(long, action = ArgAction::SetTrue)]
    pub compress: bool,

    /// Size factor (32, 64, 128, 256 or 512). Compress only.
    #[arg(short = 'f', long, value_name = "N")]
    pub factor: Option<SizeFactor>,

    /// Fill pattern (repeat, zero or random). Compress only.
    #[arg(long = "mode", value_name = "PATTERN")]
    pub fill_pattern: Option<FillPattern>,

    /// Overwrite an existing output without asking.
    #[arg(short, long)]
    pub yes: bool,

    /// Print the executable and arguments, but don't launch anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Path to the config file (TOML).
    ///
    /// If omitted, `Bigzip.toml` in the current working directory is used
    /// when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BIGZIP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    /// Mode requested explicitly on the command line, if any.
    pub fn mode_override(&self) -> Option<Mode> {
        if self.decompress {
            Some(Mode::Decompress)
        } else if self.compress {
            Some(Mode::Compress)
        } else {
            None
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_command_line() {
        let args = CliArgs::try_parse_from([
            "bigzip-controller",
            "-i",
            "data.txt",
            "-o",
            "out.bigzip",
            "-f",
            "256",
            "--mode",
            "zero",
            "--yes",
        ])
        .unwrap();

        assert_eq!(args.input, "data.txt");
        assert_eq!(args.output.as_deref(), Some("out.bigzip"));
        assert_eq!(args.factor, Some(SizeFactor::X256));
        assert_eq!(args.fill_pattern, Some(FillPattern::Zero));
        assert!(args.yes);
        assert_eq!(args.mode_override(), None);
    }

    #[test]
    fn mode_flags() {
        let argv = ["bigzip-controller", "-i", "a.bigzip", "--decompress"];
        let args = CliArgs::try_parse_from(argv).unwrap();
        assert_eq!(args.mode_override(), Some(Mode::Decompress));

        let args =
            CliArgs::try_parse_from(["bigzip-controller", "-i", "a.bigzip", "--compress"]).unwrap();
        assert_eq!(args.mode_override(), Some(Mode::Compress));

        assert!(CliArgs::try_parse_from([
            "bigzip-controller",
            "-i",
            "a",
            "--compress",
            "--decompress"
        ])
        .is_err());
    }

    #[test]
    fn rejects_unknown_factor() {
        assert!(CliArgs::try_parse_from(["bigzip-controller", "-i", "a", "-f", "100"]).is_err());
    }
}
