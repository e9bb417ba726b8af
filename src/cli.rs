//! Command-line interface definitions
//!
//! Arguments are grouped by the component that consumes them: the
//! subcommand picks the operation, [`SubmitConfig`] picks how it is issued
//! and [`OutputConfig`] drives logging.

use crate::constants::{flags_from_str, parse_mode};
use crate::runner::Mode;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Filesystem operations through the io_uring bridge
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Operation to run
    #[command(subcommand)]
    pub command: Command,

    /// Submission configuration
    #[command(flatten)]
    pub submit: SubmitConfig,

    /// Output and logging configuration
    #[command(flatten)]
    pub output: OutputConfig,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the stat record of a path, following symlinks
    Stat {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Print the stat record of a path without following a final symlink
    Lstat {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Print the target of a symlink
    Readlink {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// List a directory
    Ls {
        #[arg(value_name = "DIR")]
        path: PathBuf,

        /// Entries requested per readdir call
        #[arg(long, default_value = "64")]
        batch: usize,
    },

    /// Print a file's contents
    Cat {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Bytes per read call
        #[arg(long, default_value = "65536")]
        chunk: usize,
    },

    /// Create a directory
    Mkdir {
        #[arg(value_name = "DIR")]
        path: PathBuf,

        /// Create missing parents; an existing directory is not an error
        #[arg(short, long)]
        parents: bool,

        /// Octal mode for created directories
        #[arg(long, default_value = "755")]
        mode: String,
    },

    /// Write text to a file
    Write {
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Text to write
        #[arg(value_name = "TEXT")]
        text: String,

        /// Open flags as an fopen-style string (r, r+, w, wx, w+, a, ax, a+, ...)
        #[arg(long, default_value = "w")]
        flags: String,

        /// Octal mode for a created file
        #[arg(long, default_value = "644")]
        mode: String,
    },
}

/// How operations are issued
///
/// Used by: `Runner::new()`
#[derive(clap::Args, Debug, Clone)]
pub struct SubmitConfig {
    /// Use the async forms, completed through the context handler
    #[arg(long = "async", global = true)]
    pub async_mode: bool,
}

impl SubmitConfig {
    #[must_use]
    pub const fn mode(&self) -> Mode {
        if self.async_mode {
            Mode::Async
        } else {
            Mode::Sync
        }
    }
}

/// Output configuration
///
/// Used by: `main()` logging setup
#[derive(clap::Args, Debug, Clone)]
pub struct OutputConfig {
    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl OutputConfig {
    /// Log level selected by `-v` / `-q`
    #[must_use]
    pub const fn level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

impl Args {
    /// Validate command-line arguments
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - Both --quiet and --verbose options are used
    /// - `ls --batch` or `cat --chunk` is 0
    /// - `write --flags`, `write --mode` or `mkdir --mode` does not parse
    pub fn validate(&self) -> Result<()> {
        if self.output.quiet && self.output.verbose > 0 {
            anyhow::bail!("Cannot use both --quiet and --verbose options");
        }

        match &self.command {
            Command::Ls { batch: 0, .. } => anyhow::bail!("--batch must be at least 1"),
            Command::Cat { chunk: 0, .. } => anyhow::bail!("--chunk must be at least 1"),
            Command::Write { flags, mode, .. } => {
                flags_from_str(flags)?;
                parse_mode(mode)?;
            }
            Command::Mkdir { mode, .. } => {
                parse_mode(mode)?;
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("fsbridge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_async_flag_after_subcommand() {
        let args = parse(&["stat", "/tmp", "--async"]);
        assert_eq!(args.submit.mode(), Mode::Async);
        assert!(matches!(args.command, Command::Stat { .. }));
    }

    #[test]
    fn test_default_mode_is_sync() {
        let args = parse(&["ls", "/tmp"]);
        assert_eq!(args.submit.mode(), Mode::Sync);
        assert!(matches!(args.command, Command::Ls { batch: 64, .. }));
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["stat", "x"]).output.level(), tracing::Level::WARN);
        assert_eq!(parse(&["-vv", "stat", "x"]).output.level(), tracing::Level::DEBUG);
        assert_eq!(parse(&["-q", "stat", "x"]).output.level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_validate_rejects_quiet_and_verbose() {
        assert!(parse(&["-q", "-v", "stat", "x"]).validate().is_err());
    }

    #[test]
    fn test_validate_write_flags() {
        assert!(parse(&["write", "f", "hi", "--flags", "a+"]).validate().is_ok());
        assert!(parse(&["write", "f", "hi", "--flags", "rw"]).validate().is_err());
        assert!(parse(&["write", "f", "hi", "--mode", "9"]).validate().is_err());
    }

    #[test]
    fn test_validate_zero_batch() {
        assert!(parse(&["ls", ".", "--batch", "0"]).validate().is_err());
        assert!(parse(&["cat", "f", "--chunk", "0"]).validate().is_err());
    }

    #[test]
    fn test_mkdir_parents_flag() {
        let args = parse(&["mkdir", "-p", "a/b/c"]);
        assert!(matches!(
            args.command,
            Command::Mkdir { parents: true, ref mode, .. } if mode == "755"
        ));
        assert!(parse(&["mkdir", "d", "--mode", "8"]).validate().is_err());
    }
}
