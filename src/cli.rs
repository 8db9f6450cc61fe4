//! Shared plumbing the four CLI binaries all use: default output filenames
//! and a uniform run-and-report wrapper, replacing the original tool's
//! `KEY=value` argument convention with ordinary long flags.
use crate::error::Result;
use crate::warn::{StderrSink, WarningSink};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Derive a default output path by swapping `input`'s extension for `ext`.
pub fn default_output_path(input: &Path, ext: &str) -> PathBuf {
    input.with_extension(ext)
}

/// Run `body`, printing any error to stderr and mapping it to a process exit
/// code. Every binary's `main` is a thin wrapper around this.
pub fn run(body: impl FnOnce() -> Result<()>) -> ExitCode {
    match body() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// The warning sink every binary uses: print to stderr, same destination the
/// original tool's debug-print flag wrote to.
pub fn warning_sink() -> StderrSink {
    StderrSink
}

/// Write `DUMPINFO=<path>`'s struct dump, if requested. Mirrors the original
/// tool's behavior: a failure writing the dump is a warning, not a fatal
/// error, and never prevents the conversion it was requested alongside from
/// succeeding.
pub fn write_dumpinfo(path: Option<&Path>, info: impl Display, warnings: &mut dyn WarningSink) {
    let Some(path) = path else { return };
    if let Err(e) = std::fs::write(path, info.to_string()) {
        warnings.warn(&format!("DUMPINFO -> Warning: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_path_swaps_extension() {
        assert_eq!(default_output_path(Path::new("game.exe"), "xbe"), PathBuf::from("game.xbe"));
    }
}
