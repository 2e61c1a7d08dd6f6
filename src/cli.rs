//! Command logic for the clover-merge CLI.
//!
//! Kept separate from `main.rs` and returning plain data, making it easy to
//! test without capturing stdout.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use crate::accumulator::{Accumulator, MergeMode};
use crate::error::{MergeError, Result};
use crate::metrics::Metrics;

/// Everything a merge run produces: the XML to write, its metrics, the text
/// to print, and whether the run passed the enforcement threshold.
#[derive(Debug)]
pub struct MergeOutcome {
    pub xml: String,
    pub metrics: Metrics,
    pub report: String,
    pub passed: bool,
}

/// Validate the input path list: at least one path, all of them existing
/// files.
pub fn check_paths(paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        return Err(MergeError::Argument(
            "At least one input path is required (preferably two).".to_string(),
        ));
    }
    if !paths.iter().all(|path| path.is_file()) {
        return Err(MergeError::Argument(
            "One or more of the given file paths couldn't be found.".to_string(),
        ));
    }
    Ok(())
}

/// Merge the given report files and build the console report. Does not write
/// the output file; the caller owns that I/O.
pub fn merge_paths(paths: &[PathBuf], mode: &str, enforce: f64) -> Result<MergeOutcome> {
    let mode: MergeMode = mode.parse()?;
    check_paths(paths)?;

    let mut accumulator = Accumulator::new(mode);
    for path in paths {
        let content = std::fs::read(path)?;
        accumulator.parse(&content)?;
    }

    let (xml, metrics) = accumulator.to_xml()?;
    let (report, passed) = format_report(&metrics, enforce);

    Ok(MergeOutcome {
        xml,
        metrics,
        report,
        passed,
    })
}

/// Write the merged XML to the output path.
pub fn write_output(path: &Path, xml: &str) -> Result<()> {
    std::fs::write(path, xml)?;
    Ok(())
}

fn format_report(metrics: &Metrics, enforce: f64) -> (String, bool) {
    let element_count = metrics.element_count();
    let covered_element_count = metrics.covered_element_count();
    let percentage = metrics.coverage_percentage();

    let mut out = String::new();
    writeln!(out, "Files Discovered: {}", metrics.file_count).unwrap();
    writeln!(
        out,
        "Final Coverage: {}/{} ({:.2}%)",
        covered_element_count, element_count, percentage
    )
    .unwrap();

    // A zero threshold disables enforcement entirely.
    let mut passed = true;
    if enforce > 0.0 {
        if percentage > enforce {
            writeln!(
                out,
                "Coverage is above required threshold ({:.2}% > {:.2}%).",
                percentage, enforce
            )
            .unwrap();
        } else {
            writeln!(
                out,
                "Coverage is below required threshold ({:.2}% < {:.2}%).",
                percentage, enforce
            )
            .unwrap();
            passed = false;
        }
    }

    (out, passed)
}
