//! Evaluation result files.
//!
//! A results directory receives:
//!
//! - `predClassAndScore`: one `<label>\t<score>` line per point
//! - `runInfo`: accuracy, model shape and sparsity
//!
//! and a shared `resultDump` file gets one `<nnz> <accuracy> <dir>` line
//! appended per run.
//!
//! The writers take any [`Write`] so they can be tested in memory; the
//! [`write_reports`] helper wires them to files.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::eval::{EvalSummary, PointPrediction};

pub const PREDICTIONS_FILE: &str = "predClassAndScore";
pub const RUN_INFO_FILE: &str = "runInfo";
pub const RESULT_DUMP_FILE: &str = "resultDump";

/// Write one `<label>\t<score>` line per prediction.
pub fn write_predictions<W: Write>(mut writer: W, predictions: &[PointPrediction]) -> io::Result<()> {
    for prediction in predictions {
        writeln!(writer, "{}\t{}", prediction.label, prediction.score)?;
    }
    writer.flush()
}

/// Write the human-readable run summary.
pub fn write_run_info<W: Write>(mut writer: W, summary: &EvalSummary) -> io::Result<()> {
    writeln!(writer, "Final Test Accuracy = {:.6}", summary.accuracy)?;
    writeln!(writer, "HyperParams:")?;
    writeln!(writer, "\tTree Depth: {}", summary.tree_depth)?;
    writeln!(writer, "\tProjected Dimension: {}", summary.projection_dim)?;
    writeln!(writer, "\tData Dimension: {}", summary.data_dim)?;
    writeln!(writer, "\tSigma: {}", summary.sigma)?;
    writeln!(writer, "\tClasses: {}", summary.num_classes)?;
    writeln!(writer, "Evaluated Points: {} of {}", summary.n_evaluated, summary.n_points)?;
    writeln!(writer, "Total Non-Zeros: {}", summary.total_non_zeros)?;
    writer.flush()
}

/// Append one `<nnz> <accuracy> <results_dir>` line.
///
/// Accuracy is written with six significant digits and no trailing zeros,
/// so `0.75` stays `0.75` and `2/3` becomes `0.666667`.
pub fn append_result_dump<W: Write>(
    mut writer: W,
    summary: &EvalSummary,
    results_dir: &Path,
) -> io::Result<()> {
    writeln!(
        writer,
        "{} {} {}",
        summary.total_non_zeros,
        significant6(summary.accuracy),
        results_dir.display()
    )?;
    writer.flush()
}

/// `%g`-style rendering: six significant digits, trailing zeros dropped,
/// scientific notation for exponents below -4 or from 6 up.
fn significant6(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }

    // Round to six significant digits first; the exponent can shift (9.999996 -> 1e1).
    let sci = format!("{value:.5e}");
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..6).contains(&exponent) {
        let decimals = (5 - exponent) as usize;
        trim_zeros(format!("{value:.decimals$}"))
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_zeros(mantissa.to_string()), exponent.abs())
    }
}

fn trim_zeros(mut digits: String) -> String {
    if digits.contains('.') {
        let trimmed = digits.trim_end_matches('0').trim_end_matches('.').len();
        digits.truncate(trimmed);
    }
    digits
}

/// Write all result files.
///
/// Creates `results_dir` if needed, overwrites the per-run files there and
/// appends to `dump_file`.
pub fn write_reports(
    results_dir: &Path,
    dump_file: &Path,
    predictions: &[PointPrediction],
    summary: &EvalSummary,
) -> io::Result<()> {
    fs::create_dir_all(results_dir)?;

    let predictions_path = results_dir.join(PREDICTIONS_FILE);
    write_predictions(BufWriter::new(fs::File::create(&predictions_path)?), predictions)?;
    write_run_info(
        BufWriter::new(fs::File::create(results_dir.join(RUN_INFO_FILE))?),
        summary,
    )?;

    if let Some(parent) = dump_file.parent() {
        fs::create_dir_all(parent)?;
    }
    let dump = OpenOptions::new().create(true).append(true).open(dump_file)?;
    append_result_dump(dump, summary, results_dir)?;

    tracing::debug!(dir = %results_dir.display(), dump = %dump_file.display(), "wrote reports");
    Ok(())
}
