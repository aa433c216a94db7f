//! Tells the user how a run went.
//!
//! As with most output code, the logic lives in a function that writes to any pair of writers,
//! so that it can be tested against buffers. [Reporter] calls it with the real stdout and
//! stderr, locking both for the duration of the report so that the lines of one report stay
//! together.

use crate::error::AggregateError;
use crate::reconcile::{Mode, Summary};
use std::io::{self, Write};
use std::ops::DerefMut;

/// Prints the outcome of a run.
pub trait Report {
    fn report(&mut self, mode: Mode, outcome: &Result<Summary, AggregateError>) -> io::Result<()>;
}

/// The real [Report] implementation. Uses the real stdout/stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reporter;

impl Report for Reporter {
    fn report(&mut self, mode: Mode, outcome: &Result<Summary, AggregateError>) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        let mut stderr = io::stderr().lock();
        _report(&mut stdout, &mut stderr, mode, outcome)
    }
}

/// A testable function containing the logic for reporting the outcome of a run.
///
/// Resources that were created or are missing go to stdout, followed by a one-line summary.
/// If anything went wrong, every error is listed on stderr instead of the summary.
pub fn _report<OT: Write, ET: Write, O: DerefMut<Target = OT>, E: DerefMut<Target = ET>>(
    mut stdout: O,
    mut stderr: E,
    mode: Mode,
    outcome: &Result<Summary, AggregateError>,
) -> io::Result<()> {
    let summary = match outcome {
        Ok(summary) => summary,
        Err(err) => &err.summary,
    };

    for resource in &summary.created {
        writeln!(&mut stdout, "Created {resource}")?;
    }
    for resource in &summary.pending {
        writeln!(&mut stdout, "Missing {resource}")?;
    }

    match outcome {
        Ok(summary) => match mode {
            Mode::Apply => writeln!(
                &mut stdout,
                "Finished {mode}: {} created",
                summary.created.len(),
            ),
            Mode::Verify => writeln!(
                &mut stdout,
                "Finished {mode}: {} missing",
                summary.pending.len(),
            ),
        },
        Err(err) => {
            writeln!(&mut stderr, "Error: {err}")?;
            for (i, error) in err.errors.iter().enumerate() {
                //                1234
                writeln!(&mut stderr, "    {}. {error}", i + 1)?;
            }
            Ok(())
        }
    }
}
