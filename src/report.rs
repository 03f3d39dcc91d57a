//! Console rendering: the progress table and the end-of-run summary.

use std::fmt;

use crate::config::Strategy;
use crate::search::SearchOutcome;
use crate::shared::ProgressEvent;

/// Column headings for the progress table, with the rule beneath them.
pub const HEADER: &str = "     Time    %done     Best\n---------------------------";

/// Title line printed above [`HEADER`].
pub fn title(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::LocalSearch => "Cable length management, local search in parallel",
        Strategy::RandomSample => "Cable length management, random sample in parallel",
    }
}

/// Formats `n` with `,` between groups of three digits.
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i).is_multiple_of(3) {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// One row of the progress table. New global bests are marked with `*`.
pub struct ProgressLine<'a>(pub &'a ProgressEvent);

impl fmt::Display for ProgressLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = self.0;
        let secs = e.elapsed.as_secs_f64().round() as u64;
        write!(
            f,
            "{:>9}  {:>7}   {:>6}",
            group_thousands(secs),
            percent(e.fraction),
            group_thousands(e.best_score)
        )?;
        if e.is_new_best {
            f.write_str(" *")?;
        }
        Ok(())
    }
}

/// End-of-run summary.
pub struct Summary<'a>(pub &'a SearchOutcome);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = self.0;
        writeln!(f, "Devices: {}", o.item_count)?;
        match &o.best {
            Some((score, candidate)) => {
                writeln!(f, "Minimum length: {}", group_thousands(*score))?;
                writeln!(f, "Best order: {candidate}")?;
            }
            None => writeln!(f, "No solution found: no worker completed")?,
        }

        let unit = match o.strategy {
            Strategy::LocalSearch => "orders",
            Strategy::RandomSample => "cases",
        };
        if let Some(budget) = o.case_budget {
            writeln!(
                f,
                "Done {} of {} cases ({})",
                group_thousands(o.total_evaluations),
                group_thousands(budget),
                percent(o.total_evaluations as f64 / budget as f64)
            )?;
        } else {
            writeln!(f, "Evaluations: {}", group_thousands(o.total_evaluations))?;
        }

        match o.throughput() {
            Some(rate) => writeln!(
                f,
                "Rate: {} {unit} per second",
                group_thousands(rate.round() as u64)
            )?,
            None => writeln!(f, "Rate: Undefined")?,
        }
        writeln!(f, "Time: {:.2} seconds", o.elapsed.as_secs_f64())?;
        write!(
            f,
            "Workers: {} of {} completed",
            o.workers_completed, o.workers_spawned
        )
    }
}
