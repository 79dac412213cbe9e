//! Per-step diagnostics. Purely observational: sinks never influence the
//! search.

use crate::warning;
use facet::Facet;
use std::io::Write;

/// What happened in one `step()` of the search.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    /// 1-based step number.
    pub step: u64,
    /// Sequence id of the state popped in this step.
    pub state: u64,
    /// Its cost.
    pub cost: u64,
    /// Its retained-relation count.
    pub retained: u32,
    /// Its matched-node count.
    pub matched: u32,
    /// Frontier size before the pop.
    pub frontier: usize,
}

/// Receives one [`StepRecord`] per search step.
pub trait TraceSink {
    /// Observe a step.
    fn record(&mut self, record: &StepRecord);
}

impl<F: FnMut(&StepRecord)> TraceSink for F {
    fn record(&mut self, record: &StepRecord) {
        self(record)
    }
}

impl TraceSink for Vec<StepRecord> {
    fn record(&mut self, record: &StepRecord) {
        self.push(record.clone());
    }
}

/// Writes each record as one JSON object per line.
///
/// The first write error is logged and disables the sink; the search itself
/// carries on.
pub struct JsonLinesTrace<W: Write> {
    out: W,
    broken: bool,
}

impl<W: Write> JsonLinesTrace<W> {
    /// Wrap a writer.
    pub fn new(out: W) -> Self {
        Self { out, broken: false }
    }

    /// Whether a write failed.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Flush and return the writer.
    pub fn into_inner(mut self) -> W {
        if self.out.flush().is_err() {
            self.broken = true;
        }
        self.out
    }
}

impl<W: Write> TraceSink for JsonLinesTrace<W> {
    fn record(&mut self, record: &StepRecord) {
        if self.broken {
            return;
        }
        let line = match facet_json::to_string(record) {
            Ok(line) => line,
            Err(_e) => {
                warning!(error = ?_e, "cannot serialize step record, disabling trace");
                self.broken = true;
                return;
            }
        };
        if let Err(_e) = writeln!(self.out, "{line}") {
            warning!(error = %_e, "trace write failed, disabling trace");
            self.broken = true;
        }
    }
}
