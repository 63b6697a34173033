//! Process log adapters.
//!
//! - [`RingProcessLog`]: fixed-capacity ring of the most recent rows,
//!   constant-time append, oldest row evicted when full.
//! - [`CsvProcessLog`]: streams rows to any `std::io::Write` as CSV.
//!
//! Both use the same column layout:
//!
//! ```text
//! timestamp_ms,phase,top,bottom,ir,external,out_top,out_bottom,out_ir,autotune
//! ```

use core::fmt::{self, Write as _};
use std::io;

use heapless::Deque;
use log::warn;

use crate::app::events::LogRow;
use crate::app::ports::ProcessLog;

pub const CSV_HEADER: &str =
    "timestamp_ms,phase,top,bottom,ir,external,out_top,out_bottom,out_ir,autotune";

/// Format one row (without trailing newline).
pub fn write_csv_row(out: &mut impl fmt::Write, row: &LogRow) -> fmt::Result {
    let [top, bottom, ir, external] = row.temps;
    let [out_top, out_bottom, out_ir] = row.outputs;
    write!(
        out,
        "{},{},{:.2},{:.2},{:.2},{:.2},{:.1},{:.1},{:.1},{}",
        row.timestamp_ms,
        row.phase,
        top,
        bottom,
        ir,
        external,
        out_top,
        out_bottom,
        out_ir,
        u8::from(row.autotune)
    )
}

// ───────────────────────────────────────────────────────────────
// RingProcessLog
// ───────────────────────────────────────────────────────────────

pub struct RingProcessLog<const N: usize> {
    rows: Deque<LogRow, N>,
    evicted: u64,
}

impl<const N: usize> RingProcessLog<N> {
    pub fn new() -> Self {
        Self {
            rows: Deque::new(),
            evicted: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows dropped to make room since creation.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    /// Oldest to newest.
    pub fn rows(&self) -> impl Iterator<Item = &LogRow> {
        self.rows.iter()
    }

    pub fn latest(&self) -> Option<&LogRow> {
        self.rows.back()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Export everything held, header first.
    pub fn write_csv(&self, out: &mut impl fmt::Write) -> fmt::Result {
        writeln!(out, "{CSV_HEADER}")?;
        for row in &self.rows {
            write_csv_row(out, row)?;
            out.write_char('\n')?;
        }
        Ok(())
    }

    pub fn to_csv(&self) -> String {
        let mut s = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_csv(&mut s);
        s
    }
}

impl<const N: usize> Default for RingProcessLog<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ProcessLog for RingProcessLog<N> {
    fn append_row(&mut self, row: &LogRow) {
        if self.rows.is_full() {
            self.rows.pop_front();
            self.evicted += 1;
        }
        // Cannot fail after the eviction above.
        let _ = self.rows.push_back(row.clone());
    }
}

// ───────────────────────────────────────────────────────────────
// CsvProcessLog
// ───────────────────────────────────────────────────────────────

/// Streams rows as CSV.  Write errors are logged once and further rows
/// are discarded; the control loop never sees them.
pub struct CsvProcessLog<W: io::Write> {
    out: W,
    line: String,
    failed: bool,
    rows: u64,
}

impl<W: io::Write> CsvProcessLog<W> {
    /// Wrap `out` and write the header line.
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{CSV_HEADER}")?;
        Ok(Self {
            out,
            line: String::with_capacity(96),
            failed: false,
            rows: 0,
        })
    }

    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: io::Write> ProcessLog for CsvProcessLog<W> {
    fn append_row(&mut self, row: &LogRow) {
        if self.failed {
            return;
        }
        self.line.clear();
        let _ = write_csv_row(&mut self.line, row);
        self.line.push('\n');
        match self.out.write_all(self.line.as_bytes()) {
            Ok(()) => self.rows += 1,
            Err(e) => {
                warn!("process log: write failed ({e}), logging stopped");
                self.failed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::bounded;

    fn row(t: u64) -> LogRow {
        LogRow {
            timestamp_ms: t,
            phase: bounded("Soak"),
            temps: [180.0, 179.5, 175.25, 150.0],
            outputs: [42.0, 30.5, 0.0],
            autotune: false,
        }
    }

    #[test]
    fn ring_evicts_oldest() {
        let mut log = RingProcessLog::<3>::new();
        for t in 0..5 {
            log.append_row(&row(t * 200));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.evicted(), 2);
        assert_eq!(log.rows().next().unwrap().timestamp_ms, 400);
        assert_eq!(log.latest().unwrap().timestamp_ms, 800);
    }

    #[test]
    fn csv_layout() {
        let mut log = RingProcessLog::<4>::new();
        log.append_row(&row(200));
        let csv = log.to_csv();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some("200,Soak,180.00,179.50,175.25,150.00,42.0,30.5,0.0,0")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn csv_stream_matches_ring_export() {
        let mut ring = RingProcessLog::<4>::new();
        let mut stream = CsvProcessLog::new(Vec::new()).unwrap();
        for t in [0, 200] {
            ring.append_row(&row(t));
            stream.append_row(&row(t));
        }
        assert_eq!(stream.rows_written(), 2);
        let bytes = stream.into_inner();
        assert_eq!(String::from_utf8(bytes).unwrap(), ring.to_csv());
    }
}
