//! The `branches.txt` control-flow report.
//!
//! Lines are appended in module iteration order as S2 and S3 run, giving a
//! deterministic byte-identical report across runs on the same input (P6).

use std::io::{self, Write};

/// Source location rendered into a block's report line, or `UNKNOWN` when no
/// debug info is attached to the terminator.
pub enum Location {
    Known { file: String, line: u32 },
    Unknown,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Known { file, line } => write!(f, "{file}:{line}"),
            Location::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Sequential writer over the edge report.
///
/// Wraps any `io::Write` sink rather than a concrete file handle: the CLI
/// hands it an opened `File` (truncated, per `spec` §6), tests hand it an
/// in-memory `Vec<u8>`.
pub struct ReportWriter<W: Write> {
    sink: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// `@@@ <function>, branch id: <id>| loc <location>`
    pub fn block_line(&mut self, function: &str, id: u32, location: &Location) -> io::Result<()> {
        writeln!(self.sink, "@@@ {function}, branch id: {id}| loc {location}")
    }

    /// `@@@ edge id (<pred>,<succ>), cond type <mnemonic>, <polarity>`
    pub fn edge_line(
        &mut self,
        pred_id: u32,
        succ_id: u32,
        mnemonic: &str,
        taken: bool,
    ) -> io::Result<()> {
        let polarity = if taken { "true" } else { "false" };
        writeln!(
            self.sink,
            "@@@ edge id ({pred_id},{succ_id}), cond type {mnemonic}, {polarity}"
        )
    }

    /// A free-form diagnostic line, written immediately before a fatal error
    /// is returned (`spec` §7: "writes a diagnostic line to the report, then
    /// aborts").
    pub fn diagnostic(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.sink, "{message}")
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn block_line_known_location() {
        let mut w = ReportWriter::new(Vec::new());
        w.block_line(
            "main",
            3,
            &Location::Known {
                file: "harness.c".into(),
                line: 12,
            },
        )
        .unwrap();
        let out = String::from_utf8(w.into_inner()).unwrap();
        assert_eq!(out, "@@@ main, branch id: 3| loc harness.c:12\n");
    }

    #[test]
    fn block_line_unknown_location() {
        let mut w = ReportWriter::new(Vec::new());
        w.block_line("main", 0, &Location::Unknown).unwrap();
        let out = String::from_utf8(w.into_inner()).unwrap();
        assert_eq!(out, "@@@ main, branch id: 0| loc UNKNOWN\n");
    }

    #[test]
    fn edge_line_pair() {
        let mut w = ReportWriter::new(Vec::new());
        w.edge_line(1, 2, "ICMP_SLT", true).unwrap();
        w.edge_line(1, 3, "ICMP_SGE", false).unwrap();
        let out = String::from_utf8(w.into_inner()).unwrap();
        assert_eq!(
            out,
            "@@@ edge id (1,2), cond type ICMP_SLT, true\n@@@ edge id (1,3), cond type ICMP_SGE, false\n"
        );
    }
}
