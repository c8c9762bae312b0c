//! Stdout writes that survive a closed pipe.

use std::io::{self, ErrorKind, Write};

/// Writes `lines` to `out`. A closed reader ends the output quietly.
pub fn write_lines<W: Write>(out: &mut W, lines: &[String]) -> io::Result<()> {
    let res = lines
        .iter()
        .try_for_each(|line| writeln!(out, "{line}"))
        .and_then(|_| out.flush());
    match res {
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Prints report lines to stdout.
pub fn print_all(lines: &[String]) -> io::Result<()> {
    write_lines(&mut io::stdout().lock(), lines)
}

/// Writes one live line to stdout, flushing so piped readers see it at once.
///
/// Errors, including `BrokenPipe`, are returned so the caller can stop.
pub fn emit(text: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{text}")?;
    out.flush()
}
