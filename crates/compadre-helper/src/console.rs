//! Stdout that survives its reader going away.
//!
//! The calling pipeline reads the ready banner from stdout and may close the
//! pipe at any point. The first write that hits a closed pipe swaps the
//! stream for a discard sink so nothing later (including the flush at exit)
//! can fail on it again.

use std::io::{self, Write};

/// Outcome of a line written through [`SafeStdout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Printed {
    Written,
    /// The reader is gone; this and all later output is discarded.
    PipeClosed,
}

pub struct SafeStdout {
    inner: Box<dyn Write + Send>,
    closed: bool,
}

impl SafeStdout {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(inner: Box<dyn Write + Send>) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    /// Write one line and flush it.
    pub fn println(&mut self, line: &str) -> io::Result<Printed> {
        if self.closed {
            return Ok(Printed::PipeClosed);
        }

        match writeln!(self.inner, "{line}").and_then(|_| self.inner.flush()) {
            Ok(()) => Ok(Printed::Written),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                self.inner = Box::new(io::sink());
                self.closed = true;
                Ok(Printed::PipeClosed)
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
