//! Run-scoped bookkeeping. Counters and the timer live on the reporter,
//! constructed fresh per invocation; nothing here affects control flow.

use crate::utils::duration::format_elapsed;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct RunReporter {
    started: Instant,
    jobs: usize,
    written: usize,
    malformed: usize,
    render_failures: usize,
    write_failures: usize,
}

impl RunReporter {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            jobs: 0,
            written: 0,
            malformed: 0,
            render_failures: 0,
            write_failures: 0,
        }
    }

    /// Number of render jobs produced by extraction.
    pub fn set_jobs(&mut self, jobs: usize) {
        self.jobs = jobs;
    }

    pub fn record_written(&mut self) {
        self.written += 1;
    }

    pub fn record_malformed(&mut self) {
        self.malformed += 1;
    }

    pub fn record_render_failure(&mut self) {
        self.render_failures += 1;
    }

    pub fn record_write_failure(&mut self) {
        self.write_failures += 1;
    }

    pub fn finish(self) -> RunSummary {
        RunSummary {
            jobs: self.jobs,
            written: self.written,
            malformed: self.malformed,
            render_failures: self.render_failures,
            write_failures: self.write_failures,
            elapsed: self.started.elapsed(),
        }
    }
}

impl Default for RunReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Final accounting for one run: attempted vs. successful artifacts plus
/// wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub jobs: usize,
    pub written: usize,
    pub malformed: usize,
    pub render_failures: usize,
    pub write_failures: usize,
    pub elapsed: Duration,
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "done in {}: wrote {} of {} file{}",
            format_elapsed(self.elapsed),
            self.written,
            self.jobs,
            plural(self.jobs),
        )?;
        if self.render_failures > 0 {
            write!(
                f,
                ", {} render failure{}",
                self.render_failures,
                plural(self.render_failures)
            )?;
        }
        if self.write_failures > 0 {
            write!(
                f,
                ", {} write failure{}",
                self.write_failures,
                plural(self.write_failures)
            )?;
        }
        if self.malformed > 0 {
            write!(
                f,
                ", {} malformed entr{}",
                self.malformed,
                if self.malformed == 1 { "y" } else { "ies" }
            )?;
        }
        Ok(())
    }
}
