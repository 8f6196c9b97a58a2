//! Page timer scheduling
//!
//! Page scripts never read the wall clock directly; they schedule callbacks
//! through a [`Scheduler`]. The scheduler runs on real elapsed time until a
//! simulated clock is installed, after which time only moves when
//! [`Scheduler::advance`] is called.

use std::time::Instant;

use tracing::trace;

use crate::common::{Error, Result};
use crate::dom::Document;

/// Deferred page work, run against the page's document
pub type TimerCallback = Box<dyn FnOnce(&mut Document) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct TimerId(u64);

#[derive(Debug, Clone, Copy)]
enum TimeSource {
    Real { origin: Instant },
    Simulated { now_ms: u64 },
}

struct Timer {
    id: TimerId,
    due_at: u64,
    callback: TimerCallback,
}

pub struct Scheduler {
    source: TimeSource,
    timers: Vec<Timer>,
    next_id: u64,
}

impl Scheduler {
    /// Scheduler driven by wall-clock time since page load
    pub fn real() -> Self {
        Self::with_source(TimeSource::Real {
            origin: Instant::now(),
        })
    }

    /// Scheduler driven by a simulated clock starting at 0
    pub fn simulated() -> Self {
        Self::simulated_at(0)
    }

    /// Simulated clock already advanced to `now_ms`
    pub fn simulated_at(now_ms: u64) -> Self {
        Self::with_source(TimeSource::Simulated { now_ms })
    }

    fn with_source(source: TimeSource) -> Self {
        Self {
            source,
            timers: Vec::new(),
            next_id: 1,
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.source, TimeSource::Simulated { .. })
    }

    /// Milliseconds since page load (real) or since install (simulated)
    pub fn now_ms(&self) -> u64 {
        match self.source {
            TimeSource::Real { origin } => origin.elapsed().as_millis() as u64,
            TimeSource::Simulated { now_ms } => now_ms,
        }
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Run `callback` once `delay_ms` has elapsed
    pub fn set_timeout(&mut self, delay_ms: u64, callback: TimerCallback) {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let due_at = self.now_ms().saturating_add(delay_ms);
        trace!(timer = id.0, due_at, "timer scheduled");
        self.timers.push(Timer {
            id,
            due_at,
            callback,
        });
    }

    /// Switch to simulated time
    ///
    /// Timers already scheduled against the wall clock cannot be moved onto
    /// virtual time, so installing with pending timers is rejected.
    pub fn install_simulated(&mut self) -> Result<()> {
        if self.is_simulated() {
            return Ok(());
        }
        if self.pending() > 0 {
            return Err(Error::invalid_state(
                "install the simulated clock",
                format!("already running {} page timer(s)", self.pending()),
            ));
        }
        self.source = TimeSource::Simulated { now_ms: 0 };
        Ok(())
    }

    /// Advance simulated time and run every callback due at or before it
    pub fn advance(&mut self, delta_ms: u64, doc: &mut Document) -> Result<usize> {
        let TimeSource::Simulated { now_ms } = &mut self.source else {
            return Err(Error::ClockNotInstalled);
        };
        let from = *now_ms;
        *now_ms = now_ms.saturating_add(delta_ms);
        let ran = self.run_due(doc);
        trace!(from, to = self.now_ms(), ran, "clock advanced");
        Ok(ran)
    }

    /// Run callbacks whose due time has passed, earliest first
    pub fn run_due(&mut self, doc: &mut Document) -> usize {
        let now = self.now_ms();
        let mut ran = 0;
        while let Some(index) = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_at <= now)
            .min_by_key(|(_, t)| (t.due_at, t.id))
            .map(|(i, _)| i)
        {
            let timer = self.timers.remove(index);
            trace!(timer = timer.id.0, due_at = timer.due_at, "timer fired");
            (timer.callback)(doc);
            ran += 1;
        }
        ran
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("simulated", &self.is_simulated())
            .field("now_ms", &self.now_ms())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_marker() -> Document {
        let mut doc = Document::new("t");
        let body = doc.body();
        doc.append_element(body, "span", &[("id", "banner")]);
        doc
    }

    fn hide_banner() -> TimerCallback {
        Box::new(|doc: &mut Document| {
            if let Some(id) = doc.get_element_by_id("banner") {
                if let Some(el) = doc.element_mut(id) {
                    el.set_hidden(true);
                }
            }
        })
    }

    fn banner_hidden(doc: &Document) -> bool {
        let id = doc.get_element_by_id("banner").unwrap();
        doc.element(id).unwrap().is_hidden()
    }

    #[test]
    fn test_advance_runs_callbacks_at_exact_due_time() {
        let mut doc = doc_with_marker();
        let mut scheduler = Scheduler::simulated();
        scheduler.set_timeout(3000, hide_banner());

        assert_eq!(scheduler.advance(2999, &mut doc).unwrap(), 0);
        assert!(!banner_hidden(&doc));

        assert_eq!(scheduler.advance(1, &mut doc).unwrap(), 1);
        assert!(banner_hidden(&doc));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_advance_requires_simulated_clock() {
        let mut doc = doc_with_marker();
        let mut scheduler = Scheduler::real();
        assert!(matches!(
            scheduler.advance(10, &mut doc),
            Err(Error::ClockNotInstalled)
        ));
    }

    #[test]
    fn test_install_rejected_once_real_timers_are_pending() {
        let mut scheduler = Scheduler::real();
        scheduler.set_timeout(3000, hide_banner());
        assert!(matches!(
            scheduler.install_simulated(),
            Err(Error::InvalidState { .. })
        ));

        let mut fresh = Scheduler::real();
        fresh.install_simulated().unwrap();
        assert!(fresh.is_simulated());
        assert_eq!(fresh.now_ms(), 0);
    }

    #[test]
    fn test_simulated_at_schedules_from_current_time() {
        let mut doc = doc_with_marker();
        let mut scheduler = Scheduler::simulated_at(500);
        assert_eq!(scheduler.now_ms(), 500);
        scheduler.set_timeout(100, hide_banner());
        assert_eq!(scheduler.advance(99, &mut doc).unwrap(), 0);
        assert_eq!(scheduler.advance(1, &mut doc).unwrap(), 1);
        assert!(banner_hidden(&doc));
    }

    #[test]
    fn test_real_clock_fires_after_elapsed_time() {
        let mut doc = doc_with_marker();
        let mut scheduler = Scheduler::real();
        scheduler.set_timeout(0, hide_banner());
        assert_eq!(scheduler.run_due(&mut doc), 1);
        assert!(banner_hidden(&doc));
    }
}
