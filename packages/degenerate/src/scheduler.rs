//! Frame scheduler: the suspension contract between a script run and the
//! host's display loop.
//!
//! A run that calls `frame()` hands the scheduler a [`Continuation`] and blocks
//! until it is resolved. Each host `frame` tick resolves every pending
//! continuation in the order they were queued, clears the queue, and then
//! advances the clock. Continuations belonging to a run that has been
//! superseded are rejected, never resolved.

use std::collections::VecDeque;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::time::Instant;

use crate::clock::Clock;

/// Identifies one script run. Increases with every `script` message.
pub type RunId = u64;

/// How a suspended run is woken up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    /// A frame tick arrived; carry on.
    Frame,
    /// The run was superseded; unwind.
    Cancelled,
}

/// A suspended run waiting for the next frame.
#[derive(Debug)]
pub struct Continuation {
    run: RunId,
    wake: SyncSender<Resume>,
}

impl Continuation {
    /// Create a continuation for `run` and the receiver the run blocks on.
    pub fn new(run: RunId) -> (Self, Receiver<Resume>) {
        let (wake, wait) = sync_channel(1);
        (Self { run, wake }, wait)
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    fn resolve(self) {
        // The run may already be gone; nothing to wake then.
        let _ = self.wake.send(Resume::Frame);
    }

    fn reject(self) {
        let _ = self.wake.send(Resume::Cancelled);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running(RunId),
}

#[derive(Debug)]
pub struct FrameScheduler {
    state: SchedulerState,
    pending: VecDeque<Continuation>,
    ticks: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            pending: VecDeque::new(),
            ticks: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Frame ticks delivered since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Switch to `run`. Anything still queued belongs to an older run and is
    /// rejected. Returns how many continuations were rejected.
    pub fn begin(&mut self, run: RunId) -> usize {
        let rejected = self.reject_all();
        self.state = SchedulerState::Running(run);
        rejected
    }

    /// The current run finished.
    pub fn end(&mut self) {
        self.reject_all();
        self.state = SchedulerState::Idle;
    }

    /// Queue a continuation. Continuations from any run other than the
    /// current one are rejected on the spot.
    pub fn suspend(&mut self, continuation: Continuation) {
        match self.state {
            SchedulerState::Running(run) if run == continuation.run => {
                self.pending.push_back(continuation);
            }
            _ => {
                log::debug!(
                    "rejecting continuation from stale run {}",
                    continuation.run
                );
                continuation.reject();
            }
        }
    }

    /// Deliver a frame tick: resolve pending continuations FIFO, clear the
    /// queue, then advance `clock`. Returns how many were resolved.
    ///
    /// Callers hold the clock lock for the whole call so a resumed run cannot
    /// read the clock before it has been advanced.
    pub fn tick(&mut self, clock: &mut Clock, now: Instant) -> usize {
        let mut resolved = 0;
        while let Some(continuation) = self.pending.pop_front() {
            continuation.resolve();
            resolved += 1;
        }
        clock.tick(now);
        self.ticks += 1;
        resolved
    }

    fn reject_all(&mut self) -> usize {
        let count = self.pending.len();
        for continuation in self.pending.drain(..) {
            continuation.reject();
        }
        count
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_tick_resolves_in_order() {
        let mut scheduler = FrameScheduler::new();
        scheduler.begin(1);
        let (a, wait_a) = Continuation::new(1);
        let (b, wait_b) = Continuation::new(1);
        scheduler.suspend(a);
        scheduler.suspend(b);
        assert_eq!(scheduler.pending(), 2);

        let mut clock = Clock::default();
        assert_eq!(scheduler.tick(&mut clock, Instant::now()), 2);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(wait_a.try_recv(), Ok(Resume::Frame));
        assert_eq!(wait_b.try_recv(), Ok(Resume::Frame));
        assert!(clock.last_frame().is_some());
    }

    #[test]
    fn test_nothing_resolves_without_tick() {
        let mut scheduler = FrameScheduler::new();
        scheduler.begin(1);
        let (a, wait) = Continuation::new(1);
        scheduler.suspend(a);
        assert!(wait.try_recv().is_err());
    }

    #[test]
    fn test_new_run_rejects_old_continuations() {
        let mut scheduler = FrameScheduler::new();
        scheduler.begin(1);
        let (a, wait) = Continuation::new(1);
        scheduler.suspend(a);

        assert_eq!(scheduler.begin(2), 1);
        assert_eq!(wait.try_recv(), Ok(Resume::Cancelled));

        let mut clock = Clock::default();
        assert_eq!(scheduler.tick(&mut clock, Instant::now()), 0);
    }

    #[test]
    fn test_stale_continuation_rejected_on_arrival() {
        let mut scheduler = FrameScheduler::new();
        scheduler.begin(2);
        let (stale, wait) = Continuation::new(1);
        scheduler.suspend(stale);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(wait.try_recv(), Ok(Resume::Cancelled));
    }

    #[test]
    fn test_clock_updated_after_resolve() {
        let start = Instant::now();
        let mut clock = Clock::new(start);
        let mut scheduler = FrameScheduler::new();
        scheduler.begin(1);
        scheduler.tick(&mut clock, start + Duration::from_millis(10));
        scheduler.tick(&mut clock, start + Duration::from_millis(30));
        assert_eq!(clock.delta(), Duration::from_millis(20));
        assert_eq!(scheduler.ticks(), 2);
    }

    #[test]
    fn test_end_goes_idle() {
        let mut scheduler = FrameScheduler::new();
        scheduler.begin(4);
        assert_eq!(scheduler.state(), SchedulerState::Running(4));
        scheduler.end();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }
}
