// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use std::time::{Duration, Instant};

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Identifies one scheduled recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

#[derive(Debug)]
struct Pending<T> {
    ticket: Ticket,
    value: T,
    deadline: Instant,
}

/// Holds at most one pending value. Scheduling a new one supersedes the old,
/// so only the latest input ever fires.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    generation: u64,
    pending: Option<Pending<T>>,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_DEBOUNCE)
    }
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self, value: T) -> Ticket {
        self.schedule_at(value, Instant::now())
    }

    pub fn schedule_at(&mut self, value: T, now: Instant) -> Ticket {
        self.generation += 1;
        let ticket = Ticket(self.generation);
        self.pending = Some(Pending {
            ticket,
            value,
            deadline: now + self.delay,
        });
        ticket
    }

    /// For timer-driven callers: yields the value only if `ticket` is still the latest.
    pub fn fire(&mut self, ticket: Ticket) -> Option<T> {
        let latest = self.pending.as_ref().is_some_and(|p| p.ticket == ticket);
        if latest {
            self.pending.take().map(|p| p.value)
        } else {
            None
        }
    }

    /// For polling callers: yields the pending value once its quiet period has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self.pending.as_ref().is_some_and(|p| p.deadline <= now);
        if due {
            self.pending.take().map(|p| p.value)
        } else {
            None
        }
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_supersedes() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let first = debouncer.schedule("b".to_string());
        let second = debouncer.schedule("be".to_string());

        assert_eq!(debouncer.fire(first), None);
        assert_eq!(debouncer.fire(second), Some("be".to_string()));
        assert_eq!(debouncer.fire(second), None);
    }

    #[test]
    fn test_poll_waits_for_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.schedule_at("bei", start);
        assert_eq!(debouncer.poll(start + Duration::from_millis(100)), None);

        debouncer.schedule_at("beij", start + Duration::from_millis(200));
        assert_eq!(debouncer.poll(start + Duration::from_millis(400)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(500)),
            Some("beij")
        );
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_cancel() {
        let mut debouncer = Debouncer::<u32>::default();
        assert_eq!(debouncer.delay(), DEFAULT_SEARCH_DEBOUNCE);
        let ticket = debouncer.schedule(1);
        assert_eq!(debouncer.cancel(), Some(1));
        assert_eq!(debouncer.fire(ticket), None);
    }
}
