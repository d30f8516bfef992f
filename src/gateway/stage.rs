//! Per-request pipeline stages.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Matched,
    CacheHit,
    CacheMiss,
    Dispatching,
    Succeeded,
    Faulted,
    Responded,
}

impl Stage {
    pub fn can_advance_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Received, Matched)
                | (Received, Responded)
                | (Matched, CacheHit)
                | (Matched, CacheMiss)
                | (Matched, Dispatching)
                | (CacheHit, Responded)
                | (CacheMiss, Dispatching)
                | (Dispatching, Succeeded)
                | (Dispatching, Faulted)
                | (Succeeded, Responded)
                | (Faulted, Responded)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Matched => "matched",
            Stage::CacheHit => "cache_hit",
            Stage::CacheMiss => "cache_miss",
            Stage::Dispatching => "dispatching",
            Stage::Succeeded => "succeeded",
            Stage::Faulted => "faulted",
            Stage::Responded => "responded",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks and traces the stage of one request.
#[derive(Debug)]
pub struct StageTracker<'a> {
    request_id: &'a str,
    current: Stage,
}

impl<'a> StageTracker<'a> {
    pub fn new(request_id: &'a str) -> Self {
        tracing::trace!(request_id, stage = %Stage::Received, "Pipeline stage");
        Self {
            request_id,
            current: Stage::Received,
        }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    pub fn advance(&mut self, next: Stage) {
        debug_assert!(
            self.current.can_advance_to(next),
            "invalid stage transition {} -> {}",
            self.current,
            next
        );
        tracing::trace!(request_id = self.request_id, from = %self.current, stage = %next, "Pipeline stage");
        self.current = next;
    }

    pub fn is_terminal(&self) -> bool {
        self.current == Stage::Responded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responded_is_terminal() {
        let all = [
            Stage::Received,
            Stage::Matched,
            Stage::CacheHit,
            Stage::CacheMiss,
            Stage::Dispatching,
            Stage::Succeeded,
            Stage::Faulted,
            Stage::Responded,
        ];
        for next in all {
            assert!(!Stage::Responded.can_advance_to(next));
        }
    }

    #[test]
    fn cache_hit_skips_dispatch() {
        assert!(Stage::CacheHit.can_advance_to(Stage::Responded));
        assert!(!Stage::CacheHit.can_advance_to(Stage::Dispatching));
        assert!(!Stage::Received.can_advance_to(Stage::Dispatching));
    }

    #[test]
    fn tracker_walks_the_miss_path() {
        let mut tracker = StageTracker::new("req-1");
        for stage in [
            Stage::Matched,
            Stage::CacheMiss,
            Stage::Dispatching,
            Stage::Faulted,
            Stage::Responded,
        ] {
            tracker.advance(stage);
        }
        assert!(tracker.is_terminal());
    }
}
