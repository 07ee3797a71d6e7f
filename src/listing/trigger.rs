// Infinite-scroll trigger bound to the tail item of a listing

// Whether the listing can accept a next-page request right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerGate {
    pub is_fetching: bool,
    pub has_more: bool,
}

impl TriggerGate {
    fn is_open(self) -> bool {
        !self.is_fetching && self.has_more
    }
}

// Fires at most once each time the observed tail item enters the viewport
#[derive(Debug, Default)]
pub struct ProximityTrigger {
    observed: Option<i64>,
    inside: bool,
}

impl ProximityTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    // A different target drops the old observation; the same target keeps its state
    pub fn observe(&mut self, tail: Option<i64>) {
        if self.observed != tail {
            if let Some(previous) = self.observed {
                tracing::trace!(previous, next = ?tail, "Proximity trigger re-targeted");
            }
            self.observed = tail;
            self.inside = false;
        }
    }

    pub fn observed(&self) -> Option<i64> {
        self.observed
    }

    pub fn on_intersection(
        &mut self,
        target: i64,
        intersecting: bool,
        gate: TriggerGate,
    ) -> bool {
        if self.observed != Some(target) {
            return false;
        }
        if !intersecting {
            self.inside = false;
            return false;
        }
        if self.inside {
            return false;
        }
        self.inside = true;
        gate.is_open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: TriggerGate = TriggerGate { is_fetching: false, has_more: true };

    #[test]
    fn fires_once_per_entry() {
        let mut trigger = ProximityTrigger::new();
        trigger.observe(Some(12));
        assert!(trigger.on_intersection(12, true, OPEN));
        assert!(!trigger.on_intersection(12, true, OPEN));
        assert!(!trigger.on_intersection(12, false, OPEN));
        assert!(trigger.on_intersection(12, true, OPEN));
    }

    #[test]
    fn ignores_targets_other_than_tail() {
        let mut trigger = ProximityTrigger::new();
        trigger.observe(Some(12));
        assert!(!trigger.on_intersection(11, true, OPEN));
    }

    #[test]
    fn retargets_when_tail_changes() {
        let mut trigger = ProximityTrigger::new();
        trigger.observe(Some(12));
        assert!(trigger.on_intersection(12, true, OPEN));

        trigger.observe(Some(24));
        assert_eq!(trigger.observed(), Some(24));
        assert!(!trigger.on_intersection(12, true, OPEN), "old tail is disconnected");
        assert!(trigger.on_intersection(24, true, OPEN));
    }

    #[test]
    fn inert_while_fetching_or_exhausted() {
        let mut trigger = ProximityTrigger::new();
        trigger.observe(Some(5));
        let fetching = TriggerGate { is_fetching: true, has_more: true };
        assert!(!trigger.on_intersection(5, true, fetching));

        let exhausted = TriggerGate { is_fetching: false, has_more: false };
        trigger.on_intersection(5, false, exhausted);
        assert!(!trigger.on_intersection(5, true, exhausted));
    }

    #[test]
    fn empty_listing_observes_nothing() {
        let mut trigger = ProximityTrigger::new();
        trigger.observe(None);
        assert!(!trigger.on_intersection(1, true, OPEN));
    }
}
