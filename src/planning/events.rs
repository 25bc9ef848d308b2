//! Planning lifecycle events.

use crossbeam_channel::{Receiver, Sender, unbounded};

/// Lifecycle event emitted by the planning coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathEvent {
    /// Fresh search started with nothing executing
    CalcStarted,
    /// Fresh search finished and is now the executing segment
    CalcFinishedNowExecuting,
    /// Fresh search produced nothing usable
    CalcFailed,
    /// Look-ahead search started from the current segment's end
    NextSegmentCalcStarted,
    /// Look-ahead search finished and is queued as the next segment
    NextSegmentCalcFinished,
    /// Look-ahead search produced nothing usable
    NextCalcFailed,
    /// Current segment ended and the queued one took over
    ContinuingOntoPlannedNext,
    /// Queued segment took over before the current one ended
    SplicingOntoNextEarly,
    AtGoal,
    /// Current segment ended while a search is still running
    PathFinishedNextStillCalculating,
    /// Queued segment no longer contains the agent and was dropped
    DiscardNext,
    Canceled,
}

/// Queue of events raised during a tick, fanned out to subscribers on
/// dispatch.
#[derive(Debug, Default)]
pub struct EventBus {
    pending: Vec<PathEvent>,
    subscribers: Vec<Sender<PathEvent>>,
    calc_failed_last_tick: bool,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// New listener; receives every event dispatched after this call
    pub fn subscribe(&mut self) -> Receiver<PathEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Queue an event for the next dispatch
    pub fn queue(&mut self, event: PathEvent) {
        self.pending.push(event);
    }

    /// Events queued since the last dispatch
    pub fn pending(&self) -> &[PathEvent] {
        &self.pending
    }

    /// Deliver queued events in emission order.
    ///
    /// Subscribers whose receiver was dropped are forgotten.
    pub fn dispatch(&mut self) -> usize {
        let events = std::mem::take(&mut self.pending);
        self.calc_failed_last_tick = events.contains(&PathEvent::CalcFailed);
        if events.is_empty() {
            return 0;
        }
        self.subscribers
            .retain(|tx| events.iter().all(|&event| tx.send(event).is_ok()));
        events.len()
    }

    /// Whether the last dispatch included [`PathEvent::CalcFailed`]
    pub fn calc_failed_last_tick(&self) -> bool {
        self.calc_failed_last_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_preserves_order() {
        let mut bus = EventBus::new();
        let rx = bus.subscribe();
        bus.queue(PathEvent::CalcStarted);
        bus.queue(PathEvent::CalcFinishedNowExecuting);
        bus.queue(PathEvent::AtGoal);
        assert_eq!(bus.dispatch(), 3);
        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            got,
            vec![
                PathEvent::CalcStarted,
                PathEvent::CalcFinishedNowExecuting,
                PathEvent::AtGoal
            ]
        );
        assert!(bus.pending().is_empty());
    }

    #[test]
    fn test_calc_failed_flag_tracks_last_dispatch() {
        let mut bus = EventBus::new();
        bus.queue(PathEvent::CalcFailed);
        bus.dispatch();
        assert!(bus.calc_failed_last_tick());
        bus.dispatch();
        assert!(!bus.calc_failed_last_tick());
    }

    #[test]
    fn test_dropped_subscriber_is_removed() {
        let mut bus = EventBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        bus.queue(PathEvent::Canceled);
        bus.dispatch();
        assert_eq!(bus.subscribers.len(), 1);
        assert_eq!(keep.try_recv(), Ok(PathEvent::Canceled));
    }
}
