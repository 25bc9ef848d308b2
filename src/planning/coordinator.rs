//! Planning coordinator.
//!
//! Owns the executing segment, the queued look-ahead segment and at most
//! one background search. The coordinator lives on the tick thread; search
//! threads never touch it and only send a [`SearchReport`] back, which is
//! installed at the start of the next tick (or by [`PlanningCoordinator::await_search`]).

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{debug, info, warn};

use super::events::{EventBus, PathEvent};
use super::executor::{Actuator, Executor};
use super::worker::{SearchReport, spawn_search};
use crate::config::MargaConfig;
use crate::core::Cell;
use crate::error::{PlanningError, SearchError};
use crate::goal::Goal;
use crate::movement::MoveModel;
use crate::search::{SearchEngine, SearchHandle};

/// Keeps an agent moving toward its goal, one segment at a time.
pub struct PlanningCoordinator<A: Actuator> {
    config: MargaConfig,
    model: Arc<dyn MoveModel>,
    actuator: A,
    goal: Option<Goal>,

    current: Option<A::Executor>,
    next: Option<A::Executor>,
    in_progress: Option<SearchHandle>,

    reports_tx: Sender<SearchReport>,
    reports_rx: Receiver<SearchReport>,
    events: EventBus,
    last_search_error: Option<SearchError>,

    expected_segment_start: Cell,
    safe_to_cancel: bool,
    pause_requested: bool,
    unpaused_last_tick: bool,
    paused_this_tick: bool,
    cancel_requested: bool,

    // ETA bookkeeping
    ticks_elapsed: u64,
    eta_start: Option<Cell>,
}

impl<A: Actuator> PlanningCoordinator<A> {
    pub fn new(config: MargaConfig, model: Arc<dyn MoveModel>, actuator: A) -> Self {
        let (reports_tx, reports_rx) = unbounded();
        let expected_segment_start = actuator.segment_start();
        Self {
            config,
            model,
            actuator,
            goal: None,
            current: None,
            next: None,
            in_progress: None,
            reports_tx,
            reports_rx,
            events: EventBus::new(),
            last_search_error: None,
            expected_segment_start,
            safe_to_cancel: true,
            pause_requested: false,
            unpaused_last_tick: false,
            paused_this_tick: false,
            cancel_requested: false,
            ticks_elapsed: 0,
            eta_start: None,
        }
    }

    /// Listen for lifecycle events
    pub fn subscribe(&mut self) -> Receiver<PathEvent> {
        self.events.subscribe()
    }

    /// Deliver queued events to subscribers
    pub fn dispatch_events(&mut self) -> usize {
        self.events.dispatch()
    }

    /// Run one tick.
    pub fn tick(&mut self) -> Result<(), PlanningError> {
        self.dispatch_events();
        self.expected_segment_start = self.actuator.segment_start();
        self.drain_reports();
        let result = self.tick_path();
        self.ticks_elapsed += 1;
        self.dispatch_events();
        result
    }

    fn tick_path(&mut self) -> Result<(), PlanningError> {
        self.paused_this_tick = false;
        if self.pause_requested && self.safe_to_cancel {
            self.pause_requested = false;
            if self.unpaused_last_tick {
                self.actuator.release_controls();
            }
            self.unpaused_last_tick = false;
            self.paused_this_tick = true;
            return Ok(());
        }
        self.unpaused_last_tick = true;
        if self.cancel_requested {
            self.cancel_requested = false;
            self.actuator.release_controls();
        }

        self.cancel_stale_search();

        let Some(current) = self.current.as_mut() else {
            return Ok(());
        };
        self.safe_to_cancel = current.advance_one_step();

        if current.has_failed() || current.has_finished() {
            self.current = None;
            return self.on_segment_ended();
        }

        // current is still executing
        if self.safe_to_cancel
            && let (Some(current), Some(next)) = (self.current.as_ref(), self.next.as_mut())
            && current.can_splice_early(next)
        {
            debug!("[Planner] splicing into planned next path early");
            self.events.queue(PathEvent::SplicingOntoNextEarly);
            self.current = self.next.take();
            self.advance_current();
            return Ok(());
        }

        if self.config.planning.splice_path
            && let Some(current) = self.current.take()
        {
            self.current = Some(current.try_splice(self.next.as_ref()));
        }
        if let (Some(current), Some(next)) = (self.current.as_ref(), self.next.as_ref())
            && current.path().dest() == next.path().dest()
        {
            self.next = None;
        }

        if self.in_progress.is_some() || self.next.is_some() {
            return Ok(());
        }
        let Some(current) = self.current.as_ref() else {
            return Ok(());
        };
        let Some(goal) = self.goal.as_ref() else {
            return Ok(());
        };
        let dest = current.path().dest();
        if goal.is_in_goal(dest) {
            return Ok(());
        }
        if current.ticks_remaining() < self.config.planning.planning_tick_lookahead {
            debug!("[Planner] path almost over, planning ahead from {}", dest);
            self.events.queue(PathEvent::NextSegmentCalcStarted);
            self.find_path_in_new_thread(dest, false)?;
        }
        Ok(())
    }

    /// `current` just failed or finished
    fn on_segment_ended(&mut self) -> Result<(), PlanningError> {
        let feet = self.actuator.position();
        if self.goal.as_ref().is_none_or(|g| g.is_in_goal(feet)) {
            info!("[Planner] all done, at {}", feet);
            self.events.queue(PathEvent::AtGoal);
            self.next = None;
            return Ok(());
        }

        if let Some(next) = self.next.as_ref() {
            let path = next.path();
            if !path.contains(feet) && !path.contains(self.expected_segment_start) {
                debug!("[Planner] discarding next path as it does not contain current position");
                self.events.queue(PathEvent::DiscardNext);
                self.next = None;
            }
        }
        if self.next.is_some() {
            debug!("[Planner] continuing on to planned next path");
            self.events.queue(PathEvent::ContinuingOntoPlannedNext);
            self.current = self.next.take();
            self.advance_current();
            return Ok(());
        }

        if self.in_progress.is_some() {
            self.events
                .queue(PathEvent::PathFinishedNextStillCalculating);
            return Ok(());
        }
        self.events.queue(PathEvent::CalcStarted);
        self.find_path_in_new_thread(self.expected_segment_start, true)
    }

    /// Don't waste a tick after a segment swap
    fn advance_current(&mut self) {
        if let Some(current) = self.current.as_mut() {
            self.safe_to_cancel = current.advance_one_step();
        }
    }

    /// Cancel a running search whose start no longer connects to where the
    /// agent is or is about to be.
    fn cancel_stale_search(&mut self) {
        let Some(handle) = self.in_progress.as_ref() else {
            return;
        };
        let calc_from = handle.start();
        let feet = self.actuator.position();
        let expected = self.expected_segment_start;

        let continues_current = self
            .current
            .as_ref()
            .is_some_and(|c| c.path().dest() == calc_from);
        if continues_current || calc_from == feet || calc_from == expected {
            return;
        }
        // Just after start the best path is empty, so calc_from is checked first
        if let Some(best) = handle.best_path_so_far()
            && (best.contains(feet) || best.contains(expected))
        {
            return;
        }
        debug!("[Planner] cancelling stale search from {}", calc_from);
        handle.cancel();
    }

    fn find_path_in_new_thread(
        &mut self,
        start: Cell,
        talk_about_it: bool,
    ) -> Result<(), PlanningError> {
        if self.in_progress.is_some() {
            return Err(PlanningError::SearchAlreadyRunning);
        }
        let Some(goal) = self.goal.clone() else {
            return Err(PlanningError::NoGoal);
        };
        let (primary, failure) = self.config.planning.timeouts(self.current.is_some());
        let engine: SearchEngine<dyn MoveModel> = SearchEngine::new(
            start,
            goal,
            Arc::clone(&self.model),
            self.config.world,
            self.config.search.clone(),
        );
        let handle = spawn_search(
            engine,
            primary,
            failure,
            talk_about_it,
            self.reports_tx.clone(),
        )?;
        self.in_progress = Some(handle);
        Ok(())
    }

    fn drain_reports(&mut self) {
        while let Ok(report) = self.reports_rx.try_recv() {
            self.install(report);
        }
    }

    /// Block until the running search reports, then install its result.
    ///
    /// Returns false when nothing was running or the timeout elapsed.
    pub fn await_search(&mut self, timeout: Duration) -> bool {
        if self.in_progress.is_none() {
            return false;
        }
        match self.reports_rx.recv_timeout(timeout) {
            Ok(report) => {
                self.install(report);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            // Unreachable while we hold reports_tx
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Merge a finished search into the segment pair.
    fn install(&mut self, report: SearchReport) {
        // The segment may have ended since the tick started
        self.expected_segment_start = self.actuator.segment_start();
        if self
            .in_progress
            .as_ref()
            .is_some_and(|h| h.is_same_search(&report.handle))
        {
            self.in_progress = None;
        }

        let SearchReport {
            handle,
            start,
            goal,
            talk_about_it,
            result,
        } = report;

        let path = match result {
            Ok(outcome) if outcome.is_cancelled() => return,
            // Cancelled after finishing; the plan it was for is gone
            Ok(_) if handle.is_cancelled() => {
                debug!("[Planner] discarding result of cancelled search from {}", start);
                return;
            }
            Ok(outcome) => outcome.into_path(),
            Err(e) => {
                self.last_search_error = Some(e);
                None
            }
        };

        match (self.current.is_some(), self.next.is_some()) {
            (false, _) => match path {
                Some(path) if path.contains(self.expected_segment_start) => {
                    self.events.queue(PathEvent::CalcFinishedNowExecuting);
                    self.current = Some(self.actuator.execute(path));
                    self.reset_eta(start);
                }
                Some(_) => {
                    warn!("[Planner] discarding orphan path segment with incorrect start");
                }
                None => self.events.queue(PathEvent::CalcFailed),
            },
            (true, false) => {
                let current_dest = self.current.as_ref().map(|c| c.path().dest());
                match path {
                    Some(path) if Some(path.src()) == current_dest => {
                        self.events.queue(PathEvent::NextSegmentCalcFinished);
                        self.next = Some(self.actuator.execute(path));
                    }
                    Some(_) => {
                        warn!("[Planner] discarding orphan next segment with incorrect start");
                    }
                    None => self.events.queue(PathEvent::NextCalcFailed),
                }
            }
            (true, true) => {
                warn!("[Planner] current and next both set, discarding search result");
            }
        }

        if talk_about_it && let Some(current) = self.current.as_ref() {
            let path = current.path();
            if goal.is_in_goal(path.dest()) {
                info!(
                    "[Planner] finished finding a path from {} to {}, {} nodes considered",
                    start,
                    goal,
                    path.num_nodes_considered()
                );
            } else {
                info!(
                    "[Planner] found path segment from {} towards {}, {} nodes considered",
                    start,
                    goal,
                    path.num_nodes_considered()
                );
            }
        }
    }

    pub fn set_goal(&mut self, goal: Option<Goal>) {
        self.goal = goal;
    }

    /// Set the goal and start a fresh search when nothing is executing or
    /// calculating. Returns whether a search was started.
    pub fn set_goal_and_path(&mut self, goal: Goal) -> Result<bool, PlanningError> {
        self.goal = Some(goal);
        self.expected_segment_start = self.actuator.segment_start();
        let feet = self.actuator.position();
        if let Some(goal) = self.goal.as_ref()
            && (goal.is_in_goal(feet) || goal.is_in_goal(self.expected_segment_start))
        {
            return Ok(false);
        }
        if self.current.is_some() || self.in_progress.is_some() {
            return Ok(false);
        }
        self.events.queue(PathEvent::CalcStarted);
        self.find_path_in_new_thread(self.expected_segment_start, true)?;
        Ok(true)
    }

    /// Restart pathing toward the current goal when nothing is executing
    /// or calculating, e.g. after a fresh result was cancelled or dropped
    /// as an orphan. Drivers call this once per tick. Returns whether a
    /// search was started.
    pub fn replan_if_idle(&mut self) -> Result<bool, PlanningError> {
        match self.goal.clone() {
            Some(goal) => self.set_goal_and_path(goal),
            None => Ok(false),
        }
    }

    /// Pause on the next tick at which stopping is safe
    pub fn request_pause(&mut self) {
        self.pause_requested = true;
    }

    /// Stop the running search; drop both segments if stopping is safe.
    /// Controls are left alone until the next tick.
    pub fn soft_cancel_if_safe(&mut self) {
        if let Some(handle) = self.in_progress.as_ref() {
            handle.cancel();
        }
        if !self.is_safe_to_cancel() {
            return;
        }
        self.current = None;
        self.next = None;
        self.cancel_requested = true;
    }

    /// Cancel the segment if stopping is safe. Returns whether it did.
    pub fn cancel_segment_if_safe(&mut self) -> bool {
        if self.is_safe_to_cancel() {
            self.segment_cancel();
            return true;
        }
        false
    }

    /// Stop everything regardless of safety.
    ///
    /// The cancelled search stays registered until its report arrives, so a
    /// new search cannot start alongside it.
    pub fn force_cancel(&mut self) {
        // segment_cancel already releases when a segment was executing
        let executing = self.current.is_some();
        self.segment_cancel();
        self.next = None;
        if !executing {
            self.actuator.release_controls();
        }
    }

    fn segment_cancel(&mut self) {
        self.events.queue(PathEvent::Canceled);
        if let Some(handle) = self.in_progress.as_ref() {
            handle.cancel();
        }
        if self.current.is_some() {
            self.current = None;
            self.next = None;
            self.actuator.release_controls();
        }
    }

    /// Ticks left to the goal, extrapolated from heuristic progress since
    /// the current segment was installed
    pub fn estimated_ticks_to_goal(&mut self) -> Option<f64> {
        let goal = self.goal.as_ref()?;
        let start = self.eta_start?;
        let feet = self.actuator.position();
        if goal.is_in_goal(feet) {
            self.reset_eta(self.expected_segment_start);
            return Some(0.0);
        }
        if self.ticks_elapsed == 0 {
            return None;
        }
        let current = goal.heuristic(feet);
        let initial = goal.heuristic(start);
        if current == initial {
            return None;
        }
        let remaining = (current - goal.heuristic_at_goal()).abs();
        Some(remaining * self.ticks_elapsed as f64 / (initial - current).abs())
    }

    fn reset_eta(&mut self, start: Cell) {
        self.ticks_elapsed = 0;
        self.eta_start = Some(start);
    }

    pub fn goal(&self) -> Option<&Goal> {
        self.goal.as_ref()
    }

    pub fn current(&self) -> Option<&A::Executor> {
        self.current.as_ref()
    }

    pub fn next(&self) -> Option<&A::Executor> {
        self.next.as_ref()
    }

    pub fn in_progress(&self) -> Option<&SearchHandle> {
        self.in_progress.as_ref()
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn has_path(&self) -> bool {
        self.current.is_some()
    }

    /// Executing and not paused this tick
    pub fn is_pathing(&self) -> bool {
        self.has_path() && !self.paused_this_tick
    }

    pub fn is_safe_to_cancel(&self) -> bool {
        self.current.is_none() || self.safe_to_cancel
    }

    pub fn calc_failed_last_tick(&self) -> bool {
        self.events.calc_failed_last_tick()
    }

    /// Fatal error from the most recent failed search, if any
    pub fn take_search_error(&mut self) -> Option<SearchError> {
        self.last_search_error.take()
    }
}
