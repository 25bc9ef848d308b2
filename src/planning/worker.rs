//! Background search worker.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, error};

use crate::core::Cell;
use crate::error::{PlanningError, SearchError};
use crate::goal::Goal;
use crate::movement::MoveModel;
use crate::search::{SearchEngine, SearchHandle, SearchOutcome, SearchState};

/// Result of one background search, sent back to the coordinator
#[derive(Debug)]
pub struct SearchReport {
    pub handle: SearchHandle,
    pub start: Cell,
    pub goal: Goal,
    /// Fresh search (true) as opposed to a look-ahead
    pub talk_about_it: bool,
    pub result: Result<SearchOutcome, SearchError>,
}

/// Run `engine` on a named search thread and report back over `reports`.
pub fn spawn_search(
    engine: SearchEngine<dyn MoveModel>,
    primary: Duration,
    failure: Duration,
    talk_about_it: bool,
    reports: Sender<SearchReport>,
) -> Result<SearchHandle, PlanningError> {
    let handle = engine.handle();
    let thread_handle = handle.clone();
    let start = engine.start();
    let goal = engine.goal().clone();

    thread::Builder::new()
        .name("search".into())
        .spawn(move || {
            if talk_about_it {
                debug!("[Search] starting search from {} to {}", start, goal);
            }
            // A panicking model must still report, or the coordinator
            // waits on this search forever
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                engine.calculate(primary, failure)
            }))
            .unwrap_or_else(|payload| {
                thread_handle.set_state(SearchState::Failed);
                Err(SearchError::WorkerPanicked {
                    start,
                    message: panic_message(payload.as_ref()),
                })
            });
            if let Err(e) = &result {
                error!("[Search] search from {} aborted: {}", start, e);
            }
            let report = SearchReport {
                handle: thread_handle,
                start,
                goal,
                talk_about_it,
                result,
            };
            if reports.send(report).is_err() {
                debug!("[Search] coordinator gone, dropping result");
            }
        })?;

    Ok(handle)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::{Move, MoveResult};
    use crate::search::SearchConfig;
    use std::sync::Arc;

    struct Exploding;

    impl MoveModel for Exploding {
        fn apply(&self, _x: i32, _y: i32, _z: i32, _movement: Move) -> MoveResult {
            panic!("world snapshot unavailable");
        }
    }

    #[test]
    fn test_panicking_model_still_reports() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let start = Cell::new(0, 64, 0);
        let model: Arc<dyn MoveModel> = Arc::new(Exploding);
        let engine: SearchEngine<dyn MoveModel> = SearchEngine::new(
            start,
            Goal::Block(Cell::new(10, 64, 0)),
            model,
            Default::default(),
            SearchConfig::default(),
        );
        let handle = spawn_search(
            engine,
            Duration::from_millis(500),
            Duration::from_millis(500),
            true,
            tx,
        )
        .unwrap();

        let report = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(report.handle.is_same_search(&handle));
        match report.result {
            Err(SearchError::WorkerPanicked { start: from, message }) => {
                assert_eq!(from, start);
                assert_eq!(message, "world snapshot unavailable");
            }
            other => panic!("expected a panic report, got {:?}", other),
        }
        assert_eq!(handle.state(), SearchState::Failed);
    }
}
