use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::Instant;

use tracing::error;

use crate::estimator::{Estimate, Estimator};
use crate::sampler::CancelToken;
use crate::state::{Delta, EstimateCommand};

/// Serves estimate requests off the UI thread. A new request cancels the run
/// still in flight, so only the latest query ever finishes.
pub fn spawn_estimator(
    estimator: Arc<Estimator>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<EstimateCommand>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut in_flight: Option<CancelToken> = None;

        while let Ok(mut cmd) = cmd_rx.recv() {
            // Collapse a burst of key presses into the newest query.
            while let Ok(newer) = cmd_rx.try_recv() {
                cmd = newer;
            }
            if let Some(prev) = in_flight.take() {
                prev.cancel();
            }

            let EstimateCommand::Run { generation, query } = cmd;
            let cancel = CancelToken::new();
            in_flight = Some(cancel.clone());

            let estimator = Arc::clone(&estimator);
            let tx = tx.clone();
            thread::spawn(move || {
                report_run(generation, &tx, || estimator.estimate(&query, &cancel));
            });
        }

        if let Some(prev) = in_flight {
            prev.cancel();
        }
    })
}

/// Runs one estimate and reports it. Every outcome ends in exactly one
/// `Estimate` or `Cancelled` delta for `generation`, a panic included.
fn report_run<F>(generation: u64, tx: &Sender<Delta>, run: F)
where
    F: FnOnce() -> Option<Estimate>,
{
    let started = Instant::now();
    match panic::catch_unwind(AssertUnwindSafe(run)) {
        Ok(Some(estimate)) => {
            let _ = tx.send(Delta::Log(format!(
                "[INFO] Run #{generation} took {} ms",
                started.elapsed().as_millis()
            )));
            let _ = tx.send(Delta::Estimate {
                generation,
                estimate,
            });
        }
        Ok(None) => {
            let _ = tx.send(Delta::Cancelled { generation });
        }
        Err(_) => {
            error!(generation, "estimate run panicked");
            let _ = tx.send(Delta::Log(format!("[ERROR] Run #{generation} failed")));
            let _ = tx.send(Delta::Cancelled { generation });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    use crate::state::{AppState, apply_delta};

    #[test]
    fn panicking_run_still_clears_pending() {
        let mut state = AppState::new();
        let EstimateCommand::Run { generation, .. } = state.next_run();
        assert!(state.pending);

        let (tx, rx) = mpsc::channel();
        report_run(generation, &tx, || panic!("boom"));
        drop(tx);

        let deltas = rx.iter().collect::<Vec<_>>();
        assert!(matches!(deltas.last(), Some(Delta::Cancelled { generation: g }) if *g == generation));
        for delta in deltas {
            apply_delta(&mut state, delta);
        }
        assert!(!state.pending);
        assert!(state.logs.iter().any(|l| l.starts_with("[ERROR]")));
    }

    #[test]
    fn cancelled_run_reports_cancelled() {
        let (tx, rx) = mpsc::channel();
        report_run(7, &tx, || None);
        drop(tx);
        let deltas = rx.iter().collect::<Vec<_>>();
        assert_eq!(deltas.len(), 1);
        assert!(matches!(deltas[0], Delta::Cancelled { generation: 7 }));
    }
}
