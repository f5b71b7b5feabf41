// ─────────────────────────────────────────────────────────────────────
// Water Treatment Core — Run Control
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Cooperative cancellation, deadlines and background runs.
//!
//! A run is checked between flocculation chambers, never inside one. The
//! worker thread hands back only the finished report (or the error), so a
//! caller polling from a UI loop never sees partial state.

use crate::pipeline::TreatmentPipeline;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use treatment_types::config::PlantConfig;
use treatment_types::error::{TreatmentError, TreatmentResult};
use treatment_types::state::TreatmentReport;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Cancellation and deadline for one run.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    pub cancel: CancelToken,
    pub deadline: Option<Instant>,
}

impl RunControl {
    /// No cancellation source, no deadline.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        RunControl {
            cancel: CancelToken::new(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn with_cancel(cancel: CancelToken) -> Self {
        RunControl {
            cancel,
            deadline: None,
        }
    }

    /// Fail with `Cancelled` or `Timeout` if the run must stop now.
    pub fn check(&self, completed_chambers: usize) -> TreatmentResult<()> {
        if self.cancel.is_cancelled() {
            return Err(TreatmentError::Cancelled { completed_chambers });
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(TreatmentError::Timeout { completed_chambers });
            }
        }
        Ok(())
    }
}

/// Handle to a pipeline running on a worker thread.
#[derive(Debug)]
pub struct RunHandle {
    cancel: CancelToken,
    receiver: Receiver<TreatmentResult<TreatmentReport>>,
    worker: Option<JoinHandle<()>>,
}

/// Start a full pipeline run for `config` on a new thread.
pub fn spawn_run(config: PlantConfig) -> RunHandle {
    spawn_run_with(config, RunControl::unbounded())
}

/// Same as [`spawn_run`] with a caller-supplied deadline or token.
pub fn spawn_run_with(config: PlantConfig, control: RunControl) -> RunHandle {
    let (sender, receiver) = mpsc::channel();
    let cancel = control.cancel.clone();
    let worker = std::thread::spawn(move || {
        let outcome = TreatmentPipeline::from_config(&config).and_then(|p| p.run_with_control(&control));
        if let Err(ref e) = outcome {
            tracing::debug!(error = %e, "background run ended with error");
        }
        // The receiver may already be gone; nothing to report to then.
        let _ = sender.send(outcome);
    });
    RunHandle {
        cancel,
        receiver,
        worker: Some(worker),
    }
}

impl RunHandle {
    /// Request cancellation; takes effect at the next chamber boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Non-blocking poll. `None` while the run is still in progress.
    pub fn try_result(&mut self) -> Option<TreatmentResult<TreatmentReport>> {
        match self.receiver.try_recv() {
            Ok(outcome) => {
                self.join_worker();
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(worker_lost())),
        }
    }

    /// Block until the run finishes.
    pub fn wait(mut self) -> TreatmentResult<TreatmentReport> {
        let outcome = self.receiver.recv().unwrap_or_else(|_| Err(worker_lost()));
        self.join_worker();
        outcome
    }

    /// Block for at most `timeout`; the handle comes back if the run is
    /// still going.
    pub fn wait_timeout(
        mut self,
        timeout: Duration,
    ) -> Result<TreatmentResult<TreatmentReport>, RunHandle> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => {
                self.join_worker();
                Ok(outcome)
            }
            Err(RecvTimeoutError::Timeout) => Err(self),
            Err(RecvTimeoutError::Disconnected) => Ok(Err(worker_lost())),
        }
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn worker_lost() -> TreatmentError {
    tracing::warn!("background worker exited without a result");
    TreatmentError::WorkerLost
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> PlantConfig {
        let mut cfg = PlantConfig::baseline();
        cfg.distribution.bins = 12;
        cfg.flocculation.total_time = 300.0;
        cfg.solver.output_points = 5;
        cfg
    }

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_check_reports_completed_chambers() {
        let control = RunControl::unbounded();
        assert!(control.check(0).is_ok());
        control.cancel.cancel();
        match control.check(2) {
            Err(TreatmentError::Cancelled { completed_chambers }) => assert_eq!(completed_chambers, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let control = RunControl {
            cancel: CancelToken::new(),
            deadline: Some(Instant::now()),
        };
        assert!(matches!(
            control.check(1),
            Err(TreatmentError::Timeout { completed_chambers: 1 })
        ));
    }

    fn orphaned_handle() -> RunHandle {
        let (sender, receiver) = mpsc::channel::<TreatmentResult<TreatmentReport>>();
        drop(sender);
        RunHandle {
            cancel: CancelToken::new(),
            receiver,
            worker: None,
        }
    }

    #[test]
    fn test_dead_worker_reported_as_worker_lost() {
        assert!(matches!(orphaned_handle().wait(), Err(TreatmentError::WorkerLost)));
        assert!(matches!(
            orphaned_handle().try_result(),
            Some(Err(TreatmentError::WorkerLost))
        ));
        match orphaned_handle().wait_timeout(Duration::from_secs(1)) {
            Ok(outcome) => assert!(matches!(outcome, Err(TreatmentError::WorkerLost))),
            Err(_) => panic!("disconnected channel must not time out"),
        }
    }

    #[test]
    fn test_background_run_completes() {
        let handle = spawn_run(quick_config());
        let report = handle.wait().unwrap();
        assert_eq!(report.flocculation.chambers.len(), 3);
        assert!(report.final_efficiency >= 0.0 && report.final_efficiency <= 100.0);
    }

    #[test]
    fn test_background_run_cancelled_before_start() {
        let control = RunControl::unbounded();
        control.cancel.cancel();
        let handle = spawn_run_with(quick_config(), control);
        assert!(matches!(
            handle.wait(),
            Err(TreatmentError::Cancelled { completed_chambers: 0 })
        ));
    }

    #[test]
    fn test_poll_until_done() {
        let mut handle = spawn_run(quick_config());
        let deadline = Instant::now() + Duration::from_secs(120);
        let outcome = loop {
            if let Some(outcome) = handle.try_result() {
                break outcome;
            }
            assert!(Instant::now() < deadline, "background run did not finish");
            std::thread::sleep(Duration::from_millis(5));
        };
        assert!(outcome.is_ok());
    }

    #[test]
    fn test_wait_timeout_returns_report() {
        let handle = spawn_run(quick_config());
        match handle.wait_timeout(Duration::from_secs(120)) {
            Ok(outcome) => assert!(outcome.is_ok()),
            Err(_) => panic!("run did not finish within two minutes"),
        }
    }
}
