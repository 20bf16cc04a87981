//! Background recomputation.
//!
//! A single worker thread owns the engine. Requests arriving within the
//! debounce window of each other are coalesced and only the newest one is
//! computed; the consumer keeps only the newest report it drains.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::domain::PredictionReport;
use crate::error::AppError;
use crate::predict::engine::{PredictionRequest, compute};

#[derive(Debug)]
pub struct PredictionWorker {
    requests: Option<Sender<PredictionRequest>>,
    reports: Receiver<PredictionReport>,
    handle: Option<JoinHandle<()>>,
}

impl PredictionWorker {
    pub fn spawn(debounce: Duration) -> Result<Self, AppError> {
        let (request_tx, request_rx) = mpsc::channel::<PredictionRequest>();
        let (report_tx, report_rx) = mpsc::channel::<PredictionReport>();
        let handle = thread::Builder::new()
            .name("prediction-worker".to_string())
            .spawn(move || run_loop(request_rx, report_tx, debounce))
            .map_err(|e| AppError::new(4, format!("Failed to start prediction worker: {e}")))?;
        info!("prediction worker started (debounce {} ms)", debounce.as_millis());
        Ok(Self {
            requests: Some(request_tx),
            reports: report_rx,
            handle: Some(handle),
        })
    }

    /// Queue a request. Older queued requests are superseded, not cancelled.
    pub fn submit(&self, request: PredictionRequest) -> Result<(), AppError> {
        let sender = self
            .requests
            .as_ref()
            .ok_or_else(|| AppError::new(4, "Prediction worker is shut down."))?;
        sender
            .send(request)
            .map_err(|_| AppError::new(4, "Prediction worker stopped unexpectedly."))
    }

    /// Drain finished reports without blocking and keep the newest.
    pub fn try_latest(&self) -> Option<PredictionReport> {
        self.reports.try_iter().last()
    }

    /// Block up to `timeout` for a report, then drain anything newer.
    pub fn wait_latest(&self, timeout: Duration) -> Option<PredictionReport> {
        let first = self.reports.recv_timeout(timeout).ok()?;
        Some(self.try_latest().unwrap_or(first))
    }

    /// Stop accepting work and join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("prediction worker panicked");
            } else {
                info!("prediction worker stopped");
            }
        }
    }
}

impl Drop for PredictionWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(requests: Receiver<PredictionRequest>, reports: Sender<PredictionReport>, debounce: Duration) {
    while let Ok(mut request) = requests.recv() {
        let mut coalesced = 0usize;
        loop {
            match requests.recv_timeout(debounce) {
                Ok(newer) => {
                    request = newer;
                    coalesced += 1;
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let started = Instant::now();
        let report = compute(&request);
        debug!(
            "recompute: {} samples, {} features, {coalesced} superseded, {:.1} ms",
            report.residuals.len(),
            request.result.partials.len(),
            started.elapsed().as_secs_f64() * 1e3
        );
        if reports.send(report).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureDescriptor, KnotSet, ScatterValue};
    use crate::predict::engine::ModelInputs;
    use std::collections::BTreeMap;

    fn request(level: f64) -> PredictionRequest {
        let mut baseline = BTreeMap::new();
        baseline.insert("a".to_string(), KnotSet::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap());
        let mut edits = BTreeMap::new();
        edits.insert("a".to_string(), KnotSet::new(vec![0.0, 1.0], vec![level, level]).unwrap());
        PredictionRequest {
            result: ModelInputs {
                partials: vec![FeatureDescriptor {
                    key: "a".to_string(),
                    label: "A".to_string(),
                    scatter_x: vec![ScatterValue::Number(0.5)],
                    categories: None,
                }],
                y: vec![1.0],
                task: Default::default(),
                intercept: Some(0.0),
            },
            baseline_knots: baseline,
            knot_edits: edits,
        }
    }

    #[test]
    fn burst_is_coalesced_to_the_newest_request() {
        let worker = PredictionWorker::spawn(Duration::from_millis(50)).unwrap();
        for level in [1.0, 2.0, 3.0] {
            worker.submit(request(level)).unwrap();
        }
        let report = worker.wait_latest(Duration::from_secs(5)).unwrap();
        assert_eq!(report.edited_model.preds, vec![3.0]);
        worker.shutdown();
    }

    #[test]
    fn nothing_pending_yields_none() {
        let worker = PredictionWorker::spawn(Duration::from_millis(1)).unwrap();
        assert!(worker.try_latest().is_none());
    }
}
