//! Background analysis worker
//!
//! Frames are offered from the capture side; admitted frames go to a single
//! analysis thread and reports come back on a channel for the renderer. The
//! report channel holds one report: a renderer that falls behind sees the
//! newest analysis, older ones are dropped.

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use crate::scan::gate::{Admission, FramePermit};
use crate::scan::session::{FrameReport, ScanSession};
use crate::vision::OcrFrame;

type Job = (FramePermit, Result<OcrFrame>);

/// What happened to an offered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Handed to the analysis thread
    Accepted,
    /// Dropped, an analysis is in flight
    DroppedBusy,
    /// Dropped, too soon after the previous frame
    DroppedThrottled,
}

/// Owns the analysis thread of a scan session
pub struct ScanWorker {
    session: Arc<ScanSession>,
    jobs: Option<Sender<Job>>,
    reports: Receiver<FrameReport>,
    handle: Option<JoinHandle<()>>,
}

impl ScanWorker {
    /// Start the analysis thread
    pub fn spawn(session: Arc<ScanSession>) -> Result<Self> {
        // Capacity 1: the gate already guarantees a single frame in flight
        let (jobs, job_rx) = bounded::<Job>(1);
        let (report_tx, reports) = bounded::<FrameReport>(1);

        let worker_session = Arc::clone(&session);
        let pending = reports.clone();
        let handle = std::thread::Builder::new()
            .name("frame-analysis".to_string())
            .spawn(move || run_analysis_loop(worker_session, job_rx, report_tx, pending))?;

        info!("Frame analysis worker started");

        Ok(Self {
            session,
            jobs: Some(jobs),
            reports,
            handle: Some(handle),
        })
    }

    /// Offer a recognized frame
    pub fn offer(&self, frame: OcrFrame) -> Offer {
        self.offer_with(|| Ok(frame))
    }

    /// Offer a frame, running `recognize` only if the frame is admitted
    ///
    /// Recognition runs on the calling thread while the slot is held, so a
    /// refused frame costs nothing.
    pub fn offer_with<F>(&self, recognize: F) -> Offer
    where
        F: FnOnce() -> Result<OcrFrame>,
    {
        let permit = match self.session.try_admit() {
            Admission::Admitted(permit) => permit,
            Admission::Busy => return Offer::DroppedBusy,
            Admission::Throttled => return Offer::DroppedThrottled,
        };

        let Some(jobs) = &self.jobs else {
            return Offer::DroppedBusy;
        };

        match jobs.try_send((permit, recognize())) {
            Ok(()) => Offer::Accepted,
            Err(TrySendError::Full(_)) => {
                warn!("Analysis queue full, dropping frame");
                Offer::DroppedBusy
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Analysis worker has stopped, dropping frame");
                Offer::DroppedBusy
            }
        }
    }

    /// Newest report for the renderer
    pub fn reports(&self) -> &Receiver<FrameReport> {
        &self.reports
    }

    pub fn session(&self) -> &Arc<ScanSession> {
        &self.session
    }

    /// Stop the worker and wait for the in-flight frame to finish
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Closing the job channel ends the loop
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Frame analysis worker panicked");
            }
        }
    }
}

impl Drop for ScanWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Process jobs until the sending side is dropped
fn run_analysis_loop(
    session: Arc<ScanSession>,
    jobs: Receiver<Job>,
    reports: Sender<FrameReport>,
    pending: Receiver<FrameReport>,
) {
    debug!("Frame analysis loop running");

    for (permit, frame) in jobs.iter() {
        if let Some(report) = session.process(permit, frame) {
            publish(&reports, &pending, report);
        }
    }

    info!("Frame analysis worker exiting");
}

/// Replace an unread report with a newer one
fn publish(reports: &Sender<FrameReport>, pending: &Receiver<FrameReport>, report: FrameReport) {
    let report = match reports.try_send(report) {
        Ok(()) => return,
        Err(TrySendError::Full(report)) => report,
        Err(TrySendError::Disconnected(report)) => {
            debug!("No renderer, dropping report {}", report.sequence);
            return;
        }
    };

    if let Ok(stale) = pending.try_recv() {
        debug!("Renderer is behind, dropping report {}", stale.sequence);
    }
    // This thread is the only sender, so the slot is free now
    if let Err(e) = reports.try_send(report) {
        debug!("Dropping report {}", e.into_inner().sequence);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ReferenceSet, Tier};
    use crate::config::ScanLoopSettings;
    use crate::geometry::Rectangle;
    use crate::pipeline::FramePipeline;
    use crate::vision::TextFragment;
    use std::time::Duration;

    fn session(min_interval_ms: u64) -> Arc<ScanSession> {
        let reference = ReferenceSet::new(76..=90).unwrap();
        Arc::new(ScanSession::new(
            FramePipeline::new(),
            reference,
            &ScanLoopSettings {
                min_interval_ms,
                ..Default::default()
            },
        ))
    }

    fn frame() -> OcrFrame {
        let fragments = (76..=90u8)
            .map(|v| {
                let i = (v - 76) as i32;
                TextFragment::new(
                    v.to_string(),
                    Rectangle::from_xywh(60 + (i % 5) * 120, 900 + (i / 5) * 100, 40, 40),
                )
            })
            .collect();
        OcrFrame::new(720, 1280, fragments)
    }

    /// Offer until the previous frame has released the slot
    fn offer_when_idle<F>(worker: &ScanWorker, mut recognize: F) -> Offer
    where
        F: FnMut() -> Result<OcrFrame>,
    {
        for _ in 0..200 {
            match worker.offer_with(&mut recognize) {
                Offer::DroppedBusy => std::thread::sleep(Duration::from_millis(5)),
                outcome => return outcome,
            }
        }
        Offer::DroppedBusy
    }

    #[test]
    fn test_frame_is_analyzed() {
        let worker = ScanWorker::spawn(session(0)).unwrap();
        assert_eq!(worker.offer(frame()), Offer::Accepted);

        let report = worker.reports().recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(report.sequence, 1);
        assert_eq!(report.analysis.blocks.len(), 1);
        assert_eq!(report.analysis.blocks[0].block_index, 2);
        assert_eq!(report.analysis.blocks[0].tier, Tier::Full);
    }

    #[test]
    fn test_refused_frame_is_not_recognized() {
        let worker = ScanWorker::spawn(session(60_000)).unwrap();
        assert_eq!(worker.offer(frame()), Offer::Accepted);

        let mut recognized = false;
        let outcome = offer_when_idle(&worker, || {
            recognized = true;
            Ok(frame())
        });
        assert_eq!(outcome, Offer::DroppedThrottled);
        assert!(!recognized);
    }

    #[test]
    fn test_provider_failure_then_recovery() {
        let worker = ScanWorker::spawn(session(0)).unwrap();
        assert_eq!(
            worker.offer_with(|| Err(anyhow::anyhow!("camera frame lost"))),
            Offer::Accepted
        );
        assert_eq!(offer_when_idle(&worker, || Ok(frame())), Offer::Accepted);

        let report = worker.reports().recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(report.sequence, 1);

        let stats = worker.session().stats();
        assert_eq!(stats.provider_failures, 1);
        assert_eq!(stats.frames_analyzed, 1);
    }

    #[test]
    fn test_undrained_reports_keep_only_newest() {
        let mut worker = ScanWorker::spawn(session(0)).unwrap();
        for _ in 0..3 {
            assert_eq!(offer_when_idle(&worker, || Ok(frame())), Offer::Accepted);
            assert!(worker.reports().len() <= 1);
        }
        // Join so every analysis has been published
        worker.stop();

        assert_eq!(worker.session().stats().frames_analyzed, 3);
        assert_eq!(worker.reports().len(), 1);
        let latest = worker.reports().try_recv().unwrap();
        assert_eq!(latest.sequence, 3);
        assert!(worker.reports().is_empty());
    }

    #[test]
    fn test_shutdown_joins_worker() {
        let worker = ScanWorker::spawn(session(0)).unwrap();
        assert_eq!(worker.offer(frame()), Offer::Accepted);
        let session = Arc::clone(worker.session());

        worker.shutdown();
        // The queued frame was finished before the thread exited
        assert_eq!(session.stats().frames_analyzed, 1);
        assert!(!session.gate().is_busy());
    }
}
