//! Scan session
//!
//! Ties the frame pipeline to one fixed reference set and the admission gate.
//! The reference set cannot change while a session exists; to scan against
//! other numbers, start a new session.

use anyhow::Result;
use parking_lot::RwLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analysis::ReferenceSet;
use crate::config::{AppConfig, ScanLoopSettings};
use crate::error::ConfigError;
use crate::pipeline::{FrameAnalysis, FramePipeline};
use crate::scan::gate::{Admission, FrameGate, FramePermit};
use crate::vision::OcrFrame;

/// Analysis of one admitted frame, ready for the renderer
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// 1-based count of frames analyzed in this session
    pub sequence: u64,
    /// OCR image size, for mapping block rectangles onto a display
    pub frame_size: Option<(u32, u32)>,
    pub analysis: FrameAnalysis,
}

/// Session counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames that got the analysis slot
    pub frames_admitted: u64,
    /// Frames dropped because an analysis was in flight
    pub dropped_busy: u64,
    /// Frames dropped by the minimum interval
    pub dropped_throttled: u64,
    /// Admitted frames skipped because OCR failed
    pub provider_failures: u64,
    /// Frames analyzed
    pub frames_analyzed: u64,
    /// Duration of the most recent analysis
    pub last_processing_time: Option<Duration>,
    /// Blocks found in the most recent analysis
    pub last_block_count: usize,
}

/// One scan session: a pipeline, a fixed reference set and an admission gate
#[derive(Debug)]
pub struct ScanSession {
    pipeline: FramePipeline,
    reference: ReferenceSet,
    gate: FrameGate,
    slow_frame: Duration,
    stats: RwLock<SessionStats>,
}

impl ScanSession {
    /// Create a session
    pub fn new(pipeline: FramePipeline, reference: ReferenceSet, settings: &ScanLoopSettings) -> Self {
        info!(
            "Scan session started: numbers [{}], min interval {} ms",
            reference, settings.min_interval_ms
        );
        Self {
            pipeline,
            reference,
            gate: FrameGate::new(Duration::from_millis(settings.min_interval_ms)),
            slow_frame: Duration::from_millis(settings.slow_frame_warn_ms),
            stats: RwLock::new(SessionStats::default()),
        }
    }

    /// Create a session from validated configuration
    pub fn from_config(config: &AppConfig, reference: ReferenceSet) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            FramePipeline::with_config(config.pipeline.clone())?,
            reference,
            &config.scan_loop,
        ))
    }

    pub fn reference(&self) -> &ReferenceSet {
        &self.reference
    }

    pub fn gate(&self) -> &FrameGate {
        &self.gate
    }

    /// Snapshot of the session counters
    pub fn stats(&self) -> SessionStats {
        self.stats.read().clone()
    }

    /// Ask for the analysis slot before running OCR on a new frame
    pub fn try_admit(&self) -> Admission {
        let admission = self.gate.try_admit();
        let mut stats = self.stats.write();
        match &admission {
            Admission::Admitted(_) => stats.frames_admitted += 1,
            Admission::Busy => stats.dropped_busy += 1,
            Admission::Throttled => stats.dropped_throttled += 1,
        }
        admission
    }

    /// Analyze an admitted frame
    ///
    /// An OCR failure skips the frame: it is logged and `None` is returned.
    /// The slot is released when this returns.
    pub fn process(&self, permit: FramePermit, ocr: Result<OcrFrame>) -> Option<FrameReport> {
        let frame = match ocr {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Text recognition failed, skipping frame: {:#}", e);
                self.stats.write().provider_failures += 1;
                return None;
            }
        };

        let analysis = self.pipeline.analyze_frame(&frame, &self.reference);
        let elapsed = permit.admitted_at().elapsed();
        drop(permit);

        if analysis.processing_time > self.slow_frame {
            warn!("Frame analysis took {:?}", analysis.processing_time);
        }
        debug!("Frame turnaround {:?} including recognition", elapsed);

        let sequence = {
            let mut stats = self.stats.write();
            stats.frames_analyzed += 1;
            stats.last_processing_time = Some(analysis.processing_time);
            stats.last_block_count = analysis.blocks.len();
            stats.frames_analyzed
        };

        for block in &analysis.blocks {
            debug!("Frame {}: {}", sequence, block);
        }

        Some(FrameReport {
            sequence,
            frame_size: frame.dimensions(),
            analysis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Tier;
    use crate::geometry::Rectangle;
    use crate::vision::TextFragment;

    fn settings() -> ScanLoopSettings {
        ScanLoopSettings {
            min_interval_ms: 0,
            ..Default::default()
        }
    }

    fn session() -> ScanSession {
        let reference = ReferenceSet::new(1..=15).unwrap();
        ScanSession::new(FramePipeline::new(), reference, &settings())
    }

    fn frame() -> OcrFrame {
        let fragments = (1..=15u8)
            .map(|v| {
                let i = (v - 1) as i32;
                TextFragment::new(
                    v.to_string(),
                    Rectangle::from_xywh(60 + (i % 5) * 120, 100 + (i / 5) * 100, 40, 40),
                )
            })
            .collect();
        OcrFrame::new(720, 1280, fragments)
    }

    fn admit(session: &ScanSession) -> FramePermit {
        match session.try_admit() {
            Admission::Admitted(permit) => permit,
            other => panic!("expected admission, got {:?}", other),
        }
    }

    #[test]
    fn test_process_frame() {
        let session = session();
        let permit = admit(&session);

        let report = session.process(permit, Ok(frame())).unwrap();
        assert_eq!(report.sequence, 1);
        assert_eq!(report.frame_size, Some((720, 1280)));
        assert_eq!(report.analysis.blocks.len(), 1);
        assert_eq!(report.analysis.blocks[0].tier, Tier::Full);

        let stats = session.stats();
        assert_eq!(stats.frames_admitted, 1);
        assert_eq!(stats.frames_analyzed, 1);
        assert_eq!(stats.last_block_count, 1);
        assert!(stats.last_processing_time.is_some());
    }

    #[test]
    fn test_busy_frames_are_counted() {
        let session = session();
        let permit = admit(&session);

        assert!(matches!(session.try_admit(), Admission::Busy));
        assert!(matches!(session.try_admit(), Admission::Busy));

        session.process(permit, Ok(frame()));
        assert!(session.try_admit().is_admitted());

        let stats = session.stats();
        assert_eq!(stats.dropped_busy, 2);
        assert_eq!(stats.frames_admitted, 2);
    }

    #[test]
    fn test_throttled_frames_are_counted() {
        let reference = ReferenceSet::new(1..=15).unwrap();
        let session = ScanSession::new(
            FramePipeline::new(),
            reference,
            &ScanLoopSettings {
                min_interval_ms: 60_000,
                ..Default::default()
            },
        );

        let permit = admit(&session);
        session.process(permit, Ok(frame()));
        assert!(matches!(session.try_admit(), Admission::Throttled));
        assert_eq!(session.stats().dropped_throttled, 1);
    }

    #[test]
    fn test_provider_failure_skips_frame() {
        let session = session();
        let permit = admit(&session);

        let report = session.process(permit, Err(anyhow::anyhow!("recognizer unavailable")));
        assert!(report.is_none());
        assert!(!session.gate().is_busy());

        let stats = session.stats();
        assert_eq!(stats.provider_failures, 1);
        assert_eq!(stats.frames_analyzed, 0);
    }

    #[test]
    fn test_from_config_validates() {
        let reference = ReferenceSet::new(1..=15).unwrap();
        let mut config = AppConfig::default();
        assert!(ScanSession::from_config(&config, reference.clone()).is_ok());

        config.pipeline.extractor.row_height = 0;
        assert!(ScanSession::from_config(&config, reference).is_err());
    }
}
