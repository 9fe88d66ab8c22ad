//! Acquisition stage.
//!
//! Records the camera in short bursts. Between two bursts one still is pulled
//! and handed to segmentation; the burst length adapts to the classification
//! backlog and stretches while the trigger is set. When a segment is complete
//! the trigger decides whether it goes to persistence or is dropped.

use std::time::Duration;

use chrono::Local;

use crate::module::channel::{Outbox, QueueDepth};
use crate::module::define;
use crate::module::device::CaptureDevice;
use crate::module::error::Result;
use crate::module::frame::{Candidate, StillFrame, VideoSegment};
use crate::module::stage::{Heartbeat, StageEvent, StageReport, StageState};
use crate::module::trigger::{StopSignal, Trigger};
use crate::module::util::conf::{self, BacklogSource};

const NAME: &str = define::stage::ACQUISITION;

/// Backpressure controlled wait between two stills.
///
#[derive(Debug, Clone)]
pub struct SampleInterval {
    current: f64,
    floor: f64,
    step: f64,
    high: usize,
    low: usize,
}

impl SampleInterval {
    pub fn new(conf: &conf::Acquisition) -> Self {
        Self {
            current: conf
                .sample_interval_seconds
                .max(conf.min_sample_interval_seconds),
            floor: conf.min_sample_interval_seconds,
            step: conf.sample_interval_step_seconds,
            high: conf.backlog_high_watermark,
            low: conf.backlog_low_watermark,
        }
    }

    /// Seconds.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Longer above the high watermark, shorter below the low one, never under the floor.
    pub fn adjust(&mut self, depth: usize) -> f64 {
        if depth > self.high {
            self.current += self.step;
        } else if depth < self.low && self.current > self.floor {
            self.current -= self.step;
        }
        self.current = self.current.max(self.floor);
        self.current
    }
}

/// Depth of the queue(s) acquisition adapts to.
///
pub struct Backlog {
    source: BacklogSource,
    stills: QueueDepth<StillFrame>,
    candidates: QueueDepth<Candidate>,
}

impl Backlog {
    pub fn new(
        source: BacklogSource,
        stills: &Outbox<StillFrame>,
        candidates: &Outbox<Candidate>,
    ) -> Self {
        Self {
            source,
            stills: QueueDepth::new(stills),
            candidates: QueueDepth::new(candidates),
        }
    }

    pub fn depth(&self) -> usize {
        match self.source {
            BacklogSource::ClassificationInput => self.candidates.depth(),
            BacklogSource::SegmentationInput => self.stills.depth(),
            BacklogSource::Combined => self.stills.depth() + self.candidates.depth(),
        }
    }
}

/// Queues acquisition writes to or watches.
pub struct AcquisitionLinks {
    pub stills: Outbox<StillFrame>,
    pub segments: Outbox<VideoSegment>,
    pub backlog: Backlog,
}

/// The producing stage. Owns the capture device.
///
pub struct Acquisition<D: CaptureDevice> {
    device: D,
    conf: conf::Acquisition,
    interval: SampleInterval,
    trigger: Trigger,
    stop: StopSignal,
    links: AcquisitionLinks,
    heartbeat: Heartbeat,
    ordinal: u64,
}

impl<D: CaptureDevice> Acquisition<D> {
    pub fn new(
        device: D,
        conf: conf::Acquisition,
        trigger: Trigger,
        stop: StopSignal,
        links: AcquisitionLinks,
        heartbeat: Heartbeat,
    ) -> Self {
        Self {
            device,
            interval: SampleInterval::new(&conf),
            conf,
            trigger,
            stop,
            links,
            heartbeat,
            ordinal: 0,
        }
    }

    /// Record segments until a stop is requested or the device fails.
    ///
    /// Both outputs always receive `Stop` before this returns.
    pub fn run(mut self) -> StageReport {
        let mut report = StageReport::new(NAME);
        log::info!(
            target: NAME,
            "Launch {} stage at {}",
            NAME,
            Local::now().format(define::naming::HEARTBEAT_FORMAT)
        );

        while report.state == StageState::Running {
            let res = self
                .record_segment()
                .and_then(|segment| self.complete_segment(segment));
            report.record(res);
            if report.state == StageState::Running && self.stop.is_requested() {
                log::info!(target: NAME, "Stop requested after still {}", self.ordinal);
                report.advance(StageEvent::Stop);
            }
        }

        self.links.stills.close();
        self.links.segments.close();
        report.advance(StageEvent::Forwarded);
        log::info!(
            target: NAME,
            "... terminate {} stage ({} segments, {} stills)",
            NAME,
            report.processed,
            self.ordinal
        );
        report
    }

    /// Record one segment, sampling a still after every burst.
    fn record_segment(&mut self) -> Result<VideoSegment> {
        let started_at = Local::now();
        let first_still = self.ordinal + 1;
        let mut bytes = Vec::new();
        let mut elapsed = 0.0;
        while elapsed < self.conf.segment_length_seconds {
            let burst = match self.trigger.is_set() {
                true => self.conf.triggered_sample_interval_seconds,
                false => self.interval.current(),
            };
            self.device.start_recording()?;
            self.device.wait_recording(Duration::from_secs_f64(burst))?;
            self.device.stop_recording(&mut bytes)?;
            elapsed += burst;

            self.sample()?;
            let depth = self.links.backlog.depth();
            let dt = self.interval.adjust(depth);
            log::debug!(target: NAME, "backlog {} -> sample interval {:.1}s", depth, dt);
            self.heartbeat.beat(NAME);
        }
        Ok(VideoSegment {
            bytes,
            container: self.device.container(),
            started_at,
            completed_at: Local::now(),
            first_still,
            last_still: self.ordinal,
            recorded_seconds: elapsed,
        })
    }

    /// Capture one still and push it to segmentation.
    fn sample(&mut self) -> Result<()> {
        let image = self.device.capture_still()?;
        self.ordinal += 1;
        self.links.stills.send(StillFrame {
            ordinal: self.ordinal,
            captured_at: Local::now(),
            image,
        })
    }

    /// Forward the segment if the trigger was raised since the last decision.
    fn complete_segment(&mut self, segment: VideoSegment) -> Result<()> {
        if self.trigger.take() {
            log::info!(
                target: NAME,
                "Keep segment of stills {}..={} ({} bytes)",
                segment.first_still,
                segment.last_still,
                segment.bytes.len()
            );
            self.links.segments.send(segment)
        } else {
            log::info!(
                target: NAME,
                "Discard segment of stills {}..={}",
                segment.first_still,
                segment.last_still
            );
            Ok(())
        }
    }
}
