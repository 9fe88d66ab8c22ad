//! Pipeline wiring.
//!
//! Acquisition -> stills -> Segmentation -> candidates -> Classification
//!             -> segments -> Persistence
//!
//! Each stage runs on its own named thread. The trigger links classification
//! back to acquisition.

use std::thread::{self, JoinHandle};

use crate::module::acquisition::{Acquisition, AcquisitionLinks, Backlog};
use crate::module::channel::queue;
use crate::module::classification::{ClassificationStage, Classifier};
use crate::module::define;
use crate::module::device::CaptureDevice;
use crate::module::error::{NightwatchError, Result};
use crate::module::frame::{Candidate, StillFrame, VideoSegment};
use crate::module::persistence::storage::Storage;
use crate::module::persistence::PersistenceStage;
use crate::module::segmentation::background::BackgroundModel;
use crate::module::segmentation::{SegmentationStage, Segmenter};
use crate::module::stage::{drive, Heartbeat, StageReport};
use crate::module::trigger::{StopSignal, Trigger};
use crate::module::util::conf::Config;

/// Running pipeline.
///
pub struct Pipeline {
    handles: Vec<(&'static str, JoinHandle<StageReport>)>,
}

/// Reports of all stages, in pipeline order.
///
#[derive(Debug)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    pub panicked: Vec<&'static str>,
}

impl PipelineReport {
    /// Every stage stopped without a fatal error.
    pub fn is_clean(&self) -> bool {
        self.panicked.is_empty() && self.stages.iter().all(|s| s.is_clean())
    }

    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.name == name)
    }
}

fn spawn<F>(name: &'static str, f: F) -> Result<(&'static str, JoinHandle<StageReport>)>
where
    F: FnOnce() -> StageReport + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map(|handle| (name, handle))
        .map_err(|source| NightwatchError::Thread {
            stage: name,
            source,
        })
}

impl Pipeline {
    /// Create the queues and start the four stages, downstream first.
    ///
    /// If a thread can't be started, the stages already running receive `Stop`
    /// when the remaining queue ends are dropped.
    pub fn launch<D, B>(
        conf: &Config,
        device: D,
        background: B,
        classifier: Classifier,
        storage: Storage,
        trigger: Trigger,
        stop: StopSignal,
    ) -> Result<Self>
    where
        D: CaptureDevice + 'static,
        B: BackgroundModel + 'static,
    {
        let (stills_tx, stills_rx) = queue::<StillFrame>("stills");
        let (candidates_tx, candidates_rx) = queue::<Candidate>("candidates");
        let (segments_tx, segments_rx) = queue::<VideoSegment>("segments");
        let source = conf.acquisition.backlog_source;
        let backlog = Backlog::new(source, &stills_tx, &candidates_tx);
        let minutes = conf.system.heartbeat_minutes;
        let mut handles = Vec::with_capacity(define::stage::ALL.len());

        let mut persistence = PersistenceStage::new(storage.clone());
        handles.push(spawn(define::stage::PERSISTENCE, move || {
            drive(&mut persistence, &segments_rx, &mut Heartbeat::from_minutes(minutes))
        })?);

        let mut classification = ClassificationStage::new(
            classifier,
            trigger.clone(),
            storage,
            conf.classification.save_evidence,
        );
        handles.push(spawn(define::stage::CLASSIFICATION, move || {
            drive(&mut classification, &candidates_rx, &mut Heartbeat::from_minutes(minutes))
        })?);

        let segmenter = Segmenter::new(background, conf.segmentation.clone());
        let mut segmentation = SegmentationStage::new(segmenter, candidates_tx);
        handles.push(spawn(define::stage::SEGMENTATION, move || {
            drive(&mut segmentation, &stills_rx, &mut Heartbeat::from_minutes(minutes))
        })?);

        let links = AcquisitionLinks {
            stills: stills_tx,
            segments: segments_tx,
            backlog,
        };
        let acquisition = Acquisition::new(
            device,
            conf.acquisition.clone(),
            trigger,
            stop,
            links,
            Heartbeat::from_minutes(minutes),
        );
        handles.push(spawn(define::stage::ACQUISITION, move || acquisition.run())?);

        handles.reverse();
        log::info!("Pipeline launched");
        Ok(Self { handles })
    }

    /// Wait for every stage to terminate.
    pub fn join(self) -> PipelineReport {
        let mut report = PipelineReport {
            stages: Vec::with_capacity(self.handles.len()),
            panicked: vec![],
        };
        for (name, handle) in self.handles {
            match handle.join() {
                Ok(stage) => report.stages.push(stage),
                Err(_) => {
                    log::error!("{} thread panicked", name);
                    report.panicked.push(name);
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::classification::Detector;
    use crate::module::device::replay::Replay;
    use crate::module::frame::Rect;
    use crate::module::segmentation::background::AdaptiveBackground;
    use crate::module::stage::StageState;
    use chrono::{DateTime, Local};
    use image::{GrayImage, Luma};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    /// Foreground wherever the still is bright.
    struct Bright;

    impl BackgroundModel for Bright {
        fn apply(&mut self, frame: &GrayImage) -> Result<GrayImage> {
            let mut mask = frame.clone();
            for p in mask.pixels_mut() {
                p[0] = if p[0] > 100 { 255 } else { 0 };
            }
            Ok(mask)
        }
    }

    /// Matches any crop with a pixel above 200.
    struct Glare;

    impl Detector for Glare {
        fn name(&self) -> &'static str {
            "glare"
        }

        fn detect(&mut self, img: &GrayImage) -> Result<Vec<Rect>> {
            Ok(match img.pixels().any(|p| p[0] > 200) {
                true => vec![Rect::new(0, 0, img.width(), img.height())],
                false => vec![],
            })
        }
    }

    struct Never;

    impl Detector for Never {
        fn name(&self) -> &'static str {
            "never"
        }

        fn detect(&mut self, _img: &GrayImage) -> Result<Vec<Rect>> {
            Ok(vec![])
        }
    }

    /// Replay that does not serve still #5 before classification has seen still #4.
    struct Gated {
        replay: Replay,
        trigger: Trigger,
        fourth_at: Arc<Mutex<Option<DateTime<Local>>>>,
    }

    impl CaptureDevice for Gated {
        fn start_recording(&mut self) -> Result<()> {
            self.replay.start_recording()
        }

        fn wait_recording(&mut self, duration: Duration) -> Result<()> {
            self.replay.wait_recording(duration)
        }

        fn stop_recording(&mut self, sink: &mut Vec<u8>) -> Result<()> {
            self.replay.stop_recording(sink)
        }

        fn capture_still(&mut self) -> Result<GrayImage> {
            if self.replay.served() == 4 {
                let deadline = Instant::now() + Duration::from_secs(5);
                while !self.trigger.is_set() && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(5));
                }
            }
            let still = self.replay.capture_still()?;
            if self.replay.served() == 4 {
                *self.fourth_at.lock().unwrap() = Some(Local::now());
            }
            Ok(still)
        }
    }

    fn test_conf() -> Config {
        let mut conf = Config::default_config().unwrap();
        let acq = &mut conf.acquisition;
        acq.segment_length_seconds = 1.5;
        acq.sample_interval_seconds = 0.5;
        acq.min_sample_interval_seconds = 0.5;
        acq.sample_interval_step_seconds = 0.5;
        acq.triggered_sample_interval_seconds = 10.0;
        acq.backlog_high_watermark = 100;
        acq.backlog_low_watermark = 0;
        conf
    }

    fn scene(bright: bool) -> GrayImage {
        let mut img = GrayImage::from_pixel(80, 60, Luma([30]));
        if bright {
            for y in 24..40 {
                for x in 32..48 {
                    img.put_pixel(x, y, Luma([250]));
                }
            }
        }
        img
    }

    fn files(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn only_the_matching_segment_is_kept_test() {
        let dir = tempfile::tempdir().unwrap();
        let stop = StopSignal::new();
        let trigger = Trigger::new();
        let stills = (1..=6).map(|i| scene(i == 4)).collect();
        let fourth_at = Arc::new(Mutex::new(None));
        let device = Gated {
            replay: Replay::from_frames(stills, stop.clone()).unwrap(),
            trigger: trigger.clone(),
            fourth_at: fourth_at.clone(),
        };
        let classifier = Classifier::new(Box::new(Glare), Box::new(Never));

        let pipeline = Pipeline::launch(
            &test_conf(),
            device,
            Bright,
            classifier,
            Storage::new(dir.path()),
            trigger.clone(),
            stop,
        )
        .unwrap();
        let report = pipeline.join();
        assert!(report.is_clean(), "{:?}", report);

        let names = files(dir.path());
        let segments: Vec<&String> = names.iter().filter(|n| n.ends_with(".h264")).collect();
        let evidence: Vec<&String> = names
            .iter()
            .filter(|n| n.starts_with("det") && n.ends_with(".jpg"))
            .collect();
        assert_eq!(segments.len(), 1, "{:?}", names);
        assert_eq!(evidence.len(), 1, "{:?}", names);
        assert_eq!(names.len(), 2);

        let fourth = fourth_at.lock().unwrap().unwrap();
        let stamp = &evidence[0]["det".len()..evidence[0].len() - ".jpg".len()];
        assert!(stamp >= Storage::stamp(fourth).as_str());

        let persisted = report.stage(define::stage::PERSISTENCE).unwrap();
        assert_eq!(persisted.processed, 1);
        assert!(!trigger.is_set());
    }

    #[test]
    fn stop_reaches_every_stage_test() {
        let dir = tempfile::tempdir().unwrap();
        let stop = StopSignal::new();
        let frames = (0..1000)
            .map(|i| GrayImage::from_pixel(80, 60, Luma([(i % 7) as u8 * 30])))
            .collect();
        let device = Replay::from_frames(frames, stop.clone()).unwrap();
        let classifier = Classifier::new(Box::new(Never), Box::new(Never));

        let pipeline = Pipeline::launch(
            &test_conf(),
            device,
            AdaptiveBackground::new(20, 16.0),
            classifier,
            Storage::new(dir.path()),
            Trigger::new(),
            stop.clone(),
        )
        .unwrap();
        stop.request();
        let report = pipeline.join();

        assert!(report.is_clean(), "{:?}", report);
        let names: Vec<&str> = report.stages.iter().map(|s| s.name).collect();
        assert_eq!(names, define::stage::ALL.to_vec());
        assert!(report.stages.iter().all(|s| s.state == StageState::Stopped));
        let stills = report.stage(define::stage::SEGMENTATION).unwrap().processed;
        assert!(stills > 0 && stills < 1000);
        assert!(files(dir.path()).is_empty());
    }

    #[test]
    fn device_failure_stops_the_pipeline_test() {
        struct Broken;

        impl CaptureDevice for Broken {
            fn start_recording(&mut self) -> Result<()> {
                Err(NightwatchError::Device("unplugged".into()))
            }
            fn wait_recording(&mut self, _: Duration) -> Result<()> {
                Ok(())
            }
            fn stop_recording(&mut self, _: &mut Vec<u8>) -> Result<()> {
                Ok(())
            }
            fn capture_still(&mut self) -> Result<GrayImage> {
                Ok(GrayImage::new(1, 1))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::launch(
            &test_conf(),
            Broken,
            Bright,
            Classifier::new(Box::new(Never), Box::new(Never)),
            Storage::new(dir.path()),
            Trigger::new(),
            StopSignal::new(),
        )
        .unwrap();
        let report = pipeline.join();
        assert!(!report.is_clean());
        let acquisition = report.stage(define::stage::ACQUISITION).unwrap();
        assert!(matches!(acquisition.fatal, Some(NightwatchError::Device(_))));
        assert!(report.stage(define::stage::PERSISTENCE).unwrap().is_clean());
    }
}
