//! Human-likeness classification of motion candidates.
//!
//! A cheap cascade looks at every crop; the HOG detector only sees the crops
//! the cascade rejects. A positive crop raises the trigger, so the segment
//! being recorded is kept.

#[cfg(feature = "opencv")]
pub mod detectors;

use image::GrayImage;

use crate::module::define;
use crate::module::error::{NightwatchError, Result};
use crate::module::frame::{Candidate, Rect};
use crate::module::persistence::storage::Storage;
use crate::module::stage::Stage;
use crate::module::trigger::Trigger;
use crate::module::util::conf;

/// Object detector over one grayscale crop.
///
/// Returns the grouped boxes of the detected objects in crop coordinates.
pub trait Detector: Send {
    fn name(&self) -> &'static str;
    fn detect(&mut self, img: &GrayImage) -> Result<Vec<Rect>>;
}

/// Outcome of classifying one crop.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Positive {
        detector: &'static str, // First detector that fired
        hits: Vec<Rect>,
    },
    Negative,
}

/// Two-step classifier: `primary` first, `fallback` only on a negative.
///
pub struct Classifier {
    primary: Box<dyn Detector>,
    fallback: Box<dyn Detector>,
}

impl Classifier {
    pub fn new(primary: Box<dyn Detector>, fallback: Box<dyn Detector>) -> Self {
        Self { primary, fallback }
    }

    /// The configured cascade, then the HOG people detector.
    #[cfg(feature = "opencv")]
    pub fn from_conf(conf: &conf::Classification) -> Result<Self> {
        use self::detectors::{CascadeDetector, HogDetector};

        let cascade = CascadeDetector::load(conf)?;
        let hog = HogDetector::people(conf)?;
        Ok(Self::new(Box::new(cascade), Box::new(hog)))
    }

    #[cfg(not(feature = "opencv"))]
    pub fn from_conf(conf: &conf::Classification) -> Result<Self> {
        Err(NightwatchError::Model(format!(
            "{}: detectors need a build with the 'opencv' feature",
            conf.cascade_model
        )))
    }

    pub fn classify(&mut self, crop: &GrayImage) -> Result<Verdict> {
        if crop.width() == 0 || crop.height() == 0 {
            return Err(NightwatchError::Detector("empty crop".into()));
        }
        for detector in [&mut self.primary, &mut self.fallback] {
            let hits = detector.detect(crop)?;
            if !hits.is_empty() {
                return Ok(Verdict::Positive {
                    detector: detector.name(),
                    hits,
                });
            }
        }
        Ok(Verdict::Negative)
    }
}

/// Classification stage: candidates in, trigger and evidence out.
///
pub struct ClassificationStage {
    classifier: Classifier,
    trigger: Trigger,
    storage: Storage,
    save_evidence: bool,
}

impl ClassificationStage {
    pub fn new(
        classifier: Classifier,
        trigger: Trigger,
        storage: Storage,
        save_evidence: bool,
    ) -> Self {
        Self {
            classifier,
            trigger,
            storage,
            save_evidence,
        }
    }
}

impl Stage for ClassificationStage {
    type Input = Candidate;

    fn name(&self) -> &'static str {
        define::stage::CLASSIFICATION
    }

    fn handle(&mut self, candidate: Candidate) -> Result<()> {
        match self.classifier.classify(&candidate.crop)? {
            Verdict::Positive { detector, hits } => {
                log::info!(
                    target: self.name(),
                    "TRIGGERED by still {} at {:?} ({}, {} hits)",
                    candidate.still,
                    candidate.rect,
                    detector,
                    hits.len()
                );
                // Raised first: the segment is kept even if the crop can't be saved.
                self.trigger.raise();
                if self.save_evidence {
                    let path = self
                        .storage
                        .write_evidence(&candidate.crop, chrono::Local::now())?;
                    log::info!(target: self.name(), "Evidence saved to {}", path.display());
                }
            }
            Verdict::Negative => {
                log::debug!(
                    target: self.name(),
                    "still {}: {:?} negative",
                    candidate.still,
                    candidate.rect
                );
            }
        }
        Ok(())
    }

    /// The trigger is the only output.
    fn close_outputs(&mut self) {}
}
