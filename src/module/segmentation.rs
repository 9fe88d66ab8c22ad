//! Motion segmentation.
//!
//! Stills are shrunk to a tiny working resolution, compared against the
//! background model, and every plausible foreground region is cropped from the
//! full resolution still and handed to classification.

pub mod background;
pub mod region;

use image::imageops::{self, FilterType};

use self::background::BackgroundModel;
use crate::module::channel::Outbox;
use crate::module::define;
use crate::module::error::Result;
use crate::module::frame::{Candidate, Rect, StillFrame};
use crate::module::stage::Stage;
use crate::module::util::conf;

/// Turns stills into candidates. Owns the background model.
///
pub struct Segmenter<B: BackgroundModel> {
    model: B,
    conf: conf::Segmentation,
}

impl<B: BackgroundModel> Segmenter<B> {
    pub fn new(model: B, conf: conf::Segmentation) -> Self {
        Self { model, conf }
    }

    /// Native resolution boxes of the moving regions in `still`, before filtering.
    pub fn regions(&mut self, still: &StillFrame) -> Result<Vec<Rect>> {
        let (w, h) = still.image.dimensions();
        if w == 0 || h == 0 {
            return Ok(vec![]);
        }
        let (ww, wh) = (self.conf.working_width, self.conf.working_height);
        let small = imageops::resize(&still.image, ww, wh, FilterType::Triangle);
        let mask = self.model.apply(&small)?;
        let mask = region::binarize(&mask);
        let mask = region::dilate(&mask, self.conf.dilate_width, self.conf.dilate_height);
        let (sx, sy) = (w as f32 / ww as f32, h as f32 / wh as f32);
        Ok(region::external_regions(&mask)
            .into_iter()
            .map(|r| r.scale(sx, sy))
            .collect())
    }

    /// Candidates of `still`: one per region narrower than the width limit.
    pub fn process(&mut self, still: &StillFrame) -> Result<Vec<Candidate>> {
        let (w, h) = still.image.dimensions();
        let max_width = self.conf.max_candidate_width_px;
        let candidates = self
            .regions(still)?
            .into_iter()
            .filter(|r| {
                let plausible = r.width < max_width;
                if !plausible {
                    log::debug!(
                        target: define::stage::SEGMENTATION,
                        "still {}: drop {:?} (too wide)",
                        still.ordinal,
                        r
                    );
                }
                plausible
            })
            .map(|r| r.clamp(w, h))
            .filter(|r| r.area() > 0)
            .map(|rect| Candidate {
                still: still.ordinal,
                rect,
                crop: imageops::crop_imm(&still.image, rect.x, rect.y, rect.width, rect.height)
                    .to_image(),
            })
            .collect();
        Ok(candidates)
    }
}

/// Segmentation stage: stills in, candidates out.
///
pub struct SegmentationStage<B: BackgroundModel> {
    segmenter: Segmenter<B>,
    candidates: Outbox<Candidate>,
}

impl<B: BackgroundModel> SegmentationStage<B> {
    pub fn new(segmenter: Segmenter<B>, candidates: Outbox<Candidate>) -> Self {
        Self {
            segmenter,
            candidates,
        }
    }
}

impl<B: BackgroundModel> Stage for SegmentationStage<B> {
    type Input = StillFrame;

    fn name(&self) -> &'static str {
        define::stage::SEGMENTATION
    }

    fn handle(&mut self, still: StillFrame) -> Result<()> {
        let candidates = self.segmenter.process(&still)?;
        log::debug!(
            target: self.name(),
            "still {} ({}): {} candidates",
            still.ordinal,
            still.captured_at.format(define::naming::TIME_FORMAT),
            candidates.len()
        );
        for candidate in candidates {
            self.candidates.send(candidate)?;
        }
        Ok(())
    }

    fn close_outputs(&mut self) {
        self.candidates.close();
    }
}
