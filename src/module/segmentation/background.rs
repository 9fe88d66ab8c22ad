//! Background Models
//!
//! With the `opencv` feature the segmentation stage runs OpenCV's MOG2
//! subtractor; otherwise a per-pixel running Gaussian.

use image::{GrayImage, Luma};

use crate::module::error::Result;
use crate::module::util::conf;

/// Running model of the static scene.
///
/// `apply` updates the model with `frame` and returns the foreground mask
/// (nonzero = foreground) of the same size.
pub trait BackgroundModel: Send {
    fn apply(&mut self, frame: &GrayImage) -> Result<GrayImage>;
}

/// The background model of this build.
#[cfg(feature = "opencv")]
pub fn from_conf(conf: &conf::Segmentation) -> Result<Mog2> {
    Mog2::new(conf.background_history_length, conf.variance_threshold)
}

/// The background model of this build.
#[cfg(not(feature = "opencv"))]
pub fn from_conf(conf: &conf::Segmentation) -> Result<AdaptiveBackground> {
    Ok(AdaptiveBackground::new(
        conf.background_history_length,
        conf.variance_threshold,
    ))
}

const VARIANCE_INIT: f32 = 15.0 * 15.0;
const VARIANCE_MIN: f32 = 4.0;
const FOREGROUND: u8 = 255;

/// Per-pixel running Gaussian.
///
/// The learning rate is `1 / min(frames seen, history)`, so the model averages
/// the first frames evenly and then forgets with a fixed horizon. A pixel is
/// foreground when its squared distance to the mean exceeds
/// `variance_threshold` variances. The first frame only seeds the model.
pub struct AdaptiveBackground {
    history: u32,
    variance_threshold: f32,
    seen: u32,
    size: (u32, u32),
    mean: Vec<f32>,
    variance: Vec<f32>,
}

impl AdaptiveBackground {
    pub fn new(history: u32, variance_threshold: f32) -> Self {
        Self {
            history: history.max(1),
            variance_threshold,
            seen: 0,
            size: (0, 0),
            mean: vec![],
            variance: vec![],
        }
    }

    fn reset(&mut self, frame: &GrayImage) {
        self.size = frame.dimensions();
        self.mean = frame.pixels().map(|p| p[0] as f32).collect();
        self.variance = vec![VARIANCE_INIT; self.mean.len()];
        self.seen = 1;
    }
}

impl BackgroundModel for AdaptiveBackground {
    fn apply(&mut self, frame: &GrayImage) -> Result<GrayImage> {
        let (w, h) = frame.dimensions();
        if self.seen == 0 || self.size != (w, h) {
            if self.seen != 0 {
                log::warn!("Frame size changed to {}x{}, background reset", w, h);
            }
            self.reset(frame);
            return Ok(GrayImage::new(w, h));
        }

        self.seen = self.seen.saturating_add(1);
        let alpha = 1.0 / self.seen.min(self.history) as f32;
        let mut mask = GrayImage::new(w, h);
        for (i, (x, y, px)) in frame.enumerate_pixels().enumerate() {
            let value = px[0] as f32;
            let diff = value - self.mean[i];
            let dist2 = diff * diff;
            if dist2 > self.variance_threshold * self.variance[i] {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
            }
            self.mean[i] += alpha * diff;
            let variance = self.variance[i] + alpha * (dist2 - self.variance[i]);
            self.variance[i] = variance.max(VARIANCE_MIN);
        }
        Ok(mask)
    }
}

/// OpenCV's Gaussian mixture subtractor. Shadows count as foreground.
#[cfg(feature = "opencv")]
pub struct Mog2 {
    subtractor: opencv::core::Ptr<opencv::video::BackgroundSubtractorMOG2>,
}

#[cfg(feature = "opencv")]
impl Mog2 {
    pub fn new(history: u32, variance_threshold: f32) -> Result<Self> {
        let subtractor = opencv::video::create_background_subtractor_mog2(
            history as i32,
            variance_threshold as f64,
            true,
        )
        .map_err(|e| crate::module::error::NightwatchError::Model(format!("MOG2: {}", e)))?;
        Ok(Self { subtractor })
    }
}

#[cfg(feature = "opencv")]
impl BackgroundModel for Mog2 {
    fn apply(&mut self, frame: &GrayImage) -> Result<GrayImage> {
        use crate::module::util::cv;
        use opencv::video::BackgroundSubtractorMOG2Trait;

        let input = cv::gray_mat(frame)?;
        let mut mask = opencv::core::Mat::default();
        BackgroundSubtractorMOG2Trait::apply(&mut self.subtractor, &input, &mut mask, -1.0)
            .map_err(cv::detector_error)?;
        cv::mat_gray(&mask)
    }
}
