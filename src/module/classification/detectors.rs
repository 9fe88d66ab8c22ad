//! OpenCV people detectors.
//!
//! A Haar cascade read from an OpenCV XML file, and the HOG descriptor with
//! OpenCV's built-in people SVM.

use std::path::Path;

use image::GrayImage;
use opencv::core::{self, Size, Vector};
use opencv::objdetect::{CascadeClassifier, HOGDescriptor};
use opencv::prelude::*;

use super::Detector;
use crate::module::error::{NightwatchError, Result};
use crate::module::frame::Rect;
use crate::module::util::{conf, cv};

/// Minimum number of overlapping HOG windows for a hit.
const HOG_GROUP_THRESHOLD: f64 = 2.0;

fn model_error(what: &str, e: opencv::Error) -> NightwatchError {
    NightwatchError::Model(format!("{}: {}", what, e))
}

/// Resolve a cascade file as given or through OpenCV's data search path.
fn locate(model: &str) -> Result<String> {
    if Path::new(model).is_file() {
        return Ok(model.to_string());
    }
    let found = core::find_file(model, false, true).map_err(|e| model_error(model, e))?;
    match found.is_empty() {
        true => Err(NightwatchError::Model(format!("{}: not found", model))),
        false => Ok(found),
    }
}

/// Viola-Jones cascade.
pub struct CascadeDetector {
    classifier: CascadeClassifier,
    scale_factor: f64,
    min_neighbors: i32,
}

impl CascadeDetector {
    pub fn load(conf: &conf::Classification) -> Result<Self> {
        let path = locate(&conf.cascade_model)?;
        let classifier = CascadeClassifier::new(&path).map_err(|e| model_error(&path, e))?;
        if classifier.empty().map_err(|e| model_error(&path, e))? {
            return Err(NightwatchError::Model(format!("{}: no cascade", path)));
        }
        log::info!("Cascade loaded from {}", path);
        Ok(Self {
            classifier,
            scale_factor: conf.cascade_scale_factor as f64,
            min_neighbors: conf.cascade_min_neighbors as i32,
        })
    }
}

impl Detector for CascadeDetector {
    fn name(&self) -> &'static str {
        "cascade"
    }

    fn detect(&mut self, img: &GrayImage) -> Result<Vec<Rect>> {
        let mat = cv::gray_mat(img)?;
        let mut found = Vector::<core::Rect>::new();
        self.classifier
            .detect_multi_scale(
                &mat,
                &mut found,
                self.scale_factor,
                self.min_neighbors,
                0,
                Size::default(),
                Size::default(),
            )
            .map_err(cv::detector_error)?;
        Ok(found.iter().map(|r| cv::rect(&r)).collect())
    }
}

/// HOG + linear SVM over a sliding window pyramid (64x128 window).
pub struct HogDetector {
    hog: HOGDescriptor,
    win_stride: Size,
    padding: Size,
    scale: f64,
    hit_threshold: f64,
}

impl HogDetector {
    /// The default descriptor with OpenCV's pedestrian weights.
    pub fn people(conf: &conf::Classification) -> Result<Self> {
        let mut hog = HOGDescriptor::default().map_err(|e| model_error("HOG", e))?;
        let weights = HOGDescriptor::get_default_people_detector()
            .map_err(|e| model_error("HOG people detector", e))?;
        hog.set_svm_detector_input_array(&weights)
            .map_err(|e| model_error("HOG people detector", e))?;
        let size = |(w, h): (u32, u32)| Size::new(w as i32, h as i32);
        Ok(Self {
            hog,
            win_stride: size(conf.hog_win_stride),
            padding: size(conf.hog_padding),
            scale: conf.hog_scale as f64,
            hit_threshold: conf.hog_hit_threshold as f64,
        })
    }
}

impl Detector for HogDetector {
    fn name(&self) -> &'static str {
        "hog"
    }

    fn detect(&mut self, img: &GrayImage) -> Result<Vec<Rect>> {
        let mat = cv::gray_mat(img)?;
        let mut found = Vector::<core::Rect>::new();
        self.hog
            .detect_multi_scale(
                &mat,
                &mut found,
                self.hit_threshold,
                self.win_stride,
                self.padding,
                self.scale,
                HOG_GROUP_THRESHOLD,
                false,
            )
            .map_err(cv::detector_error)?;
        Ok(found.iter().map(|r| cv::rect(&r)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn classification() -> conf::Classification {
        conf::Config::default_config().unwrap().classification
    }

    #[test]
    fn people_detector_window_test() {
        let hog = HogDetector::people(&classification()).unwrap();
        assert_eq!(hog.hog.win_size(), Size::new(64, 128));
        assert_eq!(hog.win_stride, Size::new(4, 4));
    }

    #[test]
    fn flat_crop_has_no_people_test() {
        let mut hog = HogDetector::people(&classification()).unwrap();
        let crop = GrayImage::from_pixel(96, 160, Luma([128]));
        assert!(hog.detect(&crop).unwrap().is_empty());
    }

    #[test]
    fn missing_cascade_is_model_error_test() {
        let mut conf = classification();
        conf.cascade_model = "/nonexistent/cascade.xml".into();
        assert!(matches!(
            CascadeDetector::load(&conf),
            Err(NightwatchError::Model(_))
        ));
    }
}
