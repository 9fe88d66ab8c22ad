//! OpenCV interop.
//!
//! Gray `image` buffers are shared with OpenCV as single channel 8 bit
//! matrices without copying.

use image::GrayImage;
use opencv::boxed_ref::BoxedRef;
use opencv::core::{self, Mat};
use opencv::prelude::*;

use crate::module::error::{NightwatchError, Result};
use crate::module::frame::Rect;

/// Borrow `img` as a `CV_8UC1` matrix.
pub fn gray_mat(img: &GrayImage) -> Result<BoxedRef<'_, Mat>> {
    Mat::new_rows_cols_with_data(img.height() as i32, img.width() as i32, img.as_raw())
        .map_err(detector_error)
}

/// Copy a continuous `CV_8UC1` matrix into a gray image.
pub fn mat_gray(mat: &Mat) -> Result<GrayImage> {
    let (w, h) = (mat.cols().max(0) as u32, mat.rows().max(0) as u32);
    let bytes = mat.data_bytes().map_err(detector_error)?;
    GrayImage::from_raw(w, h, bytes.to_vec())
        .ok_or_else(|| NightwatchError::Detector(format!("unexpected {}x{} matrix layout", w, h)))
}

pub fn rect(r: &core::Rect) -> Rect {
    let (x, y) = (r.x.max(0), r.y.max(0));
    Rect::new(
        x as u32,
        y as u32,
        (r.x + r.width - x).max(0) as u32,
        (r.y + r.height - y).max(0) as u32,
    )
}

pub fn detector_error(e: opencv::Error) -> NightwatchError {
    NightwatchError::Detector(e.to_string())
}
