//! Foreground mask morphology and region extraction.
//!

use image::{imageops, GrayImage, Luma};
use imageproc::contours::{self, BorderType};
use imageproc::contrast::{self, ThresholdType};
use imageproc::morphology::{self, Mask};

use crate::module::frame::Rect;

/// Any nonzero pixel becomes 255.
pub fn binarize(mask: &GrayImage) -> GrayImage {
    contrast::threshold(mask, 0, ThresholdType::Binary)
}

/// Dilation with a `kw` x `kh` rectangle anchored at its center.
///
/// Both sides must be below 256.
pub fn dilate(mask: &GrayImage, kw: u32, kh: u32) -> GrayImage {
    let kernel = GrayImage::from_pixel(kw, kh, Luma([u8::MAX]));
    let kernel = Mask::from_image(&kernel, (kw / 2) as u8, (kh / 2) as u8);
    morphology::grayscale_dilate(mask, &kernel)
}

/// Bounding boxes of the outermost foreground regions, in scan order.
///
/// Regions nested in another region's hole are not reported.
pub fn external_regions(mask: &GrayImage) -> Vec<Rect> {
    // Border following needs background around the image.
    let (w, h) = mask.dimensions();
    let mut framed = GrayImage::new(w + 2, h + 2);
    imageops::replace(&mut framed, mask, 1, 1);

    contours::find_contours::<u32>(&framed)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| {
            let x1 = c.points.iter().map(|p| p.x).min()?;
            let y1 = c.points.iter().map(|p| p.y).min()?;
            let x2 = c.points.iter().map(|p| p.x).max()?;
            let y2 = c.points.iter().map(|p| p.y).max()?;
            Some(Rect::new(x1 - 1, y1 - 1, x2 - x1 + 1, y2 - y1 + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> GrayImage {
        let h = rows.len() as u32;
        let w = rows[0].len() as u32;
        GrayImage::from_fn(w, h, |x, y| {
            Luma([(rows[y as usize].as_bytes()[x as usize] == b'#') as u8 * 255])
        })
    }

    #[test]
    fn binarize_test() {
        let mask = GrayImage::from_raw(4, 1, vec![0, 1, 127, 255]).unwrap();
        assert_eq!(binarize(&mask).into_raw(), vec![0, 255, 255, 255]);
    }

    #[test]
    fn dilate_grows_by_half_kernel_test() {
        let mask = mask_from(&[".......", ".......", "...#...", ".......", "......."]);
        let out = dilate(&mask, 3, 5);
        assert_eq!(out.pixels().filter(|p| p[0] != 0).count(), 15);
        assert_eq!(external_regions(&out), vec![Rect::new(2, 0, 3, 5)]);
    }

    #[test]
    fn separate_and_diagonal_regions_test() {
        let mask = mask_from(&[
            "##......", //
            "##...#..",
            "......#.",
            "........",
            "......##",
        ]);
        let regions = external_regions(&mask);
        assert_eq!(
            regions,
            vec![
                Rect::new(0, 0, 2, 2),
                Rect::new(5, 1, 2, 2),
                Rect::new(6, 4, 2, 1)
            ]
        );
    }

    #[test]
    fn nested_region_is_absorbed_test() {
        let mask = mask_from(&[
            ".......", //
            ".#####.",
            ".#...#.",
            ".#.#.#.",
            ".#...#.",
            ".#####.",
            ".......",
        ]);
        assert_eq!(external_regions(&mask), vec![Rect::new(1, 1, 5, 5)]);
    }

    #[test]
    fn region_on_the_left_edge_test() {
        let mask = mask_from(&["#....", "#....", "....#"]);
        assert_eq!(
            external_regions(&mask),
            vec![Rect::new(0, 0, 1, 2), Rect::new(4, 2, 1, 1)]
        );
    }

    #[test]
    fn empty_mask_has_no_regions_test() {
        assert!(external_regions(&GrayImage::new(20, 15)).is_empty());
    }
}
