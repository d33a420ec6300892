use image::{GrayImage, Luma};
use thiserror::Error;

/// Absolute intensity difference above which a pixel counts as changed
/// between two consecutive frames.
pub const PIXEL_DIFF_THRESHOLD: u8 = 30;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDiffError {
    #[error("frames differ in size: {prev:?} vs {curr:?}")]
    DimensionMismatch { prev: (u32, u32), curr: (u32, u32) },
}

/// Counts the pixels whose absolute difference between `frame_a` and `frame_b`
/// exceeds `diff_thresh`.
pub fn count_changed_pixels(
    frame_a: &GrayImage,
    frame_b: &GrayImage,
    diff_thresh: u8,
) -> Result<u64, FrameDiffError> {
    if frame_a.dimensions() != frame_b.dimensions() {
        return Err(FrameDiffError::DimensionMismatch {
            prev: frame_a.dimensions(),
            curr: frame_b.dimensions(),
        });
    }

    //NOTE: Hot code. Runs once per decoded frame.
    let changed = frame_a
        .pixels()
        .zip(frame_b.pixels())
        .filter(|&(&Luma([a_pix]), &Luma([b_pix]))| a_pix.abs_diff(b_pix) > diff_thresh)
        .count();

    Ok(changed as u64)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_identical_frames_have_no_change() {
        let img = GrayImage::from_pixel(4, 4, Luma([128]));
        assert_eq!(count_changed_pixels(&img, &img, PIXEL_DIFF_THRESHOLD), Ok(0));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        #[rustfmt::skip]
        let a = GrayImage::from_vec(4, 1, vec![100, 100, 100, 100]).unwrap();
        #[rustfmt::skip]
        let b = GrayImage::from_vec(4, 1, vec![130, 131,  69,  70]).unwrap();

        //only the differences of 31 count.
        assert_eq!(count_changed_pixels(&a, &b, PIXEL_DIFF_THRESHOLD), Ok(2));
        assert_eq!(count_changed_pixels(&b, &a, PIXEL_DIFF_THRESHOLD), Ok(2));
    }

    #[test]
    fn test_full_inversion_changes_everything() {
        let a = GrayImage::from_pixel(10, 5, Luma([0]));
        let b = GrayImage::from_pixel(10, 5, Luma([255]));
        assert_eq!(count_changed_pixels(&a, &b, PIXEL_DIFF_THRESHOLD), Ok(50));
    }

    #[test]
    fn test_size_mismatch() {
        let a = GrayImage::new(2, 2);
        let b = GrayImage::new(2, 3);
        assert_eq!(
            count_changed_pixels(&a, &b, PIXEL_DIFF_THRESHOLD),
            Err(FrameDiffError::DimensionMismatch {
                prev: (2, 2),
                curr: (2, 3)
            })
        );
    }
}
