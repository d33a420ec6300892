use std::path::{Path, PathBuf};

use image::{GenericImageView, GrayImage, Luma, RgbImage};
use imageproc::contrast::ThresholdType;
use thiserror::Error;

use crate::{gray_frame::to_gray, Crop};

/// Pixels brighter than this are content; everything else is letterbox/pillarbox.
pub const CONTENT_THRESHOLD: u8 = 10;

#[derive(Error, Debug)]
pub enum AutocropError {
    #[error("failed to open page image {}: {msg}", path.display())]
    Open { path: PathBuf, msg: String },

    #[error("failed to decode page image {}: {msg}", path.display())]
    Decode { path: PathBuf, msg: String },
}

/// The smallest crop containing every pixel brighter than [`CONTENT_THRESHOLD`].
/// Returns None if the image has no such pixel.
#[must_use]
pub fn content_crop(gray: &GrayImage) -> Option<Crop> {
    let mask = imageproc::contrast::threshold(gray, CONTENT_THRESHOLD, ThresholdType::Binary);

    let masked_pixels = mask
        .enumerate_pixels()
        .filter(|(_x, _y, Luma([pix]))| *pix == 255);

    let (Some(min_x), Some(min_y), Some(max_x), Some(max_y)) = masked_pixels.fold(
        (None, None, None, None),
        |(acc_min_x, acc_min_y, acc_max_x, acc_max_y): (
            Option<u32>,
            Option<u32>,
            Option<u32>,
            Option<u32>,
        ),
         (x, y, _pix)| {
            (
                acc_min_x.map_or(Some(x), |a| Some(x.min(a))),
                acc_min_y.map_or(Some(y), |a| Some(y.min(a))),
                acc_max_x.map_or(Some(x), |a| Some(x.max(a))),
                acc_max_y.map_or(Some(y), |a| Some(y.max(a))),
            )
        },
    ) else {
        return None;
    };

    let width = (max_x - min_x) + 1;
    let height = (max_y - min_y) + 1;

    Some(Crop::from_topleft_and_dims(
        gray.dimensions(),
        min_x,
        min_y,
        width,
        height,
    ))
}

/// Strips the dark borders from a captured page. An image with no content at all
/// is returned unchanged, so the result is never empty.
#[must_use]
pub fn autocrop(img: &RgbImage) -> RgbImage {
    match content_crop(&to_gray(img)) {
        Some(crop) => {
            let (x, y, w, h) = crop.as_view_args();
            img.view(x, y, w, h).to_image()
        }
        None => {
            log::warn!("no content brighter than {CONTENT_THRESHOLD} found. Keeping the whole image");
            img.clone()
        }
    }
}

/// Reads a page image from disk and autocrops it.
pub fn autocrop_file(path: impl AsRef<Path>) -> Result<RgbImage, AutocropError> {
    let path = path.as_ref();

    let img = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(e) => AutocropError::Open {
            path: path.to_path_buf(),
            msg: e.to_string(),
        },
        e => AutocropError::Decode {
            path: path.to_path_buf(),
            msg: e.to_string(),
        },
    })?;

    Ok(autocrop(&img.to_rgb8()))
}

#[cfg(test)]
mod test {
    use image::Rgb;

    use super::*;

    fn gray_from(x: u32, y: u32, pixs: Vec<u8>) -> GrayImage {
        GrayImage::from_vec(x, y, pixs).unwrap()
    }

    //the letterbox is removed
    #[test]
    fn test_letterbox() {
        #[rustfmt::skip]
        let img = gray_from(5, 6, vec![
            0,   0,   0,   0, 0,
            0, 255, 255, 255, 0,
            0, 255, 255, 255, 0,
            0, 255, 255, 255, 0,
            0,   0,   0,   0, 0,
            0,   0,   0,   0, 0,
        ]);

        let exp = Some(Crop::from_topleft_and_dims((5, 6), 1, 1, 3, 3));
        assert_eq!(exp, content_crop(&img));
    }

    #[test]
    fn test_content_touching_edges_is_uncropped() {
        #[rustfmt::skip]
        let img = gray_from(3, 3, vec![
            200,   0,   0,
              0,   0,   0,
              0,   0,  40,
        ]);

        let crop = content_crop(&img).unwrap();
        assert_eq!(crop.as_view_args(), (0, 0, 3, 3));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        #[rustfmt::skip]
        let img = gray_from(4, 1, vec![
            10, 11, 10, 5,
        ]);

        let exp = Some(Crop::from_topleft_and_dims((4, 1), 1, 0, 1, 1));
        assert_eq!(exp, content_crop(&img));
    }

    #[test]
    fn test_single_pixel() {
        #[rustfmt::skip]
        let img = gray_from(4, 4, vec![
            0, 0,  0, 0,
            0, 0,  0, 0,
            0, 0, 99, 0,
            0, 0,  0, 0,
        ]);

        let crop = content_crop(&img).unwrap();
        assert_eq!(crop.as_view_args(), (2, 2, 1, 1));
    }

    #[test]
    fn test_all_background_is_none() {
        let img = GrayImage::from_pixel(6, 6, Luma([10]));
        assert_eq!(content_crop(&img), None);
    }

    #[test]
    fn test_autocrop_all_black_returns_original() {
        let img = RgbImage::from_pixel(6, 4, Rgb([3, 3, 3]));
        let cropped = autocrop(&img);
        assert_eq!(cropped, img);
    }

    #[test]
    fn test_autocrop_rgb_pillarbox() {
        let mut img = RgbImage::from_pixel(16, 9, Rgb([0, 0, 0]));
        for y in 0..9 {
            for x in 4..12 {
                img.put_pixel(x, y, Rgb([250, 240, 230]));
            }
        }

        let cropped = autocrop(&img);
        assert_eq!(cropped.dimensions(), (8, 9));
        assert!(cropped.pixels().all(|p| *p == Rgb([250, 240, 230])));
    }

    //every content pixel is inside the crop, and nothing outside the crop is content.
    #[test]
    fn test_crop_is_tight() {
        let (w, h) = (23, 17);
        let content_coords = [(3, 5), (19, 2), (7, 14), (11, 11)];

        let mut img = GrayImage::new(w, h);
        for (x, y) in content_coords {
            img.put_pixel(x, y, Luma([180]));
        }

        let crop = content_crop(&img).unwrap();
        for (x, y) in content_coords {
            assert!(crop.contains(x, y));
        }
        for (x, y, Luma([pix])) in img.enumerate_pixels() {
            if !crop.contains(x, y) {
                assert!(*pix <= CONTENT_THRESHOLD);
            }
        }

        assert_eq!(crop.as_view_args(), (3, 2, 17, 13));
    }

    #[test]
    fn test_autocrop_file_missing() {
        let path = std::env::temp_dir().join("vid_score_common_does_not_exist.png");
        let res = autocrop_file(&path);
        assert!(matches!(res, Err(AutocropError::Open { .. })));
    }

    #[test]
    fn test_autocrop_file_garbage() {
        let path = std::env::temp_dir().join(format!(
            "vid_score_common_garbage_{}.png",
            std::process::id()
        ));
        std::fs::write(&path, b"definitely not a png").unwrap();

        let res = autocrop_file(&path);
        let _ = std::fs::remove_file(&path);

        assert!(res.is_err());
    }
}
