use image::{GenericImageView, GrayImage, Luma, RgbImage};

/// Single channel projection of a captured RGB frame.
#[must_use]
pub fn to_gray(frame: &RgbImage) -> GrayImage {
    image::imageops::grayscale(frame)
}

pub trait GrayFrameExt {
    type Item: GenericImageView<Pixel = Luma<u8>>;

    fn frame(&self) -> &Self::Item;

    /// Mean intensity over every pixel of the frame, in the range 0..=255.
    /// An empty frame has a mean of 0.
    fn mean_brightness(&self) -> f64 {
        let frame = self.frame();
        let (width, height) = frame.dimensions();
        let num_pix = u64::from(width) * u64::from(height);
        if num_pix == 0 {
            return 0.0;
        }

        let sum = frame
            .pixels()
            .map(|(_x, _y, Luma([l]))| u64::from(l))
            .sum::<u64>();

        sum as f64 / num_pix as f64
    }
}

impl<T> GrayFrameExt for T
where
    T: GenericImageView<Pixel = Luma<u8>>,
{
    type Item = T;

    fn frame(&self) -> &Self::Item {
        self
    }
}

#[cfg(test)]
mod test {
    use image::{GrayImage, Rgb, RgbImage};

    use super::*;

    #[test]
    fn test_mean_brightness() {
        #[rustfmt::skip]
        let pixs = vec![
              0,   0,
            255, 255,
        ];
        let img = GrayImage::from_vec(2, 2, pixs).unwrap();
        assert!((img.mean_brightness() - 127.5).abs() < 1e-9);
    }

    #[test]
    fn test_black_frame_is_dark() {
        let img = to_gray(&RgbImage::from_pixel(8, 6, Rgb([0, 0, 0])));
        assert_eq!(img.mean_brightness(), 0.0);
    }

    #[test]
    fn test_to_gray_keeps_dimensions_and_white() {
        let img = to_gray(&RgbImage::from_pixel(7, 3, Rgb([255, 255, 255])));
        assert_eq!(img.dimensions(), (7, 3));
        assert!(img.pixels().all(|Luma([l])| *l == 255));
    }
}
