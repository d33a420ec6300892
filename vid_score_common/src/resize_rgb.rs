use fast_image_resize::{images::ImageRef, PixelType, Resizer};
use image::{DynamicImage, RgbImage};

use std::{num::NonZeroU32, ops::Deref};

use crate::compositing::RenderError;

pub fn resize_img_rgb(
    frame: &RgbImage,
    new_width: NonZeroU32,
    new_height: NonZeroU32,
) -> Result<RgbImage, RenderError> {
    let frame = ImageRef::new(frame.width(), frame.height(), frame.deref(), PixelType::U8x3)
        .map_err(|e| RenderError::Resize(e.to_string()))?;

    let mut dst_image = DynamicImage::ImageRgb8(RgbImage::new(new_width.into(), new_height.into()));

    let mut resizer = Resizer::new();

    resizer
        .resize(&frame, &mut dst_image, None)
        .map_err(|e| RenderError::Resize(e.to_string()))?;

    let DynamicImage::ImageRgb8(dst_image) = dst_image else {
        unreachable!()
    };

    Ok(dst_image)
}
