use std::num::NonZeroU32;

use image::{GenericImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    resize_rgb::resize_img_rgb,
    sheet_layout::{Placement, SheetSpec},
};

pub const PAPER_WHITE: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderError {
    #[error("pixels per millimetre must be positive and finite, got {0}")]
    InvalidScale(f64),

    #[error("rendered sheet would be empty at {0} pixels per millimetre")]
    EmptyCanvas(f64),

    #[error("failed to resize page image: {0}")]
    Resize(String),

    #[error("failed to draw page {page_index} onto the sheet: {msg}")]
    Placement { page_index: usize, msg: String },
}

fn mm_to_px(mm: f64, px_per_mm: f64) -> u32 {
    //lengths are always non-negative here, and saturate rather than wrap
    (mm * px_per_mm).round().max(0.0) as u32
}

/// Rasterise one sheet onto a white canvas.
///
/// Each page image is resized to its placement rectangle. Placement rectangles that
/// round to zero pixels are skipped, and rectangles are clipped to the canvas edge.
pub fn render_sheet<'a, I>(
    spec: &SheetSpec,
    placed: I,
    px_per_mm: f64,
) -> Result<RgbImage, RenderError>
where
    I: IntoIterator<Item = (&'a Placement, &'a RgbImage)>,
{
    if !px_per_mm.is_finite() || px_per_mm <= 0.0 {
        return Err(RenderError::InvalidScale(px_per_mm));
    }

    let canvas_w = mm_to_px(spec.width_mm(), px_per_mm);
    let canvas_h = mm_to_px(spec.height_mm(), px_per_mm);
    if canvas_w == 0 || canvas_h == 0 {
        return Err(RenderError::EmptyCanvas(px_per_mm));
    }

    let mut canvas = RgbImage::from_pixel(canvas_w, canvas_h, PAPER_WHITE);

    for (placement, img) in placed {
        let x = mm_to_px(placement.x_mm, px_per_mm).min(canvas_w);
        let y = mm_to_px(placement.y_mm, px_per_mm).min(canvas_h);
        let w = mm_to_px(placement.w_mm, px_per_mm).min(canvas_w - x);
        let h = mm_to_px(placement.h_mm, px_per_mm).min(canvas_h - y);

        let (Some(w), Some(h)) = (NonZeroU32::new(w), NonZeroU32::new(h)) else {
            log::debug!("page {} is too small to render", placement.page_index);
            continue;
        };

        let resized = resize_img_rgb(img, w, h)?;

        canvas
            .copy_from(&resized, x, y)
            .map_err(|e| RenderError::Placement {
                page_index: placement.page_index,
                msg: e.to_string(),
            })?;
    }

    Ok(canvas)
}
