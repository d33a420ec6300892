use std::path::PathBuf;

use image::RgbImage;
use rayon::prelude::*;
use vid_score_common::{autocrop_file, Placement, SheetLayout};

/// Decode and autocrop page images that were extracted earlier.
///
/// Images are processed in parallel but returned in the order given. An image that
/// cannot be read is logged and becomes None, so the compositor leaves its slot empty.
pub fn load_page_images(paths: &[PathBuf]) -> Vec<Option<RgbImage>> {
    paths
        .par_iter()
        .map(|path| match autocrop_file(path) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("{e}");
                None
            }
        })
        .collect()
}

/// Pair each placement on a sheet with its page image. Placements whose image is
/// missing are skipped.
pub fn placed_images<'a>(
    layout: &'a SheetLayout,
    images: &'a [Option<RgbImage>],
) -> impl Iterator<Item = (&'a Placement, &'a RgbImage)> + 'a {
    layout.placements().iter().filter_map(move |placement| {
        images
            .get(placement.page_index)
            .and_then(Option::as_ref)
            .map(|img| (placement, img))
    })
}
