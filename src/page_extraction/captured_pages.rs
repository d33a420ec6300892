use image::RgbImage;

/// One detected page: the autocropped frame plus where in the video it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPage {
    frame_index: u64,
    image: RgbImage,
}

impl CapturedPage {
    /// Zero-based position of the source frame in the decoded stream.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

/// The pages captured from one video, in detection order (which is also display order).
///
/// Pages can only be appended, and only by the detector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedPages {
    pages: Vec<CapturedPage>,
}

impl CapturedPages {
    pub(crate) fn push(&mut self, frame_index: u64, image: RgbImage) -> usize {
        self.pages.push(CapturedPage { frame_index, image });
        self.pages.len() - 1
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True if nothing ever passed the brightness and change criteria.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&CapturedPage> {
        self.pages.get(idx)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &CapturedPage> {
        self.pages.iter()
    }

    pub fn frame_indices(&self) -> impl ExactSizeIterator<Item = u64> + '_ {
        self.pages.iter().map(CapturedPage::frame_index)
    }

    pub fn into_images(self) -> impl ExactSizeIterator<Item = RgbImage> {
        self.pages.into_iter().map(CapturedPage::into_image)
    }
}

impl IntoIterator for CapturedPages {
    type Item = CapturedPage;
    type IntoIter = std::vec::IntoIter<CapturedPage>;

    fn into_iter(self) -> Self::IntoIter {
        self.pages.into_iter()
    }
}
