/// An axis-aligned bounding box inside a source image, stored as the distance
/// of each edge from the corresponding edge of the source.
///
/// Invariant: at least one pixel remains in each dimension, so a `Crop` is
/// always fully contained in `orig_res` and never empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Crop {
    pub orig_res: (u32, u32),
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl Crop {
    #[must_use]
    pub fn from_topleft_and_dims(
        (orig_width, orig_height): (u32, u32),
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Self {
        assert!(width > 0 && height > 0);
        assert!(x + width <= orig_width);
        assert!(y + height <= orig_height);

        let left = x;
        let right = orig_width - width - x;
        let top = y;
        let bottom = orig_height - height - y;
        Self {
            orig_res: (orig_width, orig_height),
            left,
            right,
            top,
            bottom,
        }
    }

    /// `(x, y, width, height)`, in the argument order of [`image::GenericImageView::view`]
    #[must_use]
    pub fn as_view_args(&self) -> (u32, u32, u32, u32) {
        (self.left, self.top, self.width(), self.height())
    }

    pub fn width(&self) -> u32 {
        self.orig_res.0 - (self.left + self.right)
    }

    pub fn height(&self) -> u32 {
        self.orig_res.1 - (self.top + self.bottom)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        let (orig_x, orig_y) = self.orig_res;
        (self.left..orig_x - self.right).contains(&x) && (self.top..orig_y - self.bottom).contains(&y)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_as_view_args_nocrop() {
        let crop = Crop::from_topleft_and_dims((100, 100), 0, 0, 100, 100);
        assert_eq!(crop.as_view_args(), (0, 0, 100, 100));
    }

    #[test]
    fn test_pillarbox_offsets() {
        let crop = Crop::from_topleft_and_dims((768, 432), 96, 0, 576, 432);
        assert_eq!((crop.left, crop.right, crop.top, crop.bottom), (96, 96, 0, 0));
        assert_eq!(crop.as_view_args(), (96, 0, 576, 432));
    }

    #[test]
    fn test_single_pixel() {
        let crop = Crop::from_topleft_and_dims((3, 3), 2, 2, 1, 1);
        assert_eq!((crop.width(), crop.height()), (1, 1));
        assert!(crop.contains(2, 2));
        assert!(!crop.contains(1, 2));
        assert!(!crop.contains(2, 3));
    }

    #[test]
    #[should_panic]
    fn test_overhanging_crop_panics() {
        let _ = Crop::from_topleft_and_dims((10, 10), 5, 0, 6, 10);
    }
}
