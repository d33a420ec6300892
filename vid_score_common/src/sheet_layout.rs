use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const A4_WIDTH_MM: f64 = 210.0;
pub const A4_HEIGHT_MM: f64 = 297.0;
pub const DEFAULT_MARGIN_MM: f64 = 5.0;

#[derive(Error, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LayoutError {
    #[error("sheet dimensions must be positive and finite, got {width_mm}mm x {height_mm}mm")]
    InvalidSheet { width_mm: f64, height_mm: f64 },

    #[error("margin of {margin_mm}mm is invalid or leaves no room for a page on the sheet")]
    InvalidMargin { margin_mm: f64 },
}

/// The geometry of one physical output sheet. All lengths are millimetres.
///
/// Each sheet holds two slots stacked vertically, separated by a gap equal to the outer margin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SheetSpec {
    width_mm: f64,
    height_mm: f64,
    margin_mm: f64,
}

impl Default for SheetSpec {
    fn default() -> Self {
        Self {
            width_mm: A4_WIDTH_MM,
            height_mm: A4_HEIGHT_MM,
            margin_mm: DEFAULT_MARGIN_MM,
        }
    }
}

impl SheetSpec {
    pub fn new(width_mm: f64, height_mm: f64, margin_mm: f64) -> Result<Self, LayoutError> {
        let valid_len = |l: f64| l.is_finite() && l > 0.0;
        if !valid_len(width_mm) || !valid_len(height_mm) {
            return Err(LayoutError::InvalidSheet {
                width_mm,
                height_mm,
            });
        }

        let ret = Self {
            width_mm,
            height_mm,
            margin_mm,
        };

        let margin_ok = margin_mm.is_finite() && margin_mm >= 0.0;
        if !margin_ok || !valid_len(ret.slot_width()) || !valid_len(ret.slot_height()) {
            return Err(LayoutError::InvalidMargin { margin_mm });
        }

        Ok(ret)
    }

    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }

    pub fn height_mm(&self) -> f64 {
        self.height_mm
    }

    pub fn margin_mm(&self) -> f64 {
        self.margin_mm
    }

    pub fn slot_width(&self) -> f64 {
        self.width_mm - 2.0 * self.margin_mm
    }

    //top margin, middle gap and bottom margin
    pub fn slot_height(&self) -> f64 {
        (self.height_mm - 3.0 * self.margin_mm) / 2.0
    }

    /// Top-left corner of the slot on the sheet.
    pub fn slot_origin(&self, slot: Slot) -> (f64, f64) {
        match slot {
            Slot::Top => (self.margin_mm, self.margin_mm),
            Slot::Bottom => (
                self.margin_mm,
                self.margin_mm + self.slot_height() + self.margin_mm,
            ),
        }
    }

    /// Scale an image of `(width, height)` pixels to fit its slot without distortion.
    /// The image is centred horizontally and top-aligned in the slot.
    ///
    /// Returns None if either dimension is zero.
    pub fn place(&self, page_index: usize, (width, height): (u32, u32)) -> Option<Placement> {
        if width == 0 || height == 0 {
            return None;
        }

        let slot = Slot::for_page(page_index);
        let slot_width = self.slot_width();
        let slot_height = self.slot_height();

        let orig_aspect = f64::from(width) / f64::from(height);
        let slot_aspect = slot_width / slot_height;

        let (w_mm, h_mm) = if orig_aspect > slot_aspect {
            (slot_width, slot_width * f64::from(height) / f64::from(width))
        } else {
            (slot_height * f64::from(width) / f64::from(height), slot_height)
        };

        let (slot_x, slot_y) = self.slot_origin(slot);

        Some(Placement {
            page_index,
            slot,
            x_mm: slot_x + (slot_width - w_mm) / 2.0,
            y_mm: slot_y,
            w_mm,
            h_mm,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Top,
    Bottom,
}

impl Slot {
    pub fn for_page(page_index: usize) -> Self {
        if page_index % 2 == 0 {
            Self::Top
        } else {
            Self::Bottom
        }
    }
}

/// Where one page image is drawn, in absolute sheet coordinates (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub page_index: usize,
    pub slot: Slot,
    pub x_mm: f64,
    pub y_mm: f64,
    pub w_mm: f64,
    pub h_mm: f64,
}

/// One physical output sheet holding zero, one or two placements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetLayout {
    placements: Vec<Placement>,
}

impl SheetLayout {
    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Lay out an ordered sequence of pages two per sheet.
///
/// Each item is the pixel size of a page, or None if the page could not be read. Unreadable
/// pages are skipped, leaving their slot empty, so `ceil(n / 2)` sheets are always produced.
pub fn compose_sheets<I>(page_dims: I, spec: &SheetSpec) -> Vec<SheetLayout>
where
    I: IntoIterator<Item = Option<(u32, u32)>>,
{
    let mut sheets: Vec<SheetLayout> = vec![];

    for (page_index, dims) in page_dims.into_iter().enumerate() {
        if page_index % 2 == 0 {
            sheets.push(SheetLayout::default());
        }

        match dims.and_then(|dims| spec.place(page_index, dims)) {
            Some(placement) => sheets[page_index / 2].placements.push(placement),
            None => log::warn!("page {page_index} could not be read. Leaving its slot empty"),
        }
    }

    sheets
}

#[cfg(test)]
mod test {
    use itertools::Itertools;

    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_within_margins(spec: &SheetSpec, p: &Placement) {
        let m = spec.margin_mm();
        let (_slot_x, slot_y) = spec.slot_origin(p.slot);

        assert!(p.x_mm >= m - EPS);
        assert!(p.x_mm + p.w_mm <= spec.width_mm() - m + EPS);
        assert!(p.y_mm >= slot_y - EPS);
        assert!(p.y_mm + p.h_mm <= slot_y + spec.slot_height() + EPS);
    }

    #[test]
    fn test_a4_slot_geometry() {
        let spec = SheetSpec::default();
        assert!((spec.slot_width() - 200.0).abs() < EPS);
        assert!((spec.slot_height() - 141.0).abs() < EPS);
        assert_eq!(spec.slot_origin(Slot::Top), (5.0, 5.0));
        assert_eq!(spec.slot_origin(Slot::Bottom), (5.0, 151.0));
    }

    #[test]
    fn test_wide_image_is_width_constrained() {
        let spec = SheetSpec::default();
        let p = spec.place(0, (1600, 400)).unwrap();

        assert!((p.w_mm - 200.0).abs() < EPS);
        assert!((p.h_mm - 50.0).abs() < EPS);
        assert!((p.x_mm - 5.0).abs() < EPS);
        assert!((p.y_mm - 5.0).abs() < EPS);
        assert_within_margins(&spec, &p);
    }

    #[test]
    fn test_tall_image_is_height_constrained_and_centred() {
        let spec = SheetSpec::default();
        let p = spec.place(1, (705, 1410)).unwrap();

        assert!((p.h_mm - 141.0).abs() < EPS);
        assert!((p.w_mm - 70.5).abs() < EPS);
        assert!((p.x_mm - (5.0 + (200.0 - 70.5) / 2.0)).abs() < EPS);
        assert!((p.y_mm - 151.0).abs() < EPS);
        assert_eq!(p.slot, Slot::Bottom);
        assert_within_margins(&spec, &p);
    }

    #[test]
    fn test_aspect_ratio_preserved() {
        let spec = SheetSpec::new(100.0, 80.0, 3.0).unwrap();
        for (idx, dims) in [(1, 1), (1920, 1080), (3, 1000), (1000, 3), (640, 480)]
            .into_iter()
            .enumerate()
        {
            let p = spec.place(idx, dims).unwrap();
            let exp = f64::from(dims.0) / f64::from(dims.1);
            assert!((p.w_mm / p.h_mm - exp).abs() < 1e-6 * exp.max(1.0));
            assert_within_margins(&spec, &p);
        }
    }

    #[test]
    fn test_zero_sized_image_not_placed() {
        assert_eq!(SheetSpec::default().place(0, (0, 10)), None);
    }

    #[test]
    fn test_three_pages_make_two_sheets() {
        let spec = SheetSpec::default();
        let sheets = compose_sheets([Some((800, 600)), Some((800, 600)), Some((800, 600))], &spec);

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].len(), 2);
        assert_eq!(sheets[0].placements()[0].slot, Slot::Top);
        assert_eq!(sheets[0].placements()[1].slot, Slot::Bottom);
        assert_eq!(sheets[1].len(), 1);
        assert_eq!(sheets[1].placements()[0].slot, Slot::Top);
        assert_eq!(sheets[1].placements()[0].page_index, 2);
    }

    #[test]
    fn test_sheet_count_is_half_rounded_up() {
        let spec = SheetSpec::default();
        for n in 0usize..9 {
            let sheets = compose_sheets((0..n).map(|_| Some((100, 100))), &spec);
            assert_eq!(sheets.len(), n.div_ceil(2));
            assert_eq!(sheets.iter().map(SheetLayout::len).sum::<usize>(), n);
        }
    }

    #[test]
    fn test_unreadable_page_leaves_slot_empty() {
        let spec = SheetSpec::default();
        let sheets = compose_sheets([Some((10, 10)), None, None, Some((10, 20))], &spec);

        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].len(), 1);
        assert_eq!(sheets[0].placements()[0].page_index, 0);

        //the remaining page keeps its bottom slot
        assert_eq!(sheets[1].len(), 1);
        assert_eq!(sheets[1].placements()[0].page_index, 3);
        assert_eq!(sheets[1].placements()[0].slot, Slot::Bottom);
    }

    #[test]
    fn test_all_unreadable_still_makes_sheets() {
        let sheets = compose_sheets([None, None], &SheetSpec::default());
        assert_eq!(sheets.len(), 1);
        assert!(sheets[0].is_empty());
    }

    #[test]
    fn test_invalid_specs() {
        assert!(matches!(
            SheetSpec::new(0.0, 297.0, 5.0),
            Err(LayoutError::InvalidSheet { .. })
        ));
        assert!(matches!(
            SheetSpec::new(210.0, f64::NAN, 5.0),
            Err(LayoutError::InvalidSheet { .. })
        ));
        assert!(matches!(
            SheetSpec::new(210.0, 297.0, -1.0),
            Err(LayoutError::InvalidMargin { .. })
        ));
        assert!(matches!(
            SheetSpec::new(210.0, 297.0, 105.0),
            Err(LayoutError::InvalidMargin { .. })
        ));
        assert!(SheetSpec::new(210.0, 297.0, 0.0).is_ok());
    }

    #[test]
    fn test_placements_never_overlap() {
        let spec = SheetSpec::new(148.0, 210.0, 8.0).unwrap();
        let sheets = compose_sheets([Some((300, 2000)), Some((2000, 300))], &spec);
        let [top, bottom] = sheets[0].placements() else {
            panic!("expected two placements");
        };

        assert!(top.y_mm + top.h_mm <= bottom.y_mm - spec.margin_mm() + EPS);
    }

    #[test]
    fn test_reading_order_is_kept() {
        let spec = SheetSpec::default();
        let dims = (1..=7).map(|i| Some((100 * i, 80)));
        let sheets = compose_sheets(dims, &spec);

        let order = sheets
            .iter()
            .flat_map(|sheet| sheet.placements().iter().map(|p| (p.page_index, p.slot)))
            .collect_vec();

        assert_eq!(order.len(), 7);
        for ((prev_idx, prev_slot), (next_idx, next_slot)) in order.into_iter().tuple_windows() {
            assert_eq!(next_idx, prev_idx + 1);
            assert_ne!(prev_slot, next_slot);
        }
    }
}
