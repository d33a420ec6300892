#![allow(clippy::let_and_return)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]

// #![warn(clippy::cast_lossless)]
// #![warn(clippy::cast_possible_truncation)]
// #![warn(clippy::cast_precision_loss)]

pub mod autocrop;
pub mod compositing;
mod crop;
pub mod frame_change;
pub mod gray_frame;
pub mod resize_rgb;
pub mod sheet_layout;

pub use autocrop::{autocrop, autocrop_file, content_crop, AutocropError};
pub use compositing::{render_sheet, RenderError};
pub use crop::Crop;
pub use frame_change::{count_changed_pixels, FrameDiffError, PIXEL_DIFF_THRESHOLD};
pub use gray_frame::{to_gray, GrayFrameExt};
pub use sheet_layout::{
    compose_sheets, LayoutError, Placement, SheetLayout, SheetSpec, Slot, A4_HEIGHT_MM,
    A4_WIDTH_MM, DEFAULT_MARGIN_MM,
};
