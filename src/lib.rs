//! Layout core for drawing translated text back over OCR'd images.
//!
//! OCR fragments are merged into lines, translated text is wrapped into a
//! block's box, and each block yields a [`overlay::BlockRenderPlan`] that a
//! [`overlay::GlyphRenderer`] draws.

pub mod batch;
pub mod logging;
pub mod overlay;
pub mod settings;
mod test_util;
pub mod typesetter;

pub use batch::layout_blocks;
pub use overlay::{
    BlockRenderPlan, BlockShape, FontLibrary, MergedLine, OcrDetection, Orientation, RawFragment,
    TextAlign, TextBlock,
};
pub use settings::{Settings, load_settings};
pub use typesetter::Typesetter;
