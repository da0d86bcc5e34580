mod geom;
mod layout;
mod merge;
mod text;
mod wrap;

pub use geom::{Point, PointF, RawGeometry, Rect};
pub use layout::{
    BlockRenderPlan, LayoutConfig, PlacedGlyph, PlacedSegment, SpacingConfig, layout_block,
};
pub use merge::{
    ProximityThresholds, merge_detections, merge_detections_with, merge_fragments,
    merge_fragments_with,
};
pub use text::{is_cjk_language, is_sentence_end};
pub use wrap::{WrappedText, wrap_text};
