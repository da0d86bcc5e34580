mod cache;
mod engine;
mod font;
mod render;
mod style;

pub use cache::{LayoutVersion, RenderCache};
pub use engine::{
    BlockRenderPlan, LayoutConfig, PlacedGlyph, PlacedSegment, Point, PointF, ProximityThresholds,
    RawGeometry, Rect, SpacingConfig, WrappedText, is_cjk_language, is_sentence_end, layout_block,
    merge_detections, merge_detections_with, merge_fragments, merge_fragments_with, wrap_text,
};
pub use font::{EstimatedMetrics, FontHandle, FontId, FontLibrary, FontMetricsProvider};
pub use render::{GlyphRenderer, SvgRenderer};
pub use style::{ResolvedStyle, Rgba, StyleDefaults, StyleOverride, resolve_style};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub type BlockId = u64;

/// One OCR detection as delivered by a provider, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrDetection {
    pub geometry: RawGeometry,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFragment {
    pub id: usize,
    pub text: String,
    pub bbox: Rect,
    pub vertices: Vec<Point>,
}

impl RawFragment {
    pub fn from_bbox(id: usize, text: impl Into<String>, bbox: Rect) -> Self {
        Self {
            id,
            text: text.into(),
            bbox,
            vertices: bbox.corners().to_vec(),
        }
    }

    /// Validates a provider detection; `None` for blank text or unusable geometry.
    pub fn from_detection(id: usize, detection: &OcrDetection) -> Option<Self> {
        let text = detection.text.trim();
        if text.is_empty() {
            debug!("dropping OCR detection {}: empty text", id);
            return None;
        }
        let Some(vertices) = detection.geometry.vertices() else {
            debug!("dropping OCR detection {}: malformed geometry", id);
            return None;
        };
        let bbox = Rect::from_points(&vertices)?;
        if !bbox.is_valid() {
            debug!("dropping OCR detection {}: degenerate bbox {:?}", id, bbox);
            return None;
        }
        Some(Self {
            id,
            text: text.to_string(),
            bbox,
            vertices: vertices.to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedLine {
    pub text: String,
    pub vertices: Vec<Point>,
    pub bbox: Rect,
    pub fragment_ids: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    VerticalLtr,
    VerticalRtl,
}

impl Orientation {
    pub fn is_vertical(self) -> bool {
        !matches!(self, Orientation::Horizontal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Horizontal text starts on the left; vertical columns hug the right edge.
    pub fn default_for(orientation: Orientation) -> Self {
        if orientation.is_vertical() {
            TextAlign::Right
        } else {
            TextAlign::Left
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockShape {
    #[default]
    Box,
    Bubble,
}

/// A translated region ready for layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub id: BlockId,
    pub original_text: String,
    pub translated_text: String,
    pub bbox: Rect,
    pub orientation: Orientation,
    pub angle_degrees: f32,
    /// `0` defers to the configured default size.
    pub font_size_px: u32,
    pub text_align: TextAlign,
    pub shape: BlockShape,
    #[serde(default)]
    pub style: StyleOverride,
}

impl TextBlock {
    pub fn new(id: BlockId, bbox: Rect, orientation: Orientation) -> Self {
        Self {
            id,
            original_text: String::new(),
            translated_text: String::new(),
            bbox,
            orientation,
            angle_degrees: 0.0,
            font_size_px: 0,
            text_align: TextAlign::default_for(orientation),
            shape: BlockShape::Box,
            style: StyleOverride::default(),
        }
    }

    /// Builds a block from a merged OCR line and its translation.
    pub fn from_merged_line(
        id: BlockId,
        line: &MergedLine,
        translated_text: impl Into<String>,
        orientation: Orientation,
    ) -> Self {
        let mut block = Self::new(id, line.bbox, orientation);
        block.original_text = line.text.clone();
        block.translated_text = translated_text.into();
        block
    }

    pub fn with_text(mut self, translated_text: impl Into<String>) -> Self {
        self.translated_text = translated_text.into();
        self
    }

    /// Sets the angle, normalised into `[0, 360)`.
    pub fn set_angle(&mut self, degrees: f32) {
        let normalized = degrees.rem_euclid(360.0);
        self.angle_degrees = if normalized.is_finite() { normalized } else { 0.0 };
    }
}
