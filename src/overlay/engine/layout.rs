use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::overlay::font::FontHandle;
use crate::overlay::{BlockShape, Orientation, TextAlign, TextBlock};

use super::geom::PointF;
use super::wrap::{WrappedText, line_width, wrap_text};

/// Per-axis spacing in pixels; negative values tighten the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpacingConfig {
    pub char_spacing_h: i32,
    pub line_spacing_h: i32,
    pub char_spacing_v: i32,
    pub col_spacing_v: i32,
    pub manual_break_extra_h: i32,
    pub manual_break_extra_v: i32,
}

impl SpacingConfig {
    /// `(char_spacing, cross_spacing, manual_break_extra)` for one orientation.
    fn for_orientation(&self, orientation: Orientation) -> (i32, i32, i32) {
        match orientation {
            Orientation::Horizontal => (
                self.char_spacing_h,
                self.line_spacing_h,
                self.manual_break_extra_h,
            ),
            Orientation::VerticalLtr | Orientation::VerticalRtl => (
                self.char_spacing_v,
                self.col_spacing_v,
                self.manual_break_extra_v,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub spacing: SpacingConfig,
    pub text_padding: i32,
    /// Fraction of each content axis kept for bubble-shaped blocks.
    pub bubble_shrink: f32,
}

impl LayoutConfig {
    pub const DEFAULT_TEXT_PADDING: i32 = 3;
    /// An ellipse clips the corners of its bounding box; 0.75 keeps text
    /// inside the curve for typical line lengths.
    pub const DEFAULT_BUBBLE_SHRINK: f32 = 0.75;
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            spacing: SpacingConfig::default(),
            text_padding: Self::DEFAULT_TEXT_PADDING,
            bubble_shrink: Self::DEFAULT_BUBBLE_SHRINK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedGlyph {
    pub ch: char,
    pub origin: PointF,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedSegment {
    pub text: String,
    /// Top-left of the line, or of the column slot.
    pub origin: PointF,
    pub manual_break: bool,
    pub glyphs: Vec<PlacedGlyph>,
}

/// Draw instructions for one block in its own unrotated frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRenderPlan {
    pub surface_width: u32,
    pub surface_height: u32,
    pub content_offset: PointF,
    pub content_width: i32,
    pub content_height: i32,
    pub orientation: Orientation,
    pub text_align: TextAlign,
    pub angle_degrees: f32,
    pub font_size_px: u32,
    pub segment_pitch: i32,
    pub column_width: f32,
    pub text_width: f32,
    pub text_height: f32,
    pub segments: Vec<PlacedSegment>,
    /// Wrapped text is larger than the content area.
    pub overflow: bool,
    /// Metrics were estimated (zero-size target or unavailable font).
    pub degraded: bool,
}

impl BlockRenderPlan {
    pub fn segment_draw_origins(&self) -> Vec<(f32, f32)> {
        self.segments
            .iter()
            .map(|segment| (segment.origin.x, segment.origin.y))
            .collect()
    }

    pub fn drawn_segments(&self) -> impl Iterator<Item = &PlacedSegment> {
        self.segments.iter().filter(|segment| !segment.manual_break)
    }
}

/// Lays out `block.translated_text` inside the block's bbox.
///
/// Fails only for a non-positive bbox. Text that does not fit is returned as
/// computed with `overflow` set.
pub fn layout_block(
    block: &TextBlock,
    config: &LayoutConfig,
    font: FontHandle<'_>,
) -> Result<BlockRenderPlan> {
    let surface_width = block.bbox.width();
    let surface_height = block.bbox.height();
    if surface_width <= 0 || surface_height <= 0 {
        bail!(
            "block {} has a non-positive bbox {:?}",
            block.id,
            block.bbox
        );
    }

    let padding = config.text_padding;
    let inset = padding.saturating_mul(2);
    let mut content_width = surface_width.saturating_sub(inset).max(1);
    let mut content_height = surface_height.saturating_sub(inset).max(1);
    let mut content_offset = PointF::new(padding as f32, padding as f32);
    if block.shape == BlockShape::Bubble {
        let shrunk_width = ((content_width as f32 * config.bubble_shrink) as i32).max(1);
        let shrunk_height = ((content_height as f32 * config.bubble_shrink) as i32).max(1);
        content_offset.x += (content_width - shrunk_width) as f32 / 2.0;
        content_offset.y += (content_height - shrunk_height) as f32 / 2.0;
        content_width = shrunk_width;
        content_height = shrunk_height;
    }

    let mut plan = BlockRenderPlan {
        surface_width: surface_width as u32,
        surface_height: surface_height as u32,
        content_offset,
        content_width,
        content_height,
        orientation: block.orientation,
        text_align: block.text_align,
        angle_degrees: block.angle_degrees,
        font_size_px: font.size_px(),
        segment_pitch: 0,
        column_width: 0.0,
        text_width: 0.0,
        text_height: 0.0,
        segments: Vec::new(),
        overflow: false,
        degraded: false,
    };
    if block.translated_text.trim().is_empty() {
        return Ok(plan);
    }

    let (char_spacing, cross_spacing, break_extra) = config.spacing.for_orientation(block.orientation);
    let max_dim = match block.orientation {
        Orientation::Horizontal => content_width,
        Orientation::VerticalLtr | Orientation::VerticalRtl => content_height,
    };
    let wrapped = wrap_text(
        &block.translated_text,
        font,
        max_dim,
        block.orientation,
        char_spacing,
        cross_spacing,
    );
    plan.segment_pitch = wrapped.segment_pitch;
    plan.degraded = wrapped.degraded;

    match block.orientation {
        Orientation::Horizontal => place_lines(&mut plan, &wrapped, font, char_spacing, break_extra),
        Orientation::VerticalLtr | Orientation::VerticalRtl => {
            place_columns(&mut plan, &wrapped, font, cross_spacing, break_extra)
        }
    }
    plan.overflow = plan.text_width > content_width as f32 || plan.text_height > content_height as f32;
    Ok(plan)
}

fn align_offset(align: TextAlign, container: f32, content: f32) -> f32 {
    match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => (container - content) / 2.0,
        TextAlign::Right => container - content,
    }
}

fn place_lines(
    plan: &mut BlockRenderPlan,
    wrapped: &WrappedText,
    font: FontHandle<'_>,
    char_spacing: i32,
    break_extra: i32,
) {
    let text_width = wrapped.max_cross_extent as f32;
    let start_x =
        plan.content_offset.x + align_offset(plan.text_align, plan.content_width as f32, text_width);
    let mut cursor_y = plan.content_offset.y;

    for segment in &wrapped.segments {
        let manual_break = segment.is_empty();
        let origin_x = if manual_break {
            start_x
        } else {
            let width = line_width(font, segment, char_spacing);
            start_x + align_offset(plan.text_align, text_width, width)
        };
        let mut glyphs = Vec::with_capacity(segment.chars().count());
        let mut glyph_x = origin_x;
        for ch in segment.chars() {
            glyphs.push(PlacedGlyph {
                ch,
                origin: PointF::new(glyph_x, cursor_y),
            });
            let mut buf = [0u8; 4];
            glyph_x += font.measure(ch.encode_utf8(&mut buf)) + char_spacing as f32;
        }
        plan.segments.push(PlacedSegment {
            text: segment.clone(),
            origin: PointF::new(origin_x, cursor_y),
            manual_break,
            glyphs,
        });
        cursor_y += wrapped.segment_pitch as f32;
        if manual_break {
            cursor_y += break_extra as f32;
        }
    }

    plan.text_width = text_width;
    plan.text_height = cursor_y - plan.content_offset.y;
}

fn place_columns(
    plan: &mut BlockRenderPlan,
    wrapped: &WrappedText,
    font: FontHandle<'_>,
    column_spacing: i32,
    break_extra: i32,
) {
    let column_width = wrapped.column_width;
    let count = wrapped.segments.len();
    let interior_breaks = wrapped.segments[..count.saturating_sub(1)]
        .iter()
        .filter(|segment| segment.is_empty())
        .count();
    let text_width = wrapped.primary_extent as f32 + (interior_breaks as i32 * break_extra) as f32;
    let start_x =
        plan.content_offset.x + align_offset(plan.text_align, plan.content_width as f32, text_width);
    let right_to_left = plan.orientation == Orientation::VerticalRtl;
    let mut column_x = if right_to_left {
        start_x + text_width - column_width
    } else {
        start_x
    };
    let top = plan.content_offset.y;

    for (index, segment) in wrapped.segments.iter().enumerate() {
        let manual_break = segment.is_empty();
        let mut glyphs = Vec::with_capacity(segment.chars().count());
        let mut glyph_y = top;
        for ch in segment.chars() {
            let mut buf = [0u8; 4];
            let advance = font.measure(ch.encode_utf8(&mut buf));
            glyphs.push(PlacedGlyph {
                ch,
                origin: PointF::new(column_x + (column_width - advance) / 2.0, glyph_y),
            });
            glyph_y += wrapped.segment_pitch as f32;
        }
        plan.segments.push(PlacedSegment {
            text: segment.clone(),
            origin: PointF::new(column_x, top),
            manual_break,
            glyphs,
        });
        if index + 1 < count {
            let mut step = column_width + column_spacing as f32;
            if manual_break {
                step += break_extra as f32;
            }
            if right_to_left {
                column_x -= step;
            } else {
                column_x += step;
            }
        }
    }

    plan.column_width = column_width;
    plan.text_width = text_width;
    plan.text_height = wrapped.max_cross_extent as f32;
}
