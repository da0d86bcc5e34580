use serde::{Deserialize, Serialize};

use crate::overlay::Orientation;
use crate::overlay::font::FontHandle;

/// Result of wrapping one string into lines (horizontal) or columns (vertical).
///
/// An empty entry in `segments` marks a manual line break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrappedText {
    pub segments: Vec<String>,
    /// Total height of all lines, or total width of all columns.
    pub primary_extent: i32,
    /// Line height, or per-character advance inside a column.
    pub segment_pitch: i32,
    /// Widest line, or tallest column.
    pub max_cross_extent: i32,
    /// Slot width of one vertical column; zero for horizontal text.
    pub column_width: f32,
    /// Set when metrics were estimated instead of measured.
    pub degraded: bool,
}

impl WrappedText {
    pub fn manual_breaks(&self) -> usize {
        self.segments.iter().filter(|segment| segment.is_empty()).count()
    }
}

/// Greedy character-level wrap. A segment that cannot hold even one
/// character still receives it; overflow is accepted.
pub fn wrap_text(
    text: &str,
    font: FontHandle<'_>,
    max_dim: i32,
    orientation: Orientation,
    char_spacing: i32,
    cross_spacing: i32,
) -> WrappedText {
    if text.is_empty() {
        let segment_pitch = match orientation {
            Orientation::Horizontal => font.line_height(cross_spacing),
            Orientation::VerticalLtr | Orientation::VerticalRtl => font.line_height(char_spacing),
        };
        return WrappedText {
            segments: Vec::new(),
            primary_extent: 0,
            segment_pitch,
            max_cross_extent: 0,
            column_width: 0.0,
            degraded: false,
        };
    }
    if max_dim <= 0 || !font.is_available() {
        return unwrapped(text, font, orientation, char_spacing, cross_spacing);
    }
    match orientation {
        Orientation::Horizontal => wrap_lines(text, font, max_dim, char_spacing, cross_spacing),
        Orientation::VerticalLtr | Orientation::VerticalRtl => {
            wrap_columns(text, font, max_dim, char_spacing, cross_spacing)
        }
    }
}

/// Width of a horizontal line including inter-character spacing.
pub(super) fn line_width(font: FontHandle<'_>, line: &str, char_spacing: i32) -> f32 {
    let count = line.chars().count();
    let spacing = if count > 1 {
        char_spacing as f32 * (count - 1) as f32
    } else {
        0.0
    };
    font.measure(line) + spacing
}

fn wrap_lines(
    text: &str,
    font: FontHandle<'_>,
    max_width: i32,
    char_spacing: i32,
    line_spacing: i32,
) -> WrappedText {
    let line_height = font.line_height(line_spacing);
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut widest = 0.0f32;

    let mut close_line = |current: &mut String, segments: &mut Vec<String>| {
        widest = widest.max(line_width(font, current, char_spacing));
        segments.push(std::mem::take(current));
    };

    for ch in text.chars() {
        if ch == '\n' {
            if !current.is_empty() {
                close_line(&mut current, &mut segments);
            }
            segments.push(String::new());
            continue;
        }
        current.push(ch);
        let overflow = line_width(font, &current, char_spacing) > max_width as f32;
        if overflow && current.chars().count() > 1 {
            current.pop();
            close_line(&mut current, &mut segments);
            current.push(ch);
        }
    }
    if !current.is_empty() {
        close_line(&mut current, &mut segments);
    }

    WrappedText {
        primary_extent: segments.len() as i32 * line_height,
        segments,
        segment_pitch: line_height,
        max_cross_extent: widest as i32,
        column_width: 0.0,
        degraded: false,
    }
}

fn wrap_columns(
    text: &str,
    font: FontHandle<'_>,
    max_height: i32,
    char_spacing: i32,
    column_spacing: i32,
) -> WrappedText {
    let char_pitch = font.line_height(char_spacing);
    let column_width = font.column_width();
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_height = 0i32;
    let mut tallest = 0i32;

    for ch in text.chars() {
        if ch == '\n' {
            if !current.is_empty() {
                tallest = tallest.max(current_height);
                segments.push(std::mem::take(&mut current));
            }
            segments.push(String::new());
            current_height = 0;
            continue;
        }
        if current.is_empty() || current_height + char_pitch <= max_height {
            current.push(ch);
            current_height += char_pitch;
        } else {
            tallest = tallest.max(current_height);
            segments.push(std::mem::replace(&mut current, ch.to_string()));
            current_height = char_pitch;
        }
    }
    if !current.is_empty() {
        tallest = tallest.max(current_height);
        segments.push(current);
    }

    WrappedText {
        primary_extent: columns_extent(segments.len(), column_width, column_spacing),
        segments,
        segment_pitch: char_pitch,
        max_cross_extent: tallest,
        column_width,
        degraded: false,
    }
}

fn columns_extent(count: usize, column_width: f32, column_spacing: i32) -> i32 {
    if count == 0 {
        return 0;
    }
    let gaps = (count - 1) as f32 * column_spacing as f32;
    (count as f32 * column_width + gaps) as i32
}

fn unwrapped(
    text: &str,
    font: FontHandle<'_>,
    orientation: Orientation,
    char_spacing: i32,
    cross_spacing: i32,
) -> WrappedText {
    match orientation {
        Orientation::Horizontal => {
            let line_height = font.line_height(cross_spacing);
            WrappedText {
                segments: vec![text.to_string()],
                primary_extent: line_height,
                segment_pitch: line_height,
                max_cross_extent: line_width(font, text, char_spacing) as i32,
                column_width: 0.0,
                degraded: true,
            }
        }
        Orientation::VerticalLtr | Orientation::VerticalRtl => {
            let char_pitch = font.line_height(char_spacing);
            let column_width = font.column_width();
            WrappedText {
                segments: vec![text.to_string()],
                primary_extent: column_width as i32,
                segment_pitch: char_pitch,
                max_cross_extent: text.chars().count() as i32 * char_pitch,
                column_width,
                degraded: true,
            }
        }
    }
}
