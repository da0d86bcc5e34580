use serde::{Deserialize, Serialize};

use super::TextBlock;
use super::font::FontId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Accepts `r,g,b`, `r,g,b,a`, `#rrggbb` and `#rrggbbaa`.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        let parts: Vec<u8> = value
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .ok()?;
        match parts.as_slice() {
            [r, g, b] => Some(Self::new(*r, *g, *b, 255)),
            [r, g, b, a] => Some(Self::new(*r, *g, *b, *a)),
            _ => None,
        }
    }

    pub fn parse_or(value: &str, default: Rgba) -> Self {
        Self::parse(value).unwrap_or(default)
    }

    pub fn is_visible(&self) -> bool {
        self.a > 0
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn opacity(&self) -> f32 {
        self.a as f32 / 255.0
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
        return None;
    }
    let channel = |idx: usize| u8::from_str_radix(&hex[idx..idx + 2], 16).ok();
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Some(Rgba::new(channel(0)?, channel(2)?, channel(4)?, alpha))
}

/// Per-block overrides; `None` falls through to the configured defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StyleOverride {
    pub main_color: Option<Rgba>,
    pub outline_color: Option<Rgba>,
    pub background_color: Option<Rgba>,
    pub outline_thickness: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDefaults {
    pub font: FontId,
    pub font_size_px: u32,
    pub main_color: Rgba,
    pub outline_color: Rgba,
    pub background_color: Rgba,
    pub outline_thickness: u32,
}

impl StyleDefaults {
    pub const DEFAULT_FONT: &'static str = "msyh.ttc";
    pub const DEFAULT_FONT_SIZE: u32 = 24;
    pub const DEFAULT_MAIN_COLOR: Rgba = Rgba::new(255, 255, 255, 255);
    pub const DEFAULT_OUTLINE_COLOR: Rgba = Rgba::new(0, 0, 0, 255);
    pub const DEFAULT_BACKGROUND_COLOR: Rgba = Rgba::new(0, 0, 0, 128);
    pub const DEFAULT_OUTLINE_THICKNESS: u32 = 2;
}

impl Default for StyleDefaults {
    fn default() -> Self {
        Self {
            font: FontId::new(Self::DEFAULT_FONT),
            font_size_px: Self::DEFAULT_FONT_SIZE,
            main_color: Self::DEFAULT_MAIN_COLOR,
            outline_color: Self::DEFAULT_OUTLINE_COLOR,
            background_color: Self::DEFAULT_BACKGROUND_COLOR,
            outline_thickness: Self::DEFAULT_OUTLINE_THICKNESS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStyle {
    pub font: FontId,
    pub font_size_px: u32,
    pub main_color: Rgba,
    pub outline_color: Rgba,
    pub background_color: Rgba,
    pub outline_thickness: u32,
}

impl ResolvedStyle {
    pub fn draws_outline(&self) -> bool {
        self.outline_thickness > 0 && self.outline_color.is_visible()
    }
}

/// Merges a block's overrides onto the defaults. The resolved font size is
/// always positive.
pub fn resolve_style(block: &TextBlock, defaults: &StyleDefaults) -> ResolvedStyle {
    let font_size_px = if block.font_size_px > 0 {
        block.font_size_px
    } else if defaults.font_size_px > 0 {
        defaults.font_size_px
    } else {
        StyleDefaults::DEFAULT_FONT_SIZE
    };
    let style = &block.style;
    ResolvedStyle {
        font: defaults.font.clone(),
        font_size_px,
        main_color: style.main_color.unwrap_or(defaults.main_color),
        outline_color: style.outline_color.unwrap_or(defaults.outline_color),
        background_color: style.background_color.unwrap_or(defaults.background_color),
        outline_thickness: style.outline_thickness.unwrap_or(defaults.outline_thickness),
    }
}
