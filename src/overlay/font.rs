use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use ttf_parser::Face;
use ttf_parser::name_id;
use usvg::fontdb;

/// Glyph whose advance is the nominal vertical column pitch.
const COLUMN_REFERENCE_GLYPH: &str = "M";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FontId(pub String);

impl FontId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FontId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Font measurement capability used by the layout engine.
///
/// Implementations are called concurrently when blocks are laid out in
/// parallel. Zero or negative results are treated as unknown.
pub trait FontMetricsProvider: Send + Sync {
    /// Horizontal advance of `text` in pixels.
    fn advance_width(&self, font: &FontId, size_px: u32, text: &str) -> f32;

    /// Line pitch in pixels, `extra_spacing` included.
    fn line_height(&self, font: &FontId, size_px: u32, extra_spacing: i32) -> i32;

    fn has_font(&self, _font: &FontId) -> bool {
        true
    }
}

/// A font at a concrete pixel size, bound to the provider that measures it.
#[derive(Clone, Copy)]
pub struct FontHandle<'a> {
    provider: &'a dyn FontMetricsProvider,
    font: &'a FontId,
    size_px: u32,
}

impl<'a> FontHandle<'a> {
    pub fn new(provider: &'a dyn FontMetricsProvider, font: &'a FontId, size_px: u32) -> Self {
        Self {
            provider,
            font,
            size_px,
        }
    }

    pub fn font(&self) -> &FontId {
        self.font
    }

    pub fn size_px(&self) -> u32 {
        self.size_px
    }

    pub fn is_available(&self) -> bool {
        self.size_px > 0 && self.provider.has_font(self.font)
    }

    pub fn measure(&self, text: &str) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        if self.is_available() {
            let width = self.provider.advance_width(self.font, self.size_px, text);
            if width > 0.0 && width.is_finite() {
                return width;
            }
        }
        estimate_text_width_units(text) * self.size_px as f32
    }

    pub fn line_height(&self, extra_spacing: i32) -> i32 {
        if self.is_available() {
            let height = self
                .provider
                .line_height(self.font, self.size_px, extra_spacing);
            if height - extra_spacing > 0 {
                return height;
            }
        }
        fallback_line_height(self.size_px) + extra_spacing
    }

    /// Nominal width of one vertical column slot.
    pub fn column_width(&self) -> f32 {
        let width = self.measure(COLUMN_REFERENCE_GLYPH);
        if width > 0.0 {
            width
        } else {
            self.size_px as f32
        }
    }
}

fn fallback_line_height(size_px: u32) -> i32 {
    (size_px as f32 * 1.2) as i32
}

/// Metric estimates without any font data; always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedMetrics;

impl FontMetricsProvider for EstimatedMetrics {
    fn advance_width(&self, _font: &FontId, size_px: u32, text: &str) -> f32 {
        estimate_text_width_units(text) * size_px as f32
    }

    fn line_height(&self, _font: &FontId, size_px: u32, extra_spacing: i32) -> i32 {
        fallback_line_height(size_px) + extra_spacing
    }
}

fn estimate_char_units_for_width(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF | 0xAC00..=0xD7AF | 0xFF00..=0xFFEF
    ) {
        1.0
    } else {
        0.9
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars()
        .filter(|ch| *ch != '\n')
        .map(estimate_char_units_for_width)
        .sum()
}

#[derive(Clone)]
struct FontFace {
    data: Arc<Vec<u8>>,
    face_index: u32,
    units_per_em: u16,
    space_advance: u16,
    ascender: i16,
    descender: i16,
    family: Option<String>,
}

/// Font files registered under caller-chosen ids, measured with `ttf-parser`.
#[derive(Clone, Default)]
pub struct FontLibrary {
    faces: HashMap<FontId, FontFace>,
}

impl FontLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn family(&self, font: &FontId) -> Option<&str> {
        self.faces.get(font).and_then(|face| face.family.as_deref())
    }

    pub fn load_file(&mut self, id: FontId, path: &Path) -> Result<()> {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font: {}", path.display()))?;
        let face = parse_face(data, None)
            .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))?;
        self.faces.insert(id, face);
        Ok(())
    }

    pub fn load_data(&mut self, id: FontId, data: Vec<u8>) -> Result<()> {
        let face = parse_face(data, None)?;
        self.faces.insert(id, face);
        Ok(())
    }

    /// Looks a family up among the installed system fonts.
    pub fn load_system_family(&mut self, id: FontId, family: &str) -> Result<()> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let families = if family.eq_ignore_ascii_case("sans-serif") {
            vec![fontdb::Family::SansSerif]
        } else {
            vec![fontdb::Family::Name(family)]
        };
        let query = fontdb::Query {
            families: &families,
            ..Default::default()
        };
        let face_id = db
            .query(&query)
            .ok_or_else(|| anyhow!("font not found: {}", family))?;
        let data = db
            .with_face_data(face_id, |data, _index| data.to_vec())
            .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
        let preferred = (!family.eq_ignore_ascii_case("sans-serif")).then_some(family);
        let face = parse_face(data, preferred)?;
        self.faces.insert(id, face);
        Ok(())
    }
}

impl FontMetricsProvider for FontLibrary {
    fn advance_width(&self, font: &FontId, size_px: u32, text: &str) -> f32 {
        let Some(entry) = self.faces.get(font) else {
            return 0.0;
        };
        let Ok(face) = Face::parse(&entry.data, entry.face_index) else {
            return 0.0;
        };
        let mut advance = 0u32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let glyph_advance = face
                .glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .unwrap_or(entry.space_advance);
            advance = advance.saturating_add(glyph_advance as u32);
        }
        let units = entry.units_per_em.max(1) as f32;
        advance as f32 * (size_px as f32 / units)
    }

    fn line_height(&self, font: &FontId, size_px: u32, extra_spacing: i32) -> i32 {
        let Some(entry) = self.faces.get(font) else {
            return extra_spacing;
        };
        let size = size_px as f32;
        let scale = size / entry.units_per_em.max(1) as f32;
        let glyph_height = ((entry.ascender as i32 - entry.descender as i32) as f32 * scale) as i32;
        let line_height = if glyph_height > 0 {
            glyph_height + ((size * 0.15) as i32).max(1)
        } else {
            (size * 1.25) as i32
        };
        line_height.max((size * 0.5) as i32) + extra_spacing
    }

    fn has_font(&self, font: &FontId) -> bool {
        self.faces.contains_key(font)
    }
}

fn parse_face(data: Vec<u8>, preferred_family: Option<&str>) -> Result<FontFace> {
    let data = Arc::new(data);
    let mut fallback = None;
    let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
    for index in 0..count {
        let Ok(face) = Face::parse(&data, index) else {
            continue;
        };
        let units_per_em = face.units_per_em().max(1);
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(units_per_em / 2);
        let family = extract_family_name(&face);
        let entry = FontFace {
            data: data.clone(),
            face_index: index,
            units_per_em,
            space_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            family: family.clone(),
        };
        if let (Some(preferred), Some(found)) = (preferred_family, &family)
            && found.eq_ignore_ascii_case(preferred)
        {
            return Ok(entry);
        }
        if fallback.is_none() {
            fallback = Some(entry);
        }
    }
    fallback.ok_or_else(|| anyhow!("failed to parse font data"))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}
