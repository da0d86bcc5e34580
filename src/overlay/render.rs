use anyhow::{Result, bail};

use super::engine::{BlockRenderPlan, Rect};
use super::style::{ResolvedStyle, Rgba};
use super::BlockShape;

/// Consumer of render plans; owns glyph drawing, fills and rotation.
pub trait GlyphRenderer {
    fn draw_block(
        &mut self,
        bbox: &Rect,
        shape: BlockShape,
        plan: &BlockRenderPlan,
        style: &ResolvedStyle,
    ) -> Result<()>;
}

/// Writes blocks as SVG markup over an image-sized canvas.
pub struct SvgRenderer {
    width: u32,
    height: u32,
    font_family: Option<String>,
    body: String,
}

impl SvgRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            font_family: None,
            body: String::new(),
        }
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn finish(self) -> String {
        let mut svg = String::new();
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        ));
        svg.push_str(&self.body);
        svg.push_str("</svg>");
        svg
    }
}

impl GlyphRenderer for SvgRenderer {
    fn draw_block(
        &mut self,
        bbox: &Rect,
        shape: BlockShape,
        plan: &BlockRenderPlan,
        style: &ResolvedStyle,
    ) -> Result<()> {
        if plan.surface_width == 0 || plan.surface_height == 0 {
            bail!("render plan has an empty surface");
        }
        let w = plan.surface_width as f32;
        let h = plan.surface_height as f32;
        self.body.push_str(&format!(
            r#"<g transform="translate({x} {y}) rotate({angle} {cx} {cy})">"#,
            x = bbox.x0,
            y = bbox.y0,
            angle = plan.angle_degrees,
            cx = w / 2.0,
            cy = h / 2.0
        ));

        if style.background_color.is_visible() {
            let fill = paint("fill", style.background_color);
            match shape {
                BlockShape::Bubble => self.body.push_str(&format!(
                    r#"<ellipse cx="{cx}" cy="{cy}" rx="{rx}" ry="{ry}" {fill}/>"#,
                    cx = w / 2.0,
                    cy = h / 2.0,
                    rx = w / 2.0,
                    ry = h / 2.0,
                )),
                BlockShape::Box => self.body.push_str(&format!(
                    r#"<rect x="0" y="0" width="{w}" height="{h}" {fill}/>"#
                )),
            }
        }

        let mut attrs = format!(
            r#"font-size="{size}" {fill}"#,
            size = plan.font_size_px,
            fill = paint("fill", style.main_color)
        );
        if let Some(family) = &self.font_family {
            attrs.push_str(&format!(r#" font-family="{}""#, escape_xml(family)));
        }
        if style.draws_outline() {
            attrs.push_str(&format!(
                r#" {stroke} stroke-width="{width}" paint-order="stroke""#,
                stroke = paint("stroke", style.outline_color),
                width = style.outline_thickness * 2
            ));
        }

        let baseline = plan.font_size_px as f32;
        for segment in plan.drawn_segments() {
            for glyph in &segment.glyphs {
                let mut buf = [0u8; 4];
                self.body.push_str(&format!(
                    r#"<text x="{x}" y="{y}" {attrs}>{text}</text>"#,
                    x = glyph.origin.x,
                    y = glyph.origin.y + baseline,
                    text = escape_xml(glyph.ch.encode_utf8(&mut buf))
                ));
            }
        }
        self.body.push_str("</g>");
        Ok(())
    }
}

fn paint(attr: &str, color: Rgba) -> String {
    format!(
        r#"{attr}="{hex}" {attr}-opacity="{opacity:.3}""#,
        hex = color.to_hex(),
        opacity = color.opacity()
    )
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
