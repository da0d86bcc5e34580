use anyhow::Result;

use crate::overlay::{
    BlockRenderPlan, FontHandle, FontMetricsProvider, GlyphRenderer, MergedLine, OcrDetection,
    RawFragment, RenderCache, ResolvedStyle, TextBlock, layout_block, merge_detections_with,
    merge_fragments_with, resolve_style,
};
use crate::settings::Settings;

/// Settings plus a metrics source; the entry point callers hold on to.
pub struct Typesetter<M> {
    settings: Settings,
    metrics: M,
}

impl<M: FontMetricsProvider> Typesetter<M> {
    pub fn new(settings: Settings, metrics: M) -> Self {
        Self { settings, metrics }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Swaps in reloaded settings. Plans cached under the old settings stop
    /// matching because the layout config is part of their version.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    pub fn metrics_mut(&mut self) -> &mut M {
        &mut self.metrics
    }

    pub fn merge(&self, fragments: &[RawFragment], language_hint: &str) -> Vec<MergedLine> {
        merge_fragments_with(fragments, language_hint, &self.settings.merge)
    }

    pub fn merge_detections(
        &self,
        detections: &[OcrDetection],
        language_hint: &str,
    ) -> Vec<MergedLine> {
        merge_detections_with(detections, language_hint, &self.settings.merge)
    }

    pub fn style_for(&self, block: &TextBlock) -> ResolvedStyle {
        resolve_style(block, &self.settings.style)
    }

    pub fn plan(&self, block: &TextBlock) -> Result<BlockRenderPlan> {
        let style = self.style_for(block);
        let font = FontHandle::new(&self.metrics, &style.font, style.font_size_px);
        layout_block(block, &self.settings.layout, font)
    }

    pub fn plan_cached<'c>(
        &self,
        cache: &'c mut RenderCache,
        block: &TextBlock,
    ) -> Result<&'c BlockRenderPlan> {
        let style = self.style_for(block);
        let font = FontHandle::new(&self.metrics, &style.font, style.font_size_px);
        cache.get_or_layout(block, &self.settings.layout, font)
    }

    /// Lays out the block and hands the plan to `renderer` with its style.
    pub fn render(&self, renderer: &mut dyn GlyphRenderer, block: &TextBlock) -> Result<()> {
        let plan = self.plan(block)?;
        let style = self.style_for(block);
        renderer.draw_block(&block.bbox, block.shape, &plan, &style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{
        EstimatedMetrics, Orientation, RawGeometry, Rect, SvgRenderer, is_cjk_language,
    };

    fn typesetter() -> Typesetter<EstimatedMetrics> {
        Typesetter::new(Settings::default(), EstimatedMetrics)
    }

    #[test]
    fn merge_uses_configured_thresholds() {
        let fragments = vec![
            RawFragment::from_bbox(0, "left", Rect::new(0, 0, 40, 20)),
            RawFragment::from_bbox(1, "right", Rect::new(80, 0, 120, 20)),
        ];
        let default_lines = typesetter().merge(&fragments, "en");
        assert_eq!(default_lines.len(), 2);

        let mut settings = Settings::default();
        settings.merge.max_horizontal_gap_ratio = 3.0;
        let wide = Typesetter::new(settings, EstimatedMetrics);
        let lines = wide.merge(&fragments, "en");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "left right");
    }

    #[test]
    fn detections_are_validated_before_merging() {
        let detections = vec![
            OcrDetection {
                geometry: RawGeometry::Flat(vec![0.0, 0.0, 30.0, 0.0, 30.0, 20.0, 0.0, 20.0]),
                text: "日本".to_string(),
            },
            OcrDetection {
                geometry: RawGeometry::Flat(vec![1.0, 2.0]),
                text: "broken".to_string(),
            },
            OcrDetection {
                geometry: RawGeometry::Points(vec![
                    [32.0, 0.0],
                    [60.0, 0.0],
                    [60.0, 20.0],
                    [32.0, 20.0],
                ]),
                text: "語".to_string(),
            },
        ];
        assert!(is_cjk_language("ja"));
        let lines = typesetter().merge_detections(&detections, "ja");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "日本語");
        assert_eq!(lines[0].fragment_ids, vec![0, 2]);
    }

    #[test]
    fn plan_applies_block_font_size() {
        let mut block = TextBlock::new(1, Rect::new(0, 0, 200, 100), Orientation::Horizontal)
            .with_text("size");
        let ts = typesetter();
        assert_eq!(ts.plan(&block).unwrap().font_size_px, 24);
        block.font_size_px = 12;
        assert_eq!(ts.plan(&block).unwrap().font_size_px, 12);
    }

    #[test]
    fn huge_padding_from_settings_still_lays_out() {
        let mut settings = Settings::default();
        settings
            .merge_toml("[layout]\ntext_padding = 1500000000\n")
            .unwrap();
        assert_eq!(settings.layout.text_padding, 1_500_000_000);
        let block = TextBlock::new(1, Rect::new(0, 0, 100, 100), Orientation::Horizontal)
            .with_text("padded");
        let plan = Typesetter::new(settings, EstimatedMetrics).plan(&block).unwrap();
        assert_eq!(plan.content_width, 1);
        assert!(plan.overflow);
    }

    #[test]
    fn reloaded_settings_invalidate_cached_plans() {
        let block = TextBlock::new(1, Rect::new(0, 0, 200, 100), Orientation::Horizontal)
            .with_text("two words");
        let mut ts = typesetter();
        let mut cache = RenderCache::new();
        let first = ts.plan_cached(&mut cache, &block).unwrap().clone();

        let mut settings = Settings::default();
        settings.layout.text_padding = 10;
        ts.set_settings(settings);
        let second = ts.plan_cached(&mut cache, &block).unwrap().clone();
        assert_ne!(first.content_offset, second.content_offset);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn render_draws_through_the_renderer() {
        let block = TextBlock::new(1, Rect::new(0, 0, 100, 50), Orientation::Horizontal)
            .with_text("hi");
        let mut renderer = SvgRenderer::new(100, 50);
        typesetter().render(&mut renderer, &block).unwrap();
        assert_eq!(renderer.finish().matches("<text").count(), 2);
    }
}
