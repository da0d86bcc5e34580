use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::engine::{BlockRenderPlan, LayoutConfig, Rect, layout_block};
use super::font::{FontHandle, FontId};
use super::{BlockId, BlockShape, Orientation, TextAlign, TextBlock};

/// Digest of every input that changes a block's layout. Colours and other
/// paint-only overrides are not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutVersion(String);

#[derive(Serialize)]
struct LayoutKey<'a> {
    text: &'a str,
    bbox: Rect,
    orientation: Orientation,
    angle_degrees: f32,
    font_size_px: u32,
    text_align: TextAlign,
    shape: BlockShape,
    font: &'a FontId,
    config: &'a LayoutConfig,
}

impl LayoutVersion {
    pub fn compute(block: &TextBlock, config: &LayoutConfig, font: FontHandle<'_>) -> Self {
        let key = LayoutKey {
            text: &block.translated_text,
            bbox: block.bbox,
            orientation: block.orientation,
            angle_degrees: block.angle_degrees,
            font_size_px: font.size_px(),
            text_align: block.text_align,
            shape: block.shape,
            font: font.font(),
            config,
        };
        let encoded = serde_json::to_string(&key).unwrap_or_default();
        Self(format!("{:x}", md5::compute(encoded.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Render plans keyed by block id, reused while the layout version matches.
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: HashMap<BlockId, (LayoutVersion, BlockRenderPlan)>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: BlockId, version: &LayoutVersion) -> Option<&BlockRenderPlan> {
        self.entries
            .get(&id)
            .filter(|(cached, _)| cached == version)
            .map(|(_, plan)| plan)
    }

    pub fn insert(&mut self, id: BlockId, version: LayoutVersion, plan: BlockRenderPlan) {
        self.entries.insert(id, (version, plan));
    }

    pub fn get_or_layout(
        &mut self,
        block: &TextBlock,
        config: &LayoutConfig,
        font: FontHandle<'_>,
    ) -> Result<&BlockRenderPlan> {
        let version = LayoutVersion::compute(block, config, font);
        match self.entries.entry(block.id) {
            Entry::Occupied(mut entry) => {
                if entry.get().0 != version {
                    let plan = layout_block(block, config, font)?;
                    entry.insert((version, plan));
                }
                Ok(&entry.into_mut().1)
            }
            Entry::Vacant(entry) => {
                let plan = layout_block(block, config, font)?;
                Ok(&entry.insert((version, plan)).1)
            }
        }
    }

    pub fn invalidate(&mut self, id: BlockId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Drops every cached plan, e.g. after the settings were reloaded.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops plans of blocks that no longer exist.
    pub fn retain_blocks(&mut self, live: &[BlockId]) {
        self.entries.retain(|id, _| live.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::font::EstimatedMetrics;
    use crate::overlay::{Rgba, SpacingConfig};

    fn sample_block() -> TextBlock {
        TextBlock::new(4, Rect::new(0, 0, 120, 60), Orientation::Horizontal)
            .with_text("cached text")
    }

    #[test]
    fn version_tracks_layout_fields_only() {
        let font = FontId::new("estimate");
        let handle = FontHandle::new(&EstimatedMetrics, &font, 16);
        let config = LayoutConfig::default();
        let block = sample_block();
        let base = LayoutVersion::compute(&block, &config, handle);

        let mut recolored = block.clone();
        recolored.style.main_color = Some(Rgba::new(9, 9, 9, 255));
        assert_eq!(LayoutVersion::compute(&recolored, &config, handle), base);

        let mut moved = block.clone();
        moved.bbox = Rect::new(0, 0, 121, 60);
        assert_ne!(LayoutVersion::compute(&moved, &config, handle), base);

        let mut rotated = block.clone();
        rotated.set_angle(15.0);
        assert_ne!(LayoutVersion::compute(&rotated, &config, handle), base);

        let respaced = LayoutConfig {
            spacing: SpacingConfig {
                line_spacing_h: 2,
                ..SpacingConfig::default()
            },
            ..config
        };
        assert_ne!(LayoutVersion::compute(&block, &respaced, handle), base);

        let bigger = FontHandle::new(&EstimatedMetrics, &font, 18);
        assert_ne!(LayoutVersion::compute(&block, &config, bigger), base);
    }

    #[test]
    fn cache_reuses_until_block_changes() {
        let font = FontId::new("estimate");
        let handle = FontHandle::new(&EstimatedMetrics, &font, 16);
        let config = LayoutConfig::default();
        let mut cache = RenderCache::new();
        let mut block = sample_block();

        let first = cache.get_or_layout(&block, &config, handle).unwrap().clone();
        let version = LayoutVersion::compute(&block, &config, handle);
        assert_eq!(cache.get(block.id, &version), Some(&first));

        block.translated_text = "different".to_string();
        let stale = LayoutVersion::compute(&block, &config, handle);
        assert!(cache.get(block.id, &stale).is_none());
        let second = cache.get_or_layout(&block, &config, handle).unwrap().clone();
        assert_ne!(first, second);
        assert_eq!(cache.len(), 1);

        assert!(cache.invalidate(block.id));
        assert!(!cache.invalidate(block.id));
        assert!(cache.is_empty());
    }

    #[test]
    fn failed_layout_is_not_cached() {
        let font = FontId::new("estimate");
        let handle = FontHandle::new(&EstimatedMetrics, &font, 16);
        let mut cache = RenderCache::new();
        let block = TextBlock::new(1, Rect::new(0, 0, 0, 10), Orientation::Horizontal).with_text("x");
        assert!(cache.get_or_layout(&block, &LayoutConfig::default(), handle).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn retain_drops_deleted_blocks() {
        let font = FontId::new("estimate");
        let handle = FontHandle::new(&EstimatedMetrics, &font, 16);
        let config = LayoutConfig::default();
        let mut cache = RenderCache::new();
        let mut block = sample_block();
        cache.get_or_layout(&block, &config, handle).unwrap();
        block.id = 5;
        cache.get_or_layout(&block, &config, handle).unwrap();
        cache.retain_blocks(&[5]);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
