use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::overlay::{MergedLine, OcrDetection, RawFragment};

use super::geom::Rect;
use super::text::{is_cjk_language, is_sentence_end, join_fragment};

/// Ratios (relative to the mean fragment height) deciding whether two
/// fragments read as consecutive words on one visual line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityThresholds {
    pub max_vertical_diff_ratio: f32,
    pub max_horizontal_gap_ratio: f32,
    pub max_backtrack_ratio: f32,
}

impl ProximityThresholds {
    pub const DEFAULT_VERTICAL_DIFF_RATIO: f32 = 0.6;
    pub const DEFAULT_HORIZONTAL_GAP_RATIO: f32 = 1.5;
    pub const DEFAULT_BACKTRACK_RATIO: f32 = 0.5;
}

impl Default for ProximityThresholds {
    fn default() -> Self {
        Self {
            max_vertical_diff_ratio: Self::DEFAULT_VERTICAL_DIFF_RATIO,
            max_horizontal_gap_ratio: Self::DEFAULT_HORIZONTAL_GAP_RATIO,
            max_backtrack_ratio: Self::DEFAULT_BACKTRACK_RATIO,
        }
    }
}

pub fn merge_fragments(fragments: &[RawFragment], language_hint: &str) -> Vec<MergedLine> {
    merge_fragments_with(fragments, language_hint, &ProximityThresholds::default())
}

pub fn merge_detections(detections: &[OcrDetection], language_hint: &str) -> Vec<MergedLine> {
    merge_detections_with(detections, language_hint, &ProximityThresholds::default())
}

/// Validates raw detections, ids taken from their input index, then merges.
pub fn merge_detections_with(
    detections: &[OcrDetection],
    language_hint: &str,
    thresholds: &ProximityThresholds,
) -> Vec<MergedLine> {
    let fragments: Vec<RawFragment> = detections
        .iter()
        .enumerate()
        .filter_map(|(id, detection)| RawFragment::from_detection(id, detection))
        .collect();
    merge_fragments_with(&fragments, language_hint, thresholds)
}

/// Greedy single pass over fragments in reading order; each line is a
/// contiguous run of the sorted list.
pub fn merge_fragments_with(
    fragments: &[RawFragment],
    language_hint: &str,
    thresholds: &ProximityThresholds,
) -> Vec<MergedLine> {
    let mut sorted: Vec<&RawFragment> = fragments.iter().filter(|f| is_usable(f)).collect();
    if sorted.is_empty() {
        return Vec::new();
    }
    sorted.sort_by_key(|f| (f.bbox.y0, f.bbox.x0, f.bbox.y1, f.bbox.x1, f.id));

    let cjk = is_cjk_language(language_hint);
    let mut consumed = vec![false; sorted.len()];
    let mut merged = Vec::new();

    for start in 0..sorted.len() {
        if consumed[start] {
            continue;
        }
        consumed[start] = true;
        let seed = sorted[start];
        let mut text = seed.text.trim().to_string();
        let mut bbox = seed.bbox;
        let mut last = seed.bbox;
        let mut fragment_ids = vec![seed.id];

        for next in start + 1..sorted.len() {
            if consumed[next] {
                continue;
            }
            let candidate = sorted[next];
            if is_sentence_end(&text) || !is_horizontally_proximate(&last, &candidate.bbox, thresholds)
            {
                break;
            }
            text = join_fragment(&text, candidate.text.trim(), cjk);
            bbox = bbox.union(&candidate.bbox);
            last = candidate.bbox;
            fragment_ids.push(candidate.id);
            consumed[next] = true;
        }

        merged.push(MergedLine {
            text,
            vertices: seed.vertices.clone(),
            bbox,
            fragment_ids,
        });
    }
    merged
}

fn is_usable(fragment: &RawFragment) -> bool {
    if fragment.text.trim().is_empty() {
        return false;
    }
    if fragment.vertices.len() != 4 || !fragment.bbox.is_valid() {
        debug!(
            "skipping fragment {}: {} vertices, bbox {:?}",
            fragment.id,
            fragment.vertices.len(),
            fragment.bbox
        );
        return false;
    }
    true
}

/// `earlier` is the last fragment already on the line, `later` the candidate.
pub(super) fn is_horizontally_proximate(
    earlier: &Rect,
    later: &Rect,
    thresholds: &ProximityThresholds,
) -> bool {
    if earlier.x0 > later.x0 && earlier.x1 > later.x1 && earlier.x0 > later.x1 {
        return false;
    }
    let h1 = i64::from(earlier.y1) - i64::from(earlier.y0);
    let h2 = i64::from(later.y1) - i64::from(later.y0);
    if h1 <= 0 || h2 <= 0 {
        return false;
    }
    let avg_h = (h1 + h2) as f64 / 2.0;
    let center1 = (i64::from(earlier.y0) + i64::from(earlier.y1)) as f64 / 2.0;
    let center2 = (i64::from(later.y0) + i64::from(later.y1)) as f64 / 2.0;
    if (center1 - center2).abs() > avg_h * f64::from(thresholds.max_vertical_diff_ratio) {
        return false;
    }
    if earlier.x1 <= later.x0 {
        let gap = (i64::from(later.x0) - i64::from(earlier.x1)) as f64;
        return gap <= avg_h * f64::from(thresholds.max_horizontal_gap_ratio);
    }
    let backtrack = (i64::from(earlier.x0) - i64::from(later.x0)) as f64;
    !(later.x0 < earlier.x0 && backtrack > avg_h * f64::from(thresholds.max_backtrack_ratio))
}
