use anyhow::{Result, anyhow};
use tracing::{debug, warn};

use crate::overlay::{BlockRenderPlan, FontMetricsProvider, TextBlock};
use crate::typesetter::Typesetter;

/// Lays out every block on a scoped worker pool. Results keep the input
/// order; one failing block does not affect the others.
pub fn layout_blocks<M: FontMetricsProvider>(
    typesetter: &Typesetter<M>,
    blocks: &[TextBlock],
) -> Vec<Result<BlockRenderPlan>> {
    if blocks.is_empty() {
        return Vec::new();
    }
    let workers = num_cpus::get().clamp(1, blocks.len());
    let chunk_size = blocks.len().div_ceil(workers);
    debug!(
        "laying out {} blocks on {} workers",
        blocks.len(),
        workers
    );

    std::thread::scope(|scope| {
        let handles: Vec<_> = blocks
            .chunks(chunk_size)
            .map(|chunk| {
                let handle = scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|block| layout_one(typesetter, block))
                        .collect::<Vec<_>>()
                });
                (chunk.len(), handle)
            })
            .collect();

        let mut results = Vec::with_capacity(blocks.len());
        for (len, handle) in handles {
            match handle.join() {
                Ok(chunk_results) => results.extend(chunk_results),
                Err(_) => {
                    warn!("layout worker panicked; failing {} blocks", len);
                    results.extend((0..len).map(|_| Err(anyhow!("layout worker panicked"))));
                }
            }
        }
        results
    })
}

fn layout_one<M: FontMetricsProvider>(
    typesetter: &Typesetter<M>,
    block: &TextBlock,
) -> Result<BlockRenderPlan> {
    let plan = typesetter.plan(block)?;
    if plan.degraded {
        warn!(
            "block {}: font unavailable or no room to wrap, text left unwrapped",
            block.id
        );
    }
    if plan.overflow {
        debug!(
            "block {}: text {}x{} overflows content {}x{}",
            block.id, plan.text_width, plan.text_height, plan.content_width, plan.content_height
        );
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{EstimatedMetrics, Orientation, Rect};
    use crate::settings::Settings;

    #[test]
    fn results_follow_input_order() {
        let typesetter = Typesetter::new(Settings::default(), EstimatedMetrics);
        let blocks: Vec<TextBlock> = (0..37)
            .map(|id| {
                let bbox = if id % 5 == 0 {
                    Rect::new(0, 0, 0, 20)
                } else {
                    Rect::new(0, 0, 100 + id as i32, 80)
                };
                TextBlock::new(id, bbox, Orientation::Horizontal).with_text(format!("block {id}"))
            })
            .collect();

        let results = layout_blocks(&typesetter, &blocks);
        assert_eq!(results.len(), blocks.len());
        for (block, result) in blocks.iter().zip(&results) {
            match result {
                Ok(plan) => {
                    assert_ne!(block.id % 5, 0);
                    assert_eq!(plan.surface_width, block.bbox.width() as u32);
                    assert_eq!(plan, &typesetter.plan(block).unwrap());
                }
                Err(_) => assert_eq!(block.id % 5, 0),
            }
        }
    }

    #[test]
    fn empty_input_yields_nothing() {
        let typesetter = Typesetter::new(Settings::default(), EstimatedMetrics);
        assert!(layout_blocks(&typesetter, &[]).is_empty());
    }
}
