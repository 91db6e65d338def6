use v_frame::pixel::Pixel;

use super::{
    BlockSearch, SearchStats, SearchType,
    block_location,
    context::{MvBounds, SearchContext},
    copy_block,
};
use crate::{
    data::{frame::MvFrame, motion::MotionVector},
    field::MotionField,
};

/// Parameters of [`BlockSearch::recalculate_mvs`].
#[derive(Debug, Clone, Copy)]
pub struct RecalcParams {
    /// Strategies used to refine costly blocks.
    pub search_type: SearchType,
    /// Search radius, in pel units.
    pub search_param: i32,
    /// Weight of the distance to the projected vector.
    pub lambda: f32,
    /// Bias against refined candidates, per 256 of their cost.
    pub penalty_new: f32,
    /// Scan odd rows right to left.
    pub meander: bool,
    /// Blocks whose projected vector costs at most this are kept as is.
    pub th_sad: f32,
    /// Blend the four nearest old vectors instead of picking the closest.
    pub smooth: bool,
}

impl Default for RecalcParams {
    #[inline]
    fn default() -> Self {
        RecalcParams {
            search_type: SearchType::HEX2,
            search_param: 2,
            lambda: 0.0,
            penalty_new: 0.0,
            meander: true,
            th_sad: 200.0,
            smooth: true,
        }
    }
}

impl<T: Pixel> BlockSearch<T> {
    /// Re-estimates the field from `old`, computed on another block grid of
    /// the same frames, typically with larger blocks.
    ///
    /// Every block starts from the old vector under its center. Only blocks
    /// whose true cost at that vector exceeds `th_sad` are refined.
    ///
    /// # Panics
    ///
    /// - If `old` is empty or the block grid does not fit in the planes.
    /// - If chroma is used and the luma padding is not a whole number of
    ///   chroma pixels.
    #[inline]
    pub fn recalculate_mvs(
        &mut self,
        old: &MotionField,
        src: &MvFrame<T>,
        reference: &MvFrame<T>,
        params: &RecalcParams,
    ) -> SearchStats {
        assert!(old.blk_count() > 0);
        self.check_frames(src, reference);

        let g = self.geometry;
        let pel = g.pel as i32;
        let ext_w = reference.luma.pitch() as i32;
        let ext_h = (reference.luma.height() + 2 * reference.luma.vpad()) as i32;
        let lambda = params.lambda / (pel * pel) as f32;

        let mut stats = SearchStats::default();
        let mut refined = 0;

        for blky in 0..g.blk_y {
            let scan_dir = if params.meander && blky % 2 == 1 { -1 } else { 1 };
            for i in 0..g.blk_x {
                let blkx = if scan_dir > 0 { i } else { g.blk_x - 1 - i };
                let blk_idx = blky * g.blk_x + blkx;

                let x0 = src.luma.hpad() + blkx * g.step_x();
                let y0 = src.luma.vpad() + blky * g.step_y();
                let bounds = MvBounds {
                    dx_min: -pel * x0 as i32,
                    dx_max: pel * (ext_w - x0 as i32 - g.blk_size_x as i32),
                    dy_min: -pel * y0 as i32,
                    dy_max: pel * (ext_h - y0 as i32 - g.blk_size_y as i32),
                };

                copy_block(&mut self.scratch, src, x0, y0, &g, self.chroma_size);

                let projected = self.project_old_vector(old, blkx, blky, params.smooth);
                let found = {
                    let mut ctx = SearchContext::new(
                        self.scratch.source(&g, self.chroma_size),
                        reference,
                        block_location(src, x0, y0, &g),
                        self.luma_cost,
                        self.chroma_sad,
                        bounds,
                        if blky == 0 { 0.0 } else { lambda },
                        params.penalty_new,
                    );
                    // The old field already carries any field shift.
                    let predictor = ctx.clip_mv(projected);
                    ctx.predictor = predictor;

                    let sad = ctx.block_cost(predictor.x, predictor.y);
                    ctx.best = predictor.with_cost(sad);
                    ctx.min_cost = sad;

                    if sad > params.th_sad {
                        refined += 1;
                        ctx.refine(params.search_type, params.search_param);
                    }
                    ctx.best
                };

                self.field.set(blk_idx, found);
                stats.plane_sad += found.cost as f64;
            }
        }

        log::debug!(
            "recalculated {} blocks, {} refined",
            g.blk_x * g.blk_y,
            refined
        );
        stats.bad_blocks = refined;
        stats
    }

    /// The old vector seeding block `(blkx, blky)`, converted to this
    /// field's pel with its cost scaled to this field's block area.
    pub(crate) fn project_old_vector(
        &self,
        old: &MotionField,
        blkx: usize,
        blky: usize,
        smooth: bool,
    ) -> MotionVector {
        let g = &self.geometry;
        let og = old.geometry();
        let (step_old_x, step_old_y) = (og.step_x() as i32, og.step_y() as i32);

        let center_x = (g.blk_size_x / 2 + g.step_x() * blkx) as i32;
        let center_y = (g.blk_size_y / 2 + g.step_y() * blky) as i32;
        let blkx_old = (center_x - og.blk_size_x as i32 / 2) / step_old_x;
        let blky_old = (center_y - og.blk_size_y as i32 / 2) / step_old_y;
        let delta_x = (center_x - (og.blk_size_x as i32 / 2 + step_old_x * blkx_old)).max(0);
        let delta_y = (center_y - (og.blk_size_y as i32 / 2 + step_old_y * blky_old)).max(0);

        let clamp_x = |v: i32| v.clamp(0, og.blk_x as i32 - 1) as usize;
        let clamp_y = |v: i32| v.clamp(0, og.blk_y as i32 - 1) as usize;
        let (x1, x2) = (clamp_x(blkx_old), clamp_x(blkx_old + 1));
        let (y1, y2) = (clamp_y(blky_old), clamp_y(blky_old + 1));

        let v1 = old.get(y1 * og.blk_x + x1);
        let v2 = old.get(y1 * og.blk_x + x2);
        let v3 = old.get(y2 * og.blk_x + x1);
        let v4 = old.get(y2 * og.blk_x + x2);

        let vector = if smooth {
            // Along x first, scaled by the old step, then along y; each stage
            // truncates on its own.
            let lerp_x = |a: i32, b: i32| a * step_old_x + delta_x * (b - a);
            let lerp_y = |a: i32, b: i32| (a + delta_y * (b - a) / step_old_y) / step_old_x;
            let (sx, sy) = (step_old_x as f32, step_old_y as f32);
            let (dx, dy) = (delta_x as f32, delta_y as f32);
            let cost_top = v1.cost * sx + dx * (v2.cost - v1.cost);
            let cost_bottom = v3.cost * sx + dx * (v4.cost - v3.cost);
            MotionVector::new(
                lerp_y(lerp_x(v1.x, v2.x), lerp_x(v3.x, v4.x)),
                lerp_y(lerp_x(v1.y, v2.y), lerp_x(v3.y, v4.y)),
                (cost_top + dy * (cost_bottom - cost_top) / sy) / sx,
            )
        } else {
            match (delta_x * 2 < step_old_x, delta_y * 2 < step_old_y) {
                (true, true) => v1,
                (false, true) => v2,
                (true, false) => v3,
                (false, false) => v4,
            }
        };

        let area = (g.blk_size_x * g.blk_size_y) as f32;
        let old_area = (og.blk_size_x * og.blk_size_y) as f32;
        let vector = vector.rescale_pel(og.pel_log2(), g.pel.trailing_zeros());
        vector.with_cost(vector.cost * area / old_area)
    }
}
