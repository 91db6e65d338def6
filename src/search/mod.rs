//! Block motion search over one pyramid level.

mod algorithms;
mod context;
mod predictors;
mod recalculate;

#[cfg(test)]
mod tests;

use std::ops::{BitOr, BitOrAssign};

use aligned::{A64, Aligned};
use v_frame::pixel::Pixel;

pub use self::recalculate::RecalcParams;
use self::{
    context::{BlockLocation, MvBounds, SearchContext, SourceBlock},
    predictors::{ScanPosition, fetch_predictors},
};
use crate::{
    data::{
        block::{BlockSize, MAX_BLOCK_AREA},
        frame::MvFrame,
        motion::MotionVector,
        plane::PlaneRegion,
        sad::{CostFn, block_sum, sad_fn},
        satd::satd_fn,
    },
    error::{ConfigError, check_chroma_alignment},
    field::{FieldGeometry, MotionField},
    pyramid,
};

/// Set of local search strategies to run on each block.
///
/// Strategies combine with `|` and always run in the order of the constants
/// below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchType(u32);

impl SearchType {
    /// Walks along each axis while the cost keeps falling.
    pub const ONETIME: Self = Self(1);
    /// Rings of 8 neighbors at decreasing distances.
    pub const NSTEP: Self = Self(1 << 1);
    /// Diamond search with halving radius.
    pub const LOGARITHMIC: Self = Self(1 << 2);
    /// Every position within the radius, ring by ring.
    pub const EXHAUSTIVE: Self = Self(1 << 3);
    /// Hexagon search.
    pub const HEX2: Self = Self(1 << 4);
    /// Uneven multi-hexagon search.
    pub const UMH: Self = Self(1 << 5);
    /// Horizontal displacements only.
    pub const HSEARCH: Self = Self(1 << 6);
    /// Vertical displacements only.
    pub const VSEARCH: Self = Self(1 << 7);

    /// The strategy numbered `index` in the classic 0-7 numbering
    /// (one-time, n-step, logarithmic, exhaustive, hex2, umh, horizontal,
    /// vertical).
    #[inline]
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 8 {
            Some(Self(1 << index))
        } else {
            None
        }
    }

    /// Whether every strategy of `other` is enabled.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// The raw flag bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether only one-dimensional strategies are enabled.
    #[inline]
    pub const fn is_directional(self) -> bool {
        let hv = Self::HSEARCH.0 | Self::VSEARCH.0;
        self.0 != 0 && self.0 & !hv == 0
    }
}

impl BitOr for SearchType {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SearchType {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Luma matching cost. Chroma is always compared with SAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum CostMetric {
    /// Sum of absolute differences.
    #[default]
    Sad,
    /// Sum of absolute Hadamard-transformed differences.
    Satd,
}

/// Fixed layout of one pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelGeometry {
    /// Number of blocks per row.
    pub blk_x: usize,
    /// Number of block rows.
    pub blk_y: usize,
    /// Block width, in pixels of this level.
    pub blk_size_x: usize,
    /// Block height.
    pub blk_size_y: usize,
    /// Columns shared by horizontally neighboring blocks.
    pub overlap_x: usize,
    /// Rows shared by vertically neighboring blocks.
    pub overlap_y: usize,
    /// Sub-pixel precision of the vectors: 1, 2 or 4.
    pub pel: usize,
    /// Pyramid level, 0 being full resolution.
    pub level: usize,
    /// `log2` of the horizontal chroma subsampling.
    pub xdec: usize,
    /// `log2` of the vertical chroma subsampling.
    pub ydec: usize,
    /// Whether chroma contributes to the matching cost.
    pub chroma: bool,
    /// Luma matching cost.
    pub metric: CostMetric,
    /// The coarsest level of the pyramid, where the median predictor seeds
    /// the search.
    pub smallest_plane: bool,
    /// Bits per sample, 8 to 16.
    pub bit_depth: usize,
}

impl LevelGeometry {
    /// The layout of the vector field this level produces.
    #[inline]
    pub const fn field_geometry(&self) -> FieldGeometry {
        FieldGeometry {
            blk_x: self.blk_x,
            blk_y: self.blk_y,
            blk_size_x: self.blk_size_x,
            blk_size_y: self.blk_size_y,
            overlap_x: self.overlap_x,
            overlap_y: self.overlap_y,
            pel: self.pel,
            level: self.level,
        }
    }

    /// Horizontal distance between neighboring block origins.
    #[inline]
    pub const fn step_x(&self) -> usize {
        self.blk_size_x - self.overlap_x
    }

    /// Vertical distance between neighboring block origins.
    #[inline]
    pub const fn step_y(&self) -> usize {
        self.blk_size_y - self.overlap_y
    }

    /// Cost recorded for blocks that were never searched.
    #[inline]
    pub fn very_big_sad(&self) -> f32 {
        ((self.blk_size_x * self.blk_size_y) << self.bit_depth) as f32
    }
}

/// Per-call parameters of [`BlockSearch::search_mvs`].
#[derive(Debug, Clone, Copy)]
pub struct SearchParams<'a> {
    /// Local search strategies run on the best seed.
    pub search_type: SearchType,
    /// Search radius, in pel units.
    pub search_param: i32,
    /// Weight of the squared distance to the predictor.
    pub lambda: f32,
    /// Lambda drops to a quarter once the predictor costs twice this.
    pub lsad: f32,
    /// Cost penalty of candidates other than the seeds, out of 256.
    pub penalty_new: f32,
    /// Scales lambda with the level: 0 none, 1 linear, 2 quadratic.
    pub plevel: u8,
    /// Cost penalty of the zero vector, out of 256.
    pub penalty_zero: f32,
    /// Cost penalty of the global motion vector, out of 256.
    pub penalty_global: f32,
    /// Global motion of this level, in full pixels.
    pub global_mv: MotionVector,
    /// Blocks costing more than this trigger a wide search.
    pub bad_sad: f32,
    /// Radius of the wide search: positive for UMH, negative for exhaustive.
    pub bad_range: i32,
    /// Scan odd rows right to left.
    pub meander: bool,
    /// Refine every seed instead of only the best one.
    pub try_many: bool,
    /// Vertical offset between the source and reference fields, in pel units.
    pub field_shift: i32,
    /// Vectors of the previous frame at this level, in the same pel.
    pub temporal: Option<&'a MotionField>,
}

impl Default for SearchParams<'_> {
    #[inline]
    fn default() -> Self {
        SearchParams {
            search_type: SearchType::HEX2,
            search_param: 2,
            lambda: 0.0,
            lsad: 400.0,
            penalty_new: 0.0,
            plevel: 0,
            penalty_zero: 0.0,
            penalty_global: 0.0,
            global_mv: MotionVector::ZERO,
            bad_sad: 10000.0,
            bad_range: 24,
            meander: true,
            try_many: false,
            field_shift: 0,
            temporal: None,
        }
    }
}

/// Aggregates of one search pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SearchStats {
    /// Sum of the final block costs.
    pub plane_sad: f64,
    /// Mean of the per-block luma sum difference between the reference and
    /// the source at zero displacement. Only measured on the coarsest level.
    pub mean_luma_change: f32,
    /// Blocks that needed the wide fallback search.
    pub bad_blocks: usize,
}

/// Source block copies, aligned for the kernels.
#[derive(Clone)]
struct BlockScratch<T: Pixel> {
    luma: Aligned<A64, [T; MAX_BLOCK_AREA]>,
    chroma: [Aligned<A64, [T; MAX_BLOCK_AREA]>; 2],
}

/// Motion search over the block grid of one pyramid level.
///
/// Owns the level's vector field, which is overwritten in place by every
/// pass, and the scratch buffers the pass needs.
#[derive(Clone)]
pub struct BlockSearch<T: Pixel> {
    geometry: LevelGeometry,
    field: MotionField,
    luma_cost: CostFn<T>,
    chroma_sad: CostFn<T>,
    chroma_size: (usize, usize),
    very_big_sad: f32,
    scratch: Box<BlockScratch<T>>,
    freq: Vec<i32>,
}

impl<T: Pixel> BlockSearch<T> {
    /// Prepares the search of one level, with every block marked unsearched.
    ///
    /// # Errors
    ///
    /// - If the block size, or its chroma counterpart, has no kernel.
    /// - If the overlap exceeds half the block size.
    /// - If `pel`, the chroma decimation or the bit depth is unsupported.
    /// - If chroma is used and the block step or overlap is not a whole
    ///   number of chroma pixels.
    #[inline]
    pub fn new(geometry: LevelGeometry) -> Result<Self, ConfigError> {
        let bsize = BlockSize::from_width_and_height_opt(geometry.blk_size_x, geometry.blk_size_y)?;
        if geometry.overlap_x > geometry.blk_size_x / 2 {
            return Err(ConfigError::Overlap {
                overlap: geometry.overlap_x,
                size: geometry.blk_size_x,
            });
        }
        if geometry.overlap_y > geometry.blk_size_y / 2 {
            return Err(ConfigError::Overlap {
                overlap: geometry.overlap_y,
                size: geometry.blk_size_y,
            });
        }
        if !matches!(geometry.pel, 1 | 2 | 4) {
            return Err(ConfigError::Pel(geometry.pel));
        }
        if geometry.xdec > 1 || geometry.ydec > 1 {
            return Err(ConfigError::ChromaDecimation {
                xdec: geometry.xdec,
                ydec: geometry.ydec,
            });
        }
        if !(8..=16).contains(&geometry.bit_depth) {
            return Err(ConfigError::BitDepth(geometry.bit_depth));
        }

        let luma_sad = sad_fn::<T>(bsize);
        let luma_cost = match geometry.metric {
            CostMetric::Sad => luma_sad,
            CostMetric::Satd => satd_fn::<T>(bsize).ok_or(ConfigError::Satd(bsize))?,
        };
        let chroma_sad = if geometry.chroma {
            sad_fn::<T>(bsize.subsampled_size(geometry.xdec, geometry.ydec)?)
        } else {
            luma_sad
        };
        // Every legal luma vector must land on a chroma block inside the
        // chroma padding.
        if geometry.chroma {
            check_chroma_alignment("horizontal step", geometry.step_x(), geometry.xdec)?;
            check_chroma_alignment("vertical step", geometry.step_y(), geometry.ydec)?;
            check_chroma_alignment("horizontal overlap", geometry.overlap_x, geometry.xdec)?;
            check_chroma_alignment("vertical overlap", geometry.overlap_y, geometry.ydec)?;
        }

        let very_big_sad = geometry.very_big_sad();
        let mut field = MotionField::new(geometry.field_geometry());
        field.write_default(very_big_sad);

        let zero = T::cast_from(0);
        Ok(Self {
            geometry,
            field,
            luma_cost,
            chroma_sad,
            chroma_size: (
                geometry.blk_size_x >> geometry.xdec,
                geometry.blk_size_y >> geometry.ydec,
            ),
            very_big_sad,
            scratch: Box::new(BlockScratch {
                luma: Aligned([zero; MAX_BLOCK_AREA]),
                chroma: [Aligned([zero; MAX_BLOCK_AREA]), Aligned([zero; MAX_BLOCK_AREA])],
            }),
            freq: Vec::new(),
        })
    }

    /// The level layout this search was built for.
    #[inline]
    pub const fn geometry(&self) -> &LevelGeometry {
        &self.geometry
    }

    /// The vectors found by the last pass, or the seeds of the next one.
    #[inline]
    pub const fn field(&self) -> &MotionField {
        &self.field
    }

    /// Mutable access to the field, e.g. to seed it by hand.
    #[inline]
    pub fn field_mut(&mut self) -> &mut MotionField {
        &mut self.field
    }

    /// Resets the field to zero vectors with the sentinel cost.
    #[inline]
    pub fn write_default(&mut self) {
        self.field.write_default(self.very_big_sad);
    }

    /// Seeds the field from the next coarser level.
    #[inline]
    pub fn interpolate_prediction(&mut self, coarse: &MotionField) {
        pyramid::interpolate_prediction(&mut self.field, coarse);
    }

    /// Estimates the dominant motion of the current field, doubled for the
    /// next finer level. `prev` is returned when the field is empty.
    #[inline]
    pub fn estimate_global_mv_doubled(&mut self, prev: MotionVector) -> MotionVector {
        pyramid::estimate_global_mv_doubled(&self.field, &mut self.freq, prev)
    }

    /// Searches every block of `src` in `reference` and stores the result in
    /// the field, whose current content seeds the search.
    ///
    /// # Panics
    ///
    /// - If the block grid does not fit in the planes.
    /// - If chroma is used and the luma padding is not a whole number of
    ///   chroma pixels.
    #[inline]
    pub fn search_mvs(
        &mut self,
        src: &MvFrame<T>,
        reference: &MvFrame<T>,
        params: &SearchParams<'_>,
    ) -> SearchStats {
        self.check_frames(src, reference);

        let g = self.geometry;
        let pel = g.pel as i32;
        let hpad_scaled = (src.luma.hpad() >> g.level) as i32;
        let vpad_scaled = (src.luma.vpad() >> g.level) as i32;
        let (width, height) = (src.luma.width() as i32, src.luma.height() as i32);

        let mut lambda_level = params.lambda / (pel * pel) as f32;
        let scale = (1 << g.level) as f32;
        match params.plevel {
            1 => lambda_level *= scale,
            2 => lambda_level *= scale * scale,
            _ => {}
        }

        let zero_shifted = MotionVector::new(0, params.field_shift, 0.0);
        let global_predictor = MotionVector::new(
            pel * params.global_mv.x,
            pel * params.global_mv.y + params.field_shift,
            params.global_mv.cost,
        );

        let mut stats = SearchStats::default();
        let mut bad_count = 0;
        let mut sum_luma_change = 0i64;

        for blky in 0..g.blk_y {
            let scan_dir = if params.meander && blky % 2 == 1 { -1 } else { 1 };
            let row_lambda = if blky == 0 { 0.0 } else { lambda_level };

            for i in 0..g.blk_x {
                let blkx = if scan_dir > 0 { i } else { g.blk_x - 1 - i };
                let pos = ScanPosition {
                    blkx,
                    blky,
                    blk_x: g.blk_x,
                    blk_y: g.blk_y,
                    scan_dir,
                };
                let blk_idx = pos.index();

                let bx = (blkx * g.step_x()) as i32;
                let by = (blky * g.step_y()) as i32;
                let bounds = MvBounds {
                    dx_min: -pel * (bx + hpad_scaled),
                    dx_max: pel * (width - bx - g.blk_size_x as i32 + hpad_scaled),
                    dy_min: -pel * (by + vpad_scaled),
                    dy_max: pel * (height - by - g.blk_size_y as i32 + vpad_scaled),
                };

                let (x0, y0) = (src.luma.hpad() + bx as usize, src.luma.vpad() + by as usize);
                copy_block(&mut self.scratch, src, x0, y0, &g, self.chroma_size);

                let found = {
                    let mut ctx = SearchContext::new(
                        self.scratch.source(&g, self.chroma_size),
                        reference,
                        block_location(src, x0, y0, &g),
                        self.luma_cost,
                        self.chroma_sad,
                        bounds,
                        row_lambda,
                        params.penalty_new,
                    );
                    ctx.predictor = ctx.clip_mv(self.field.get(blk_idx));
                    let temporal = params.temporal.map(|field| field.get(blk_idx));
                    let predictors = fetch_predictors(
                        &mut ctx,
                        &self.field,
                        pos,
                        zero_shifted,
                        temporal,
                        g.smallest_plane,
                        params.lsad,
                    );

                    pseudo_epz_search(&mut ctx, &predictors, zero_shifted, global_predictor, params);

                    let found_sad = ctx.best.cost;
                    if blk_idx > 1
                        && found_sad > params.bad_sad + params.bad_sad * bad_count as f32 / 16.0
                    {
                        bad_count += 1;
                        log::trace!(
                            "level {} block {}: cost {} triggers a wide search",
                            g.level,
                            blk_idx,
                            found_sad
                        );
                        wide_search(&mut ctx, found_sad, params.bad_range, pel);
                    }

                    ctx.best
                };

                self.field.set(blk_idx, found);
                stats.plane_sad += found.cost as f64;

                if g.smallest_plane {
                    let src_sum = block_sum(&self.scratch.source(&g, self.chroma_size).luma);
                    let ref_sum = block_sum(&reference.luma.region(
                        x0,
                        y0,
                        g.blk_size_x,
                        g.blk_size_y,
                    ));
                    sum_luma_change += ref_sum as i64 - src_sum as i64;
                }
            }
        }

        stats.bad_blocks = bad_count;
        if g.smallest_plane {
            stats.mean_luma_change = sum_luma_change as f32 / self.field.blk_count() as f32;
        }
        stats
    }

    fn check_frames(&self, src: &MvFrame<T>, reference: &MvFrame<T>) {
        let g = &self.geometry;
        for frame in [src, reference] {
            let luma = &frame.luma;
            if g.chroma {
                assert_eq!(0, luma.hpad() % (1 << g.xdec));
                assert_eq!(0, luma.vpad() % (1 << g.ydec));
            }
            assert!(g.blk_x * g.step_x() + g.overlap_x <= luma.width());
            assert!(g.blk_y * g.step_y() + g.overlap_y <= luma.height());
            assert_eq!(g.pel, luma.pel());
            assert_eq!(g.chroma, frame.chroma.is_some());
        }
    }
}

impl<T: Pixel> BlockScratch<T> {
    fn source(&self, g: &LevelGeometry, chroma_size: (usize, usize)) -> SourceBlock<'_, T> {
        let (cw, ch) = chroma_size;
        SourceBlock {
            luma: PlaneRegion::new(&self.luma[..], g.blk_size_x, g.blk_size_x, g.blk_size_y),
            chroma: g.chroma.then(|| {
                [
                    PlaneRegion::new(&self.chroma[0][..], cw, cw, ch),
                    PlaneRegion::new(&self.chroma[1][..], cw, cw, ch),
                ]
            }),
        }
    }
}

fn copy_region<T: Pixel>(dst: &mut [T], src: PlaneRegion<'_, T>) {
    let w = src.width();
    for (out, row) in dst.chunks_exact_mut(w).zip(src.rows_iter()) {
        out.copy_from_slice(row);
    }
}

fn copy_block<T: Pixel>(
    scratch: &mut BlockScratch<T>,
    src: &MvFrame<T>,
    x0: usize,
    y0: usize,
    g: &LevelGeometry,
    (cw, ch): (usize, usize),
) {
    copy_region(
        &mut scratch.luma[..],
        src.luma.region(x0, y0, g.blk_size_x, g.blk_size_y),
    );
    if let Some(planes) = &src.chroma {
        let (cx, cy) = chroma_origin(src, x0, y0, g);
        for (out, plane) in scratch.chroma.iter_mut().zip(planes) {
            copy_region(&mut out[..], plane.region(cx, cy, cw, ch));
        }
    }
}

/// Absolute chroma coordinates of the block at absolute luma `(x0, y0)`.
fn chroma_origin<T: Pixel>(src: &MvFrame<T>, x0: usize, y0: usize, g: &LevelGeometry) -> (usize, usize) {
    let (hpad, vpad) = (src.luma.hpad(), src.luma.vpad());
    match &src.chroma {
        Some([u, _]) => (
            u.hpad() + ((x0 - hpad) >> g.xdec),
            u.vpad() + ((y0 - vpad) >> g.ydec),
        ),
        None => (0, 0),
    }
}

fn block_location<T: Pixel>(src: &MvFrame<T>, x0: usize, y0: usize, g: &LevelGeometry) -> BlockLocation {
    let pel_log2 = g.pel.trailing_zeros();
    let (cx, cy) = chroma_origin(src, x0, y0, g);
    BlockLocation {
        x: (x0 as i32) << pel_log2,
        y: (y0 as i32) << pel_log2,
        cx: (cx as i32) << pel_log2,
        cy: (cy as i32) << pel_log2,
        xdec: g.xdec as u32,
        ydec: g.ydec as u32,
    }
}

/// Evaluates the zero, global and direct seeds and the spatial predictors,
/// leaving the refined best vector in `ctx`.
fn pseudo_epz_search<T: Pixel>(
    ctx: &mut SearchContext<'_, T>,
    predictors: &[MotionVector],
    zero_shifted: MotionVector,
    global_predictor: MotionVector,
    params: &SearchParams<'_>,
) {
    let try_many = params.try_many;
    let mut candidates = arrayvec::ArrayVec::<(MotionVector, f32), 8>::new();

    let sad = ctx.block_cost(zero_shifted.x, zero_shifted.y);
    ctx.best = zero_shifted.with_cost(sad);
    ctx.min_cost = sad + params.penalty_zero * sad / 256.0;
    if try_many {
        ctx.refine(params.search_type, params.search_param);
        candidates.push((ctx.best, ctx.min_cost));
    }

    let global = ctx.clip_mv(global_predictor);
    let sad = ctx.block_cost(global.x, global.y);
    let cost = sad + params.penalty_global * sad / 256.0;
    if cost < ctx.min_cost || try_many {
        ctx.best = global.with_cost(sad);
        ctx.min_cost = cost;
    }
    if try_many {
        ctx.refine(params.search_type, params.search_param);
        candidates.push((ctx.best, ctx.min_cost));
    }

    let predictor = ctx.predictor;
    let sad = ctx.block_cost(predictor.x, predictor.y);
    if sad < ctx.min_cost || try_many {
        ctx.best = predictor.with_cost(sad);
        ctx.min_cost = sad;
    }
    if try_many {
        ctx.refine(params.search_type, params.search_param);
        candidates.push((ctx.best, ctx.min_cost));
    }

    for p in predictors {
        if try_many {
            ctx.min_cost = f32::INFINITY;
        }
        ctx.check_mv0(p.x, p.y);
        if try_many {
            ctx.refine(params.search_type, params.search_param);
            candidates.push((ctx.best, ctx.min_cost));
        }
    }

    if try_many {
        let mut min_cost = f32::INFINITY;
        for &(mv, cost) in &candidates {
            if cost < min_cost {
                ctx.best = mv;
                min_cost = cost;
            }
        }
        ctx.min_cost = min_cost;
    } else {
        ctx.refine(params.search_type, params.search_param);
    }
}

/// Fallback for blocks whose best cost is far above the usual level: search
/// a wide area around the origin, then refine to sub-pixel.
fn wide_search<T: Pixel>(ctx: &mut SearchContext<'_, T>, found_sad: f32, bad_range: i32, pel: i32) {
    if bad_range > 0 {
        ctx.umh_search(bad_range * pel, 0, 0);
    } else if bad_range < 0 {
        let mut radius = 1;
        while radius < -bad_range * pel {
            ctx.expanding_search(radius, pel, 0, 0);
            if ctx.best.cost < found_sad / 4.0 {
                break;
            }
            radius += pel;
        }
    }

    for radius in 1..pel {
        let (mvx, mvy) = (ctx.best.x, ctx.best.y);
        ctx.expanding_search(radius, 1, mvx, mvy);
    }
}
