//! Coarse-to-fine search over a frame pyramid.

mod global;
mod interpolate;


use v_frame::pixel::{ChromaSampling, Pixel};

pub use self::{global::estimate_global_mv_doubled, interpolate::interpolate_prediction};
use crate::{
    data::{
        frame::{MvPyramid, PyramidConfig},
        motion::MotionVector,
    },
    error::{ConfigError, check_chroma_alignment},
    field::MotionField,
    search::{BlockSearch, CostMetric, LevelGeometry, SearchParams, SearchType},
};

/// Options of a multi-level motion analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AnalysisOptions {
    /// Block width.
    pub blk_size_x: usize,
    /// Block height.
    pub blk_size_y: usize,
    /// Horizontal overlap between neighboring blocks, at most half a block.
    pub overlap_x: usize,
    /// Vertical overlap between neighboring blocks, at most half a block.
    pub overlap_y: usize,
    /// Sub-pixel precision of the finest level: 1, 2 or 4.
    pub pel: usize,
    /// Maximum number of pyramid levels, 0 for as many as fit.
    pub levels: usize,
    /// Horizontal padding of the luma planes, in pixels.
    pub hpad: usize,
    /// Vertical padding of the luma planes, in pixels.
    pub vpad: usize,
    /// Search strategies of the finest level.
    pub search_type: SearchType,
    /// Search radius of the intermediate levels.
    pub search_param: i32,
    /// Search radius of the finest level, in pel units. 0 uses `pel`.
    pub pel_search: i32,
    /// Search strategies of the intermediate levels.
    pub coarse_search_type: SearchType,
    /// Weight of the distance to the predictor, for an 8x8 block.
    pub lambda: f32,
    /// Predictor cost, for an 8x8 block, at which lambda is damped to a
    /// quarter.
    pub lsad: f32,
    /// Bias against candidates other than the direct predictor, per 256
    /// of their cost.
    pub penalty_new: f32,
    /// Lambda growth per level: 0 none, 1 linear, 2 quadratic.
    pub plevel: u8,
    /// Use the dominant motion of the coarser level as a predictor.
    pub global: bool,
    /// Bias against the zero vector, per 256 of its cost.
    pub penalty_zero: f32,
    /// Bias against the global vector, per 256 of its cost.
    pub penalty_global: f32,
    /// Cost, for an 8x8 block of 8-bit pixels, above which a block is
    /// searched again over a wide area.
    pub bad_sad: f32,
    /// Radius of the wide search: UMH when positive, exhaustive rings when
    /// negative.
    pub bad_range: i32,
    /// Scan odd rows right to left.
    pub meander: bool,
    /// Refine every seed and predictor separately on the coarse levels.
    pub try_many: bool,
    /// Include chroma in the matching cost.
    pub chroma: bool,
    /// Luma matching cost.
    pub metric: CostMetric,
    /// Vertical offset between the source and reference fields, in pel units
    /// of the finest level.
    pub field_shift: i32,
    /// Use the previous pair's vectors as predictors. Pairs must then be
    /// searched in order.
    pub temporal: bool,
    /// Scene change cost threshold for an 8x8 block of 8-bit pixels.
    pub thscd1: f32,
    /// Scene change block share threshold, out of 256.
    pub thscd2: u32,
}

impl Default for AnalysisOptions {
    #[inline]
    fn default() -> Self {
        AnalysisOptions {
            blk_size_x: 8,
            blk_size_y: 8,
            overlap_x: 0,
            overlap_y: 0,
            pel: 2,
            levels: 0,
            hpad: 16,
            vpad: 16,
            search_type: SearchType::HEX2,
            search_param: 2,
            pel_search: 0,
            coarse_search_type: SearchType::EXHAUSTIVE,
            lambda: 0.0,
            lsad: 400.0,
            penalty_new: 0.0,
            plevel: 0,
            global: true,
            penalty_zero: 0.0,
            penalty_global: 0.0,
            bad_sad: 10000.0,
            bad_range: 24,
            meander: true,
            try_many: false,
            chroma: true,
            metric: CostMetric::Sad,
            field_shift: 0,
            temporal: false,
            thscd1: 400.0,
            thscd2: 130,
        }
    }
}

impl AnalysisOptions {
    /// Defaults tuned for motion that follows the actual objects rather than
    /// the lowest cost: vectors are biased towards their neighbors.
    #[must_use]
    #[inline]
    pub fn true_motion() -> Self {
        let defaults = Self::default();
        let area = (defaults.blk_size_x * defaults.blk_size_y) as f32;
        Self {
            lambda: 1000.0 * area / 64.0,
            lsad: 1200.0,
            penalty_new: 50.0,
            plevel: 1,
            penalty_zero: 50.0,
            ..defaults
        }
    }

    /// Frame layout the analysis expects.
    #[must_use]
    #[inline]
    pub const fn pyramid_config(&self, levels: usize) -> PyramidConfig {
        PyramidConfig {
            levels,
            hpad: self.hpad,
            vpad: self.vpad,
            pel: self.pel,
            chroma: self.chroma,
        }
    }
}

/// Result of the analysis of one frame pair.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct PairResult {
    /// Vectors of the finest level, pointing from each source block to its
    /// match in the reference.
    pub field: MotionField,
    /// Dominant motion used at the finest level, in full pixels.
    pub global: MotionVector,
    /// Sum of the finest level's block costs.
    pub plane_sad: f64,
    /// Mean luma change measured on the coarsest level.
    pub mean_luma_change: f32,
    /// Whether too many blocks failed to find a match.
    pub scene_change: bool,
}

/// Hierarchical motion search between two frames.
///
/// Holds one [`BlockSearch`] per level, coarsest last. Each pair is
/// searched from the coarsest level down, every finer level being seeded
/// with the interpolated vectors of the level above.
#[derive(Clone)]
pub struct MotionAnalysis<T: Pixel> {
    opts: AnalysisOptions,
    searches: Vec<BlockSearch<T>>,
    /// Per-level vectors of the previous pair, kept for temporal prediction.
    prev_fields: Option<Vec<MotionField>>,
    bit_depth: usize,
}

impl<T: Pixel> MotionAnalysis<T> {
    /// Lays out the pyramid levels of `width` by `height` frames.
    ///
    /// # Errors
    ///
    /// - If the frame cannot hold a single block.
    /// - If chroma is used and the padding is not a whole number of chroma
    ///   pixels.
    /// - If any level's search cannot be built from `opts`.
    #[inline]
    pub fn new(
        width: usize,
        height: usize,
        chroma_sampling: ChromaSampling,
        bit_depth: usize,
        opts: &AnalysisOptions,
    ) -> Result<Self, ConfigError> {
        let (xdec, ydec) = chroma_sampling.get_decimation().unwrap_or((0, 0));
        let chroma = opts.chroma && chroma_sampling != ChromaSampling::Cs400;
        let step_x = opts.blk_size_x.saturating_sub(opts.overlap_x).max(1);
        let step_y = opts.blk_size_y.saturating_sub(opts.overlap_y).max(1);

        let fits = |w: usize, h: usize| {
            w.checked_sub(opts.overlap_x).is_some_and(|w| w / step_x > 0)
                && h.checked_sub(opts.overlap_y).is_some_and(|h| h / step_y > 0)
        };
        if !fits(width, height) {
            return Err(ConfigError::FrameTooSmall {
                width,
                height,
                blk_w: opts.blk_size_x,
                blk_h: opts.blk_size_y,
            });
        }

        if chroma {
            check_chroma_alignment("horizontal padding", opts.hpad, xdec)?;
            check_chroma_alignment("vertical padding", opts.vpad, ydec)?;
        }

        let mut level_count = 0;
        while level_count < usize::BITS as usize
            && fits(width >> level_count, height >> level_count)
        {
            level_count += 1;
        }
        if opts.levels > 0 {
            level_count = level_count.min(opts.levels);
        }

        let mut blk_x = (width - opts.overlap_x) / step_x;
        let mut blk_y = (height - opts.overlap_y) / step_y;
        let mut geometries = Vec::with_capacity(level_count);
        for level in 0..level_count {
            if level > 0 {
                blk_x = ((blk_x * step_x + opts.overlap_x) / 2).saturating_sub(opts.overlap_x)
                    / step_x;
                blk_y = ((blk_y * step_y + opts.overlap_y) / 2).saturating_sub(opts.overlap_y)
                    / step_y;
                if blk_x == 0 || blk_y == 0 {
                    break;
                }
            }
            geometries.push(LevelGeometry {
                blk_x,
                blk_y,
                blk_size_x: opts.blk_size_x,
                blk_size_y: opts.blk_size_y,
                overlap_x: opts.overlap_x,
                overlap_y: opts.overlap_y,
                pel: if level == 0 { opts.pel } else { 1 },
                level,
                xdec,
                ydec,
                chroma,
                metric: opts.metric,
                smallest_plane: false,
                bit_depth,
            });
        }
        if let Some(coarsest) = geometries.last_mut() {
            coarsest.smallest_plane = true;
        }

        let searches = geometries
            .into_iter()
            .map(BlockSearch::new)
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "motion analysis of {}x{} frames over {} levels",
            width,
            height,
            searches.len()
        );

        Ok(Self {
            opts: *opts,
            searches,
            prev_fields: None,
            bit_depth,
        })
    }

    /// Options the analysis was built with.
    #[inline]
    pub const fn options(&self) -> &AnalysisOptions {
        &self.opts
    }

    /// Number of pyramid levels searched.
    #[inline]
    pub fn level_count(&self) -> usize {
        self.searches.len()
    }

    /// Layout of the frame pyramids [`Self::search_pair`] expects.
    #[inline]
    pub fn pyramid_config(&self) -> PyramidConfig {
        self.opts.pyramid_config(self.level_count())
    }

    /// The field of `level` left by the last search.
    #[inline]
    pub fn field(&self, level: usize) -> &MotionField {
        self.searches[level].field()
    }

    /// Forgets the vectors kept for temporal prediction.
    #[inline]
    pub fn reset_temporal(&mut self) {
        self.prev_fields = None;
    }

    /// Searches every block of `src` in `reference`, coarsest level first.
    ///
    /// # Panics
    ///
    /// - If the pyramids were not built with [`Self::pyramid_config`].
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    #[inline]
    pub fn search_pair(&mut self, src: &MvPyramid<T>, reference: &MvPyramid<T>) -> PairResult {
        let levels = self.searches.len();
        assert!(src.level_count() >= levels && reference.level_count() >= levels);

        let coarsest = levels - 1;
        let mut global = MotionVector::ZERO;
        let mut mean_luma_change = 0.0;
        let mut plane_sad = 0.0;

        for level in (0..levels).rev() {
            if level == coarsest {
                self.searches[level].write_default();
            } else {
                if self.opts.global {
                    global = self.searches[level + 1].estimate_global_mv_doubled(global);
                }
                let (fine, coarse) = self.searches.split_at_mut(level + 1);
                fine[level].interpolate_prediction(coarse[0].field());
            }

            let params = level_params(
                &self.opts,
                levels,
                self.bit_depth,
                self.prev_fields.as_deref(),
                level,
                global,
            );
            let stats =
                self.searches[level].search_mvs(src.level(level), reference.level(level), &params);

            log::debug!(
                "level {}: cost {:.0}, {} blocks searched wide",
                level,
                stats.plane_sad,
                stats.bad_blocks
            );
            if level == coarsest {
                mean_luma_change = stats.mean_luma_change;
            }
            if level == 0 {
                plane_sad = stats.plane_sad;
            }
        }

        if self.opts.temporal {
            self.prev_fields = Some(self.searches.iter().map(|s| s.field().clone()).collect());
        }

        let field = self.searches[0].field().clone();
        let scene_change = field.is_scene_change(self.opts.thscd1, self.opts.thscd2, self.bit_depth);
        PairResult {
            field,
            global,
            plane_sad,
            mean_luma_change,
            scene_change,
        }
    }

    /// Appends the vectors of every level, coarsest first, prefixed by the
    /// total length and a validity flag.
    #[inline]
    pub fn write_group_array(&self, out: &mut Vec<i32>) {
        let start = out.len();
        out.extend_from_slice(&[0, 1]);
        for search in self.searches.iter().rev() {
            search.field().write_to_array(out);
        }
        out[start] = (out.len() - start) as i32;
    }
}

/// Search parameters of `level` in a pyramid of `levels` levels.
fn level_params<'a>(
    opts: &AnalysisOptions,
    levels: usize,
    bit_depth: usize,
    prev_fields: Option<&'a [MotionField]>,
    level: usize,
    global_mv: MotionVector,
) -> SearchParams<'a> {
    let coarsest = levels - 1;
    let directional = opts.search_type.is_directional();
    let pel_search = if opts.pel_search > 0 {
        opts.pel_search
    } else {
        opts.pel as i32
    };

    let (search_type, search_param) = if level == coarsest {
        let search_type = if levels == 1 || directional {
            opts.search_type
        } else {
            SearchType::EXHAUSTIVE
        };
        let search_param = if levels == 1 {
            pel_search
        } else {
            opts.search_param
        };
        (search_type, search_param)
    } else if level == 0 {
        (opts.search_type, pel_search)
    } else if directional {
        (opts.search_type, opts.search_param)
    } else {
        (opts.coarse_search_type, opts.search_param)
    };

    let area_scale = (opts.blk_size_x * opts.blk_size_y) as f32 / 64.0;
    let depth_scale = (1 << bit_depth.saturating_sub(8)) as f32;

    SearchParams {
        search_type,
        search_param,
        lambda: opts.lambda,
        lsad: opts.lsad * area_scale * depth_scale,
        penalty_new: opts.penalty_new,
        plevel: opts.plevel,
        penalty_zero: opts.penalty_zero,
        penalty_global: if opts.global {
            opts.penalty_global
        } else {
            opts.penalty_zero
        },
        global_mv,
        bad_sad: opts.bad_sad * area_scale * depth_scale,
        bad_range: opts.bad_range,
        meander: opts.meander,
        try_many: opts.try_many && level > 0,
        field_shift: if level == 0 { opts.field_shift } else { 0 },
        temporal: prev_fields
            .filter(|_| opts.temporal)
            .and_then(|fields| fields.get(level)),
    }
}
