use v_frame::pixel::Pixel;

use crate::data::{
    frame::MvFrame,
    motion::MotionVector,
    plane::PlaneRegion,
    sad::CostFn,
};

/// Legal displacements of one block, in pel units. The maxima are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MvBounds {
    pub dx_min: i32,
    pub dx_max: i32,
    pub dy_min: i32,
    pub dy_max: i32,
}

impl MvBounds {
    pub const fn contains(&self, vx: i32, vy: i32) -> bool {
        vx >= self.dx_min && vy >= self.dy_min && vx < self.dx_max && vy < self.dy_max
    }

    /// Clamps into the legal range, keeping the cost.
    pub fn clip(&self, mv: MotionVector) -> MotionVector {
        MotionVector {
            x: mv.x.min(self.dx_max - 1).max(self.dx_min),
            y: mv.y.min(self.dy_max - 1).max(self.dy_min),
            cost: mv.cost,
        }
    }
}

/// The source block being matched, copied out of its plane.
pub(crate) struct SourceBlock<'a, T: Pixel> {
    pub luma: PlaneRegion<'a, T>,
    pub chroma: Option<[PlaneRegion<'a, T>; 2]>,
}

/// Where the block sits in the reference planes and how to score it.
pub(crate) struct BlockLocation {
    /// Luma block origin in absolute pel units.
    pub x: i32,
    pub y: i32,
    /// Chroma block origin in absolute pel units.
    pub cx: i32,
    pub cy: i32,
    pub xdec: u32,
    pub ydec: u32,
}

/// Mutable state of the search for one block.
///
/// Every local search reads and updates `best`, `min_cost` and `predictor`
/// through the `check_*` methods, which are the only way a candidate becomes
/// the best vector.
pub(crate) struct SearchContext<'a, T: Pixel> {
    src: SourceBlock<'a, T>,
    reference: &'a MvFrame<T>,
    loc: BlockLocation,
    luma_cost: CostFn<T>,
    chroma_sad: CostFn<T>,
    pub bounds: MvBounds,
    pub best: MotionVector,
    /// Cost of `best` including the search biases.
    pub min_cost: f32,
    pub predictor: MotionVector,
    pub lambda: f32,
    pub penalty_new: f32,
}

impl<'a, T: Pixel> SearchContext<'a, T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        src: SourceBlock<'a, T>,
        reference: &'a MvFrame<T>,
        loc: BlockLocation,
        luma_cost: CostFn<T>,
        chroma_sad: CostFn<T>,
        bounds: MvBounds,
        lambda: f32,
        penalty_new: f32,
    ) -> Self {
        debug_assert_eq!(src.chroma.is_some(), reference.chroma.is_some());
        Self {
            src,
            reference,
            loc,
            luma_cost,
            chroma_sad,
            bounds,
            best: MotionVector::ZERO,
            min_cost: f32::INFINITY,
            predictor: MotionVector::ZERO,
            lambda,
            penalty_new,
        }
    }

    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub fn is_vector_ok(&self, vx: i32, vy: i32) -> bool {
        self.bounds.contains(vx, vy)
    }

    #[inline]
    pub fn clip_mv(&self, mv: MotionVector) -> MotionVector {
        self.bounds.clip(mv)
    }

    /// Luma matching cost of the block displaced by `(vx, vy)`.
    pub fn luma_cost(&self, vx: i32, vy: i32) -> f32 {
        let src = &self.src.luma;
        let reference =
            self.reference
                .luma
                .pel_region(self.loc.x + vx, self.loc.y + vy, src.width(), src.height());
        (self.luma_cost)(src, &reference) as f32
    }

    /// Sum of the U and V absolute differences, zero without chroma.
    pub fn chroma_cost(&self, vx: i32, vy: i32) -> f32 {
        let (Some([src_u, src_v]), Some([ref_u, ref_v])) =
            (&self.src.chroma, &self.reference.chroma)
        else {
            return 0.0;
        };
        let cx = self.loc.cx + (vx >> self.loc.xdec);
        let cy = self.loc.cy + (vy >> self.loc.ydec);
        let (w, h) = (src_u.width(), src_u.height());
        let sad_u = (self.chroma_sad)(src_u, &ref_u.pel_region(cx, cy, w, h));
        let sad_v = (self.chroma_sad)(src_v, &ref_v.pel_region(cx, cy, w, h));
        (sad_u + sad_v) as f32
    }

    /// Unbiased luma plus chroma cost.
    pub fn block_cost(&self, vx: i32, vy: i32) -> f32 {
        self.luma_cost(vx, vy) + self.chroma_cost(vx, vy)
    }

    fn motion_distortion(&self, vx: i32, vy: i32) -> f32 {
        self.lambda * self.predictor.distance_sq(vx, vy) as f32 / 256.0
    }

    /// Scores a predictor candidate: only the `penalty_new` bias applies.
    pub fn check_mv0(&mut self, vx: i32, vy: i32) -> bool {
        self.check(vx, vy, false)
    }

    /// Scores a local search candidate.
    pub fn check_mv(&mut self, vx: i32, vy: i32) -> bool {
        self.check(vx, vy, true)
    }

    /// Like [`Self::check_mv`], and adds `val` to `dir` on improvement.
    pub fn check_mv2(&mut self, vx: i32, vy: i32, dir: &mut i32, val: i32) {
        if self.check(vx, vy, true) {
            *dir |= val;
        }
    }

    /// Like [`Self::check_mv`], and sets `dir` to `val` on improvement.
    pub fn check_mv_dir(&mut self, vx: i32, vy: i32, dir: &mut i32, val: i32) {
        if self.check(vx, vy, true) {
            *dir = val;
        }
    }

    #[inline(always)]
    #[allow(clippy::inline_always)]
    fn check(&mut self, vx: i32, vy: i32, with_distortion: bool) -> bool {
        if !self.is_vector_ok(vx, vy) {
            return false;
        }

        let mut cost = if with_distortion {
            let distortion = self.motion_distortion(vx, vy);
            if distortion >= self.min_cost {
                return false;
            }
            distortion
        } else {
            0.0
        };

        let sad = self.luma_cost(vx, vy);
        cost += sad + self.penalty_new * sad / 256.0;
        if cost >= self.min_cost {
            return false;
        }

        let sad_uv = self.chroma_cost(vx, vy);
        cost += sad_uv + self.penalty_new * sad_uv / 256.0;
        if cost >= self.min_cost {
            return false;
        }

        self.best = MotionVector::new(vx, vy, sad + sad_uv);
        self.min_cost = cost;
        true
    }
}
