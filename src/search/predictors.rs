use arrayvec::ArrayVec;
use v_frame::pixel::Pixel;

use super::context::SearchContext;
use crate::{data::motion::MotionVector, field::MotionField};

/// Position of the current block in the scan.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScanPosition {
    pub blkx: usize,
    pub blky: usize,
    pub blk_x: usize,
    pub blk_y: usize,
    /// `1` when scanning left to right, `-1` otherwise.
    pub scan_dir: isize,
}

impl ScanPosition {
    pub const fn index(&self) -> usize {
        self.blky * self.blk_x + self.blkx
    }

    /// The row has a block behind the current one in scan order.
    const fn has_previous(&self) -> bool {
        if self.scan_dir > 0 {
            self.blkx > 0
        } else {
            self.blkx < self.blk_x - 1
        }
    }

    /// The row has a block ahead of the current one in scan order.
    const fn has_next(&self) -> bool {
        if self.scan_dir > 0 {
            self.blkx < self.blk_x - 1
        } else {
            self.blkx > 0
        }
    }

    fn offset(&self, rows: isize) -> usize {
        (self.index() as isize + rows * self.blk_x as isize + self.scan_dir) as usize
    }
}

/// Median, left, top, diagonal and, when supplied, temporal candidates.
pub(crate) type PredictorSet = ArrayVec<MotionVector, 5>;

pub(super) const fn median(a: i32, b: i32, c: i32) -> i32 {
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    if c < lo {
        lo
    } else if c > hi {
        hi
    } else {
        c
    }
}

/// Gathers the spatial predictors of the block at `pos` from `field`.
///
/// On the coarsest plane the median also becomes the direct predictor.
/// Afterwards `lambda` is damped according to the predictor's own cost.
pub(crate) fn fetch_predictors<T: Pixel>(
    ctx: &mut SearchContext<'_, T>,
    field: &MotionField,
    pos: ScanPosition,
    zero_shifted: MotionVector,
    temporal: Option<MotionVector>,
    smallest_plane: bool,
    lsad: f32,
) -> PredictorSet {
    let idx = pos.index();

    let left = if pos.has_previous() {
        field.get((idx as isize - pos.scan_dir) as usize)
    } else {
        zero_shifted
    };

    let top = if pos.blky > 0 {
        field.get(idx - pos.blk_x)
    } else {
        zero_shifted
    };

    // Below the current row the field still holds the coarse level's
    // prediction.
    let diagonal = if pos.blky + 1 < pos.blk_y && pos.has_next() {
        field.get(pos.offset(1))
    } else if pos.blky > 0 && pos.has_next() {
        field.get(pos.offset(-1))
    } else {
        zero_shifted
    };

    let (left, top, diagonal) = (ctx.clip_mv(left), ctx.clip_mv(top), ctx.clip_mv(diagonal));

    let median_mv = if pos.blky > 0 {
        MotionVector::new(
            median(left.x, top.x, diagonal.x),
            median(left.y, top.y, diagonal.y),
            left.cost.max(top.cost).max(diagonal.cost),
        )
    } else {
        left
    };

    let mut predictors = PredictorSet::new();
    predictors.push(median_mv);
    predictors.push(left);
    predictors.push(top);
    predictors.push(diagonal);
    if let Some(temporal) = temporal {
        predictors.push(ctx.clip_mv(temporal));
    }

    if smallest_plane {
        ctx.predictor = median_mv;
    }

    let denom = lsad + ctx.predictor.cost / 2.0;
    if denom > 0.0 {
        let damping = lsad / denom;
        ctx.lambda *= damping * damping;
    }

    predictors
}

