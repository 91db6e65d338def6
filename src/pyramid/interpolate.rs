use crate::{data::motion::MotionVector, field::MotionField};

/// Area weights of the two coarse blocks covering a fine block along one
/// axis: the one under the fine block first.
///
/// `odd` is true when the fine block is the second of the pair covered by
/// its coarse block. The weights add up to `4 * (size - overlap)`.
pub(crate) const fn area_weights(size: i32, overlap: i32, odd: bool) -> (i32, i32) {
    let near = if odd {
        3 * size - 2 * overlap
    } else {
        3 * size - 4 * overlap
    };
    (near, 4 * (size - overlap) - near)
}

/// Seeds `fine` from the field of the next coarser level.
///
/// Each fine block blends the coarse vector under it with its horizontal,
/// vertical and diagonal neighbors on the side the fine block leans to;
/// blocks on the outer ring of the coarse grid use fewer neighbors. The
/// result is converted to the fine level's resolution and pel.
///
/// # Panics
///
/// - If an overlap exceeds half of the block size.
#[inline]
pub fn interpolate_prediction(fine: &mut MotionField, coarse: &MotionField) {
    let g = *fine.geometry();
    let cg = coarse.geometry();
    assert!(
        g.overlap_x <= g.blk_size_x / 2 && g.overlap_y <= g.blk_size_y / 2,
        "overlap larger than half a block is not supported"
    );

    let norm_factor = 3 - g.pel_log2() as i32 + cg.pel_log2() as i32;
    let (shift_right, shift_left) = if norm_factor < 0 {
        (0, -norm_factor)
    } else {
        (norm_factor, 0)
    };
    let (bsx, bsy) = (g.blk_size_x as i32, g.blk_size_y as i32);
    let (ovx, ovy) = (g.overlap_x as i32, g.overlap_y as i32);
    let no_overlap = ovx == 0 && ovy == 0;
    let normov = (bsx - ovx) * (bsy - ovy);

    let (cbx, cby) = (cg.blk_x, cg.blk_y);
    let at = |x: usize, y: usize| coarse.get(y * cbx + x);

    for l in 0..g.blk_y {
        for k in 0..g.blk_x {
            let i = k.min(2 * cbx - 1);
            let j = l.min(2 * cby - 1);
            let (ix, jy) = (i / 2, j / 2);
            // Neighbor on the side of the coarse block the fine one lies in.
            let nx = if i % 2 == 1 { ix + 1 } else { ix.wrapping_sub(1) };
            let ny = if j % 2 == 1 { jy + 1 } else { jy.wrapping_sub(1) };

            let x_edge = i == 0 || i >= 2 * cbx - 1;
            let y_edge = j == 0 || j >= 2 * cby - 1;
            let (v1, v2, v3, v4) = match (x_edge, y_edge) {
                (true, true) => {
                    let v = at(ix, jy);
                    (v, v, v, v)
                }
                (true, false) => {
                    let (v, w) = (at(ix, jy), at(ix, ny));
                    (v, v, w, w)
                }
                (false, true) => {
                    let (v, w) = (at(ix, jy), at(nx, jy));
                    (v, v, w, w)
                }
                (false, false) => (at(ix, jy), at(nx, jy), at(ix, ny), at(nx, ny)),
            };

            let (w1, w2, w3, w4, norm) = if no_overlap {
                (9, 3, 3, 1, 1)
            } else {
                let (ax1, ax2) = area_weights(bsx, ovx, i % 2 == 1);
                let (ay1, ay2) = area_weights(bsy, ovy, j % 2 == 1);
                (ax1 * ay1, ax2 * ay1, ax1 * ay2, ax2 * ay2, normov)
            };

            let x = (w1 * v1.x + w2 * v2.x + w3 * v3.x + w4 * v4.x) / norm;
            let y = (w1 * v1.y + w2 * v2.y + w3 * v3.y + w4 * v4.y) / norm;
            let cost = (w1 as f32 * v1.cost
                + w2 as f32 * v2.cost
                + w3 as f32 * v3.cost
                + w4 as f32 * v4.cost)
                / norm as f32;

            fine.set(
                l * g.blk_x + k,
                MotionVector::new(
                    (x >> shift_right) << shift_left,
                    (y >> shift_right) << shift_left,
                    cost / 16.0,
                ),
            );
        }
    }
}
