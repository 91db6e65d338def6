use v_frame::pixel::{CastFromPrimitive, Pixel};

use crate::data::{
    hadamard::{hadamard4x4, hadamard8x8},
    plane::PlaneRegion,
};

/// Sums the absolute transform coefficients of every `TILE`x`TILE` tile of
/// the residual.
pub(super) fn get_satd_internal<T: Pixel, const TILE: usize>(
    src: &PlaneRegion<'_, T>,
    dst: &PlaneRegion<'_, T>,
    w: usize,
    h: usize,
) -> u32 {
    debug_assert!(TILE == 4 || TILE == 8);
    debug_assert!(w % TILE == 0 && h % TILE == 0);

    let mut sum = 0;
    for ty in (0..h).step_by(TILE) {
        for tx in (0..w).step_by(TILE) {
            sum += if TILE == 4 {
                let mut buf = [0i32; 16];
                fill_residual(&mut buf, src, dst, tx, ty, 4);
                hadamard4x4(&mut buf);
                // Normalize to the scale of a SAD.
                (abs_sum(&buf) + 1) >> 1
            } else {
                let mut buf = [0i32; 64];
                fill_residual(&mut buf, src, dst, tx, ty, 8);
                hadamard8x8(&mut buf);
                (abs_sum(&buf) + 2) >> 2
            };
        }
    }
    sum
}

fn fill_residual<T: Pixel>(
    buf: &mut [i32],
    src: &PlaneRegion<'_, T>,
    dst: &PlaneRegion<'_, T>,
    tx: usize,
    ty: usize,
    n: usize,
) {
    for (r, out) in buf.chunks_exact_mut(n).enumerate() {
        let s = &src.row(ty + r)[tx..tx + n];
        let d = &dst.row(ty + r)[tx..tx + n];
        for ((o, &a), &b) in out.iter_mut().zip(s).zip(d) {
            *o = i32::cast_from(a) - i32::cast_from(b);
        }
    }
}

fn abs_sum(coeffs: &[i32]) -> u32 {
    coeffs.iter().map(|c| c.unsigned_abs()).sum()
}
