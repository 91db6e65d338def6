use v_frame::pixel::{CastFromPrimitive, Pixel};

use crate::data::plane::PlaneRegion;

pub(super) fn get_sad_internal<T: Pixel>(
    plane_org: &PlaneRegion<'_, T>,
    plane_ref: &PlaneRegion<'_, T>,
    w: usize,
    h: usize,
) -> u32 {
    debug_assert!(w <= 64 && h <= 64);

    plane_org
        .rows_iter()
        .zip(plane_ref.rows_iter())
        .take(h)
        .map(|(src, dst)| {
            src[..w]
                .iter()
                .zip(&dst[..w])
                .map(|(&p1, &p2)| i32::cast_from(p1).abs_diff(i32::cast_from(p2)))
                .sum::<u32>()
        })
        .sum()
}

pub(super) fn block_sum_internal<T: Pixel>(block: &PlaneRegion<'_, T>) -> u32 {
    block
        .rows_iter()
        .map(|row| row.iter().map(|&p| u32::cast_from(p)).sum::<u32>())
        .sum()
}
