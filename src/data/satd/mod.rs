mod rust;


use v_frame::pixel::Pixel;

use super::{block::BlockSize, plane::PlaneRegion, sad::CostFn};

/// Selects the Hadamard-domain cost kernel for `bsize`, if one exists.
///
/// Blocks are tiled with 8x8 transforms when both dimensions allow it and
/// with 4x4 transforms otherwise.
pub(crate) fn satd_fn<T: Pixel>(bsize: BlockSize) -> Option<CostFn<T>> {
    use BlockSize::*;

    Some(match bsize {
        BLOCK_4X4 => get_satd::<T, 4, 4>,
        BLOCK_4X8 => get_satd::<T, 4, 8>,
        BLOCK_8X4 => get_satd::<T, 8, 4>,
        BLOCK_8X8 => get_satd::<T, 8, 8>,
        BLOCK_8X16 => get_satd::<T, 8, 16>,
        BLOCK_16X4 => get_satd::<T, 16, 4>,
        BLOCK_16X8 => get_satd::<T, 16, 8>,
        BLOCK_16X16 => get_satd::<T, 16, 16>,
        BLOCK_16X32 => get_satd::<T, 16, 32>,
        BLOCK_32X8 => get_satd::<T, 32, 8>,
        BLOCK_32X16 => get_satd::<T, 32, 16>,
        BLOCK_32X32 => get_satd::<T, 32, 32>,
        BLOCK_32X64 => get_satd::<T, 32, 64>,
        BLOCK_64X32 => get_satd::<T, 64, 32>,
        BLOCK_64X64 => get_satd::<T, 64, 64>,
        BLOCK_2X2 | BLOCK_2X4 | BLOCK_4X2 | BLOCK_8X1 | BLOCK_8X2 | BLOCK_16X1
        | BLOCK_16X2 => return None,
    })
}

fn get_satd<T: Pixel, const W: usize, const H: usize>(
    src: &PlaneRegion<'_, T>,
    dst: &PlaneRegion<'_, T>,
) -> u32 {
    if W % 8 == 0 && H % 8 == 0 {
        rust::get_satd_internal::<T, 8>(src, dst, W, H)
    } else {
        rust::get_satd_internal::<T, 4>(src, dst, W, H)
    }
}
