#[cfg(asm_x86_64)]
mod avx2;
mod rust;
#[cfg(asm_x86_64)]
mod sse2;


use cfg_if::cfg_if;
use v_frame::pixel::Pixel;

use super::{block::BlockSize, plane::PlaneRegion};

/// A matching cost kernel for one fixed block size.
pub(crate) type CostFn<T> = fn(&PlaneRegion<'_, T>, &PlaneRegion<'_, T>) -> u32;

/// Selects the sum of absolute differences kernel for `bsize`.
pub(crate) fn sad_fn<T: Pixel>(bsize: BlockSize) -> CostFn<T> {
    use BlockSize::*;

    match bsize {
        BLOCK_2X2 => get_sad::<T, 2, 2>,
        BLOCK_2X4 => get_sad::<T, 2, 4>,
        BLOCK_4X2 => get_sad::<T, 4, 2>,
        BLOCK_4X4 => get_sad::<T, 4, 4>,
        BLOCK_4X8 => get_sad::<T, 4, 8>,
        BLOCK_8X1 => get_sad::<T, 8, 1>,
        BLOCK_8X2 => get_sad::<T, 8, 2>,
        BLOCK_8X4 => get_sad::<T, 8, 4>,
        BLOCK_8X8 => get_sad::<T, 8, 8>,
        BLOCK_8X16 => get_sad::<T, 8, 16>,
        BLOCK_16X1 => get_sad::<T, 16, 1>,
        BLOCK_16X2 => get_sad::<T, 16, 2>,
        BLOCK_16X4 => get_sad::<T, 16, 4>,
        BLOCK_16X8 => get_sad::<T, 16, 8>,
        BLOCK_16X16 => get_sad::<T, 16, 16>,
        BLOCK_16X32 => get_sad::<T, 16, 32>,
        BLOCK_32X8 => get_sad::<T, 32, 8>,
        BLOCK_32X16 => get_sad::<T, 32, 16>,
        BLOCK_32X32 => get_sad::<T, 32, 32>,
        BLOCK_32X64 => get_sad::<T, 32, 64>,
        BLOCK_64X32 => get_sad::<T, 64, 32>,
        BLOCK_64X64 => get_sad::<T, 64, 64>,
    }
}

fn get_sad<T: Pixel, const W: usize, const H: usize>(
    src: &PlaneRegion<'_, T>,
    dst: &PlaneRegion<'_, T>,
) -> u32 {
    debug_assert!(src.width() == W && src.height() == H);
    debug_assert!(dst.width() == W && dst.height() == H);

    cfg_if! {
        if #[cfg(asm_x86_64)] {
            if size_of::<T>() == 1 {
                if W % 32 == 0 && crate::cpu::has_avx2() {
                    // SAFETY: avx2 was detected and both regions hold H rows of W pixels.
                    return unsafe { avx2::get_sad_u8(src, dst, W, H) };
                }
                if W % 16 == 0 || W == 8 {
                    // SAFETY: SSE2 is baseline on all x86_64 CPUs.
                    return unsafe { sse2::get_sad_u8(src, dst, W, H) };
                }
            }
        }
    }

    rust::get_sad_internal(src, dst, W, H)
}

/// Sum of all pixels of a block.
pub(crate) fn block_sum<T: Pixel>(block: &PlaneRegion<'_, T>) -> u32 {
    rust::block_sum_internal(block)
}
