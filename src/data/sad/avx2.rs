use std::arch::x86_64::*;

use v_frame::pixel::Pixel;

use crate::data::plane::PlaneRegion;

/// SAD of an 8-bit block whose width is a multiple of 32.
#[target_feature(enable = "avx2")]
pub(super) unsafe fn get_sad_u8<T: Pixel>(
    src: &PlaneRegion<'_, T>,
    dst: &PlaneRegion<'_, T>,
    w: usize,
    h: usize,
) -> u32 {
    debug_assert_eq!(size_of::<T>(), 1);
    debug_assert!(w % 32 == 0);

    let src_ptr = src.as_ptr().cast::<u8>();
    let dst_ptr = dst.as_ptr().cast::<u8>();

    // SAFETY: both regions are at least `h` rows of `w` pixels.
    unsafe {
        let mut acc = _mm256_setzero_si256();
        for y in 0..h {
            let s = src_ptr.add(y * src.stride());
            let d = dst_ptr.add(y * dst.stride());
            for x in (0..w).step_by(32) {
                let a = _mm256_loadu_si256(s.add(x).cast());
                let b = _mm256_loadu_si256(d.add(x).cast());
                acc = _mm256_add_epi64(acc, _mm256_sad_epu8(a, b));
            }
        }

        let sum = _mm_add_epi64(
            _mm256_castsi256_si128(acc),
            _mm256_extracti128_si256::<1>(acc),
        );
        let hi = _mm_unpackhi_epi64(sum, sum);
        _mm_cvtsi128_si32(_mm_add_epi64(sum, hi)) as u32
    }
}
