use std::arch::x86_64::*;

use v_frame::pixel::Pixel;

use crate::data::plane::PlaneRegion;

/// SAD of an 8-bit block whose width is 8 or a multiple of 16.
#[target_feature(enable = "sse2")]
pub(super) unsafe fn get_sad_u8<T: Pixel>(
    src: &PlaneRegion<'_, T>,
    dst: &PlaneRegion<'_, T>,
    w: usize,
    h: usize,
) -> u32 {
    debug_assert_eq!(size_of::<T>(), 1);
    debug_assert!(w == 8 || w % 16 == 0);

    let src_ptr = src.as_ptr().cast::<u8>();
    let dst_ptr = dst.as_ptr().cast::<u8>();

    // SAFETY: both regions are at least `h` rows of `w` pixels, and
    // every load below reads at most `w` bytes from the start of a row.
    unsafe {
        let mut acc = _mm_setzero_si128();
        for y in 0..h {
            let s = src_ptr.add(y * src.stride());
            let d = dst_ptr.add(y * dst.stride());
            if w == 8 {
                let a = _mm_loadl_epi64(s.cast());
                let b = _mm_loadl_epi64(d.cast());
                acc = _mm_add_epi64(acc, _mm_sad_epu8(a, b));
            } else {
                for x in (0..w).step_by(16) {
                    let a = _mm_loadu_si128(s.add(x).cast());
                    let b = _mm_loadu_si128(d.add(x).cast());
                    acc = _mm_add_epi64(acc, _mm_sad_epu8(a, b));
                }
            }
        }

        let hi = _mm_unpackhi_epi64(acc, acc);
        _mm_cvtsi128_si32(_mm_add_epi64(acc, hi)) as u32
    }
}
