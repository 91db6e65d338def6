//! Planes, block sizes and matching cost kernels.

pub mod block;
pub mod frame;
pub(crate) mod hadamard;
pub mod motion;
pub mod plane;
pub(crate) mod sad;
pub(crate) mod satd;

/// Indexes a slice with bounds checks in debug builds only.
///
/// The block scan guarantees every index it produces is in range, so release
/// builds skip the check in the hot path.
#[inline(always)]
#[allow(clippy::inline_always)]
pub(crate) fn get_dbg<T, I: std::slice::SliceIndex<[T]>>(
    arr: &[T],
    index: I,
) -> &<I as std::slice::SliceIndex<[T]>>::Output {
    use cfg_if::cfg_if;

    cfg_if! {
        if #[cfg(debug_assertions)] {
            arr.get(index).expect("array index out of bounds")
        } else {
            // SAFETY: callers only pass indices derived from the block grid
            // dimensions, which are checked at construction.
            unsafe { arr.get_unchecked(index) }
        }
    }
}

/// Mutable counterpart of [`get_dbg`].
#[inline(always)]
#[allow(clippy::inline_always)]
pub(crate) fn get_dbg_mut<T, I: std::slice::SliceIndex<[T]>>(
    arr: &mut [T],
    index: I,
) -> &mut <I as std::slice::SliceIndex<[T]>>::Output {
    use cfg_if::cfg_if;

    cfg_if! {
        if #[cfg(debug_assertions)] {
            arr.get_mut(index).expect("array index out of bounds")
        } else {
            // SAFETY: see `get_dbg`.
            unsafe { arr.get_unchecked_mut(index) }
        }
    }
}
