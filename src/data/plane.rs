//! Borrowed views of pixel blocks.

use std::marker::PhantomData;

use v_frame::pixel::Pixel;

/// Read-only view of a rectangular block of pixels inside a larger buffer.
///
/// `data` starts at the top-left pixel of the block and must extend at least
/// `(height - 1) * stride + width` elements.
#[derive(Debug, Clone, Copy)]
pub struct PlaneRegion<'a, T: Pixel> {
    data: &'a [T],
    stride: usize,
    width: usize,
    height: usize,
}

impl<'a, T: Pixel> PlaneRegion<'a, T> {
    /// # Panics
    ///
    /// - If `data` is too short to hold `height` rows of `width` pixels.
    #[inline]
    pub fn new(data: &'a [T], stride: usize, width: usize, height: usize) -> Self {
        assert!(width <= stride || height <= 1);
        assert!(height == 0 || data.len() >= (height - 1) * stride + width);
        Self {
            data,
            stride,
            width,
            height,
        }
    }

    /// Distance between the starts of two rows, in pixels.
    #[inline]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Width in pixels.
    #[inline]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[inline]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Pointer to the top-left pixel, for the SIMD kernels.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    /// The `width` pixels of row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &'a [T] {
        debug_assert!(y < self.height);
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    /// Iterates over the rows, top to bottom.
    #[inline]
    pub fn rows_iter(&self) -> RowsIter<'a, T> {
        RowsIter {
            data: self.data,
            stride: self.stride,
            width: self.width,
            remaining: self.height,
            phantom: PhantomData,
        }
    }
}

/// Iterator over the rows of a [`PlaneRegion`], top to bottom.
pub struct RowsIter<'a, T: Pixel> {
    data: &'a [T],
    stride: usize,
    width: usize,
    remaining: usize,
    phantom: PhantomData<&'a T>,
}

impl<'a, T: Pixel> Iterator for RowsIter<'a, T> {
    type Item = &'a [T];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let row = &self.data[..self.width];
        self.remaining -= 1;
        if self.remaining > 0 {
            self.data = &self.data[self.stride..];
        }
        Some(row)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Pixel> ExactSizeIterator for RowsIter<'_, T> {}
