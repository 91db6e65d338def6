//! Block sizes with a matching cost kernel.

use std::fmt::{self, Display};

use thiserror::Error;

/// Largest block area handled by the search, used to size scratch buffers.
pub const MAX_BLOCK_AREA: usize = 64 * 64;

/// Block sizes with a matching cost kernel.
///
/// Luma and chroma block sizes share this table: a luma size is usable when
/// both it and its subsampled chroma counterpart appear here. Each variant
/// is named `BLOCK_<width>X<height>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(Default))]
#[expect(non_camel_case_types, missing_docs)]
pub enum BlockSize {
    BLOCK_2X2,
    BLOCK_2X4,
    BLOCK_4X2,
    BLOCK_4X4,
    BLOCK_4X8,
    BLOCK_8X1,
    BLOCK_8X2,
    BLOCK_8X4,
    #[cfg_attr(test, default)]
    BLOCK_8X8,
    BLOCK_8X16,
    BLOCK_16X1,
    BLOCK_16X2,
    BLOCK_16X4,
    BLOCK_16X8,
    BLOCK_16X16,
    BLOCK_16X32,
    BLOCK_32X8,
    BLOCK_32X16,
    BLOCK_32X32,
    BLOCK_32X64,
    BLOCK_64X32,
    BLOCK_64X64,
}

impl BlockSize {
    /// The block of `w` by `h` pixels.
    ///
    /// # Errors
    ///
    /// - Returns `InvalidBlockSize` if the given `w` and `h` do not produce a
    ///   valid block size.
    #[inline]
    pub fn from_width_and_height_opt(w: usize, h: usize) -> Result<BlockSize, InvalidBlockSize> {
        use self::BlockSize::*;

        match (w, h) {
            (2, 2) => Ok(BLOCK_2X2),
            (2, 4) => Ok(BLOCK_2X4),
            (4, 2) => Ok(BLOCK_4X2),
            (4, 4) => Ok(BLOCK_4X4),
            (4, 8) => Ok(BLOCK_4X8),
            (8, 1) => Ok(BLOCK_8X1),
            (8, 2) => Ok(BLOCK_8X2),
            (8, 4) => Ok(BLOCK_8X4),
            (8, 8) => Ok(BLOCK_8X8),
            (8, 16) => Ok(BLOCK_8X16),
            (16, 1) => Ok(BLOCK_16X1),
            (16, 2) => Ok(BLOCK_16X2),
            (16, 4) => Ok(BLOCK_16X4),
            (16, 8) => Ok(BLOCK_16X8),
            (16, 16) => Ok(BLOCK_16X16),
            (16, 32) => Ok(BLOCK_16X32),
            (32, 8) => Ok(BLOCK_32X8),
            (32, 16) => Ok(BLOCK_32X16),
            (32, 32) => Ok(BLOCK_32X32),
            (32, 64) => Ok(BLOCK_32X64),
            (64, 32) => Ok(BLOCK_64X32),
            (64, 64) => Ok(BLOCK_64X64),
            _ => Err(InvalidBlockSize { w, h }),
        }
    }

    /// Width in pixels.
    #[inline]
    pub const fn width(self) -> usize {
        self.dimensions().0
    }

    /// Height in pixels.
    #[inline]
    pub const fn height(self) -> usize {
        self.dimensions().1
    }

    /// Number of pixels.
    #[inline]
    pub const fn area(self) -> usize {
        let (w, h) = self.dimensions();
        w * h
    }

    /// The block covering the same area of a plane decimated by
    /// `1 << xdec` horizontally and `1 << ydec` vertically.
    ///
    /// # Errors
    ///
    /// - Returns `InvalidBlockSize` if the subsampled block has no kernel.
    #[inline]
    pub fn subsampled_size(self, xdec: usize, ydec: usize) -> Result<BlockSize, InvalidBlockSize> {
        let (w, h) = self.dimensions();
        Self::from_width_and_height_opt(w >> xdec, h >> ydec)
    }

    /// Whether the transform-domain cost can be evaluated on this size.
    #[inline]
    pub const fn supports_satd(self) -> bool {
        let (w, h) = self.dimensions();
        w % 4 == 0 && h % 4 == 0
    }

    const fn dimensions(self) -> (usize, usize) {
        use self::BlockSize::*;

        match self {
            BLOCK_2X2 => (2, 2),
            BLOCK_2X4 => (2, 4),
            BLOCK_4X2 => (4, 2),
            BLOCK_4X4 => (4, 4),
            BLOCK_4X8 => (4, 8),
            BLOCK_8X1 => (8, 1),
            BLOCK_8X2 => (8, 2),
            BLOCK_8X4 => (8, 4),
            BLOCK_8X8 => (8, 8),
            BLOCK_8X16 => (8, 16),
            BLOCK_16X1 => (16, 1),
            BLOCK_16X2 => (16, 2),
            BLOCK_16X4 => (16, 4),
            BLOCK_16X8 => (16, 8),
            BLOCK_16X16 => (16, 16),
            BLOCK_16X32 => (16, 32),
            BLOCK_32X8 => (32, 8),
            BLOCK_32X16 => (32, 16),
            BLOCK_32X32 => (32, 32),
            BLOCK_32X64 => (32, 64),
            BLOCK_64X32 => (64, 32),
            BLOCK_64X64 => (64, 64),
        }
    }
}

impl Display for BlockSize {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width(), self.height())
    }
}

/// A block size without a matching cost kernel.
#[derive(Debug, Clone, Copy, Error)]
#[error("no matching cost kernel for a {w}x{h} block")]
pub struct InvalidBlockSize {
    /// Requested block width.
    pub w: usize,
    /// Requested block height.
    pub h: usize,
}
