//! Configuration errors.

use thiserror::Error;

use crate::data::block::{BlockSize, InvalidBlockSize};

/// Rejected search or analysis configuration.
#[derive(Debug, Clone, Copy, Error)]
pub enum ConfigError {
    /// The block size, or its chroma counterpart, has no cost kernel.
    #[error(transparent)]
    BlockSize(#[from] InvalidBlockSize),
    /// The overlap exceeds half the block size.
    #[error("overlap {overlap} exceeds half of the block size {size}")]
    Overlap {
        /// Requested overlap.
        overlap: usize,
        /// Block size along the same axis.
        size: usize,
    },
    /// Sub-pixel precision other than 1, 2 or 4.
    #[error("pel must be 1, 2 or 4, got {0}")]
    Pel(usize),
    /// SATD was requested for a block size it cannot handle.
    #[error("transform-domain cost is not available for {0} blocks")]
    Satd(BlockSize),
    /// Chroma decimated by more than 2 on an axis.
    #[error("unsupported chroma decimation {xdec}x{ydec}")]
    ChromaDecimation {
        /// `log2` of the horizontal decimation.
        xdec: usize,
        /// `log2` of the vertical decimation.
        ydec: usize,
    },
    /// A luma distance that must map to a whole number of chroma pixels does
    /// not.
    #[error("{what} {value} is not a multiple of the chroma subsampling {ratio}")]
    ChromaAlignment {
        /// The offending quantity: block step, overlap or padding.
        what: &'static str,
        /// Its value in luma pixels.
        value: usize,
        /// The chroma subsampling ratio along the same axis.
        ratio: usize,
    },
    /// Bit depth outside `8..=16`.
    #[error("unsupported bit depth {0}")]
    BitDepth(usize),
    /// Not even one block fits in the frame.
    #[error("a {width}x{height} plane cannot hold a single {blk_w}x{blk_h} block")]
    FrameTooSmall {
        /// Frame width.
        width: usize,
        /// Frame height.
        height: usize,
        /// Block width.
        blk_w: usize,
        /// Block height.
        blk_h: usize,
    },
    /// The block grid is larger than the plane.
    #[error("block grid {blk_x}x{blk_y} does not fit the {width}x{height} plane")]
    GridMismatch {
        /// Number of blocks per row.
        blk_x: usize,
        /// Number of block rows.
        blk_y: usize,
        /// Plane width.
        width: usize,
        /// Plane height.
        height: usize,
    },
}

/// Checks that `value` luma pixels span a whole number of chroma pixels.
pub(crate) const fn check_chroma_alignment(
    what: &'static str,
    value: usize,
    dec: usize,
) -> Result<(), ConfigError> {
    let ratio = 1 << dec;
    if value % ratio != 0 {
        return Err(ConfigError::ChromaAlignment { what, value, ratio });
    }
    Ok(())
}
