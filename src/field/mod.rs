//! Per-level motion vector fields and their persisted layout.


use thiserror::Error;

use crate::data::{get_dbg, get_dbg_mut, motion::MotionVector};

/// Number of serialized integers per block: `x`, `y` and the cost bits.
pub const N_PER_BLOCK: usize = 3;

/// Block layout of a motion field at one pyramid level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldGeometry {
    /// Number of blocks per row.
    pub blk_x: usize,
    /// Number of block rows.
    pub blk_y: usize,
    /// Block width, in pixels of the level.
    pub blk_size_x: usize,
    /// Block height.
    pub blk_size_y: usize,
    /// Columns shared by horizontally neighboring blocks.
    pub overlap_x: usize,
    /// Rows shared by vertically neighboring blocks.
    pub overlap_y: usize,
    /// Sub-pixel precision the vectors are expressed in.
    pub pel: usize,
    /// Pyramid level, 0 being full resolution.
    pub level: usize,
}

impl FieldGeometry {
    /// Number of blocks in the field.
    #[inline]
    pub const fn blk_count(&self) -> usize {
        self.blk_x * self.blk_y
    }

    /// Horizontal distance between neighboring block origins.
    #[inline]
    pub const fn step_x(&self) -> usize {
        self.blk_size_x - self.overlap_x
    }

    /// Vertical distance between neighboring block origins.
    #[inline]
    pub const fn step_y(&self) -> usize {
        self.blk_size_y - self.overlap_y
    }

    /// `log2` of [`Self::pel`].
    #[inline]
    pub const fn pel_log2(&self) -> u32 {
        self.pel.trailing_zeros()
    }
}

/// A persisted field array that cannot be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The array lacks even its header.
    #[error("motion field array is empty")]
    Empty,
    /// The header disagrees with the length of the array.
    #[error("header announces {header} values but {actual} are present")]
    LengthMismatch {
        /// Length recorded in the header, itself included.
        header: usize,
        /// Actual length of the array.
        actual: usize,
    },
    /// The array holds a field of another size.
    #[error("expected {expected} blocks but the array holds {found}")]
    BlockCount {
        /// Blocks in the requested geometry.
        expected: usize,
        /// Blocks in the array.
        found: usize,
    },
}

/// Per-block motion vectors of one pyramid level, in row-major block order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionField {
    geometry: FieldGeometry,
    vectors: Box<[MotionVector]>,
}

impl MotionField {
    /// A field of zero vectors with zero cost.
    ///
    /// # Panics
    ///
    /// - If the geometry has an overlap not smaller than the block size.
    #[inline]
    pub fn new(geometry: FieldGeometry) -> Self {
        assert!(geometry.overlap_x < geometry.blk_size_x);
        assert!(geometry.overlap_y < geometry.blk_size_y);
        Self {
            geometry,
            vectors: vec![MotionVector::ZERO; geometry.blk_count()].into_boxed_slice(),
        }
    }

    /// The block layout.
    #[inline]
    pub const fn geometry(&self) -> &FieldGeometry {
        &self.geometry
    }

    /// Number of blocks in the field.
    #[inline]
    pub fn blk_count(&self) -> usize {
        self.vectors.len()
    }

    /// All vectors in row-major block order.
    #[inline]
    pub fn vectors(&self) -> &[MotionVector] {
        &self.vectors
    }

    /// The vector of block `index`. Bounds are only checked in debug builds.
    #[inline]
    pub fn get(&self, index: usize) -> MotionVector {
        *get_dbg(&self.vectors, index)
    }

    /// Replaces the vector of block `index`.
    #[inline]
    pub fn set(&mut self, index: usize, mv: MotionVector) {
        *get_dbg_mut(&mut self.vectors, index) = mv;
    }

    /// Resets every block to the zero vector with the given sentinel cost.
    #[inline]
    pub fn write_default(&mut self, cost: f32) {
        self.vectors.fill(MotionVector::ZERO.with_cost(cost));
    }

    /// Appends the persisted layout: the number of integers that follow plus
    /// one, then `x, y, cost` per block with the cost as its `f32` bits.
    #[inline]
    pub fn write_to_array(&self, out: &mut Vec<i32>) {
        out.reserve(self.vectors.len() * N_PER_BLOCK + 1);
        out.push((self.vectors.len() * N_PER_BLOCK + 1) as i32);
        for mv in self.vectors.iter() {
            out.extend_from_slice(&[mv.x, mv.y, mv.cost.to_bits() as i32]);
        }
    }

    /// Reads back the layout produced by [`MotionField::write_to_array`].
    ///
    /// # Errors
    ///
    /// - If the header does not match the array length or the number of
    ///   blocks does not match `geometry`.
    #[inline]
    pub fn from_array(geometry: FieldGeometry, data: &[i32]) -> Result<Self, FieldError> {
        let (&header, body) = data.split_first().ok_or(FieldError::Empty)?;
        let header = header.max(0) as usize;
        if header != data.len() {
            return Err(FieldError::LengthMismatch {
                header,
                actual: data.len(),
            });
        }
        if body.len() != geometry.blk_count() * N_PER_BLOCK {
            return Err(FieldError::BlockCount {
                expected: geometry.blk_count(),
                found: body.len() / N_PER_BLOCK,
            });
        }

        let mut field = Self::new(geometry);
        for (mv, chunk) in field
            .vectors
            .iter_mut()
            .zip(body.chunks_exact(N_PER_BLOCK))
        {
            *mv = MotionVector::new(chunk[0], chunk[1], f32::from_bits(chunk[2] as u32));
        }
        Ok(field)
    }

    /// Compact per-block records `(x, y, cost bits low, cost bits high)`.
    #[inline]
    pub fn file_records(&self) -> Vec<[i16; 4]> {
        self.vectors
            .iter()
            .map(|mv| {
                let bits = mv.cost.to_bits();
                [
                    mv.x as i16,
                    mv.y as i16,
                    (bits & 0xffff) as u16 as i16,
                    (bits >> 16) as u16 as i16,
                ]
            })
            .collect()
    }

    /// Average block cost, zero for an empty field.
    #[inline]
    pub fn mean_cost(&self) -> f32 {
        if self.vectors.is_empty() {
            return 0.0;
        }
        self.vectors.iter().map(|mv| mv.cost as f64).sum::<f64>() as f32
            / self.vectors.len() as f32
    }

    /// Whether too many blocks failed to find a match for the field to be
    /// usable.
    ///
    /// `thscd1` is a cost threshold for an 8x8 block of 8-bit pixels and is
    /// scaled to the block size and `bit_depth`. `thscd2` is the tolerated
    /// share of bad blocks, out of 256.
    #[inline]
    pub fn is_scene_change(&self, thscd1: f32, thscd2: u32, bit_depth: usize) -> bool {
        let area = (self.geometry.blk_size_x * self.geometry.blk_size_y) as f32;
        let threshold = thscd1 * area / 64.0 * (1 << bit_depth.saturating_sub(8)) as f32;
        let limit = thscd2 as usize * self.vectors.len() / 256;

        let bad = self
            .vectors
            .iter()
            .filter(|mv| mv.cost > threshold)
            .count();
        bad > limit
    }
}
