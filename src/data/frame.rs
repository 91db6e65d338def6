//! Padded sub-pixel planes and the per-frame pyramid.


use v_frame::{
    frame::Frame,
    pixel::{CastFromPrimitive, ChromaSampling, Pixel},
    plane::Plane,
};

use super::plane::PlaneRegion;

/// A plane with replicated borders and its sub-pixel refined copies.
///
/// Coordinates passed to the region accessors are absolute: `(0, 0)` is the
/// top-left pixel of the padding, so the visible area starts at
/// `(hpad, vpad)`.
#[derive(Debug, Clone)]
pub struct MvPlane<T: Pixel> {
    /// `pel * pel` buffers, indexed by `fy * pel + fx`; index 0 holds the
    /// full-pixel samples.
    subplanes: Vec<Box<[T]>>,
    width: usize,
    height: usize,
    hpad: usize,
    vpad: usize,
    pitch: usize,
    pel_log2: u32,
}

impl<T: Pixel> MvPlane<T> {
    /// Allocates a black plane.
    ///
    /// # Panics
    ///
    /// - If `pel` is not 1, 2 or 4.
    #[inline]
    pub fn new(width: usize, height: usize, hpad: usize, vpad: usize, pel: usize) -> Self {
        assert!(matches!(pel, 1 | 2 | 4), "pel must be 1, 2 or 4");
        let pitch = width + 2 * hpad;
        let len = pitch * (height + 2 * vpad);
        Self {
            subplanes: (0..pel * pel)
                .map(|_| vec![T::cast_from(0); len].into_boxed_slice())
                .collect(),
            width,
            height,
            hpad,
            vpad,
            pitch,
            pel_log2: pel.trailing_zeros(),
        }
    }

    /// Copies the visible area of `plane`, pads it, and computes the
    /// sub-pixel planes.
    #[inline]
    pub fn from_plane(plane: &Plane<T>, hpad: usize, vpad: usize, pel: usize) -> Self {
        let mut mv_plane = Self::new(plane.cfg.width, plane.cfg.height, hpad, vpad, pel);
        mv_plane.fill_from_rows(plane.rows_iter());
        mv_plane.pad();
        mv_plane.refine();
        mv_plane
    }

    /// Builds the next coarser plane: half the size, 2x2 averaged, full-pixel
    /// precision.
    #[must_use]
    #[inline]
    pub fn reduce(&self) -> Self {
        let width = self.width / 2;
        let height = self.height / 2;
        let mut reduced = Self::new(width, height, self.hpad, self.vpad, 1);

        let src = &self.subplanes[0];
        let dst_pitch = reduced.pitch;
        for y in 0..height {
            let top = (self.vpad + 2 * y) * self.pitch + self.hpad;
            let bottom = top + self.pitch;
            let out = (reduced.vpad + y) * dst_pitch + reduced.hpad;
            for x in 0..width {
                let sum = u32::cast_from(src[top + 2 * x])
                    + u32::cast_from(src[top + 2 * x + 1])
                    + u32::cast_from(src[bottom + 2 * x])
                    + u32::cast_from(src[bottom + 2 * x + 1]);
                reduced.subplanes[0][out + x] = T::cast_from((sum + 2) / 4);
            }
        }

        reduced.pad();
        reduced
    }

    fn fill_from_rows<'a>(&mut self, rows: impl Iterator<Item = &'a [T]>) {
        let (width, hpad, vpad, pitch) = (self.width, self.hpad, self.vpad, self.pitch);
        for (y, row) in rows.take(self.height).enumerate() {
            let start = (vpad + y) * pitch + hpad;
            self.subplanes[0][start..start + width].copy_from_slice(&row[..width]);
        }
    }

    /// Replicates the outermost visible pixels into the padding.
    pub(crate) fn pad(&mut self) {
        let (width, height, hpad, vpad, pitch) =
            (self.width, self.height, self.hpad, self.vpad, self.pitch);
        if width == 0 || height == 0 {
            return;
        }
        let data = &mut self.subplanes[0];

        for y in vpad..vpad + height {
            let row = &mut data[y * pitch..(y + 1) * pitch];
            let left = row[hpad];
            let right = row[hpad + width - 1];
            row[..hpad].fill(left);
            row[hpad + width..].fill(right);
        }

        let (top, rest) = data.split_at_mut(vpad * pitch);
        let first = &rest[..pitch];
        for row in top.chunks_exact_mut(pitch) {
            row.copy_from_slice(first);
        }

        let last_row = vpad + height - 1;
        let (body, bottom) = data.split_at_mut((last_row + 1) * pitch);
        let last = &body[last_row * pitch..];
        for row in bottom.chunks_exact_mut(pitch) {
            row.copy_from_slice(last);
        }
    }

    /// Fills the sub-pixel planes by bilinear interpolation of the padded
    /// full-pixel plane.
    pub(crate) fn refine(&mut self) {
        let pel = 1usize << self.pel_log2;
        if pel == 1 {
            return;
        }
        let ext_w = self.pitch;
        let ext_h = self.subplanes.first().map_or(0, |p| p.len()) / self.pitch.max(1);
        let round = (pel * pel / 2) as u32;
        let shift = 2 * self.pel_log2;

        let (full, refined) = self.subplanes.split_at_mut(1);
        let full = &full[0];
        for (idx, sub) in refined.iter_mut().enumerate() {
            let idx = idx + 1;
            let (fx, fy) = ((idx % pel) as u32, (idx / pel) as u32);
            let (p, w00, w10, w01, w11) = (
                pel as u32,
                (pel as u32 - fx) * (pel as u32 - fy),
                fx * (pel as u32 - fy),
                (pel as u32 - fx) * fy,
                fx * fy,
            );
            debug_assert_eq!(w00 + w10 + w01 + w11, p * p);

            for y in 0..ext_h {
                let y1 = (y + 1).min(ext_h - 1);
                for x in 0..ext_w {
                    let x1 = (x + 1).min(ext_w - 1);
                    let a = u32::cast_from(full[y * ext_w + x]);
                    let b = u32::cast_from(full[y * ext_w + x1]);
                    let c = u32::cast_from(full[y1 * ext_w + x]);
                    let d = u32::cast_from(full[y1 * ext_w + x1]);
                    let v = (a * w00 + b * w10 + c * w01 + d * w11 + round) >> shift;
                    sub[y * ext_w + x] = T::cast_from(v);
                }
            }
        }
    }

    /// Width without padding, in full pixels.
    #[inline]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height without padding, in full pixels.
    #[inline]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Columns of padding on each side.
    #[inline]
    pub const fn hpad(&self) -> usize {
        self.hpad
    }

    /// Rows of padding above and below.
    #[inline]
    pub const fn vpad(&self) -> usize {
        self.vpad
    }

    /// Row length of the padded buffers.
    #[inline]
    pub const fn pitch(&self) -> usize {
        self.pitch
    }

    /// Sub-pixel precision: 1, 2 or 4.
    #[inline]
    pub const fn pel(&self) -> usize {
        1 << self.pel_log2
    }

    /// Full-pixel region at absolute coordinates.
    #[inline]
    pub fn region(&self, x: usize, y: usize, w: usize, h: usize) -> PlaneRegion<'_, T> {
        PlaneRegion::new(&self.subplanes[0][y * self.pitch + x..], self.pitch, w, h)
    }

    /// Region at absolute coordinates given in pel units.
    #[inline]
    pub fn pel_region(&self, x: i32, y: i32, w: usize, h: usize) -> PlaneRegion<'_, T> {
        debug_assert!(x >= 0 && y >= 0);
        let mask = (1 << self.pel_log2) - 1;
        let sub = (((y & mask) << self.pel_log2) | (x & mask)) as usize;
        let (fx, fy) = (
            (x >> self.pel_log2) as usize,
            (y >> self.pel_log2) as usize,
        );
        PlaneRegion::new(
            &self.subplanes[sub][fy * self.pitch + fx..],
            self.pitch,
            w,
            h,
        )
    }
}

/// The planes of one frame at one pyramid level.
#[derive(Debug, Clone)]
pub struct MvFrame<T: Pixel> {
    /// The luma plane.
    pub luma: MvPlane<T>,
    /// The U and V planes, absent for monochrome input or when chroma is not
    /// used by the search.
    pub chroma: Option<[MvPlane<T>; 2]>,
}

impl<T: Pixel> MvFrame<T> {
    /// The next coarser level of every plane.
    #[must_use]
    #[inline]
    pub fn reduce(&self) -> Self {
        MvFrame {
            luma: self.luma.reduce(),
            chroma: self
                .chroma
                .as_ref()
                .map(|[u, v]| [u.reduce(), v.reduce()]),
        }
    }
}

/// Layout of the planes built for each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PyramidConfig {
    /// Number of levels, including the full resolution one.
    pub levels: usize,
    /// Horizontal luma padding, in pixels.
    pub hpad: usize,
    /// Vertical luma padding, in pixels.
    pub vpad: usize,
    /// Sub-pixel precision of the finest level: 1, 2 or 4.
    pub pel: usize,
    /// Whether to build the chroma planes.
    pub chroma: bool,
}

/// All pyramid levels of a frame, finest first.
#[derive(Debug, Clone)]
pub struct MvPyramid<T: Pixel> {
    levels: Vec<MvFrame<T>>,
    chroma_sampling: ChromaSampling,
    bit_depth: usize,
}

impl<T: Pixel> MvPyramid<T> {
    /// Pads and refines `frame`, then reduces it `cfg.levels - 1` times.
    ///
    /// # Panics
    ///
    /// - If `cfg.levels` is zero.
    #[inline]
    pub fn new(
        frame: &Frame<T>,
        chroma_sampling: ChromaSampling,
        bit_depth: usize,
        cfg: &PyramidConfig,
    ) -> Self {
        assert!(cfg.levels > 0);

        let chroma = match chroma_sampling.get_decimation() {
            Some((xdec, ydec)) if cfg.chroma => Some([
                MvPlane::from_plane(&frame.planes[1], cfg.hpad >> xdec, cfg.vpad >> ydec, cfg.pel),
                MvPlane::from_plane(&frame.planes[2], cfg.hpad >> xdec, cfg.vpad >> ydec, cfg.pel),
            ]),
            _ => None,
        };
        let finest = MvFrame {
            luma: MvPlane::from_plane(&frame.planes[0], cfg.hpad, cfg.vpad, cfg.pel),
            chroma,
        };

        let mut levels = Vec::with_capacity(cfg.levels);
        levels.push(finest);
        for _ in 1..cfg.levels {
            let next = levels[levels.len() - 1].reduce();
            levels.push(next);
        }

        Self {
            levels,
            chroma_sampling,
            bit_depth,
        }
    }

    /// The planes of `level`, 0 being full resolution.
    #[inline]
    pub fn level(&self, level: usize) -> &MvFrame<T> {
        &self.levels[level]
    }

    /// Number of levels built.
    #[inline]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Chroma layout of the source frame.
    #[inline]
    pub const fn chroma_sampling(&self) -> ChromaSampling {
        self.chroma_sampling
    }

    /// Bits per sample of the source frame.
    #[inline]
    pub const fn bit_depth(&self) -> usize {
        self.bit_depth
    }
}
