//! Motion vectors.

/// A block displacement in pel units together with the matching cost found
/// for it.
///
/// The cost is the raw luma and chroma distortion of the block at this
/// displacement; search biases never leak into it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionVector {
    /// Horizontal displacement, positive to the right.
    pub x: i32,
    /// Vertical displacement, positive downwards.
    pub y: i32,
    /// Matching cost of the block at this displacement.
    pub cost: f32,
}

impl MotionVector {
    /// The zero displacement with zero cost.
    pub const ZERO: Self = Self {
        x: 0,
        y: 0,
        cost: 0.0,
    };

    /// A displacement of `(x, y)` with the given cost.
    #[inline]
    pub const fn new(x: i32, y: i32, cost: f32) -> Self {
        Self { x, y, cost }
    }

    /// The same displacement with another cost.
    #[inline]
    pub const fn with_cost(self, cost: f32) -> Self {
        Self { cost, ..self }
    }

    /// Whether the displacement is zero, whatever the cost.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// Converts the displacement between pel precisions given as `log2(pel)`.
    #[inline]
    pub const fn rescale_pel(self, from_log2: u32, to_log2: u32) -> Self {
        Self {
            x: (self.x << to_log2) >> from_log2,
            y: (self.y << to_log2) >> from_log2,
            cost: self.cost,
        }
    }

    /// Squared euclidean distance between two displacements.
    #[inline]
    pub const fn distance_sq(self, x: i32, y: i32) -> i32 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}
