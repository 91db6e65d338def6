//! Local refinement strategies. Each one tries candidates around the current
//! best vector through the context's `check_*` methods.

use v_frame::pixel::Pixel;

use super::{SearchType, context::SearchContext};

// Direction bits of the diamond search.
const RIGHT: i32 = 1;
const LEFT: i32 = 2;
const DOWN: i32 = 4;
const UP: i32 = 8;

/// `(x - 1) mod 6`, offset by one so index 0 maps direction -1.
const MOD6M1: [usize; 8] = [5, 0, 1, 2, 3, 4, 5, 0];

/// Radius 2 hexagon. The first and last two entries repeat so the walk can
/// index three consecutive points without wrapping.
const HEX2: [(i32, i32); 8] = [
    (-1, -2),
    (-2, 0),
    (-1, 2),
    (1, 2),
    (2, 0),
    (1, -2),
    (-1, -2),
    (-2, 0),
];

const HEX4: [(i32, i32); 16] = [
    (-4, 2),
    (-4, 1),
    (-4, 0),
    (-4, -1),
    (-4, -2),
    (4, -2),
    (4, -1),
    (4, 0),
    (4, 1),
    (4, 2),
    (2, 3),
    (0, 4),
    (-2, 3),
    (-2, -3),
    (0, -4),
    (2, -3),
];

impl<T: Pixel> SearchContext<'_, T> {
    /// Runs every enabled strategy of `search_type` with radius `stp`.
    pub(crate) fn refine(&mut self, search_type: SearchType, stp: i32) {
        if search_type.contains(SearchType::ONETIME) {
            let mut length = stp;
            while length > 0 {
                self.one_time_search(length);
                length /= 2;
            }
        }

        if search_type.contains(SearchType::NSTEP) {
            self.n_step_search(stp);
        }

        if search_type.contains(SearchType::LOGARITHMIC) {
            let mut length = stp;
            while length > 0 {
                self.diamond_search(length);
                length /= 2;
            }
        }

        if search_type.contains(SearchType::EXHAUSTIVE) {
            let (mvx, mvy) = (self.best.x, self.best.y);
            for radius in 1..=stp {
                self.expanding_search(radius, 1, mvx, mvy);
            }
        }

        if search_type.contains(SearchType::HEX2) {
            self.hex2_search(stp);
        }

        if search_type.contains(SearchType::UMH) {
            self.umh_search(stp, self.best.x, self.best.y);
        }

        if search_type.contains(SearchType::HSEARCH) {
            let (mvx, mvy) = (self.best.x, self.best.y);
            for i in 1..=stp {
                self.check_mv(mvx - i, mvy);
                self.check_mv(mvx + i, mvy);
            }
        }

        if search_type.contains(SearchType::VSEARCH) {
            let (mvx, mvy) = (self.best.x, self.best.y);
            for i in 1..=stp {
                self.check_mv(mvx, mvy - i);
                self.check_mv(mvx, mvy + i);
            }
        }
    }

    /// Walks along x, then along y, in steps of `length` for as long as the
    /// cost keeps falling.
    pub(crate) fn one_time_search(&mut self, length: i32) {
        let mut direction = 0;
        let (mut dx, mut dy) = (self.best.x, self.best.y);

        self.check_mv2(dx - length, dy, &mut direction, 2);
        self.check_mv2(dx + length, dy, &mut direction, 1);
        if direction == 1 {
            while direction != 0 {
                direction = 0;
                dx += length;
                self.check_mv2(dx + length, dy, &mut direction, 1);
            }
        } else if direction == 2 {
            while direction != 0 {
                direction = 0;
                dx -= length;
                self.check_mv2(dx - length, dy, &mut direction, 1);
            }
        }

        // `direction` carries over: if both x steps improved, y does not walk.
        self.check_mv2(dx, dy - length, &mut direction, 2);
        self.check_mv2(dx, dy + length, &mut direction, 1);
        if direction == 1 {
            while direction != 0 {
                direction = 0;
                dy += length;
                self.check_mv2(dx, dy + length, &mut direction, 1);
            }
        } else if direction == 2 {
            while direction != 0 {
                direction = 0;
                dy -= length;
                self.check_mv2(dx, dy - length, &mut direction, 1);
            }
        }
    }

    /// Tries the 8 neighbors at every distance from `stp` down to 1.
    pub(crate) fn n_step_search(&mut self, stp: i32) {
        let mut length = stp;
        while length > 0 {
            let (dx, dy) = (self.best.x, self.best.y);
            self.check_mv(dx + length, dy + length);
            self.check_mv(dx + length, dy);
            self.check_mv(dx + length, dy - length);
            self.check_mv(dx, dy - length);
            self.check_mv(dx, dy + length);
            self.check_mv(dx - length, dy + length);
            self.check_mv(dx - length, dy);
            self.check_mv(dx - length, dy - length);
            length -= 1;
        }
    }

    /// Logarithmic search on a diamond of radius `length`.
    pub(crate) fn diamond_search(&mut self, length: i32) {
        let mut direction = RIGHT | LEFT | DOWN | UP;

        while direction > 0 {
            let (dx, dy) = (self.best.x, self.best.y);
            let last = direction;
            direction = 0;

            if last & RIGHT != 0 {
                self.check_mv2(dx + length, dy, &mut direction, RIGHT);
            }
            if last & LEFT != 0 {
                self.check_mv2(dx - length, dy, &mut direction, LEFT);
            }
            if last & DOWN != 0 {
                self.check_mv2(dx, dy + length, &mut direction, DOWN);
            }
            if last & UP != 0 {
                self.check_mv2(dx, dy - length, &mut direction, UP);
            }

            if direction != 0 {
                // Moved: try the perpendicular axis from the new position.
                let (dx, dy) = (self.best.x, self.best.y);
                if direction & (RIGHT | LEFT) != 0 {
                    self.check_mv2(dx, dy + length, &mut direction, DOWN);
                    self.check_mv2(dx, dy - length, &mut direction, UP);
                } else {
                    self.check_mv2(dx + length, dy, &mut direction, RIGHT);
                    self.check_mv2(dx - length, dy, &mut direction, LEFT);
                }
            } else {
                // Stuck: the last directions hint at which diagonals to try.
                let diagonals: &[i32] = match last {
                    RIGHT => &[RIGHT | DOWN, RIGHT | UP],
                    LEFT => &[LEFT | DOWN, LEFT | UP],
                    DOWN => &[RIGHT | DOWN, LEFT | DOWN],
                    UP => &[RIGHT | UP, LEFT | UP],
                    d if d == RIGHT | DOWN => &[RIGHT | DOWN, LEFT | DOWN, RIGHT | UP],
                    d if d == LEFT | DOWN => &[RIGHT | DOWN, LEFT | DOWN, LEFT | UP],
                    d if d == RIGHT | UP => &[RIGHT | DOWN, LEFT | UP, RIGHT | UP],
                    d if d == LEFT | UP => &[LEFT | UP, LEFT | DOWN, RIGHT | UP],
                    _ => &[RIGHT | DOWN, LEFT | DOWN, RIGHT | UP, LEFT | UP],
                };
                for &diagonal in diagonals {
                    let sx = if diagonal & RIGHT != 0 { length } else { -length };
                    let sy = if diagonal & DOWN != 0 { length } else { -length };
                    self.check_mv2(dx + sx, dy + sy, &mut direction, diagonal);
                }
            }
        }
    }

    /// Tries the perimeter of the square of half-width `r` around
    /// `(mvx, mvy)` with stride `s`, corners last.
    pub(crate) fn expanding_search(&mut self, r: i32, s: i32, mvx: i32, mvy: i32) {
        let mut i = -r + s;
        while i < r {
            self.check_mv(mvx + i, mvy - r);
            self.check_mv(mvx + i, mvy + r);
            i += s;
        }

        let mut j = -r + s;
        while j < r {
            self.check_mv(mvx - r, mvy + j);
            self.check_mv(mvx + r, mvy + j);
            j += s;
        }

        self.check_mv(mvx - r, mvy - r);
        self.check_mv(mvx - r, mvy + r);
        self.check_mv(mvx + r, mvy - r);
        self.check_mv(mvx + r, mvy + r);
    }

    /// Hexagon search, as done by x264, followed by a square refinement.
    pub(crate) fn hex2_search(&mut self, range: i32) {
        let mut dir = -2;
        let (mut bmx, mut bmy) = (self.best.x, self.best.y);

        if range > 1 {
            for (val, &(hx, hy)) in HEX2[1..7].iter().enumerate() {
                self.check_mv_dir(bmx + hx, bmy + hy, &mut dir, val as i32);
            }

            if dir != -2 {
                let (hx, hy) = HEX2[(dir + 1) as usize];
                bmx += hx;
                bmy += hy;

                let mut i = 1;
                while i < range / 2 && self.is_vector_ok(bmx, bmy) {
                    // Only the half hexagon not covered by the previous step.
                    let odir = MOD6M1[(dir + 1) as usize];
                    dir = -2;
                    for k in 0..3 {
                        let (hx, hy) = HEX2[odir + k];
                        self.check_mv_dir(bmx + hx, bmy + hy, &mut dir, odir as i32 + k as i32 - 1);
                    }
                    if dir == -2 {
                        break;
                    }
                    let (hx, hy) = HEX2[(dir + 1) as usize];
                    bmx += hx;
                    bmy += hy;
                    i += 1;
                }
            }
            debug_assert_eq!((bmx, bmy), (self.best.x, self.best.y));
        }

        self.expanding_search(1, 1, bmx, bmy);
    }

    /// Tries odd distances from `start` along both axes around `(mvx, mvy)`.
    pub(crate) fn cross_search(&mut self, start: i32, x_max: i32, y_max: i32, mvx: i32, mvy: i32) {
        let mut i = start;
        while i < x_max {
            self.check_mv(mvx - i, mvy);
            self.check_mv(mvx + i, mvy);
            i += 2;
        }

        let mut j = start;
        while j < y_max {
            self.check_mv(mvx, mvy - j);
            self.check_mv(mvx, mvy + j);
            j += 2;
        }
    }

    /// Uneven multi-hexagon search centered on `(omx, omy)`.
    pub(crate) fn umh_search(&mut self, range: i32, omx: i32, omy: i32) {
        self.cross_search(1, range, range, omx, omy);

        let rings = (range / 4).max(1);
        for i in 1..=rings {
            for &(hx, hy) in HEX4.iter() {
                self.check_mv(omx + hx * i, omy + hy * i);
            }
        }

        self.hex2_search(range);
    }
}
