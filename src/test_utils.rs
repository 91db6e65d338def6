use v_frame::{
    frame::Frame,
    pixel::{CastFromPrimitive, Pixel},
    plane::Plane,
};

pub(crate) fn plane_from_fn<T: Pixel>(
    width: usize,
    height: usize,
    xdec: usize,
    ydec: usize,
    f: impl Fn(usize, usize) -> i32,
) -> Plane<T> {
    let mut plane = Plane::new(width, height, xdec, ydec, 0, 0);
    let stride = plane.cfg.stride;
    for (y, row) in plane
        .data_origin_mut()
        .chunks_mut(stride)
        .take(height)
        .enumerate()
    {
        for (x, pixel) in row[..width].iter_mut().enumerate() {
            *pixel = T::cast_from(f(x, y));
        }
    }
    plane
}

/// A 4:2:0 frame whose luma is `f` and whose chroma is a flat mid-grey.
pub(crate) fn frame_from_fn<T: Pixel>(
    width: usize,
    height: usize,
    f: impl Fn(usize, usize) -> i32,
) -> Frame<T> {
    Frame {
        planes: [
            plane_from_fn(width, height, 0, 0, f),
            plane_from_fn(width / 2, height / 2, 1, 1, |_, _| 128),
            plane_from_fn(width / 2, height / 2, 1, 1, |_, _| 128),
        ],
    }
}

/// Smooth texture: over a few pixels the matching cost of a block grows
/// steadily with the distance to the true displacement.
pub(crate) fn texture(x: i32, y: i32) -> i32 {
    let (x, y) = (x as f64, y as f64);
    let v = 128.0 + 50.0 * (0.35 * x + 0.1 * y).sin() + 40.0 * (0.3 * y - 0.15 * x).cos();
    v.round() as i32
}
