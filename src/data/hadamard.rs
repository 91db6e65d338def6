// In-place 2D Walsh-Hadamard transforms on row-major blocks.

pub(crate) fn hadamard4x4(data: &mut [i32; 16]) {
    hadamard2d::<16, 4>(data, hadamard4_1d::<16>);
}

pub(crate) fn hadamard8x8(data: &mut [i32; 64]) {
    hadamard2d::<64, 8>(data, hadamard8_1d::<64>);
}

fn hadamard2d<const LEN: usize, const N: usize>(
    data: &mut [i32; LEN],
    transform: fn(&mut [i32; LEN], usize, usize),
) {
    // Columns, then rows.
    for i in 0..N {
        transform(data, i, N);
    }
    for i in 0..N {
        transform(data, i * N, 1);
    }
}

fn hadamard4_1d<const LEN: usize>(data: &mut [i32; LEN], start: usize, step: usize) {
    let idx = |k: usize| start + k * step;

    let (a0, a1) = butterfly(data[idx(0)], data[idx(1)]);
    let (a2, a3) = butterfly(data[idx(2)], data[idx(3)]);
    let (b0, b2) = butterfly(a0, a2);
    let (b1, b3) = butterfly(a1, a3);

    data[idx(0)] = b0;
    data[idx(1)] = b1;
    data[idx(2)] = b2;
    data[idx(3)] = b3;
}

fn hadamard8_1d<const LEN: usize>(data: &mut [i32; LEN], start: usize, step: usize) {
    let idx = |k: usize| start + k * step;

    let (a0, a1) = butterfly(data[idx(0)], data[idx(1)]);
    let (a2, a3) = butterfly(data[idx(2)], data[idx(3)]);
    let (a4, a5) = butterfly(data[idx(4)], data[idx(5)]);
    let (a6, a7) = butterfly(data[idx(6)], data[idx(7)]);

    let (b0, b2) = butterfly(a0, a2);
    let (b1, b3) = butterfly(a1, a3);
    let (b4, b6) = butterfly(a4, a6);
    let (b5, b7) = butterfly(a5, a7);

    let (c0, c4) = butterfly(b0, b4);
    let (c1, c5) = butterfly(b1, b5);
    let (c2, c6) = butterfly(b2, b6);
    let (c3, c7) = butterfly(b3, b7);

    for (k, v) in [c0, c1, c2, c3, c4, c5, c6, c7].into_iter().enumerate() {
        data[idx(k)] = v;
    }
}

const fn butterfly(a: i32, b: i32) -> (i32, i32) {
    ((a + b), (a - b))
}
