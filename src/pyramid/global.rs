use crate::{data::motion::MotionVector, field::MotionField};

/// Vectors further than this from the mode, on either axis, are left out of
/// the mean.
const DIST_MAX: i32 = 6;

/// Most frequent value of `values`, the lowest one on ties.
///
/// Values outside the histogram are ignored. `None` when nothing was counted.
fn histogram_mode(values: impl Iterator<Item = i32>, freq: &mut [i32]) -> Option<i32> {
    freq.fill(0);
    let half = (freq.len() / 2) as i32;
    let (mut ind_min, mut ind_max) = (usize::MAX, 0);

    for v in values {
        let ind = half + v;
        if ind < 0 || ind as usize >= freq.len() {
            continue;
        }
        let ind = ind as usize;
        freq[ind] += 1;
        ind_min = ind_min.min(ind);
        ind_max = ind_max.max(ind);
    }
    if ind_min > ind_max {
        return None;
    }

    let mut index = ind_min;
    for i in ind_min + 1..=ind_max {
        if freq[i] > freq[index] {
            index = i;
        }
    }
    Some(index as i32 - half)
}

/// Dominant motion of `field`, doubled to the next finer level.
///
/// The mode of each component is refined by averaging the vectors close to
/// it. `freq` is the histogram scratch and is resized as needed. `prev` is
/// returned when the field has no usable vector.
#[inline]
pub fn estimate_global_mv_doubled(
    field: &MotionField,
    freq: &mut Vec<i32>,
    prev: MotionVector,
) -> MotionVector {
    let freq_size = 8192 * field.geometry().pel * 2;
    freq.resize(freq_size, 0);

    let vectors = field.vectors();
    let (Some(mode_x), Some(mode_y)) = (
        histogram_mode(vectors.iter().map(|mv| mv.x), freq),
        histogram_mode(vectors.iter().map(|mv| mv.y), freq),
    ) else {
        return prev;
    };

    let (mut sum_x, mut sum_y, mut count) = (0i64, 0i64, 0i64);
    for mv in vectors {
        if (mv.x - mode_x).abs() < DIST_MAX && (mv.y - mode_y).abs() < DIST_MAX {
            sum_x += mv.x as i64;
            sum_y += mv.y as i64;
            count += 1;
        }
    }

    if count > 0 {
        MotionVector::new((2 * sum_x / count) as i32, (2 * sum_y / count) as i32, 0.0)
    } else {
        MotionVector::new(2 * mode_x, 2 * mode_y, 0.0)
    }
}
