//! Locating and refining the dips of a normalized difference function.

struct Point {
    x: f32,
    y: f32,
}

/// Index of the first local minimum of `arr` that dips below `threshold`, scanning
/// upward from `start`. Once a value below `threshold` is found, the scan walks
/// downhill to the bottom of that dip. The last index is never returned so the
/// result always has a right neighbour for interpolation.
pub fn first_dip_below(arr: &[f32], start: usize, threshold: f32) -> Option<usize> {
    if arr.len() < 2 {
        return None;
    }
    let last = arr.len() - 1;
    let mut idx = start.max(1);
    while idx < last {
        if arr[idx] < threshold {
            while idx + 1 < last && arr[idx + 1] < arr[idx] {
                idx += 1;
            }
            return Some(idx);
        }
        idx += 1;
    }
    None
}

/// Index and value of the smallest element of `arr[start..]`.
pub fn global_minimum(arr: &[f32], start: usize) -> Option<(usize, f32)> {
    arr.iter()
        .enumerate()
        .skip(start)
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b <= v => best,
            _ => Some((i, v)),
        })
}

/// Refine the dip at `idx` to sub-sample precision by fitting a parabola through
/// it and its two neighbours. Returns the fractional position and the value at
/// the vertex. Falls back to `idx` on the boundaries or a flat neighbourhood.
pub fn refine_dip(arr: &[f32], idx: usize) -> (f32, f32) {
    if idx == 0 || idx + 1 >= arr.len() {
        return (idx as f32, arr[idx]);
    }
    let curvature = 2.0 * arr[idx] - arr[idx - 1] - arr[idx + 1];
    if curvature.abs() < 1e-12 {
        return (idx as f32, arr[idx]);
    }
    let point = quadratic_interpolation(
        Point {
            x: (idx - 1) as f32,
            y: arr[idx - 1],
        },
        Point {
            x: idx as f32,
            y: arr[idx],
        },
        Point {
            x: (idx + 1) as f32,
            y: arr[idx + 1],
        },
    );
    (point.x, point.y)
}

fn quadratic_interpolation(left: Point, center: Point, right: Point) -> Point {
    let shift = 0.5 * (right.y - left.y) / (2.0 * center.y - left.y - right.y);
    let x = center.x + shift;
    let y = center.y + 0.25 * (right.y - left.y) * shift;
    Point { x, y }
}
