use crate::affine::AffineTransform;

/// Squared Euclidean distance between two points.
pub fn squared_distance(p: &[f64], q: &[f64]) -> f64 {
    p.iter().zip(q).map(|(a, b)| (b - a) * (b - a)).sum()
}

/// A sphere enclosing `points`, as `(center, squared_radius)`.
///
/// The sphere is centered on the midpoint of the farthest pair of points. This is exact for
/// two points and a close, cheap approximation otherwise. Returns `None` for fewer than two
/// points.
pub fn smallest_enclosing_sphere<P: AsRef<[f64]>>(points: &[P]) -> Option<(Vec<f64>, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for i in 0..points.len() {
        for j in i + 1..points.len() {
            let d = squared_distance(points[i].as_ref(), points[j].as_ref());
            if best.map_or(true, |(_, _, b)| d > b) {
                best = Some((i, j, d));
            }
        }
    }

    let (i, j, d) = best?;
    let center = points[i]
        .as_ref()
        .iter()
        .zip(points[j].as_ref())
        .map(|(a, b)| 0.5 * a + 0.5 * b)
        .collect();
    Some((center, d / 4.0))
}

/// Determinant of the linear part of a 2d affine.
pub fn det2d(a: &AffineTransform) -> f64 {
    a.get(0, 0) * a.get(1, 1) - a.get(1, 0) * a.get(0, 1)
}

/// Trace of the linear part of a 2d affine.
pub fn trace2d(a: &AffineTransform) -> f64 {
    a.get(0, 0) + a.get(1, 1)
}

/// Eigenvalues of the linear part of a 2d affine, largest first.
///
/// Returns `None` when the eigenvalues are complex.
pub fn evals2d(a: &AffineTransform) -> Option<[f64; 2]> {
    let m = trace2d(a) / 2.0;
    let disc = m * m - det2d(a);
    if disc < 0.0 {
        return None;
    }
    let d = disc.sqrt();
    Some([m + d, m - d])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn enclosing_sphere_of_farthest_pair() {
        let points = [[0.0, 0.0], [1.0, 0.0], [4.0, 0.0], [2.0, 1.0]];
        let (center, r2) = smallest_enclosing_sphere(&points).expect("enough points");
        assert_eq!(center, vec![2.0, 0.0]);
        assert_relative_eq!(r2, 4.0);
        assert!(smallest_enclosing_sphere(&[[1.0, 1.0]]).is_none());
    }

    #[test]
    fn eigenvalues() {
        let a = AffineTransform::new_2d([2.0, 1.0, 5.0, 1.0, 2.0, 5.0]);
        assert_relative_eq!(det2d(&a), 3.0);
        assert_relative_eq!(trace2d(&a), 4.0);
        assert_eq!(evals2d(&a), Some([3.0, 1.0]));

        let rotation = AffineTransform::new_2d([0.0, -1.0, 0.0, 1.0, 0.0, 0.0]);
        assert!(evals2d(&rotation).is_none());
    }
}
