use std::f64::consts::PI;
use std::sync::Arc;

use approx::assert_relative_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};
use warpview_image::{ImageError, RealInterval};
use warpview_transform::decomposition::{
    centered_similarity, from_scales_angle, scales_angle_centered,
};
use warpview_transform::mask::build_masked_transform;
use warpview_transform::{
    blend, AffineInterpolator, AffineTransform, BoundingBoxEstimator, ConstantField,
    CoordinateTransform, FalloffShape, InverseSolverConfig, MaskInterpolation, MaskParameters,
    PlateauSphericalMask, SimilarityInterpolator, TransformRecord, TransformSequence, Warp,
};

#[derive(Debug)]
struct Bend;

impl Warp for Bend {
    fn num_source_dimensions(&self) -> usize {
        2
    }

    fn num_target_dimensions(&self) -> usize {
        2
    }

    fn apply(&self, s: &[f64], t: &mut [f64]) {
        t[0] = s[0] + 0.01 * s[0].powi(3);
        t[1] = s[1] + 0.1 * s[0];
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn bbox_contains_affine_preimage() -> Result<(), ImageError> {
    init_logger();
    // 90 degree rotation and scale 2 about the origin: (x, y) -> (-2y, 2x)
    let t = CoordinateTransform::from(AffineTransform::new_2d([0.0, -2.0, 0.0, 2.0, 0.0, 0.0]));
    let output = RealInterval::new(vec![0.0, 0.0], vec![1.0, 1.0])?;

    let estimate = BoundingBoxEstimator::default()
        .estimate_preimage(&t, &output, InverseSolverConfig::default())
        .expect("affine transforms invert");

    // hand inverse: (u, v) -> (v / 2, -u / 2)
    for (u, v) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)] {
        assert!(estimate.contains(&[v / 2.0, -u / 2.0], 1e-12));
    }
    assert_relative_eq!(estimate.min()[0], 0.0, epsilon = 1e-12);
    assert_relative_eq!(estimate.max()[0], 0.5, epsilon = 1e-12);
    assert_relative_eq!(estimate.min()[1], -0.5, epsilon = 1e-12);
    assert_relative_eq!(estimate.max()[1], 0.0, epsilon = 1e-12);
    Ok(())
}

#[test]
fn bbox_contains_warp_preimage() -> Result<(), ImageError> {
    init_logger();
    let warp = CoordinateTransform::warp(Bend);
    let output = RealInterval::new(vec![0.0, 0.0], vec![2.0, 2.0])?;
    let config = InverseSolverConfig::default().with_max_iters(500);

    let estimate = BoundingBoxEstimator::default()
        .estimate_preimage(&warp, &output, config)
        .expect("square warps become invertible");

    let mut inverse = warp
        .copy()
        .into_invertible(config)
        .inverse()
        .expect("iterative transforms invert");
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let y = [rng.random_range(0.0..2.0), rng.random_range(0.0..2.0)];
        let x = inverse.apply_vec(&y);
        assert!(estimate.contains(&x, 1e-4), "{x:?} outside {estimate:?}");
    }
    Ok(())
}

#[test]
fn blend_endpoints() {
    let a = CoordinateTransform::warp(Bend);
    let b = CoordinateTransform::from(AffineTransform::new_2d([1.0, 0.5, -3.0, 0.0, 2.0, 1.0]));

    let mut only_a = blend(a.copy(), b.copy(), Arc::new(ConstantField(1.0)));
    let mut only_b = blend(a.copy(), b.copy(), Arc::new(ConstantField(0.0)));
    let (mut a, mut b) = (a, b);

    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let x = [rng.random_range(-50.0..50.0), rng.random_range(-50.0..50.0)];
        let (pa, pb) = (a.apply_vec(&x), b.apply_vec(&x));
        let (qa, qb) = (only_a.apply_vec(&x), only_b.apply_vec(&x));
        for d in 0..2 {
            assert_relative_eq!(qa[d], pa[d], epsilon = 1e-12);
            assert_relative_eq!(qb[d], pb[d], epsilon = 1e-12);
        }
    }
}

#[test]
fn decomposition_round_trip() -> Result<(), warpview_transform::TransformError> {
    let (sx, sy, theta) = (2.2, 2.2, PI - 0.1);
    let c = [-10.0, 20.0];

    let p = scales_angle_centered(&from_scales_angle(sx, sy, theta), c)?;
    assert_relative_eq!(p.scale_x, sx, epsilon = 1e-9);
    assert_relative_eq!(p.scale_y, sy, epsilon = 1e-9);
    assert_relative_eq!(p.angle, theta, epsilon = 1e-9);

    let q = scales_angle_centered(&centered_similarity(theta, sx, c), c)?;
    assert_relative_eq!(q.mean_scale(), sx, epsilon = 1e-9);
    assert_relative_eq!(q.angle, theta, epsilon = 1e-9);
    Ok(())
}

#[test]
fn similarity_interpolation_endpoints() -> Result<(), warpview_transform::TransformError> {
    let c = [-10.0, 20.0];
    let end = centered_similarity(PI - 0.1, 2.2, c)
        .pre_concatenate(&AffineTransform::translation(&[3.0, -4.0]));
    let interp = SimilarityInterpolator::new(&end, c)?;

    assert!(interp.get(0.0).is_identity(1e-12));

    let at_end = interp.get(1.0);
    for point in [c, [5.0, 7.0], [0.0, 0.0]] {
        let expected = end.apply_vec(&point);
        let actual = at_end.apply_vec(&point);
        assert_relative_eq!(actual[0], expected[0], epsilon = 1e-9);
        assert_relative_eq!(actual[1], expected[1], epsilon = 1e-9);
    }

    // the center moves on a straight line
    let half = interp.get(0.5).apply_vec(&c);
    let target = end.apply_vec(&c);
    assert_relative_eq!(half[0], 0.5 * (c[0] + target[0]), epsilon = 1e-9);
    assert_relative_eq!(half[1], 0.5 * (c[1] + target[1]), epsilon = 1e-9);
    Ok(())
}

#[test]
fn inverse_stops_at_bound() {
    init_logger();
    let config = InverseSolverConfig {
        max_iters: 2,
        tolerance: 0.0,
        ..Default::default()
    };
    let forward = CoordinateTransform::Sequence(
        TransformSequence::new()
            .then(CoordinateTransform::warp(Bend))
            .then(AffineTransform::scaling(2, 3.0)),
    );
    let mut inverse = forward
        .into_invertible(config)
        .inverse()
        .expect("iterative transforms invert");
    let x = inverse.apply_vec(&[100.0, -40.0]);
    assert!(x.iter().all(|v| v.is_finite()));

    let CoordinateTransform::Iterative(solver) = &inverse else {
        panic!("expected an iterative inverse, got {}", inverse.kind());
    };
    assert!(solver.last_report().iterations <= 2);
}

#[test]
fn mask_parameters_round_trip_exactly() -> Result<(), serde_json::Error> {
    let params = MaskParameters {
        fall_off_shape: FalloffShape::Linear,
        squared_radius: 0.1 + 0.2,
        squared_sigma: PI * 1e-7,
        center: vec![1.0 / 3.0, -2.0 / 7.0],
    };
    let json = serde_json::to_string(&params)?;
    let back: MaskParameters = serde_json::from_str(&json)?;
    assert_eq!(back, params);
    assert_eq!(
        PlateauSphericalMask::from_parameters(back.clone()).parameters(),
        params
    );
    Ok(())
}

#[test]
fn record_rebuilds_masked_transform() -> Result<(), Box<dyn std::error::Error>> {
    let json = r#"{
        "type": "Thin Plate Spline",
        "landmarks": { "numDimensions": 2, "active": [] },
        "mask": {
            "parameters": {
                "fallOffShape": "COSINE",
                "squaredRadius": 4.0,
                "squaredSigma": 1.0,
                "center": [0.0, 0.0]
            },
            "range": { "min": 0.0, "max": 1.0 },
            "interpolationType": "LINEAR"
        }
    }"#;
    let record = TransformRecord::from_json(json)?;
    let mask_record = record.mask.as_ref().ok_or("mask missing")?;
    let mask = mask_record.mask().ok_or("parameters missing")?;
    assert_eq!(mask.squared_radius(), 4.0);

    let warp = CoordinateTransform::from(AffineTransform::translation(&[1.0, 1.0]));
    let mut t = build_masked_transform(
        mask_record.interpolation_type,
        warp,
        Arc::new(mask),
        None,
    )?;
    assert_eq!(t.apply_vec(&[0.0, 0.0]), vec![1.0, 1.0]);
    assert_eq!(t.apply_vec(&[10.0, 0.0]), vec![10.0, 0.0]);
    assert_eq!(mask_record.interpolation_type, MaskInterpolation::Linear);
    Ok(())
}
