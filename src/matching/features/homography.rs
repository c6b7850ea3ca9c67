//! Planar homography estimation and projected-outline geometry
//!
//! A 4-point normalized DLT inside a seeded RANSAC loop, followed by a
//! least-squares refit on the consensus set.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;

pub type Point = (f64, f64);

/// 3x3 projective transform, normalized so that `h[(2, 2)] == 1` when
/// possible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(pub Matrix3<f64>);

impl Homography {
    /// Map a point. `None` when it lands on the line at infinity.
    pub fn project(&self, (x, y): Point) -> Option<Point> {
        let p = self.0 * Vector3::new(x, y, 1.0);
        if p.z.abs() < 1e-12 {
            return None;
        }
        Some((p.x / p.z, p.y / p.z))
    }

    pub fn determinant(&self) -> f64 {
        self.0.determinant()
    }

    fn normalized(self) -> Homography {
        let scale = self.0[(2, 2)];
        if scale.abs() < 1e-12 {
            return self;
        }
        Homography(self.0 / scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RansacParams {
    /// Maximum reprojection error, in pixels, for an inlier
    pub reproj_threshold: f64,
    pub max_iterations: usize,
    /// Probability of drawing at least one all-inlier sample
    pub confidence: f64,
    pub seed: u64,
}

impl RansacParams {
    pub fn with_threshold(reproj_threshold: f64) -> Self {
        Self {
            reproj_threshold,
            ..Self::default()
        }
    }
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            reproj_threshold: 3.0,
            max_iterations: 2000,
            confidence: 0.995,
            seed: 0x5eed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RansacFit {
    pub homography: Homography,
    /// Inlier flag per correspondence
    pub inliers: Vec<bool>,
    pub inlier_count: usize,
}

/// Robustly fit `dst ≈ H(src)`. Returns `None` with fewer than four
/// correspondences or when no non-degenerate model is found.
pub fn find_homography_ransac(src: &[Point], dst: &[Point], params: &RansacParams) -> Option<RansacFit> {
    let n = src.len();
    if n < 4 || n != dst.len() {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<RansacFit> = None;
    let mut iterations = params.max_iterations;
    let mut i = 0;
    while i < iterations {
        i += 1;
        let sample = index::sample(&mut rng, n, 4);
        let s: Vec<Point> = sample.iter().map(|k| src[k]).collect();
        let d: Vec<Point> = sample.iter().map(|k| dst[k]).collect();
        if has_collinear_triple(&s) || has_collinear_triple(&d) {
            continue;
        }
        let Some(h) = fit_homography(&s, &d) else {
            continue;
        };

        let (inliers, count) = score_inliers(&h, src, dst, params.reproj_threshold);
        if best.as_ref().is_none_or(|b| count > b.inlier_count) {
            iterations = adaptive_iterations(count, n, params.confidence).min(params.max_iterations);
            best = Some(RansacFit {
                homography: h,
                inliers,
                inlier_count: count,
            });
        }
    }

    let mut best = best?;
    if best.inlier_count < 4 {
        return None;
    }

    let (s, d): (Vec<Point>, Vec<Point>) = best
        .inliers
        .iter()
        .enumerate()
        .filter(|(_, inlier)| **inlier)
        .map(|(k, _)| (src[k], dst[k]))
        .unzip();
    if let Some(refit) = fit_homography(&s, &d) {
        let (inliers, count) = score_inliers(&refit, src, dst, params.reproj_threshold);
        if count >= best.inlier_count {
            best = RansacFit {
                homography: refit,
                inliers,
                inlier_count: count,
            };
        }
    }
    Some(best)
}
/// Least-squares homography through at least four correspondences, exact
/// for four.
pub fn fit_homography(src: &[Point], dst: &[Point]) -> Option<Homography> {
    if src.len() < 4 || src.len() != dst.len() {
        return None;
    }
    let (src_t, src_n) = normalize_points(src)?;
    let (dst_t, dst_n) = normalize_points(dst)?;

    // Normal equations of the 2n x 8 DLT system with h33 = 1.
    let mut ata = SMatrix::<f64, 8, 8>::zeros();
    let mut atb = SVector::<f64, 8>::zeros();
    for (&(x, y), &(u, v)) in src_n.iter().zip(&dst_n) {
        let rows = [
            (SVector::<f64, 8>::from([x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y]), u),
            (SVector::<f64, 8>::from([0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y]), v),
        ];
        for (row, rhs) in rows {
            ata += row * row.transpose();
            atb += row * rhs;
        }
    }

    let svd = ata.svd(true, true);
    let largest = svd.singular_values.max();
    if largest <= 0.0 || svd.singular_values.min() <= 1e-10 * largest {
        return None;
    }
    let h = svd.solve(&atb, 1e-12).ok()?;
    let normalized = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);

    let full = Homography(dst_t.try_inverse()? * normalized * src_t).normalized();
    full.0.iter().all(|v| v.is_finite()).then_some(full)
}

/// Translate to the centroid and scale to mean distance sqrt(2). Returns the
/// similarity that does this and the normalized points.
fn normalize_points(points: &[Point]) -> Option<(Matrix3<f64>, Vec<Point>)> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.1).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist < 1e-12 {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    let transform = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = points
        .iter()
        .map(|p| ((p.0 - cx) * s, (p.1 - cy) * s))
        .collect();
    Some((transform, normalized))
}

fn score_inliers(h: &Homography, src: &[Point], dst: &[Point], threshold: f64) -> (Vec<bool>, usize) {
    let inliers: Vec<bool> = src
        .iter()
        .zip(dst)
        .map(|(&s, &(u, v))| {
            h.project(s)
                .is_some_and(|(px, py)| ((px - u).powi(2) + (py - v).powi(2)).sqrt() <= threshold)
        })
        .collect();
    let count = inliers.iter().filter(|&&inlier| inlier).count();
    (inliers, count)
}

fn adaptive_iterations(inliers: usize, total: usize, confidence: f64) -> usize {
    let w = inliers as f64 / total as f64;
    if w >= 1.0 {
        return 1;
    }
    let p_good_sample = w.powi(4);
    if p_good_sample <= f64::EPSILON {
        return usize::MAX;
    }
    let k = (1.0 - confidence).ln() / (1.0 - p_good_sample).ln();
    if k.is_finite() && k > 0.0 { k.ceil() as usize } else { usize::MAX }
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

fn has_collinear_triple(points: &[Point]) -> bool {
    let n = points.len();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                if cross(points[i], points[j], points[k]).abs() < 1e-6 {
                    return true;
                }
            }
        }
    }
    false
}

/// Whether the closed polygon turns the same way at every vertex.
pub fn is_convex(polygon: &[Point]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0f64;
    for i in 0..n {
        let turn = cross(polygon[i], polygon[(i + 1) % n], polygon[(i + 2) % n]);
        if turn.abs() < 1e-9 {
            return false;
        }
        if sign == 0.0 {
            sign = turn.signum();
        } else if turn.signum() != sign {
            return false;
        }
    }
    true
}

/// Shoelace area of a simple polygon.
pub fn polygon_area(polygon: &[Point]) -> f64 {
    let n = polygon.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let (x1, y1) = polygon[i];
            let (x2, y2) = polygon[(i + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum();
    twice.abs() / 2.0
}

/// Convex hull (monotone chain), counter-clockwise, no repeated vertex.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<Point> = Vec::new();
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point> = Vec::new();
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}
