//! Planar homography estimation (normalized DLT + RANSAC)

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Row-major 3x3 projective transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(pub [f64; 9]);

impl Homography {
    #[must_use]
    pub fn identity() -> Self {
        Homography([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }

    /// Map a point, `None` when it lands at infinity
    #[must_use]
    pub fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let h = &self.0;
        let w = h[6] * x + h[7] * y + h[8];
        if w.abs() < 1e-12 {
            return None;
        }
        Some(((h[0] * x + h[1] * y + h[2]) / w, (h[3] * x + h[4] * y + h[5]) / w))
    }

    fn mul(&self, other: &Homography) -> Homography {
        let (a, b) = (&self.0, &other.0);
        let mut out = [0.0; 9];
        for r in 0..3 {
            for c in 0..3 {
                out[r * 3 + c] = (0..3).map(|k| a[r * 3 + k] * b[k * 3 + c]).sum();
            }
        }
        Homography(out)
    }

    /// Least-squares fit with `h33 = 1` over at least four correspondences
    #[must_use]
    pub fn fit(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<Homography> {
        if src.len() < 4 || src.len() != dst.len() {
            return None;
        }
        let (t_src, src_n) = normalize_points(src)?;
        let (t_dst, dst_n) = normalize_points(dst)?;

        let mut ata = [[0.0f64; 8]; 8];
        let mut atb = [0.0f64; 8];
        for (&(x, y), &(u, v)) in src_n.iter().zip(&dst_n) {
            let rows = [
                ([x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u], u),
                ([0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v], v),
            ];
            for (row, rhs) in rows {
                for i in 0..8 {
                    atb[i] += row[i] * rhs;
                    for j in 0..8 {
                        ata[i][j] += row[i] * row[j];
                    }
                }
            }
        }
        let h = solve8(ata, atb)?;
        let normalized = Homography([h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0]);

        let denormalized = invert_similarity(&t_dst).mul(&normalized).mul(&t_src);
        let scale = denormalized.0[8];
        if scale.abs() < 1e-12 || denormalized.0.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(Homography(denormalized.0.map(|v| v / scale)))
    }

    fn reprojection_error_sq(&self, src: (f64, f64), dst: (f64, f64)) -> f64 {
        match self.project(src.0, src.1) {
            Some((x, y)) => (x - dst.0).powi(2) + (y - dst.1).powi(2),
            None => f64::INFINITY,
        }
    }
}

/// Translate to the centroid and scale to mean distance sqrt(2)
fn normalize_points(points: &[(f64, f64)]) -> Option<(Homography, Vec<(f64, f64)>)> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.1).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist < 1e-9 {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Homography([s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0]);
    let normalized = points.iter().map(|p| (s * (p.0 - cx), s * (p.1 - cy))).collect();
    Some((t, normalized))
}

fn invert_similarity(t: &Homography) -> Homography {
    let s = t.0[0];
    let (tx, ty) = (t.0[2], t.0[5]);
    Homography([1.0 / s, 0.0, -tx / s, 0.0, 1.0 / s, -ty / s, 0.0, 0.0, 1.0])
}

/// Gaussian elimination with partial pivoting
fn solve8(mut a: [[f64; 8]; 8], mut b: [f64; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let pivot = (col..8).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-10 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..8 {
            let factor = a[row][col] / a[col][col];
            for k in col..8 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = [0.0f64; 8];
    for row in (0..8).rev() {
        let tail: f64 = (row + 1..8).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[derive(Debug, Clone)]
pub struct RansacParams {
    /// Maximum reprojection error for an inlier, in pixels
    pub threshold: f64,
    pub iterations: usize,
    pub seed: u64,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            threshold: 5.0,
            iterations: 1000,
            seed: 0x5eed_1090,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RansacFit {
    pub homography: Homography,
    pub inliers: Vec<bool>,
}

impl RansacFit {
    #[must_use]
    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|i| **i).count()
    }
}

fn classify_inliers(h: &Homography, src: &[(f64, f64)], dst: &[(f64, f64)], threshold_sq: f64) -> Vec<bool> {
    src.iter()
        .zip(dst)
        .map(|(s, d)| h.reprojection_error_sq(*s, *d) <= threshold_sq)
        .collect()
}

/// Robust homography; deterministic for a given seed
#[must_use]
pub fn find_homography(src: &[(f64, f64)], dst: &[(f64, f64)], params: &RansacParams) -> Option<RansacFit> {
    let n = src.len();
    if n < 4 || n != dst.len() {
        return None;
    }
    let threshold_sq = params.threshold * params.threshold;
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<(Homography, Vec<bool>, usize)> = None;

    for _ in 0..params.iterations {
        let sample = rand::seq::index::sample(&mut rng, n, 4);
        let s: Vec<(f64, f64)> = sample.iter().map(|i| src[i]).collect();
        let d: Vec<(f64, f64)> = sample.iter().map(|i| dst[i]).collect();
        let Some(h) = Homography::fit(&s, &d) else {
            continue;
        };
        let inliers = classify_inliers(&h, src, dst, threshold_sq);
        let count = inliers.iter().filter(|i| **i).count();
        if best.as_ref().map_or(true, |(_, _, c)| count > *c) {
            best = Some((h, inliers, count));
            if count == n {
                break;
            }
        }
    }

    let (h, inliers, count) = best?;
    if count < 4 {
        return None;
    }

    // Refit on the consensus set
    let (s, d): (Vec<_>, Vec<_>) = src
        .iter()
        .zip(dst)
        .zip(&inliers)
        .filter(|(_, keep)| **keep)
        .map(|((s, d), _)| (*s, *d))
        .unzip();
    if let Some(refined) = Homography::fit(&s, &d) {
        let refined_inliers = classify_inliers(&refined, src, dst, threshold_sq);
        if refined_inliers.iter().filter(|i| **i).count() >= count {
            return Some(RansacFit {
                homography: refined,
                inliers: refined_inliers,
            });
        }
    }
    Some(RansacFit { homography: h, inliers })
}
