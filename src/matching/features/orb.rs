/// Oriented FAST keypoints with rotated binary intensity tests
use super::keypoints::{self, DetectorParams, intensity_centroid_angle};
use super::matcher::Descriptors;
use super::{AreaBounds, CenterRule, FeatureExtractor, FeatureGate, FeatureStrategy, Features, ScoreRule};
use crate::matching::types::StrategyKind;
use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DESCRIPTOR_BITS: usize = 256;
/// Test points are drawn from [-PATTERN_SPAN, PATTERN_SPAN]^2.
const PATTERN_SPAN: i32 = 10;
const ORIENTATION_RADIUS: i32 = 15;
const PATTERN_SEED: u64 = 0x0b1e_f00d;

pub struct OrbExtractor {
    detector: DetectorParams,
    blur_sigma: f32,
    pattern: Vec<((i32, i32), (i32, i32))>,
}

impl OrbExtractor {
    pub fn new(detector: DetectorParams) -> Self {
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        let mut point = || {
            (
                rng.gen_range(-PATTERN_SPAN..=PATTERN_SPAN),
                rng.gen_range(-PATTERN_SPAN..=PATTERN_SPAN),
            )
        };
        let pattern = (0..DESCRIPTOR_BITS).map(|_| (point(), point())).collect();
        Self {
            detector,
            blur_sigma: 2.0,
            pattern,
        }
    }

    fn describe(&self, smoothed: &GrayImage, keypoint: &keypoints::Keypoint) -> Vec<u8> {
        let (sin, cos) = keypoint.angle.sin_cos();
        let rotate = |(dx, dy): (i32, i32)| {
            let (fx, fy) = (dx as f32, dy as f32);
            (
                (fx * cos - fy * sin).round() as i32,
                (fx * sin + fy * cos).round() as i32,
            )
        };

        let mut bytes = vec![0u8; DESCRIPTOR_BITS / 8];
        for (bit, &(a, b)) in self.pattern.iter().enumerate() {
            let (ax, ay) = rotate(a);
            let (bx, by) = rotate(b);
            let va = keypoints::sample(smoothed, keypoint.x, keypoint.y, ax, ay);
            let vb = keypoints::sample(smoothed, keypoint.x, keypoint.y, bx, by);
            if va < vb {
                bytes[bit / 8] |= 1 << (bit % 8);
            }
        }
        bytes
    }
}

impl Default for OrbExtractor {
    fn default() -> Self {
        Self::new(DetectorParams {
            fast_threshold: 20,
            max_keypoints: 1500,
            border: 24,
        })
    }
}

impl FeatureExtractor for OrbExtractor {
    fn detect_and_compute(&self, image: &GrayImage) -> Features {
        let smoothed = gaussian_blur_f32(image, self.blur_sigma);
        let keypoints: Vec<_> = keypoints::detect(image, &self.detector)
            .into_iter()
            .map(|mut k| {
                k.angle = intensity_centroid_angle(&smoothed, k.x, k.y, ORIENTATION_RADIUS);
                k
            })
            .collect();
        let descriptors = keypoints.iter().map(|k| self.describe(&smoothed, k)).collect();
        Features {
            keypoints,
            descriptors: Descriptors::Binary(descriptors),
        }
    }
}

impl FeatureStrategy<OrbExtractor> {
    pub const DEFAULT_MIN_MATCHES: f64 = 15.0;

    pub fn orb() -> Self {
        Self::new(
            StrategyKind::OrbFeatures,
            OrbExtractor::default(),
            FeatureGate {
                min_keypoints: 10,
                ratio: 0.7,
                ransac_threshold: 3.0,
                min_inlier_fraction: Some(0.25),
                area: AreaBounds {
                    min: 0.1,
                    max: 10.0,
                    inclusive: false,
                },
                center: CenterRule::CornerMean,
                score: ScoreRule::Inliers,
            },
            Self::DEFAULT_MIN_MATCHES,
        )
    }
}
