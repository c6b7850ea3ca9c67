/// Upright gradient-orientation histograms around FAST keypoints
use super::keypoints::{self, DetectorParams};
use super::matcher::Descriptors;
use super::{AreaBounds, CenterRule, FeatureExtractor, FeatureGate, FeatureStrategy, Features, ScoreRule};
use crate::matching::types::StrategyKind;
use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;
use std::f32::consts::PI;

/// Window is GRID x GRID cells of CELL x CELL pixels.
const GRID: usize = 4;
const CELL: i32 = 4;
const BINS: usize = 8;
const CLAMP: f32 = 0.2;

pub struct SiftExtractor {
    detector: DetectorParams,
    blur_sigma: f32,
}

impl SiftExtractor {
    pub fn new(detector: DetectorParams) -> Self {
        Self {
            detector,
            blur_sigma: 1.0,
        }
    }

    fn describe(&self, smoothed: &GrayImage, keypoint: &keypoints::Keypoint) -> Vec<f32> {
        let half = (GRID as i32 * CELL) / 2;
        let sigma = half as f32;
        let mut histogram = vec![0.0f32; GRID * GRID * BINS];

        for dy in -half..half {
            for dx in -half..half {
                let at = |ox: i32, oy: i32| {
                    f32::from(keypoints::sample(smoothed, keypoint.x, keypoint.y, dx + ox, dy + oy))
                };
                let gx = at(1, 0) - at(-1, 0);
                let gy = at(0, 1) - at(0, -1);
                let magnitude = (gx * gx + gy * gy).sqrt();
                if magnitude == 0.0 {
                    continue;
                }
                let weight = (-((dx * dx + dy * dy) as f32) / (2.0 * sigma * sigma)).exp();
                let orientation = gy.atan2(gx).rem_euclid(2.0 * PI);
                let bin = ((orientation / (2.0 * PI) * BINS as f32) as usize).min(BINS - 1);
                let cell_x = ((dx + half) / CELL) as usize;
                let cell_y = ((dy + half) / CELL) as usize;
                histogram[(cell_y * GRID + cell_x) * BINS + bin] += magnitude * weight;
            }
        }

        normalize(&mut histogram);
        for value in histogram.iter_mut() {
            *value = value.min(CLAMP);
        }
        normalize(&mut histogram);
        histogram
    }
}

fn normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}

impl Default for SiftExtractor {
    fn default() -> Self {
        Self::new(DetectorParams {
            fast_threshold: 20,
            max_keypoints: 1500,
            border: 16,
        })
    }
}

impl FeatureExtractor for SiftExtractor {
    fn detect_and_compute(&self, image: &GrayImage) -> Features {
        let smoothed = gaussian_blur_f32(image, self.blur_sigma);
        let keypoints = keypoints::detect(image, &self.detector);
        let descriptors = keypoints.iter().map(|k| self.describe(&smoothed, k)).collect();
        Features {
            keypoints,
            descriptors: Descriptors::Float(descriptors),
        }
    }
}

impl FeatureStrategy<SiftExtractor> {
    pub const DEFAULT_MIN_MATCHES: f64 = 10.0;

    pub fn sift() -> Self {
        Self::new(
            StrategyKind::SiftFeatures,
            SiftExtractor::default(),
            FeatureGate {
                min_keypoints: 2,
                ratio: 0.7,
                ransac_threshold: 5.0,
                min_inlier_fraction: None,
                area: AreaBounds {
                    min: 0.01,
                    max: 100.0,
                    inclusive: true,
                },
                center: CenterRule::HullMean,
                score: ScoreRule::Inliers,
            },
            Self::DEFAULT_MIN_MATCHES,
        )
    }
}
