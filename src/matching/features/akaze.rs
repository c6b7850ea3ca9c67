/// Upright binary descriptor from pairwise grid-cell comparisons
///
/// The square window around a keypoint is split into 2x2, 3x3 and 4x4 grids.
/// Every pair of cells in a grid is compared on mean intensity and mean
/// horizontal and vertical gradient, one bit per comparison.
use super::keypoints::{self, DetectorParams};
use super::matcher::Descriptors;
use super::{AreaBounds, CenterRule, FeatureExtractor, FeatureGate, FeatureStrategy, Features, ScoreRule};
use crate::matching::types::StrategyKind;
use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;

const WINDOW: i32 = 24;
const GRIDS: [i32; 3] = [2, 3, 4];

pub struct AkazeExtractor {
    detector: DetectorParams,
    blur_sigma: f32,
}

impl AkazeExtractor {
    pub fn new(detector: DetectorParams) -> Self {
        Self {
            detector,
            blur_sigma: 1.4,
        }
    }

    /// Mean intensity, x gradient and y gradient of one cell.
    fn cell_stats(smoothed: &GrayImage, keypoint: &keypoints::Keypoint, x0: i32, y0: i32, size: i32) -> [f32; 3] {
        let at = |dx: i32, dy: i32| f32::from(keypoints::sample(smoothed, keypoint.x, keypoint.y, dx, dy));
        let mut sums = [0.0f32; 3];
        for dy in y0..y0 + size {
            for dx in x0..x0 + size {
                sums[0] += at(dx, dy);
                sums[1] += at(dx + 1, dy) - at(dx - 1, dy);
                sums[2] += at(dx, dy + 1) - at(dx, dy - 1);
            }
        }
        let n = (size * size) as f32;
        [sums[0] / n, sums[1] / n, sums[2] / n]
    }

    fn describe(&self, smoothed: &GrayImage, keypoint: &keypoints::Keypoint) -> Vec<u8> {
        let half = WINDOW / 2;
        let mut bits: Vec<bool> = Vec::new();
        for grid in GRIDS {
            let size = WINDOW / grid;
            let cells: Vec<[f32; 3]> = (0..grid * grid)
                .map(|i| {
                    let x0 = -half + (i % grid) * size;
                    let y0 = -half + (i / grid) * size;
                    Self::cell_stats(smoothed, keypoint, x0, y0, size)
                })
                .collect();
            for a in 0..cells.len() {
                for b in (a + 1)..cells.len() {
                    for channel in 0..3 {
                        bits.push(cells[a][channel] > cells[b][channel]);
                    }
                }
            }
        }

        let mut bytes = vec![0u8; bits.len().div_ceil(8)];
        for (i, _) in bits.iter().enumerate().filter(|(_, set)| **set) {
            bytes[i / 8] |= 1 << (i % 8);
        }
        bytes
    }
}

impl Default for AkazeExtractor {
    fn default() -> Self {
        Self::new(DetectorParams {
            fast_threshold: 20,
            max_keypoints: 1500,
            border: 20,
        })
    }
}

impl FeatureExtractor for AkazeExtractor {
    fn detect_and_compute(&self, image: &GrayImage) -> Features {
        let smoothed = gaussian_blur_f32(image, self.blur_sigma);
        let keypoints = keypoints::detect(image, &self.detector);
        let descriptors = keypoints.iter().map(|k| self.describe(&smoothed, k)).collect();
        Features {
            keypoints,
            descriptors: Descriptors::Binary(descriptors),
        }
    }
}

impl FeatureStrategy<AkazeExtractor> {
    pub const DEFAULT_MIN_MATCHES: f64 = 10.0;

    pub fn akaze() -> Self {
        Self::new(
            StrategyKind::AkazeFeatures,
            AkazeExtractor::default(),
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
                center: CenterRule::BoundingBoxMidpoint,
                score: ScoreRule::GoodMatches,
            },
            Self::DEFAULT_MIN_MATCHES,
        )
    }
}
