//! Feature-based strategies
//!
//! All three share one acceptance pipeline: detect and describe keypoints,
//! ratio-test matches, fit a RANSAC homography, then check the projected
//! template outline before picking a center. The extractors and the
//! per-strategy gate parameters are what differ.

pub mod akaze;
pub mod homography;
pub mod keypoints;
pub mod matcher;
pub mod orb;
pub mod sift;

pub use akaze::AkazeExtractor;
pub use keypoints::{DetectorParams, Keypoint};
pub use matcher::{Descriptors, FeatureMatch};
pub use orb::OrbExtractor;
pub use sift::SiftExtractor;

use super::error::{StrategyError, StrategyResult};
use super::strategy::{MatchContext, Strategy};
use super::types::{MatchCandidate, StrategyKind};
use homography::{Point, RansacParams, convex_hull, find_homography_ransac, is_convex, polygon_area};
use image::GrayImage;

pub type OrbFeatures = FeatureStrategy<OrbExtractor>;
pub type SiftFeatures = FeatureStrategy<SiftExtractor>;
pub type AkazeFeatures = FeatureStrategy<AkazeExtractor>;

/// Keypoints and their descriptors, index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Descriptors,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Keypoint detector plus descriptor.
pub trait FeatureExtractor: Send + Sync {
    fn detect_and_compute(&self, image: &GrayImage) -> Features;
}

/// Accepted range of projected area / template area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaBounds {
    pub min: f64,
    pub max: f64,
    /// Whether the bounds themselves are accepted
    pub inclusive: bool,
}

impl AreaBounds {
    pub fn contains(&self, ratio: f64) -> bool {
        if self.inclusive {
            ratio >= self.min && ratio <= self.max
        } else {
            ratio > self.min && ratio < self.max
        }
    }
}

/// How the reported center is derived from the projected template corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CenterRule {
    CornerMean,
    HullMean,
    BoundingBoxMidpoint,
}

impl CenterRule {
    pub fn apply(self, corners: &[Point]) -> Point {
        match self {
            CenterRule::CornerMean => mean(corners),
            CenterRule::HullMean => mean(&convex_hull(corners)),
            CenterRule::BoundingBoxMidpoint => {
                let min_x = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
                let max_x = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
                let min_y = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
                let max_y = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
                ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0)
            }
        }
    }
}

fn mean(points: &[Point]) -> Point {
    let n = points.len().max(1) as f64;
    (
        points.iter().map(|p| p.0).sum::<f64>() / n,
        points.iter().map(|p| p.1).sum::<f64>() / n,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreRule {
    Inliers,
    GoodMatches,
}

/// Per-strategy acceptance parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureGate {
    /// Keypoints required on each side
    pub min_keypoints: usize,
    /// Nearest-neighbour ratio
    pub ratio: f32,
    pub ransac_threshold: f64,
    /// Extra inlier requirement as a fraction of the good matches
    pub min_inlier_fraction: Option<f64>,
    pub area: AreaBounds,
    pub center: CenterRule,
    pub score: ScoreRule,
}

/// Outcome of a successful pipeline run, before it becomes a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatchResult {
    pub center: (i32, i32),
    pub good_matches: usize,
    pub inliers: usize,
    pub score: f64,
}

pub struct FeatureStrategy<E> {
    kind: StrategyKind,
    extractor: E,
    gate: FeatureGate,
    default_min_matches: f64,
}

impl<E: FeatureExtractor> FeatureStrategy<E> {
    pub fn new(kind: StrategyKind, extractor: E, gate: FeatureGate, default_min_matches: f64) -> Self {
        Self {
            kind,
            extractor,
            gate,
            default_min_matches,
        }
    }

    /// Run the acceptance pipeline of `template` against `screen`.
    pub fn match_features(
        &self,
        template: &GrayImage,
        screen: &GrayImage,
        min_matches: f64,
    ) -> StrategyResult<FeatureMatchResult> {
        let gate = &self.gate;
        let tf = self.extractor.detect_and_compute(template);
        let sf = self.extractor.detect_and_compute(screen);
        if tf.len() < gate.min_keypoints || sf.len() < gate.min_keypoints {
            return Err(StrategyError::InsufficientFeatures {
                template: tf.len(),
                screen: sf.len(),
                required: gate.min_keypoints,
            });
        }

        let good = matcher::ratio_matches(&tf.descriptors, &sf.descriptors, gate.ratio);
        log::debug!(
            "{}: {} template / {} screen keypoints, {} good matches",
            self.kind,
            tf.len(),
            sf.len(),
            good.len()
        );
        if (good.len() as f64) < min_matches {
            return Err(StrategyError::NotEnoughMatches {
                found: good.len(),
                required: min_matches,
            });
        }

        let src: Vec<Point> = good.iter().map(|m| tf.keypoints[m.query].point()).collect();
        let dst: Vec<Point> = good.iter().map(|m| sf.keypoints[m.train].point()).collect();
        let fit = find_homography_ransac(&src, &dst, &RansacParams::with_threshold(gate.ransac_threshold))
            .ok_or(StrategyError::HomographyFailed)?;

        let determinant = fit.homography.determinant();
        if determinant.abs() < 1e-5 {
            return Err(StrategyError::DegenerateHomography { determinant });
        }
        if let Some(fraction) = gate.min_inlier_fraction {
            let required = min_matches.max(fraction * good.len() as f64);
            if (fit.inlier_count as f64) < required {
                return Err(StrategyError::InsufficientInliers {
                    inliers: fit.inlier_count,
                    required,
                });
            }
        }

        let (tw, th) = (f64::from(template.width()), f64::from(template.height()));
        let outline = [(0.0, 0.0), (tw, 0.0), (tw, th), (0.0, th)];
        let projected: Vec<Point> = outline
            .iter()
            .map(|&p| fit.homography.project(p))
            .collect::<Option<_>>()
            .ok_or(StrategyError::HomographyFailed)?;
        if !is_convex(&projected) {
            return Err(StrategyError::NonConvex);
        }
        let ratio = polygon_area(&projected) / (tw * th);
        if !gate.area.contains(ratio) {
            return Err(StrategyError::ImplausibleArea { ratio });
        }

        let (cx, cy) = gate.center.apply(&projected);
        let center = (cx.round() as i32, cy.round() as i32);
        let (width, height) = screen.dimensions();
        if center.0 < 0 || center.1 < 0 || center.0 as u32 > width || center.1 as u32 > height {
            return Err(StrategyError::OutOfBounds {
                x: center.0,
                y: center.1,
                width,
                height,
            });
        }

        let score = match gate.score {
            ScoreRule::Inliers => fit.inlier_count as f64,
            ScoreRule::GoodMatches => good.len() as f64,
        };
        Ok(FeatureMatchResult {
            center,
            good_matches: good.len(),
            inliers: fit.inlier_count,
            score,
        })
    }
}

impl<E: FeatureExtractor> Strategy for FeatureStrategy<E> {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn default_threshold(&self) -> f64 {
        self.default_min_matches
    }

    fn locate(
        &self,
        ctx: &MatchContext<'_>,
        template_id: &str,
        threshold: f64,
    ) -> StrategyResult<MatchCandidate> {
        let template = ctx.template(template_id)?;
        let capture = ctx.capture()?;
        let result = self.match_features(&template, &capture, threshold)?;
        Ok(MatchCandidate::new(result.center, result.score, self.kind.name()))
    }
}
