/// Normalized correlation-coefficient matching
///
/// Slides the template over the capture and keeps the single best location.
use super::error::{StrategyError, StrategyResult};
use super::strategy::{MatchContext, Strategy};
use super::types::{MatchCandidate, StrategyKind};
use crate::config::MatchMode;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contrast::match_histogram;
use imageproc::definitions::Image;
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::template_matching::{MatchTemplateMethod, find_extremes, match_template_parallel};

/// Best top-left location of a template on a screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationHit {
    pub x: u32,
    pub y: u32,
    /// Correlation coefficient, clamped to [0, 1]
    pub score: f32,
}

impl CorrelationHit {
    /// Center of a `width`x`height` template placed at this hit.
    pub fn center(&self, width: u32, height: u32) -> (i32, i32) {
        ((self.x + width / 2) as i32, (self.y + height / 2) as i32)
    }
}

/// Variance below which a window or template counts as flat.
const MIN_VARIANCE: f64 = 1e-6;

/// Locate the highest correlation coefficient of `template` on `screen`.
///
/// Returns `None` when the template is empty or does not fit on the screen.
pub fn best_correlation(screen: &GrayImage, template: &GrayImage) -> Option<CorrelationHit> {
    let (tw, th) = template.dimensions();
    let (sw, sh) = screen.dimensions();
    if tw == 0 || th == 0 || tw > sw || th > sh {
        return None;
    }

    let cross = match_template_parallel(screen, template, MatchTemplateMethod::CrossCorrelation);
    let scores = correlation_coefficients(screen, template, &cross);
    let extremes = find_extremes(&scores);
    if !extremes.max_value.is_finite() {
        return None;
    }
    let (x, y) = extremes.max_value_location;
    Some(CorrelationHit {
        x,
        y,
        score: extremes.max_value.clamp(0.0, 1.0),
    })
}

/// Zero-mean normalized correlation for every placement, derived from the
/// raw cross-correlation sums and integral images of the screen. A flat
/// template or a flat screen window scores 0.
fn correlation_coefficients(
    screen: &GrayImage,
    template: &GrayImage,
    cross: &Image<Luma<f32>>,
) -> Image<Luma<f32>> {
    let (tw, th) = template.dimensions();
    let n = f64::from(tw) * f64::from(th);
    let (t_sum, t_squares) = template.pixels().fold((0.0, 0.0), |(sum, squares), p| {
        let v = f64::from(p[0]);
        (sum + v, squares + v * v)
    });
    let t_variance = t_squares - t_sum * t_sum / n;

    let sums: Image<Luma<u64>> = integral_image::<_, u64>(screen);
    let squares: Image<Luma<u64>> = integral_squared_image::<_, u64>(screen);
    let window = |integral: &Image<Luma<u64>>, x: u32, y: u32| {
        let at = |px: u32, py: u32| integral.get_pixel(px, py)[0];
        ((at(x + tw, y + th) + at(x, y)) - (at(x, y + th) + at(x + tw, y))) as f64
    };

    ImageBuffer::from_fn(cross.width(), cross.height(), |x, y| {
        if t_variance <= MIN_VARIANCE {
            return Luma([0.0]);
        }
        let w_sum = window(&sums, x, y);
        let w_variance = window(&squares, x, y) - w_sum * w_sum / n;
        if w_variance <= MIN_VARIANCE {
            return Luma([0.0]);
        }
        let covariance = f64::from(cross.get_pixel(x, y)[0]) - w_sum * t_sum / n;
        Luma([(covariance / (t_variance * w_variance).sqrt()) as f32])
    })
}

/// Correlation strategy over the shared capture.
#[derive(Debug, Default)]
pub struct TemplateCorrelation;

impl TemplateCorrelation {
    pub const DEFAULT_THRESHOLD: f64 = 0.8;
}

impl Strategy for TemplateCorrelation {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TemplateCorrelation
    }

    fn default_threshold(&self) -> f64 {
        Self::DEFAULT_THRESHOLD
    }

    fn locate(
        &self,
        ctx: &MatchContext<'_>,
        template_id: &str,
        threshold: f64,
    ) -> StrategyResult<MatchCandidate> {
        let template = ctx.template(template_id)?;
        let capture = ctx.capture()?;

        let (tw, th) = template.dimensions();
        let (sw, sh) = capture.dimensions();
        if tw > sw || th > sh {
            return Err(StrategyError::TemplateTooLarge {
                template_w: tw,
                template_h: th,
                screen_w: sw,
                screen_h: sh,
            });
        }

        let hit = if ctx.state.mode() == MatchMode::Accuracy {
            let equalized = match_histogram(&capture, &template);
            best_correlation(&equalized, &template)
        } else {
            best_correlation(&capture, &template)
        }
        .ok_or(StrategyError::NotFound)?;

        let score = f64::from(hit.score);
        if score < threshold {
            return Err(StrategyError::BelowThreshold { score, threshold });
        }

        Ok(MatchCandidate::new(
            hit.center(tw, th),
            score,
            self.kind().name(),
        ))
    }
}
