/// Keypoint detection shared by the feature extractors
use image::GrayImage;
use imageproc::corners::corners_fast9;

/// A detected interest point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: u32,
    pub y: u32,
    /// FAST corner score
    pub score: f32,
    /// Dominant orientation in radians, 0 for upright extractors
    pub angle: f32,
}

impl Keypoint {
    pub fn point(&self) -> (f64, f64) {
        (f64::from(self.x), f64::from(self.y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    /// FAST-9 intensity threshold
    pub fast_threshold: u8,
    /// Strongest corners kept per image
    pub max_keypoints: usize,
    /// Distance from the image edge inside which corners are dropped, so
    /// every descriptor window lies fully inside the image.
    pub border: u32,
}

/// FAST-9 corners away from the border, strongest first.
///
/// Ties are broken by position so the result does not depend on detection
/// order.
pub fn detect(image: &GrayImage, params: &DetectorParams) -> Vec<Keypoint> {
    let (width, height) = image.dimensions();
    let border = params.border;
    if width <= 2 * border || height <= 2 * border {
        return Vec::new();
    }

    let mut corners: Vec<_> = corners_fast9(image, params.fast_threshold)
        .into_iter()
        .filter(|c| c.x >= border && c.y >= border && c.x < width - border && c.y < height - border)
        .collect();
    corners.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| (a.y, a.x).cmp(&(b.y, b.x)))
    });
    corners.truncate(params.max_keypoints);

    corners
        .into_iter()
        .map(|c| Keypoint {
            x: c.x,
            y: c.y,
            score: c.score,
            angle: 0.0,
        })
        .collect()
}

/// Orientation of the intensity centroid of the disc of `radius` around
/// (`cx`, `cy`). The disc must lie inside the image.
pub fn intensity_centroid_angle(image: &GrayImage, cx: u32, cy: u32, radius: i32) -> f32 {
    let mut m01 = 0.0f64;
    let mut m10 = 0.0f64;
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > r2 {
                continue;
            }
            let x = (cx as i32 + dx) as u32;
            let y = (cy as i32 + dy) as u32;
            let value = f64::from(image.get_pixel(x, y)[0]);
            m10 += f64::from(dx) * value;
            m01 += f64::from(dy) * value;
        }
    }
    m01.atan2(m10) as f32
}

/// Pixel value at an offset from (`cx`, `cy`), clamped to the image.
pub fn sample(image: &GrayImage, cx: u32, cy: u32, dx: i32, dy: i32) -> u8 {
    let (width, height) = image.dimensions();
    let x = (cx as i64 + i64::from(dx)).clamp(0, i64::from(width) - 1) as u32;
    let y = (cy as i64 + i64::from(dy)).clamp(0, i64::from(height) - 1) as u32;
    image.get_pixel(x, y)[0]
}
