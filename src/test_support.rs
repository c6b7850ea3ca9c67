// Synthetic rasters for tests

use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform noise, reproducible from `seed`.
pub fn noise_image(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    GrayImage::from_fn(width, height, |_, _| Luma([rng.gen_range(0..=255u8)]))
}

/// Flat `background` screen with `template` pasted at (`x`, `y`).
pub fn screen_with(width: u32, height: u32, background: u8, template: &GrayImage, x: u32, y: u32) -> GrayImage {
    let mut screen = GrayImage::from_pixel(width, height, Luma([background]));
    image::imageops::replace(&mut screen, template, i64::from(x), i64::from(y));
    screen
}
