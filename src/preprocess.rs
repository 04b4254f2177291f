use std::path::Path;

use image::{imageops, GrayImage};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::params::{BilateralParams, SizePolicy};

/// Known acquisition sizes, `(height, width)`, and the number of rows kept
/// above the instrument footer (scale bar and metadata overlay).
const CROP_RULES: [((u32, u32), u32); 4] = [
    ((2048, 2560), 1920),
    ((1428, 2048), 1408),
    ((1024, 1280), 960),
    ((1448, 2048), 1428),
];

/// Reads an image file of any supported format as 8-bit greyscale.
pub fn load_grayscale(path: &Path) -> Result<GrayImage> {
    image::open(path)
        .map(|img| img.into_luma8())
        .map_err(|source| Error::ImageLoad {
            path: path.to_path_buf(),
            source,
        })
}

#[derive(Debug, Copy, Clone, Default)]
pub struct Preprocessor {
    pub policy: SizePolicy,
}

impl Preprocessor {
    pub fn new(policy: SizePolicy) -> Preprocessor {
        Preprocessor { policy }
    }

    /// Rows to keep for an image of this size, if the size is a known one.
    pub fn crop_height(width: u32, height: u32) -> Option<u32> {
        CROP_RULES
            .iter()
            .find(|(size, _)| *size == (height, width))
            .map(|(_, rows)| *rows)
    }

    /// Removes the footer of a known acquisition size. Unknown sizes are
    /// returned unchanged or rejected, according to the policy.
    pub fn crop(&self, img: &GrayImage) -> Result<GrayImage> {
        let (width, height) = img.dimensions();
        match Preprocessor::crop_height(width, height) {
            Some(rows) => Ok(imageops::crop_imm(img, 0, 0, width, rows).to_image()),
            None => match self.policy {
                SizePolicy::Passthrough => Ok(img.clone()),
                SizePolicy::Fail => Err(Error::UnsupportedImageSize { width, height }),
            },
        }
    }

    pub fn denoise(&self, img: &GrayImage, params: &BilateralParams) -> GrayImage {
        bilateral_filter(img, params.d, params.sigma_color, params.sigma_space)
    }
}

fn reflect101(mut i: i64, n: i64) -> usize {
    if n == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * (n - 1) - i;
        } else {
            return i as usize;
        }
    }
}

/// Neighbourhood radius of the bilateral filter: half the diameter `d`, or
/// `1.5 * sigma_space` when `d` is not positive. Never below 1.
pub fn bilateral_radius(d: i32, sigma_space: f64) -> i64 {
    let sigma_space = if sigma_space <= 0.0 { 1.0 } else { sigma_space };
    if d <= 0 {
        (sigma_space * 1.5).round() as i64
    } else {
        (d / 2) as i64
    }
    .max(1)
}

/// Edge-preserving smoothing: each output pixel is the mean of its disk
/// neighbourhood weighted by spatial distance and intensity difference.
///
/// `d > 0` sets the neighbourhood diameter, otherwise it is derived from
/// `sigma_space`. Borders are mirrored without repeating the edge pixel.
pub fn bilateral_filter(img: &GrayImage, d: i32, sigma_color: f64, sigma_space: f64) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let sigma_color = if sigma_color <= 0.0 { 1.0 } else { sigma_color };
    let sigma_space = if sigma_space <= 0.0 { 1.0 } else { sigma_space };
    let radius = bilateral_radius(d, sigma_space);

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let color_weight: Vec<f32> = (0..256)
        .map(|i| ((i * i) as f64 * color_coeff).exp() as f32)
        .collect();

    let (w, h) = (width as i64, height as i64);
    let padded_w = w + 2 * radius;
    let src = img.as_raw();
    let padded: Vec<u8> = (-radius..h + radius)
        .flat_map(|y| {
            let row = reflect101(y, h) * width as usize;
            (-radius..w + radius).map(move |x| src[row + reflect101(x, w)])
        })
        .collect();

    let mut taps: Vec<(isize, f32)> = Vec::new();
    for i in -radius..=radius {
        for j in -radius..=radius {
            let r = ((i * i + j * j) as f64).sqrt();
            if r > radius as f64 {
                continue;
            }
            taps.push((
                (i * padded_w + j) as isize,
                (r * r * space_coeff).exp() as f32,
            ));
        }
    }

    let mut out = vec![0u8; src.len()];
    out.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, px) in row.iter_mut().enumerate() {
                let center = ((y as i64 + radius) * padded_w + x as i64 + radius) as isize;
                let value = padded[center as usize];
                let mut sum = 0.0f32;
                let mut wsum = 0.0f32;
                for (ofs, space_w) in &taps {
                    let v = padded[(center + ofs) as usize];
                    let weight = space_w * color_weight[(v as i32 - value as i32).unsigned_abs() as usize];
                    sum += v as f32 * weight;
                    wsum += weight;
                }
                *px = (sum / wsum).round().clamp(0.0, 255.0) as u8;
            }
        });

    GrayImage::from_raw(width, height, out).unwrap_or_else(|| img.clone())
}
