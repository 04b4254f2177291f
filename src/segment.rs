use std::path::Path;

use image::{GrayImage, RgbImage};
use palette::Srgb;

use crate::error::Result;
use crate::kmeans::{histogram, KMeans};
use crate::mask::Mask;
use crate::morphology::{self, StructuringElement};
use crate::params::{Params, SizePolicy};
use crate::preprocess::{load_grayscale, Preprocessor};

const BACKGROUND_COLOR: Srgb<u8> = Srgb::new(219, 94, 86);
const DIFFUSE_COLOR: Srgb<u8> = Srgb::new(86, 219, 127);
const COMPACT_COLOR: Srgb<u8> = Srgb::new(86, 111, 219);

/// The two dark-phase masks of one image. They never share a foreground
/// pixel.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Diffuse dark regions (open then close).
    pub mask_a: Mask,
    /// Compact dark regions (close then open).
    pub mask_b: Mask,
}

impl Segmentation {
    fn empty(width: u32, height: u32) -> Segmentation {
        Segmentation {
            mask_a: Mask::new(width, height),
            mask_b: Mask::new(width, height),
        }
    }
}

pub struct PhaseSegmenter {
    kmeans: KMeans,
    compact: [&'static StructuringElement; 2],
    diffuse: [&'static StructuringElement; 2],
}

impl PhaseSegmenter {
    /// `kernels` are the element sizes for, in order: closing and opening of
    /// the compact phase, opening and closing of the diffuse phase.
    pub fn new(kernels: [u32; 4]) -> Result<PhaseSegmenter> {
        Ok(PhaseSegmenter {
            kmeans: KMeans::default(),
            compact: [
                StructuringElement::square(kernels[0])?,
                StructuringElement::square(kernels[1])?,
            ],
            diffuse: [
                StructuringElement::square(kernels[2])?,
                StructuringElement::square(kernels[3])?,
            ],
        })
    }

    pub fn from_params(params: &Params) -> Result<PhaseSegmenter> {
        PhaseSegmenter::new(params.kernels)
    }

    pub fn segment(&self, img: &GrayImage) -> Segmentation {
        let (width, height) = img.dimensions();
        let hist = histogram(img);
        let clustering = match self.kmeans.fit(&hist) {
            Some(clustering) => clustering,
            None => return Segmentation::empty(width, height),
        };

        /* a single quantised level means there is no second phase to find */
        let levels = clustering.levels(&hist);
        if levels.len() < 2 {
            return Segmentation::empty(width, height);
        }
        let darkest = levels[0];

        let mut bright_lut = [0u8; 256];
        for v in 0..=255u8 {
            bright_lut[v as usize] = (clustering.quantize(v) != darkest) as u8;
        }
        let bright = Mask::from_raw(
            width,
            height,
            img.as_raw().iter().map(|&p| bright_lut[p as usize]).collect(),
        );

        /* refinement runs on the bright plane; the dark phase is its complement */
        let compact = morphology::open(
            &morphology::close(&bright, self.compact[0]),
            self.compact[1],
        );
        let diffuse = morphology::close(
            &morphology::open(&bright, self.diffuse[0]),
            self.diffuse[1],
        );

        let mask_b = compact.invert();
        let mut mask_a = diffuse.invert();
        mask_a.subtract(&mask_b);

        Segmentation { mask_a, mask_b }
    }
}

fn to_rgb(color: Srgb<u8>) -> image::Rgb<u8> {
    let (r, g, b) = color.into_components();
    image::Rgb([r, g, b])
}

/// Paints background, diffuse and compact phases in three fixed colours.
pub fn render_overlay(segmentation: &Segmentation) -> RgbImage {
    let mask_a = &segmentation.mask_a;
    let mask_b = &segmentation.mask_b;
    RgbImage::from_fn(mask_a.width(), mask_a.height(), |x, y| {
        if mask_b.get(x, y) {
            to_rgb(COMPACT_COLOR)
        } else if mask_a.get(x, y) {
            to_rgb(DIFFUSE_COLOR)
        } else {
            to_rgb(BACKGROUND_COLOR)
        }
    })
}

/// Standalone segmentation of one file. Unknown acquisition sizes are
/// rejected rather than passed through.
pub fn segment_file(path: &Path, params: &Params) -> Result<RgbImage> {
    params.validate()?;
    let preprocessor = Preprocessor::new(SizePolicy::Fail);
    let segmenter = PhaseSegmenter::from_params(params)?;

    let img = load_grayscale(path)?;
    let img = preprocessor.crop(&img)?;
    let img = preprocessor.denoise(&img, &params.bilateral);
    Ok(render_overlay(&segmenter.segment(&img)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn default_segmenter() -> PhaseSegmenter {
        PhaseSegmenter::new([9, 9, 9, 3]).unwrap()
    }

    /* dark 20x20 squares every 40 pixels plus a thin dark line */
    fn blocks_and_line() -> GrayImage {
        GrayImage::from_fn(120, 120, |x, y| {
            let in_block = x % 40 >= 10 && x % 40 < 30 && y % 40 >= 10 && y % 40 < 30;
            if in_block || y == 5 {
                Luma([30])
            } else {
                Luma([220])
            }
        })
    }

    #[test]
    fn uniform_image_has_no_phases() {
        let img = GrayImage::from_pixel(50, 40, Luma([128]));
        let seg = default_segmenter().segment(&img);
        assert_eq!(seg.mask_a.count(), 0);
        assert_eq!(seg.mask_b.count(), 0);
        assert_eq!(seg.mask_a.width(), 50);
    }

    #[test]
    fn masks_are_disjoint() {
        let img = GrayImage::from_fn(64, 64, |x, y| Luma([((x * 7 + y * 13) % 256) as u8]));
        let seg = default_segmenter().segment(&img);
        assert!(seg.mask_a.is_disjoint(&seg.mask_b));
    }

    #[test]
    fn compact_blocks_land_in_mask_b() {
        let seg = default_segmenter().segment(&blocks_and_line());
        assert_eq!(seg.mask_b.count(), 9 * 400);
        assert!(seg.mask_b.get(15, 15));
        assert!(!seg.mask_a.get(15, 15));
        /* away from the blocks the thin line survives neither pipeline */
        assert!(!seg.mask_b.get(35, 5));
        assert!(!seg.mask_a.get(35, 5));
    }

    #[test]
    fn thin_band_lands_in_mask_a() {
        /* 5 rows: closed over by the compact pipeline, kept by the diffuse one */
        let img = GrayImage::from_fn(80, 80, |_, y| {
            if (40..45).contains(&y) {
                Luma([30])
            } else {
                Luma([220])
            }
        });
        let seg = default_segmenter().segment(&img);
        assert_eq!(seg.mask_b.count(), 0);
        assert_eq!(seg.mask_a.count(), 80 * 5);
        assert!(seg.mask_a.get(0, 40));
        assert!(seg.mask_a.get(79, 44));
        assert!(!seg.mask_a.get(10, 39));
        assert!(!seg.mask_a.get(10, 45));
    }

    #[test]
    fn overlay_colours_follow_masks() {
        let seg = default_segmenter().segment(&blocks_and_line());
        let overlay = render_overlay(&seg);
        assert_eq!(overlay.get_pixel(15, 15), &image::Rgb([86, 111, 219]));
        assert_eq!(overlay.get_pixel(0, 0), &image::Rgb([219, 94, 86]));
    }

    #[test]
    fn rejects_unknown_kernel_size() {
        assert!(PhaseSegmenter::new([9, 9, 8, 3]).is_err());
    }
}
