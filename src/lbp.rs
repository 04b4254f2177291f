use image::GrayImage;

use crate::params::LbpMethod;

/// Neighbour offsets `(dy, dx)` on a circle of radius `r`, rounded to five
/// decimals so that samples on the axes land exactly on pixels.
fn circle(points: u32, radius: f64) -> Vec<(f64, f64)> {
    let round5 = |v: f64| (v * 1e5).round() / 1e5;
    (0..points)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / points as f64;
            (round5(-radius * angle.sin()), round5(radius * angle.cos()))
        })
        .collect()
}

fn pixel(img: &GrayImage, y: i64, x: i64) -> f64 {
    if y < 0 || x < 0 || y >= img.height() as i64 || x >= img.width() as i64 {
        0.0
    } else {
        img.get_pixel(x as u32, y as u32)[0] as f64
    }
}

/* bilinear sample, zero outside the image */
fn interpolate(img: &GrayImage, y: f64, x: f64) -> f64 {
    let (y0, x0) = (y.floor(), x.floor());
    let (y1, x1) = (y.ceil(), x.ceil());
    let (dy, dx) = (y - y0, x - x0);
    let top = (1.0 - dx) * pixel(img, y0 as i64, x0 as i64) + dx * pixel(img, y0 as i64, x1 as i64);
    let bottom = (1.0 - dx) * pixel(img, y1 as i64, x0 as i64) + dx * pixel(img, y1 as i64, x1 as i64);
    (1.0 - dy) * top + dy * bottom
}

/// Per-pixel LBP codes, row-major. Bit `i` is set when neighbour `i` is at
/// least as bright as the centre.
pub fn lbp_codes(img: &GrayImage, points: u32, radius: f64, method: LbpMethod) -> Vec<u32> {
    let neighbors = circle(points, radius);
    let mut bits = vec![false; points as usize];

    let mut res = Vec::with_capacity((img.width() * img.height()) as usize);
    for (x, y, val) in img.enumerate_pixels() {
        let center = val[0] as f64;
        for (bit, (dy, dx)) in bits.iter_mut().zip(neighbors.iter()) {
            *bit = interpolate(img, y as f64 + dy, x as f64 + dx) - center >= 0.0;
        }

        let out_val = match method {
            LbpMethod::Default => bits
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, &b)| if b { acc | 1 << i } else { acc }),
            LbpMethod::Uniform => {
                let changes = bits.windows(2).filter(|w| w[0] != w[1]).count();
                if changes <= 2 {
                    bits.iter().filter(|&&b| b).count() as u32
                } else {
                    points + 1
                }
            }
        };
        res.push(out_val);
    }
    res
}

/// Density histogram of LBP codes with `P + 2` unit bins over `[0, P + 2)`.
///
/// Codes outside that range are not counted. Empty or all-black images, or
/// images with no code in range, give `P + 2` zeros.
///
/// `Params` defaults to `LbpMethod::Uniform`, which keeps every code in range
/// so the histogram sums to 1. Feature tables built with raw codes
/// (`LbpMethod::Default`, as scikit-image's `local_binary_pattern` produces by
/// default) only count the codes below `P + 2` and are not comparable with the
/// uniform columns.
pub fn lbp(img: &GrayImage, points: u32, radius: f64, method: LbpMethod) -> Vec<f64> {
    let bins = points as usize + 2;
    let mut hist = vec![0.0; bins];
    if img.as_raw().iter().all(|&p| p == 0) {
        return hist;
    }

    let mut counted = 0u64;
    for code in lbp_codes(img, points, radius, method) {
        if (code as usize) < bins {
            hist[code as usize] += 1.0;
            counted += 1;
        }
    }
    if counted > 0 {
        for h in hist.iter_mut() {
            *h /= counted as f64;
        }
    }
    hist
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use image::Luma;

    #[test]
    fn axis_samples_are_exact() {
        let c = circle(4, 1.0);
        assert_eq!(c[0], (0.0, 1.0));
        assert_eq!(c[1], (-1.0, 0.0));
        assert_eq!(c[2], (0.0, -1.0));
    }

    #[test]
    fn interpolation_between_pixels() {
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 10 } else { 20 }]));
        assert_abs_diff_eq!(interpolate(&img, 0.0, 0.5), 15.0);
        assert_abs_diff_eq!(interpolate(&img, 0.0, 1.5), 10.0);
    }

    #[test]
    fn uniform_image_codes() {
        let img = GrayImage::from_pixel(9, 9, Luma([50]));
        let codes = lbp_codes(&img, 4, 1.0, LbpMethod::Uniform);
        assert_eq!(codes[4 * 9 + 4], 4);
        let raw = lbp_codes(&img, 4, 1.0, LbpMethod::Default);
        assert_eq!(raw[4 * 9 + 4], 15);
        /* the corner sees zero padding on two sides */
        assert_eq!(raw[0], 0b1001);
    }

    #[test]
    fn uniform_codes_stay_in_range() {
        let img = GrayImage::from_fn(32, 32, |x, y| Luma([((x * 31 + y * 17) % 251) as u8]));
        let codes = lbp_codes(&img, 10, 5.0, LbpMethod::Uniform);
        assert!(codes.iter().all(|&c| c <= 11));
    }

    #[test]
    fn histogram_is_a_density() {
        let img = GrayImage::from_fn(40, 30, |x, y| Luma([((x * x + 3 * y) % 256) as u8]));
        let h = lbp(&img, 10, 5.0, LbpMethod::Uniform);
        assert_eq!(h.len(), 12);
        assert_abs_diff_eq!(h.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_inputs_give_declared_length() {
        assert_eq!(lbp(&GrayImage::new(0, 0), 10, 5.0, LbpMethod::Uniform), vec![0.0; 12]);
        assert_eq!(lbp(&GrayImage::new(5, 5), 8, 1.0, LbpMethod::Uniform), vec![0.0; 10]);
        let single = lbp(&GrayImage::from_pixel(1, 1, Luma([7])), 10, 5.0, LbpMethod::Uniform);
        assert_eq!(single.len(), 12);
    }

    #[test]
    fn raw_codes_out_of_range_are_dropped() {
        /* on a 3x3 patch only the bottom-left pixel has a raw code below 6 */
        let img = GrayImage::from_pixel(3, 3, Luma([50]));
        let h = lbp(&img, 4, 1.0, LbpMethod::Default);
        assert_eq!(h, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }
}
