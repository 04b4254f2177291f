use glam::DVec2;

use crate::mask::Mask;
use crate::segment::Segmentation;

pub const SPATIAL_LEN: usize = 14;
pub const AREA_LEN: usize = 3;

/// One 8-connected foreground component of a mask.
#[derive(Debug, Clone)]
pub struct Region {
    pub label: u32,
    pub area: u64,
    pub centroid: DVec2,
    pub bbox_width: u32,
    pub bbox_height: u32,
}

impl Region {
    /// Bounding-box area over pixel area; 1 for a filled rectangle.
    pub fn fill_ratio(&self) -> f64 {
        debug_assert!(self.area > 0, "region {} has no pixels", self.label);
        (self.bbox_width as f64 * self.bbox_height as f64) / self.area as f64
    }
}

/// Labels the 8-connected foreground components of `mask`. Background keeps
/// label 0, components are numbered from 1 in raster order of their first
/// pixel. Returns the label image and the number of components.
pub fn label_components(mask: &Mask) -> (Vec<u32>, usize) {
    let (width, height) = (mask.width(), mask.height());
    let mut labels = vec![0u32; mask.len()];
    let mut labels_count = 0u32;
    let mut queue: Vec<(u32, u32)> = vec![];

    for sy in 0..height {
        for sx in 0..width {
            let sidx = (sy * width + sx) as usize;
            if !mask.get(sx, sy) || labels[sidx] != 0 {
                continue;
            }

            labels_count += 1;
            labels[sidx] = labels_count;
            queue.push((sx, sy));

            while let Some((x, y)) = queue.pop() {
                let snx = if x > 0 { x - 1 } else { x };
                let enx = if x < width - 1 { x + 1 } else { x };
                let sny = if y > 0 { y - 1 } else { y };
                let eny = if y < height - 1 { y + 1 } else { y };

                for ny in sny..=eny {
                    for nx in snx..=enx {
                        let nidx = (ny * width + nx) as usize;
                        if labels[nidx] != 0 || !mask.get(nx, ny) {
                            continue;
                        }
                        labels[nidx] = labels_count;
                        queue.push((nx, ny));
                    }
                }
            }
        }
    }

    (labels, labels_count as usize)
}

/// Area, centroid and bounding box of every component, in label order.
pub fn regions(mask: &Mask) -> Vec<Region> {
    let (labels, n) = label_components(mask);
    let width = mask.width();

    let mut area = vec![0u64; n];
    let mut sums = vec![DVec2::ZERO; n];
    let mut min = vec![(u32::MAX, u32::MAX); n];
    let mut max = vec![(0u32, 0u32); n];

    for (idx, &label) in labels.iter().enumerate() {
        if label == 0 {
            continue;
        }
        let i = (label - 1) as usize;
        let (x, y) = (idx as u32 % width, idx as u32 / width);
        area[i] += 1;
        sums[i] += DVec2::new(x as f64, y as f64);
        min[i] = (min[i].0.min(x), min[i].1.min(y));
        max[i] = (max[i].0.max(x), max[i].1.max(y));
    }

    (0..n)
        .map(|i| Region {
            label: i as u32 + 1,
            area: area[i],
            centroid: sums[i] / area[i] as f64,
            bbox_width: max[i].0 - min[i].0 + 1,
            bbox_height: max[i].1 - min[i].1 + 1,
        })
        .collect()
}

/// Mean and population standard deviation; zeros for an empty slice.
fn mean_std(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = values.clone().count();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let var = values.map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}

/// Seven shape statistics of the mask's regions: count, mean and std of
/// area, std of centroid x and y, mean and std of the fill ratio. All zero
/// when the mask has no region.
pub fn describe(mask: &Mask) -> [f64; 7] {
    let regions = regions(mask);
    if regions.is_empty() {
        return [0.0; 7];
    }

    let (area_mean, area_std) = mean_std(regions.iter().map(|r| r.area as f64));
    let (_, cx_std) = mean_std(regions.iter().map(|r| r.centroid.x));
    let (_, cy_std) = mean_std(regions.iter().map(|r| r.centroid.y));
    let (ratio_mean, ratio_std) = mean_std(regions.iter().map(Region::fill_ratio));

    [
        regions.len() as f64,
        area_mean,
        area_std,
        cx_std,
        cy_std,
        ratio_mean,
        ratio_std,
    ]
}

/// `describe` of mask A followed by `describe` of mask B.
pub fn spatial_features(segmentation: &Segmentation) -> [f64; SPATIAL_LEN] {
    let mut out = [0.0; SPATIAL_LEN];
    out[..7].copy_from_slice(&describe(&segmentation.mask_a));
    out[7..].copy_from_slice(&describe(&segmentation.mask_b));
    out
}

/// Background, mask A and mask B fractions of the image area. They sum to 1
/// except for an empty image, where all three are 0.
pub fn area_fractions(mask_a: &Mask, mask_b: &Mask) -> [f64; AREA_LEN] {
    if mask_a.is_empty() {
        return [0.0; AREA_LEN];
    }
    let a = mask_a.fraction();
    let b = mask_b.fraction();
    [1.0 - a - b, a, b]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn diagonal_pixels_are_connected() {
        let mask = Mask::from_fn(4, 4, |x, y| x == y);
        let (_, n) = label_components(&mask);
        assert_eq!(n, 1);
    }

    #[test]
    fn separate_blobs_get_separate_labels() {
        let mask = Mask::from_fn(10, 10, |x, y| (x < 2 && y < 2) || (x > 6 && y > 5));
        let (labels, n) = label_components(&mask);
        assert_eq!(n, 2);
        assert_eq!(labels[0], 1);
        assert_eq!(labels[99], 2);
        assert_eq!(labels[5], 0);
    }

    #[test]
    fn region_geometry() {
        /* L shape: 3x1 bar plus one pixel below its left end */
        let mask = Mask::from_fn(5, 5, |x, y| (y == 1 && x >= 1 && x <= 3) || (x == 1 && y == 2));
        let regions = regions(&mask);
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert_eq!(r.area, 4);
        assert_eq!((r.bbox_width, r.bbox_height), (3, 2));
        assert_abs_diff_eq!(r.centroid.x, 7.0 / 4.0);
        assert_abs_diff_eq!(r.centroid.y, 5.0 / 4.0);
        assert_abs_diff_eq!(r.fill_ratio(), 1.5);
    }

    #[test]
    fn describe_two_squares() {
        /* 2x2 square at (0,0) and 4x4 square at (6,6) */
        let mask = Mask::from_fn(12, 12, |x, y| (x < 2 && y < 2) || (x >= 6 && x < 10 && y >= 6 && y < 10));
        let f = describe(&mask);
        assert_eq!(f[0], 2.0);
        assert_abs_diff_eq!(f[1], 10.0);
        assert_abs_diff_eq!(f[2], 6.0);
        assert_abs_diff_eq!(f[3], 3.5);
        assert_abs_diff_eq!(f[4], 3.5);
        assert_abs_diff_eq!(f[5], 1.0);
        assert_abs_diff_eq!(f[6], 0.0);
    }

    #[test]
    fn empty_mask_describes_as_zeros() {
        let f = describe(&Mask::new(8, 8));
        assert_eq!(f, [0.0; 7]);
        assert!(f.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn area_fractions_sum_to_one() {
        let a = Mask::from_fn(10, 10, |x, _| x < 3);
        let b = Mask::from_fn(10, 10, |x, _| x >= 8);
        let f = area_fractions(&a, &b);
        assert_abs_diff_eq!(f[0], 0.5);
        assert_abs_diff_eq!(f[1], 0.3);
        assert_abs_diff_eq!(f[2], 0.2);
        assert_abs_diff_eq!(f.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn area_fractions_of_empty_image() {
        let empty = Mask::new(0, 0);
        assert_eq!(area_fractions(&empty, &empty), [0.0; 3]);
    }
}
