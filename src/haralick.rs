use image::GrayImage;

pub const HARALICK_LEN: usize = 13;

/// Pixel offsets `(dx, dy)` of the four principal directions at distance 1:
/// 0, 45, 90 and 135 degrees.
const DIRECTIONS: [(i64, i64); 4] = [(1, 0), (1, -1), (0, -1), (-1, -1)];

/// Symmetric grey-level co-occurrence counts for one direction.
struct Cooccurrence {
    levels: usize,
    counts: Vec<u64>,
}

impl Cooccurrence {
    fn compute(img: &GrayImage, levels: usize, dx: i64, dy: i64) -> Cooccurrence {
        let mut counts = vec![0u64; levels * levels];
        let (width, height) = (img.width() as i64, img.height() as i64);
        let data = img.as_raw();
        for y in 0..height {
            let ny = y + dy;
            if ny < 0 || ny >= height {
                continue;
            }
            for x in 0..width {
                let nx = x + dx;
                if nx < 0 || nx >= width {
                    continue;
                }
                let a = data[(y * width + x) as usize] as usize;
                let b = data[(ny * width + nx) as usize] as usize;
                counts[a * levels + b] += 1;
                counts[b * levels + a] += 1;
            }
        }
        Cooccurrence { levels, counts }
    }

    fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /* the 13 descriptors of the normalised matrix */
    fn features(&self) -> [f64; HARALICK_LEN] {
        let n = self.levels;
        let total = self.total() as f64;
        let p: Vec<f64> = self.counts.iter().map(|&c| c as f64 / total).collect();

        let mut px = vec![0.0; n];
        let mut py = vec![0.0; n];
        let mut p_sum = vec![0.0; 2 * n];
        let mut p_diff = vec![0.0; n];
        for i in 0..n {
            for j in 0..n {
                let v = p[i * n + j];
                px[j] += v;
                py[i] += v;
                p_sum[i + j] += v;
                p_diff[if i > j { i - j } else { j - i }] += v;
            }
        }

        let ux: f64 = px.iter().enumerate().map(|(k, v)| k as f64 * v).sum();
        let uy: f64 = py.iter().enumerate().map(|(k, v)| k as f64 * v).sum();
        let vx: f64 = px.iter().enumerate().map(|(k, v)| (k * k) as f64 * v).sum::<f64>() - ux * ux;
        let vy: f64 = py.iter().enumerate().map(|(k, v)| (k * k) as f64 * v).sum::<f64>() - uy * uy;
        let (sx, sy) = (vx.max(0.0).sqrt(), vy.max(0.0).sqrt());

        let mut f = [0.0; HARALICK_LEN];
        let mut ij = 0.0;
        let mut idm = 0.0;
        for i in 0..n {
            for j in 0..n {
                let v = p[i * n + j];
                if v == 0.0 {
                    continue;
                }
                f[0] += v * v;
                ij += (i * j) as f64 * v;
                let d = i as f64 - j as f64;
                idm += v / (d * d + 1.0);
            }
        }
        f[1] = p_diff.iter().enumerate().map(|(k, v)| (k * k) as f64 * v).sum();
        f[2] = if sx == 0.0 || sy == 0.0 {
            1.0
        } else {
            (ij - ux * uy) / (sx * sy)
        };
        f[3] = vx;
        f[4] = idm;
        f[5] = p_sum.iter().enumerate().map(|(k, v)| k as f64 * v).sum();
        f[6] = p_sum
            .iter()
            .enumerate()
            .map(|(k, v)| (k as f64 - f[5]).powi(2) * v)
            .sum();
        f[7] = entropy(&p_sum);
        f[8] = entropy(&p);
        let diff_mean = p_diff.iter().sum::<f64>() / n as f64;
        f[9] = p_diff.iter().map(|v| (v - diff_mean).powi(2)).sum::<f64>() / n as f64;
        f[10] = entropy(&p_diff);

        let hx = entropy(&px);
        let hy = entropy(&py);
        let mut hxy1 = 0.0;
        let mut hxy2 = 0.0;
        for i in 0..n {
            for j in 0..n {
                let cross = px[i] * py[j];
                if cross > 0.0 {
                    hxy1 -= p[i * n + j] * cross.log2();
                    hxy2 -= cross * cross.log2();
                }
            }
        }
        let hmax = hx.max(hy);
        f[11] = if hmax > 0.0 { (f[8] - hxy1) / hmax } else { 0.0 };
        f[12] = (1.0 - (-2.0 * (hxy2 - f[8])).exp()).max(0.0).sqrt();
        f
    }
}

/// Shannon entropy in bits, with 0 log 0 taken as 0.
fn entropy(p: &[f64]) -> f64 {
    -p.iter().filter(|&&v| v > 0.0).map(|v| v * v.log2()).sum::<f64>()
}

/// Direction-averaged Haralick descriptors at pixel offset `distance`:
/// angular second moment, contrast, correlation, variance, inverse
/// difference moment, sum average, sum variance, sum entropy, entropy,
/// difference variance, difference entropy and the two information measures
/// of correlation.
///
/// Empty or all-black images, and images too small to hold a single pair at
/// this distance, give 13 zeros.
pub fn haralick(img: &GrayImage, distance: u32) -> [f64; HARALICK_LEN] {
    let max = img.as_raw().iter().copied().max();
    let levels = match max {
        Some(0) | None => return [0.0; HARALICK_LEN],
        Some(max) => max as usize + 1,
    };

    let d = distance as i64;
    let mut sum = [0.0; HARALICK_LEN];
    let mut used = 0;
    for (dx, dy) in DIRECTIONS.iter() {
        let cmat = Cooccurrence::compute(img, levels, dx * d, dy * d);
        if cmat.total() == 0 {
            continue;
        }
        for (s, v) in sum.iter_mut().zip(cmat.features().iter()) {
            *s += v;
        }
        used += 1;
    }

    if used == 0 {
        return [0.0; HARALICK_LEN];
    }
    for s in sum.iter_mut() {
        *s /= used as f64;
    }
    sum
}
