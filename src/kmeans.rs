use image::GrayImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Intensity histogram of an 8-bit image. Clustering 8-bit samples on their
/// histogram gives the same centres as clustering every pixel.
pub type Histogram = [u64; 256];

pub fn histogram(img: &GrayImage) -> Histogram {
    let mut hist = [0u64; 256];
    for p in img.as_raw() {
        hist[*p as usize] += 1;
    }
    hist
}

/// Lloyd's k-means on 1-D intensities with k-means++ seeding and restarts.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub k: usize,
    pub attempts: usize,
    pub max_iter: usize,
    /// Iteration stops once no centre moves by this much or more.
    pub epsilon: f64,
    pub seed: u64,
}

impl Default for KMeans {
    fn default() -> Self {
        KMeans {
            k: 2,
            attempts: 10,
            max_iter: 100,
            epsilon: 1.0,
            seed: 0x6d69_6372_6f67,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Clustering {
    pub centers: Vec<f64>,
    pub compactness: f64,
    labels: Vec<usize>,
}

impl Clustering {
    /// Cluster index of an intensity.
    pub fn label(&self, value: u8) -> usize {
        self.labels[value as usize]
    }

    /// Centre of the cluster holding `value`, truncated to 8 bits.
    pub fn quantize(&self, value: u8) -> u8 {
        self.centers[self.label(value)] as u8
    }

    /// Sorted distinct quantised values actually taken by the samples of `hist`.
    pub fn levels(&self, hist: &Histogram) -> Vec<u8> {
        let mut levels: Vec<u8> = (0..=255u8)
            .filter(|&v| hist[v as usize] > 0)
            .map(|v| self.quantize(v))
            .collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }
}

fn nearest(centers: &[f64], value: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centers.iter().enumerate() {
        let dist = (value - c).abs();
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

impl KMeans {
    /// Returns `None` when the histogram holds no samples.
    pub fn fit(&self, hist: &Histogram) -> Option<Clustering> {
        let total: u64 = hist.iter().sum();
        if total == 0 || self.k == 0 {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<Clustering> = None;
        for _ in 0..self.attempts.max(1) {
            let centers = self.seed_centers(hist, total, &mut rng);
            let clustering = self.refine(hist, centers);
            let better = match &best {
                Some(b) => clustering.compactness < b.compactness,
                None => true,
            };
            if better {
                best = Some(clustering);
            }
        }
        best
    }

    /* k-means++: first centre by weight, next ones by weight * squared distance */
    fn seed_centers(&self, hist: &Histogram, total: u64, rng: &mut StdRng) -> Vec<f64> {
        let mut centers = Vec::with_capacity(self.k);

        let mut r = rng.random_range(0..total);
        let mut first = 0usize;
        for (v, &w) in hist.iter().enumerate() {
            if r < w {
                first = v;
                break;
            }
            r -= w;
        }
        centers.push(first as f64);

        while centers.len() < self.k {
            let dists: Vec<f64> = (0..256)
                .map(|v| {
                    let d = (v as f64 - centers[nearest(&centers, v as f64)]).abs();
                    hist[v] as f64 * d * d
                })
                .collect();
            let sum: f64 = dists.iter().sum();
            if sum <= 0.0 {
                centers.push(centers[0]);
                continue;
            }
            let mut r = rng.random::<f64>() * sum;
            let mut chosen = None;
            for (v, d) in dists.iter().enumerate() {
                if *d > 0.0 {
                    chosen = Some(v);
                    if r < *d {
                        break;
                    }
                    r -= d;
                }
            }
            centers.push(chosen.unwrap_or(first) as f64);
        }
        centers
    }

    fn refine(&self, hist: &Histogram, mut centers: Vec<f64>) -> Clustering {
        let k = centers.len();
        for _ in 0..self.max_iter {
            let mut sums = vec![0.0f64; k];
            let mut weights = vec![0u64; k];
            for (v, &w) in hist.iter().enumerate() {
                if w == 0 {
                    continue;
                }
                let label = nearest(&centers, v as f64);
                sums[label] += w as f64 * v as f64;
                weights[label] += w;
            }

            let mut shift = 0.0f64;
            for i in 0..k {
                /* an empty cluster keeps its previous centre */
                if weights[i] > 0 {
                    let next = sums[i] / weights[i] as f64;
                    shift = shift.max((next - centers[i]).abs());
                    centers[i] = next;
                }
            }
            if shift < self.epsilon {
                break;
            }
        }

        let labels: Vec<usize> = (0..256).map(|v| nearest(&centers, v as f64)).collect();
        let compactness = hist
            .iter()
            .enumerate()
            .map(|(v, &w)| {
                let d = v as f64 - centers[labels[v]];
                w as f64 * d * d
            })
            .sum();

        Clustering {
            centers,
            compactness,
            labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bimodal() -> Histogram {
        let mut hist = [0u64; 256];
        hist[20] = 500;
        hist[24] = 500;
        hist[200] = 300;
        hist[210] = 300;
        hist
    }

    #[test]
    fn separates_two_populations() {
        let hist = bimodal();
        let clustering = KMeans::default().fit(&hist).unwrap();
        assert_eq!(clustering.levels(&hist), vec![22, 205]);
        assert_ne!(clustering.label(20), clustering.label(210));
        assert_eq!(clustering.label(20), clustering.label(24));
        assert!((clustering.compactness - (1000.0 * 4.0 + 600.0 * 25.0)).abs() < 1e-9);
    }

    #[test]
    fn repeated_fits_are_identical() {
        let hist = bimodal();
        let a = KMeans::default().fit(&hist).unwrap();
        let b = KMeans::default().fit(&hist).unwrap();
        assert_eq!(a.centers, b.centers);
    }

    #[test]
    fn uniform_input_collapses_to_one_level() {
        let mut hist = [0u64; 256];
        hist[128] = 1000;
        let clustering = KMeans::default().fit(&hist).unwrap();
        assert_eq!(clustering.levels(&hist), vec![128]);
        assert_eq!(clustering.compactness, 0.0);
    }

    #[test]
    fn empty_histogram_has_no_clustering() {
        assert!(KMeans::default().fit(&[0u64; 256]).is_none());
    }
}
