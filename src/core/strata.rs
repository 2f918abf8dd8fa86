// Copyright @yucwang 2026

//! Per-cell stratified importance table over the normalised spectrum.

use crate::math::constants::Float;

pub const SPECTRAL_BUCKETS: usize = 16;

// Share of the strongest bucket mixed into every bucket, keeping all
// probabilities positive.
const BUCKET_FLOOR: Float = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralSample {
    pub rho: Float,
    /// Density of `rho` over `[0, 1]`.
    pub pdf: Float,
    pub bucket: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralStrata {
    weights: [Float; SPECTRAL_BUCKETS],
    counts: [u32; SPECTRAL_BUCKETS],
    last_bucket: usize,
}

impl Default for SpectralStrata {
    fn default() -> Self {
        let mut strata = Self {
            weights: [0.0; SPECTRAL_BUCKETS],
            counts: [0; SPECTRAL_BUCKETS],
            last_bucket: 0,
        };
        strata.init();
        strata
    }
}

impl SpectralStrata {
    /// Uniform prior: one unit observation per bucket.
    pub fn init(&mut self) {
        self.weights = [1.0; SPECTRAL_BUCKETS];
        self.counts = [1; SPECTRAL_BUCKETS];
        self.last_bucket = 0;
    }

    fn importance(&self) -> [Float; SPECTRAL_BUCKETS] {
        let mut means = [0.0; SPECTRAL_BUCKETS];
        let mut max_mean: Float = 0.0;
        for (i, mean) in means.iter_mut().enumerate() {
            *mean = self.weights[i] / self.counts[i].max(1) as Float;
            max_mean = max_mean.max(*mean);
        }
        let floor = BUCKET_FLOOR * max_mean + 1e-6;
        for mean in means.iter_mut() {
            *mean += floor;
        }
        means
    }

    /// Picks a bucket with `u` in proportion to its history and places the
    /// wavelength inside it with `v`.
    pub fn draw_sample(&mut self, u: Float, v: Float) -> SpectralSample {
        let importance = self.importance();
        let total: Float = importance.iter().sum();

        let target = u.clamp(0.0, 1.0) * total;
        let mut bucket = SPECTRAL_BUCKETS - 1;
        let mut cumulative = 0.0;
        for (i, w) in importance.iter().enumerate() {
            cumulative += w;
            if target < cumulative {
                bucket = i;
                break;
            }
        }

        self.last_bucket = bucket;
        let width = 1.0 / SPECTRAL_BUCKETS as Float;
        SpectralSample {
            rho: (bucket as Float + v.clamp(0.0, 1.0)) * width,
            pdf: importance[bucket] / total * SPECTRAL_BUCKETS as Float,
            bucket,
        }
    }

    /// Folds an observed path weight into the bucket of the last draw.
    pub fn update(&mut self, weight: Float) {
        if !weight.is_finite() || weight < 0.0 {
            log::debug!("ignoring spectral weight {}", weight);
            return;
        }
        self.weights[self.last_bucket] += weight;
        self.counts[self.last_bucket] = self.counts[self.last_bucket].saturating_add(1);
    }

    pub fn pdf(&self, bucket: usize) -> Float {
        let importance = self.importance();
        let total: Float = importance.iter().sum();
        importance[bucket.min(SPECTRAL_BUCKETS - 1)] / total * SPECTRAL_BUCKETS as Float
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_strata_sample_uniformly() {
        let mut strata = SpectralStrata::default();
        for i in 0..SPECTRAL_BUCKETS {
            let u = (i as Float + 0.5) / SPECTRAL_BUCKETS as Float;
            let s = strata.draw_sample(u, 0.5);
            assert_eq!(s.bucket, i);
            assert!((s.pdf - 1.0).abs() < 1e-4);
            assert!((s.rho - u).abs() < 1e-5);
        }
    }

    #[test]
    fn heavy_bucket_attracts_samples() {
        let mut strata = SpectralStrata::default();
        let u = 3.5 / SPECTRAL_BUCKETS as Float;
        let first = 3;
        for _ in 0..32 {
            assert_eq!(strata.draw_sample(u, 0.5).bucket, first);
            strata.update(50.0);
        }
        assert!(strata.pdf(first) > 1.0);

        let density: Float = (0..SPECTRAL_BUCKETS).map(|b| strata.pdf(b)).sum::<Float>() / SPECTRAL_BUCKETS as Float;
        assert!((density - 1.0).abs() < 1e-4);
        assert!((0..SPECTRAL_BUCKETS).all(|b| strata.pdf(b) > 0.0));

        let hits = (0..100)
            .filter(|i| strata.draw_sample((*i as Float + 0.5) / 100.0, 0.5).bucket == first)
            .count();
        assert!(hits > 100 / SPECTRAL_BUCKETS);
    }

    #[test]
    fn init_restores_prior_in_place() {
        let mut strata = SpectralStrata::default();
        strata.draw_sample(0.9, 0.1);
        strata.update(10.0);
        strata.update(Float::NAN);
        strata.init();
        assert_eq!(strata, SpectralStrata::default());
    }
}
