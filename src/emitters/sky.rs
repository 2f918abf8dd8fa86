// Copyright @yucwang 2026

use crate::math::constants::{ Float, Vector3f };
use crate::math::spectrum::sky_radiance;

pub const DEFAULT_SKY_DISTANCE: Float = 1000.0;

/// Implicit environment light on a sphere around the world origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sky {
    distance: Float,
    intensity: Float,
}

impl Default for Sky {
    fn default() -> Self {
        Self { distance: DEFAULT_SKY_DISTANCE, intensity: 1.0 }
    }
}

impl Sky {
    pub fn new(distance: Float, intensity: Float) -> Self {
        Self { distance: distance.max(1e-3), intensity: intensity.max(0.0) }
    }

    pub fn distance(&self) -> Float {
        self.distance
    }

    pub fn intensity(&self) -> Float {
        self.intensity
    }

    /// Point where the ray leaves the sky sphere.
    pub fn project(&self, ori: &Vector3f, dir: &Vector3f) -> Vector3f {
        let b = ori.dot(dir);
        let c = ori.norm_squared() - self.distance * self.distance;
        let disc = b * b - c;
        if disc < 0.0 {
            return ori + dir * self.distance;
        }
        let t = -b + disc.sqrt();
        ori + dir * t.max(0.0)
    }

    /// Spectral radiance and its pdf for an exit direction. The environment
    /// is evaluated rather than sampled, so the pdf is one.
    pub fn eval(&self, rho: Float, dir: &Vector3f) -> (Float, Float) {
        (self.intensity * sky_radiance(rho, dir.y), 1.0)
    }
}
